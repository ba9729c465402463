use crate::infrastructure::error::InfraError;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TaskChangeKind {
    Added,
    Updated,
    Completed,
    Deleted,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TaskChange {
    pub user_key: String,
    pub kind: TaskChangeKind,
    pub task_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type TaskChangeCallback = Arc<dyn Fn(&TaskChange) + Send + Sync>;

/// Fan-out of saved task changes to whoever needs to rebuild views.
#[derive(Default)]
pub struct TaskChangeNotifier {
    next_id: AtomicU64,
    subscribers: Mutex<Vec<(SubscriptionId, TaskChangeCallback)>>,
}

impl TaskChangeNotifier {
    pub fn subscribe<F>(&self, callback: F) -> Result<SubscriptionId, InfraError>
    where
        F: Fn(&TaskChange) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.lock_subscribers()?.push((id, Arc::new(callback)));
        Ok(id)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> Result<bool, InfraError> {
        let mut subscribers = self.lock_subscribers()?;
        let before = subscribers.len();
        subscribers.retain(|(candidate, _)| *candidate != id);
        Ok(subscribers.len() != before)
    }

    /// Calls every subscriber outside the lock and returns how many ran.
    pub fn notify(&self, change: &TaskChange) -> Result<usize, InfraError> {
        let callbacks = self
            .lock_subscribers()?
            .iter()
            .map(|(_, callback)| Arc::clone(callback))
            .collect::<Vec<_>>();
        for callback in &callbacks {
            callback(change);
        }
        Ok(callbacks.len())
    }

    #[cfg(test)]
    pub(crate) fn poison_for_tests(&self) {
        std::thread::scope(|scope| {
            let outcome = scope
                .spawn(|| {
                    let _guard = self.subscribers.lock();
                    panic!("subscriber lock poisoned on purpose");
                })
                .join();
            assert!(outcome.is_err());
        });
    }

    fn lock_subscribers(
        &self,
    ) -> Result<MutexGuard<'_, Vec<(SubscriptionId, TaskChangeCallback)>>, InfraError> {
        self.subscribers
            .lock()
            .map_err(|error| InfraError::InvalidConfig(format!("subscriber lock poisoned: {error}")))
    }
}
