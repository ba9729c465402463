pub mod clock;
pub mod config;
pub mod error;
pub mod storage;
pub mod task_store;
