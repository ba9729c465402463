pub mod bootstrap;
pub mod commands;
pub mod task_events;
pub mod ticker;
