pub mod calendar_grid;
pub mod date_matcher;
pub mod models;
pub mod session_timer;
