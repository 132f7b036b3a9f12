pub mod activity_log;
pub mod admin_view;
pub mod app;
pub mod browser;
pub mod shared_state;
pub mod user_view;
