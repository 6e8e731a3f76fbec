pub mod config;
pub mod exercise;
pub mod history;
pub mod play;
pub mod session;
