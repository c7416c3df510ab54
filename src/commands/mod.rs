//! CLI commands module.

pub mod ask;
pub mod chat;
pub mod config;
pub mod history;
pub mod route;
pub mod sessions;
