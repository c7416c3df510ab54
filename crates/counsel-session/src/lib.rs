//! # Counsel Session
//!
//! Conversation state for the transfer counsel orchestrator.
//!
//! This crate provides:
//! - A concurrency-safe session store with per-session serialization
//! - A persistence interface with graceful degradation on failure
//! - A SQLite backend on sqlx
//! - Idle session cleanup
//!
//! ## Example
//!
//! ```rust,no_run
//! use counsel_session::{PoolConfig, SessionStore, SqliteSessionBackend};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let backend = SqliteSessionBackend::connect(&PoolConfig::new("sqlite://sessions.db")).await?;
//!     let store = SessionStore::with_backend(Arc::new(backend));
//!     let history = store.history(&"session-1".into(), 10).await;
//!     println!("{} turns", history.len());
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod backend;
pub mod pool;
pub mod schema;
pub mod sqlite;
pub mod store;

pub use backend::SessionBackend;
pub use pool::PoolConfig;
pub use sqlite::SqliteSessionBackend;
pub use store::SessionStore;

/// Re-export sqlx types for convenience
pub use sqlx;
