//! # Counsel Providers
//!
//! Provider implementations for the transfer counsel orchestrator:
//! - OpenAI-compatible chat completions over HTTP
//! - Offline provider for running without credentials

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod offline;
pub mod openai;

// Re-export main types
pub use offline::OfflineProvider;
pub use openai::{OpenAiConfig, OpenAiProvider};
