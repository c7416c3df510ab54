//! # Counsel Routing
//!
//! Keyword routing for the transfer counsel orchestrator.
//!
//! This crate provides:
//! - A token and phrase matcher with a simple plural rule
//! - Weighted agent scoring with deterministic tie-breaks
//! - Primary and secondary agent selection within an epsilon band
//! - Routing explanations for diagnostics

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod explain;
pub mod matcher;
pub mod router;

// Re-export main types
pub use explain::{AgentExplanation, RoutingExplanation};
pub use matcher::{tokenize, QueryTokens};
pub use router::{Router, RouterConfig};
