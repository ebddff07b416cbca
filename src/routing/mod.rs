//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Policy.from ("https://*.example.com")
//!     → matcher.rs (parse source pattern, derive domains and authority regexes)
//!     → builder (virtual hosts and routes)
//!
//! Policy content (targets, source, path rule)
//!     → stable_id.rs (content hash)
//!     → cluster name "route-<hex>" and numeric route id
//! ```
//!
//! # Design Decisions
//! - Routes compiled from scratch on every build, never patched
//! - Deterministic: same policy content always yields the same identifiers
//! - First match wins in the data plane, so route order is part of the contract

pub mod matcher;
pub mod stable_id;

pub use matcher::{AuthorityMatch, SourcePattern};
pub use stable_id::{cluster_name, route_id};
