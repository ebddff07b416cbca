//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Publishing (publisher.rs):
//!     Options → Builder → Snapshot → output file + in-memory current
//!
//! Watch loop (publisher.rs):
//!     ConfigWatcher update → publish → (on failure) keep previous snapshot
//!
//! Shutdown (shutdown.rs):
//!     Ctrl-C received → broadcast → watch loop exits
//! ```
//!
//! # Design Decisions
//! - Fail-static: a failed build never replaces the published snapshot
//! - Versions only move forward, and only when the output changes
//! - The output file is replaced atomically

pub mod publisher;
pub mod shutdown;

pub use publisher::{ConfigPublisher, PublishError, Snapshot};
pub use shutdown::Shutdown;
