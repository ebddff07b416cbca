//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks on every policy)
//!     → Config (validated, immutable)
//!     → handed to the builder for one full compilation
//!
//! On file change (watch mode):
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → new Config sent to the publisher
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a full rebuild
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod policy;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use policy::{LbPolicy, PathRule, Policy, PolicyError, WeightedUrl};
pub use schema::{
    BrandingOptions, Config, HeaderRule, ObservabilityConfig, Options, RuntimeFlags, ServiceRole,
    ServiceRoles,
};
