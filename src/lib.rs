//! Route compiler library.
//!
//! Compiles identity-aware access policies into the data plane's route
//! table and local reply configuration.

pub mod builder;
pub mod config;
pub mod envoy;
pub mod lifecycle;
pub mod observability;
pub mod render;
pub mod routing;

pub use builder::{BuildError, Builder, CompiledConfig};
pub use config::schema::{Config, Options};
pub use lifecycle::{ConfigPublisher, Shutdown, Snapshot};
pub use render::{HtmlPageRenderer, PageRenderer};
