//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Builder, publisher, watcher produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (build counters, durations, route gauges)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape, watch mode only)
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing
//! - Metrics are recorded unconditionally; without an installed recorder they are no-ops

pub mod logging;
pub mod metrics;

pub use self::logging::init_logging;
pub use self::metrics::init_metrics;
