//! Configuration builder.
//!
//! # Data Flow
//! ```text
//! Options (policies + globals)
//!     → route_configuration.rs (catch-all + one virtual host per policy host)
//!         → virtual_host.rs (domains, control-plane routes, policy routes)
//!             → control_plane.rs (/ping, /healthz, /.pomerium, ...)
//!             → policy_route.rs (per-policy routes, stable ids, headers)
//!                 → headers.rs (header rules → header mutations)
//!     → local_reply.rs (error page for proxy-generated responses)
//!     → CompiledConfig
//! ```
//!
//! # Design Decisions
//! - Pure functions of `Options`; no state is kept between builds
//! - A build either fully succeeds or fails; nothing partial is returned
//! - Errors carry the virtual host and policy they came from

pub mod control_plane;
pub mod headers;
pub mod local_reply;
pub mod policy_route;
pub mod route_configuration;
pub mod virtual_host;

use std::collections::BTreeMap;
use std::time::Instant;

use serde::Serialize;

use crate::config::policy::{Policy, PolicyError};
use crate::config::schema::Options;
use crate::envoy::local_reply::LocalReplyConfig;
use crate::envoy::route::{CheckSettings, ExtAuthzPerRoute, RouteConfiguration, TypedFilterConfig, EXT_AUTHZ_FILTER_NAME};
use crate::observability::metrics;
use crate::render::{PageRenderer, RenderError};
use crate::routing::matcher::SourcePattern;

/// Error aborting a build.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("invalid policy {policy}: {source}")]
    InvalidPolicy {
        policy: String,
        #[source]
        source: PolicyError,
    },

    #[error("virtual host {host}: {source}")]
    VirtualHost {
        host: String,
        #[source]
        source: Box<BuildError>,
    },

    #[error("error rendering error page for local reply: {0}")]
    Render(#[from] RenderError),
}

/// Everything one build publishes to the data plane.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompiledConfig {
    pub route_configuration: RouteConfiguration,
    pub local_reply_config: LocalReplyConfig,
}

/// A policy together with its parsed source and declaration index.
#[derive(Debug, Clone)]
pub struct SourcedPolicy<'p> {
    pub index: usize,
    pub policy: &'p Policy,
    pub source: SourcePattern,
}

/// Compiles options into data-plane configuration.
pub struct Builder<'a> {
    options: &'a Options,
    renderer: &'a dyn PageRenderer,
}

impl<'a> Builder<'a> {
    pub fn new(options: &'a Options, renderer: &'a dyn PageRenderer) -> Self {
        Self { options, renderer }
    }

    pub fn options(&self) -> &Options {
        self.options
    }

    /// Build the route configuration and the local reply config.
    pub fn build(&self) -> Result<CompiledConfig, BuildError> {
        let started = Instant::now();
        let result = self.build_main_route_configuration().and_then(|route_configuration| {
            Ok(CompiledConfig {
                route_configuration,
                local_reply_config: self.build_local_reply_config()?,
            })
        });

        match &result {
            Ok(compiled) => {
                metrics::record_build(true, started);
                metrics::record_compiled(compiled);
                tracing::info!(
                    virtual_hosts = compiled.route_configuration.virtual_hosts.len(),
                    routes = compiled.route_configuration.route_count(),
                    policies = self.options.policies.len(),
                    "Route configuration built"
                );
            }
            Err(e) => {
                metrics::record_build(false, started);
                tracing::error!(error = %e, "Route configuration build failed");
            }
        }
        result
    }

    /// Parse every policy source, in declaration order.
    fn sourced_policies(&self) -> Result<Vec<SourcedPolicy<'a>>, BuildError> {
        self.options
            .policies
            .iter()
            .enumerate()
            .map(|(index, policy)| {
                SourcePattern::parse(&policy.from)
                    .map(|source| SourcedPolicy { index, policy, source })
                    .map_err(|source| BuildError::InvalidPolicy {
                        policy: policy.identity(index),
                        source,
                    })
            })
            .collect()
    }
}

/// Per-route authorization context: whether the route is internal and its id.
pub fn ext_authz_context(internal: bool, route_id: u64) -> BTreeMap<String, TypedFilterConfig> {
    let context_extensions = BTreeMap::from([
        ("internal".to_string(), internal.to_string()),
        ("route_id".to_string(), route_id.to_string()),
    ]);
    BTreeMap::from([(
        EXT_AUTHZ_FILTER_NAME.to_string(),
        TypedFilterConfig::ExtAuthzPerRoute(ExtAuthzPerRoute {
            check_settings: CheckSettings { context_extensions },
        }),
    )])
}
