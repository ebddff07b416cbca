//! Routes served by the control plane itself.
//!
//! These match health checks and the `/.pomerium` and `/.well-known/pomerium`
//! path families on every host. They are emitted before policy routes so the
//! data plane's first-match-wins ordering always reaches them.

use crate::builder::headers::to_envoy_headers;
use crate::builder::{ext_authz_context, Builder};
use crate::envoy::route::{PathSpecifier, Route, RouteAction, RouteMatch};

/// Cluster pointing back at the control plane's HTTP listener.
pub const CONTROL_PLANE_CLUSTER: &str = "pomerium-control-plane-http";

enum ControlPlanePath {
    Exact(&'static str),
    Prefix(&'static str),
}

const CONTROL_PLANE_PATHS: [ControlPlanePath; 6] = [
    ControlPlanePath::Exact("/ping"),
    ControlPlanePath::Exact("/healthz"),
    ControlPlanePath::Exact("/.pomerium"),
    ControlPlanePath::Prefix("/.pomerium/"),
    ControlPlanePath::Exact("/.well-known/pomerium"),
    ControlPlanePath::Prefix("/.well-known/pomerium/"),
];

impl Builder<'_> {
    /// All control-plane routes, in matching order.
    pub fn build_control_plane_routes(&self) -> Vec<Route> {
        CONTROL_PLANE_PATHS
            .iter()
            .map(|path| match path {
                ControlPlanePath::Exact(path) => self.build_control_plane_path_route(path),
                ControlPlanePath::Prefix(prefix) => self.build_control_plane_prefix_route(prefix),
            })
            .collect()
    }

    /// Route matching exactly `path`.
    pub fn build_control_plane_path_route(&self, path: &str) -> Route {
        self.control_plane_route(format!("pomerium-path-{path}"), PathSpecifier::Path(path.to_string()))
    }

    /// Route matching everything under `prefix`.
    pub fn build_control_plane_prefix_route(&self, prefix: &str) -> Route {
        self.control_plane_route(
            format!("pomerium-prefix-{prefix}"),
            PathSpecifier::Prefix(prefix.to_string()),
        )
    }

    fn control_plane_route(&self, name: String, path_specifier: PathSpecifier) -> Route {
        Route {
            name,
            route_match: RouteMatch {
                path_specifier,
                headers: Vec::new(),
            },
            route: RouteAction::to_cluster(CONTROL_PLANE_CLUSTER),
            metadata: None,
            request_headers_to_add: Vec::new(),
            request_headers_to_remove: Vec::new(),
            response_headers_to_add: to_envoy_headers(&self.options().set_response_headers),
            typed_per_filter_config: ext_authz_context(true, 0),
        }
    }
}
