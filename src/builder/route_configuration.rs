//! Main route configuration compilation.

use std::collections::HashSet;

use crate::builder::{BuildError, Builder, SourcedPolicy};
use crate::envoy::route::RouteConfiguration;

/// Name of the published route configuration.
pub const MAIN_ROUTE_CONFIGURATION: &str = "main";

/// Virtual host that answers for any domain with control-plane routes only.
pub const CATCH_ALL_VIRTUAL_HOST: &str = "catch-all";

impl Builder<'_> {
    /// Build the route table: catch-all first, then one virtual host per
    /// distinct policy host in declaration order.
    pub fn build_main_route_configuration(&self) -> Result<RouteConfiguration, BuildError> {
        let policies = self.sourced_policies()?;

        // 1. Catch-all keeps health endpoints reachable for unknown hosts
        let mut virtual_hosts = vec![self.build_virtual_host_for(CATCH_ALL_VIRTUAL_HOST, "*", &[])?];

        // 2. One virtual host per policy host
        for host in distinct_hosts(&policies) {
            virtual_hosts.push(self.build_virtual_host_for(&host, &host, &policies)?);
        }

        Ok(RouteConfiguration {
            name: MAIN_ROUTE_CONFIGURATION.to_string(),
            virtual_hosts,
            // clusters are published separately and may not exist yet
            validate_clusters: false,
        })
    }
}

/// Distinct hostnames, first occurrence wins.
fn distinct_hosts(policies: &[SourcedPolicy<'_>]) -> Vec<String> {
    let mut seen = HashSet::new();
    policies
        .iter()
        .map(|p| p.source.hostname())
        .filter(|host| seen.insert(host.clone()))
        .collect()
}
