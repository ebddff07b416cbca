//! Virtual host compilation.

use crate::builder::{BuildError, Builder, SourcedPolicy};
use crate::envoy::route::VirtualHost;
use crate::routing::matcher::virtual_host_domains;

impl<'a> Builder<'a> {
    /// Build the virtual host `name` serving `host`, with every matching policy route.
    pub fn build_virtual_host(&self, name: &str, host: &str) -> Result<VirtualHost, BuildError> {
        let policies = self.sourced_policies()?;
        self.build_virtual_host_for(name, host, &policies)
    }

    pub(crate) fn build_virtual_host_for(
        &self,
        name: &str,
        host: &str,
        policies: &[SourcedPolicy<'a>],
    ) -> Result<VirtualHost, BuildError> {
        // if we're stripping the port from incoming requests and this host
        // doesn't have a port or wildcard in it, `host:*` matches any port
        let domains = virtual_host_domains(host, self.options().runtime_flags.match_any_incoming_port);

        // these routes match /.pomerium/... and similar paths
        let mut routes = self.build_control_plane_routes();

        for sourced in policies.iter().filter(|p| p.source.matches_host(host)) {
            let policy_routes = self.build_policy_routes(sourced).map_err(|source| BuildError::VirtualHost {
                host: name.to_string(),
                source: Box::new(BuildError::InvalidPolicy {
                    policy: sourced.policy.identity(sourced.index),
                    source,
                }),
            })?;
            routes.extend(policy_routes);
        }

        tracing::debug!(virtual_host = %name, domains = ?domains, routes = routes.len(), "Built virtual host");

        Ok(VirtualHost {
            name: name.to_string(),
            domains,
            routes,
        })
    }
}
