//! Shared fixtures for integration tests.

#![allow(dead_code)]

use route_compiler::config::policy::{Policy, WeightedUrl};
use route_compiler::config::schema::{Options, ServiceRole, ServiceRoles};

/// A policy forwarding `from` to the given targets.
pub fn policy(from: &str, to: &[&str]) -> Policy {
    Policy {
        from: from.to_string(),
        to: to
            .iter()
            .map(|target| target.parse::<WeightedUrl>().expect("valid target"))
            .collect(),
        ..Default::default()
    }
}

/// Options matching the reference deployment: proxy role, `pomerium` cookie, 3s timeout.
pub fn proxy_options(policies: Vec<Policy>) -> Options {
    Options {
        cookie_name: "pomerium".to_string(),
        default_upstream_timeout_secs: 3,
        services: ServiceRoles::new([ServiceRole::Proxy]),
        policies,
        ..Default::default()
    }
}

/// The wildcard fixture: every `*.example.com` host forwards to `www.example.com`.
pub fn wildcard_options() -> Options {
    proxy_options(vec![policy("https://*.example.com", &["https://www.example.com"])])
}
