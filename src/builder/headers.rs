//! Header rule translation.

use crate::config::schema::HeaderRule;
use crate::envoy::core::{HeaderAppendAction, HeaderValue, HeaderValueOption};

/// Header carrying an explicit session-affinity key.
pub const ROUTING_KEY_HEADER: &str = "x-pomerium-routing-key";

/// Internal propagation headers that must never reach an upstream.
pub const INTERNAL_REQUEST_HEADERS: [&str; 4] = [
    "x-pomerium-jwt-assertion",
    "x-pomerium-jwt-assertion-for",
    "x-pomerium-reproxy-policy",
    "x-pomerium-reproxy-policy-hmac",
];

/// Security headers set on every policy route response.
pub const SECURITY_RESPONSE_HEADERS: [(&str, &str); 2] = [
    ("X-Frame-Options", "SAMEORIGIN"),
    ("X-XSS-Protection", "1; mode=block"),
];

/// Convert header rules to header mutations, preserving order.
pub fn to_envoy_headers(rules: &[HeaderRule]) -> Vec<HeaderValueOption> {
    rules
        .iter()
        .map(|rule| HeaderValueOption {
            header: HeaderValue {
                key: rule.name.clone(),
                value: rule.value.clone(),
            },
            append_action: if rule.overwrite {
                HeaderAppendAction::OverwriteIfExistsOrAdd
            } else {
                HeaderAppendAction::AppendIfExistsOrAdd
            },
        })
        .collect()
}

/// The fixed security headers, overwriting any upstream value.
pub fn security_response_headers() -> Vec<HeaderValueOption> {
    let rules: Vec<HeaderRule> = SECURITY_RESPONSE_HEADERS
        .iter()
        .map(|(name, value)| HeaderRule::overwrite(*name, *value))
        .collect();
    to_envoy_headers(&rules)
}
