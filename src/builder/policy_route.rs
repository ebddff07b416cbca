//! Per-policy route compilation.
//!
//! # Responsibilities
//! - Translate one policy into one route per authority variant
//! - Attach stable cluster names and route ids
//! - Attach the fixed header, hash and metadata rules every policy route carries
//!
//! # Design Decisions
//! - Authority variants differ only in their `:authority` matcher
//! - Policy header rules are applied on top of the fixed rules, never instead of them

use std::collections::BTreeMap;
use std::time::Duration;

use crate::builder::headers::{
    security_response_headers, to_envoy_headers, INTERNAL_REQUEST_HEADERS, ROUTING_KEY_HEADER,
};
use crate::builder::{ext_authz_context, Builder, SourcedPolicy};
use crate::config::policy::{PathRule, Policy, PolicyError};
use crate::envoy::core::ProtoDuration;
use crate::envoy::route::{
    ConnectionPropertiesHash, CookieHash, FilterMetadata, HashPolicy, HashPolicySpecifier, HeaderHash,
    HeaderMatcher, Metadata, PathSpecifier, RegexMatcher, ResponseRewriteMetadata,
    RewriteResponseHeaderMetadata, Route, RouteAction, RouteMatch, StringMatcher, UpgradeConfig,
    LUA_FILTER_NAME,
};
use crate::routing::matcher::AuthorityMatch;
use crate::routing::stable_id::{cluster_name, route_id};

const WEBSOCKET_UPGRADE: &str = "websocket";
const SPDY_UPGRADE: &str = "spdy/3.1";

impl Builder<'_> {
    /// Compile one policy into its routes.
    pub fn build_policy_routes(&self, sourced: &SourcedPolicy<'_>) -> Result<Vec<Route>, PolicyError> {
        let policy = sourced.policy;
        if policy.to.is_empty() {
            return Err(PolicyError::NoTargets);
        }

        let path_specifier = match policy.path_rule()? {
            PathRule::Prefix(prefix) => PathSpecifier::Prefix(prefix),
            PathRule::Path(path) => PathSpecifier::Path(path),
            PathRule::Regex(regex) => PathSpecifier::SafeRegex(RegexMatcher { regex }),
        };
        let authorities = sourced.source.authority_matchers()?;

        let id = route_id(policy, &sourced.source);
        let action = self.build_policy_route_action(policy, cluster_name(id));
        let metadata = self.build_policy_metadata(policy);

        let request_headers_to_remove: Vec<String> = INTERNAL_REQUEST_HEADERS
            .iter()
            .map(|h| h.to_string())
            .chain(policy.remove_request_headers.iter().cloned())
            .collect();
        let mut response_headers_to_add = security_response_headers();
        response_headers_to_add.extend(to_envoy_headers(&policy.set_response_headers));
        let request_headers_to_add = to_envoy_headers(&policy.set_request_headers);

        tracing::debug!(
            policy = %policy.identity(sourced.index),
            cluster = %action.cluster,
            route_id = id,
            variants = authorities.len(),
            "Built policy routes"
        );

        Ok(authorities
            .into_iter()
            .map(|authority| Route {
                name: format!("policy-{}", sourced.index),
                route_match: RouteMatch {
                    path_specifier: path_specifier.clone(),
                    headers: authority_headers(authority),
                },
                route: action.clone(),
                metadata: Some(metadata.clone()),
                request_headers_to_add: request_headers_to_add.clone(),
                request_headers_to_remove: request_headers_to_remove.clone(),
                response_headers_to_add: response_headers_to_add.clone(),
                typed_per_filter_config: ext_authz_context(policy.internal, id),
            })
            .collect())
    }

    fn build_policy_route_action(&self, policy: &Policy, cluster: String) -> RouteAction {
        // upgraded connections are long lived; only the idle timeout applies
        let (timeout, idle_timeout) = if policy.allows_upgrades() {
            (Duration::ZERO, policy.idle_timeout())
        } else {
            (policy.upstream_timeout(self.options().default_upstream_timeout()), None)
        };

        RouteAction {
            cluster,
            auto_host_rewrite: Some(true),
            hash_policy: build_hash_policy(policy),
            timeout: Some(ProtoDuration(timeout)),
            idle_timeout: idle_timeout.map(ProtoDuration),
            upgrade_configs: vec![
                UpgradeConfig {
                    upgrade_type: WEBSOCKET_UPGRADE.to_string(),
                    enabled: policy.allow_websockets,
                },
                UpgradeConfig {
                    upgrade_type: SPDY_UPGRADE.to_string(),
                    enabled: policy.allow_spdy,
                },
            ],
        }
    }

    fn build_policy_metadata(&self, policy: &Policy) -> Metadata {
        let rewrite = ResponseRewriteMetadata {
            remove_impersonate_headers: policy.service_account_token.is_some(),
            remove_pomerium_authorization: true,
            remove_pomerium_cookie: self.options().cookie_name.clone(),
            rewrite_response_headers: policy
                .rewrite_response_headers
                .iter()
                .map(|r| RewriteResponseHeaderMetadata {
                    header: r.header.clone(),
                    prefix: r.prefix.clone(),
                    value: r.value.clone(),
                })
                .collect(),
        };
        Metadata {
            filter_metadata: BTreeMap::from([(
                LUA_FILTER_NAME.to_string(),
                FilterMetadata::ResponseRewrite(rewrite),
            )]),
        }
    }
}

/// Routing key header, then the optional affinity cookie, then the client IP.
fn build_hash_policy(policy: &Policy) -> Vec<HashPolicy> {
    let mut steps = vec![HashPolicy {
        policy_specifier: HashPolicySpecifier::Header(HeaderHash {
            header_name: ROUTING_KEY_HEADER.to_string(),
        }),
        terminal: true,
    }];
    if let Some(affinity) = &policy.session_affinity {
        steps.push(HashPolicy {
            policy_specifier: HashPolicySpecifier::Cookie(CookieHash {
                name: affinity.cookie_name.clone(),
                ttl: (affinity.ttl_secs > 0).then(|| ProtoDuration(Duration::from_secs(affinity.ttl_secs))),
            }),
            terminal: true,
        });
    }
    steps.push(HashPolicy {
        policy_specifier: HashPolicySpecifier::ConnectionProperties(ConnectionPropertiesHash {
            source_ip: true,
        }),
        terminal: true,
    });
    steps
}

fn authority_headers(authority: AuthorityMatch) -> Vec<HeaderMatcher> {
    match authority {
        AuthorityMatch::Any => Vec::new(),
        AuthorityMatch::Regex(regex) => vec![HeaderMatcher {
            name: ":authority".to_string(),
            string_match: StringMatcher::SafeRegex(RegexMatcher { regex }),
        }],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::policy::{RewriteResponseHeader, SessionAffinity, WeightedUrl};
    use crate::config::schema::{HeaderRule, Options};
    use crate::envoy::core::HeaderAppendAction;
    use crate::render::HtmlPageRenderer;
    use crate::routing::matcher::SourcePattern;

    fn policy(from: &str) -> Policy {
        Policy {
            from: from.into(),
            to: vec!["https://upstream.internal".parse::<WeightedUrl>().unwrap()],
            ..Default::default()
        }
    }

    fn build(options: &Options, policy: &Policy) -> Result<Vec<Route>, PolicyError> {
        let sourced = SourcedPolicy {
            index: 0,
            policy,
            source: SourcePattern::parse(&policy.from).unwrap(),
        };
        Builder::new(options, &HtmlPageRenderer).build_policy_routes(&sourced)
    }

    #[test]
    fn test_concrete_host_single_route_without_authority() {
        let routes = build(&Options::default(), &policy("https://a.example.com")).unwrap();
        assert_eq!(routes.len(), 1);
        assert!(routes[0].route_match.headers.is_empty());
        assert_eq!(routes[0].route_match.path_specifier, PathSpecifier::Prefix("/".into()));
        assert_eq!(routes[0].route.timeout, Some(ProtoDuration(Duration::from_secs(30))));
    }

    #[test]
    fn test_wildcard_variants_share_everything_but_match() {
        let p = policy("https://*.example.com");
        let routes = build(&Options::default(), &p).unwrap();
        assert_eq!(routes.len(), 2);
        let (a, b) = (&routes[0], &routes[1]);
        assert_ne!(a.route_match, b.route_match);
        assert_eq!(a.name, b.name);
        assert_eq!(a.route, b.route);
        assert_eq!(a.metadata, b.metadata);
        assert_eq!(a.typed_per_filter_config, b.typed_per_filter_config);

        let id = route_id(&p, &SourcePattern::parse(&p.from).unwrap());
        assert_eq!(a.route.cluster, cluster_name(id));
        assert_eq!(a.request_headers_to_remove, b.request_headers_to_remove);
        assert_eq!(a.response_headers_to_add, b.response_headers_to_add);
    }

    #[test]
    fn test_policy_headers_are_additive() {
        let p = Policy {
            remove_request_headers: vec!["x-debug".into()],
            set_request_headers: vec![HeaderRule::overwrite("X-Tenant", "blue")],
            set_response_headers: vec![HeaderRule::append("X-Served-By", "edge")],
            ..policy("https://a.example.com")
        };
        let route = build(&Options::default(), &p).unwrap().remove(0);

        assert_eq!(
            route.request_headers_to_remove,
            vec![
                "x-pomerium-jwt-assertion",
                "x-pomerium-jwt-assertion-for",
                "x-pomerium-reproxy-policy",
                "x-pomerium-reproxy-policy-hmac",
                "x-debug",
            ]
        );
        let keys: Vec<&str> = route
            .response_headers_to_add
            .iter()
            .map(|h| h.header.key.as_str())
            .collect();
        assert_eq!(keys, vec!["X-Frame-Options", "X-XSS-Protection", "X-Served-By"]);
        assert_eq!(
            route.response_headers_to_add[2].append_action,
            HeaderAppendAction::AppendIfExistsOrAdd
        );
        assert_eq!(route.request_headers_to_add[0].header.key, "X-Tenant");
    }

    #[test]
    fn test_upgrades_disable_timeout() {
        let p = Policy {
            allow_websockets: true,
            idle_timeout_ms: Some(60_000),
            timeout_ms: Some(5_000),
            ..policy("https://a.example.com")
        };
        let route = build(&Options::default(), &p).unwrap().remove(0);
        assert_eq!(route.route.timeout, Some(ProtoDuration(Duration::ZERO)));
        assert_eq!(route.route.idle_timeout, Some(ProtoDuration(Duration::from_secs(60))));
        assert_eq!(
            route.route.upgrade_configs,
            vec![
                UpgradeConfig { upgrade_type: "websocket".into(), enabled: true },
                UpgradeConfig { upgrade_type: "spdy/3.1".into(), enabled: false },
            ]
        );
    }

    #[test]
    fn test_session_affinity_sits_before_source_ip() {
        let p = Policy {
            session_affinity: Some(SessionAffinity {
                cookie_name: "lb".into(),
                ttl_secs: 3600,
            }),
            ..policy("https://a.example.com")
        };
        let route = build(&Options::default(), &p).unwrap().remove(0);
        let hash = &route.route.hash_policy;
        assert_eq!(hash.len(), 3);
        assert!(hash.iter().all(|h| h.terminal));
        assert!(matches!(hash[0].policy_specifier, HashPolicySpecifier::Header(_)));
        assert_eq!(
            hash[1].policy_specifier,
            HashPolicySpecifier::Cookie(CookieHash {
                name: "lb".into(),
                ttl: Some(ProtoDuration(Duration::from_secs(3600))),
            })
        );
        assert!(matches!(
            hash[2].policy_specifier,
            HashPolicySpecifier::ConnectionProperties(ConnectionPropertiesHash { source_ip: true })
        ));
    }

    #[test]
    fn test_rewrite_metadata() {
        let p = Policy {
            service_account_token: Some("token".into()),
            rewrite_response_headers: vec![RewriteResponseHeader {
                header: "Location".into(),
                prefix: "http://internal/".into(),
                value: "https://a.example.com/".into(),
            }],
            internal: true,
            ..policy("https://a.example.com")
        };
        let options = Options {
            cookie_name: "session".into(),
            ..Default::default()
        };
        let route = build(&options, &p).unwrap().remove(0);
        let metadata = serde_json::to_value(&route.metadata).unwrap();
        assert_eq!(
            metadata,
            serde_json::json!({
                "filterMetadata": {
                    "envoy.filters.http.lua": {
                        "remove_impersonate_headers": true,
                        "remove_pomerium_authorization": true,
                        "remove_pomerium_cookie": "session",
                        "rewrite_response_headers": [
                            { "header": "Location", "prefix": "http://internal/", "value": "https://a.example.com/" }
                        ]
                    }
                }
            })
        );
        let authz = serde_json::to_value(&route.typed_per_filter_config).unwrap();
        assert_eq!(
            authz["envoy.filters.http.ext_authz"]["checkSettings"]["contextExtensions"]["internal"],
            "true"
        );
    }

    #[test]
    fn test_path_regex_route() {
        let p = Policy {
            regex: Some("^/api/v[0-9]+/.*$".into()),
            ..policy("https://a.example.com")
        };
        let route = build(&Options::default(), &p).unwrap().remove(0);
        assert_eq!(
            route.route_match.path_specifier,
            PathSpecifier::SafeRegex(RegexMatcher { regex: "^/api/v[0-9]+/.*$".into() })
        );
    }
}
