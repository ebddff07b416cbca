//! End-to-end route table compilation.

mod common;

use route_compiler::builder::control_plane::CONTROL_PLANE_CLUSTER;
use route_compiler::config::schema::{HeaderRule, Options};
use route_compiler::envoy::route::{PathSpecifier, Route, StringMatcher};
use route_compiler::envoy::HeaderAppendAction;
use route_compiler::routing::{cluster_name, route_id, SourcePattern};
use route_compiler::{Builder, HtmlPageRenderer};

use serde_json::json;

use common::{policy, proxy_options, wildcard_options};

fn compile(options: &Options) -> route_compiler::CompiledConfig {
    Builder::new(options, &HtmlPageRenderer).build().expect("build succeeds")
}

fn policy_routes(routes: &[Route]) -> Vec<&Route> {
    routes.iter().filter(|r| r.name.starts_with("policy-")).collect()
}

fn authority_regex(route: &Route) -> Option<&str> {
    route.route_match.headers.iter().find_map(|h| match (&h.name[..], &h.string_match) {
        (":authority", StringMatcher::SafeRegex(m)) => Some(m.regex.as_str()),
        _ => None,
    })
}

fn wildcard_policy_route(authority: &str, cluster: &str, route_id: u64) -> serde_json::Value {
    json!({
        "name": "policy-0",
        "match": {
            "prefix": "/",
            "headers": [
                { "name": ":authority", "stringMatch": { "safeRegex": { "regex": authority } } }
            ]
        },
        "metadata": {
            "filterMetadata": {
                "envoy.filters.http.lua": {
                    "remove_impersonate_headers": false,
                    "remove_pomerium_authorization": true,
                    "remove_pomerium_cookie": "pomerium",
                    "rewrite_response_headers": []
                }
            }
        },
        "requestHeadersToRemove": [
            "x-pomerium-jwt-assertion",
            "x-pomerium-jwt-assertion-for",
            "x-pomerium-reproxy-policy",
            "x-pomerium-reproxy-policy-hmac"
        ],
        "responseHeadersToAdd": [
            { "appendAction": "OVERWRITE_IF_EXISTS_OR_ADD", "header": { "key": "X-Frame-Options", "value": "SAMEORIGIN" } },
            { "appendAction": "OVERWRITE_IF_EXISTS_OR_ADD", "header": { "key": "X-XSS-Protection", "value": "1; mode=block" } }
        ],
        "route": {
            "autoHostRewrite": true,
            "cluster": cluster,
            "hashPolicy": [
                { "header": { "headerName": "x-pomerium-routing-key" }, "terminal": true },
                { "connectionProperties": { "sourceIp": true }, "terminal": true }
            ],
            "timeout": "3s",
            "upgradeConfigs": [
                { "enabled": false, "upgradeType": "websocket" },
                { "enabled": false, "upgradeType": "spdy/3.1" }
            ]
        },
        "typedPerFilterConfig": {
            "envoy.filters.http.ext_authz": {
                "@type": "type.googleapis.com/envoy.extensions.filters.http.ext_authz.v3.ExtAuthzPerRoute",
                "checkSettings": {
                    "contextExtensions": {
                        "internal": "false",
                        "route_id": route_id.to_string()
                    }
                }
            }
        }
    })
}

#[test]
fn test_wildcard_fixture() {
    let options = wildcard_options();
    let compiled = compile(&options);
    let config = &compiled.route_configuration;

    assert_eq!(config.name, "main");
    assert!(!config.validate_clusters);
    assert_eq!(config.virtual_hosts.len(), 2);
    assert_eq!(config.virtual_hosts[0].name, "catch-all");
    assert_eq!(config.virtual_hosts[0].domains, vec!["*"]);
    assert_eq!(config.virtual_hosts[1].name, "*.example.com");
    assert_eq!(config.virtual_hosts[1].domains, vec!["*.example.com"]);

    let policy = &options.policies[0];
    let id = route_id(policy, &SourcePattern::parse(&policy.from).unwrap());
    let cluster = cluster_name(id);
    assert_eq!(cluster, format!("route-{id:016x}"));

    let routes: Vec<serde_json::Value> = policy_routes(&config.virtual_hosts[1].routes)
        .into_iter()
        .map(|route| serde_json::to_value(route).unwrap())
        .collect();
    assert_eq!(
        routes,
        vec![
            wildcard_policy_route(r"^(.*)\.example\.com$", &cluster, id),
            wildcard_policy_route(r"^(.*)\.example\.com:443$", &cluster, id),
        ]
    );
}

#[test]
fn test_builds_are_byte_identical() {
    let options = proxy_options(vec![
        policy("https://*.example.com", &["https://www.example.com"]),
        policy("https://a.example.com", &["http://10.0.0.1,2", "http://10.0.0.2,1"]),
        policy("http://b.example.com:8080", &["http://10.0.0.3"]),
    ]);
    let a = serde_json::to_vec(&compile(&options)).unwrap();
    let b = serde_json::to_vec(&compile(&options.clone())).unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_infrastructure_routes_precede_policy_routes() {
    let options = proxy_options(vec![
        policy("https://a.example.com", &["http://10.0.0.1"]),
        policy("https://*.example.com", &["http://10.0.0.2"]),
    ]);
    let compiled = compile(&options);
    for vh in &compiled.route_configuration.virtual_hosts {
        let first_policy = vh.routes.iter().position(|r| r.name.starts_with("policy-"));
        let last_infra = vh
            .routes
            .iter()
            .rposition(|r| r.route.cluster == CONTROL_PLANE_CLUSTER);
        assert!(last_infra.is_some(), "{} has no infrastructure routes", vh.name);
        if let Some(first_policy) = first_policy {
            assert!(last_infra.unwrap() < first_policy, "{}", vh.name);
        }
    }
}

#[test]
fn test_header_invariants_hold_despite_policy_rules() {
    let mut p = policy("https://a.example.com", &["http://10.0.0.1"]);
    p.remove_request_headers = vec!["x-debug".into()];
    p.set_response_headers = vec![
        HeaderRule::append("X-Frame-Options", "DENY"),
        HeaderRule::overwrite("Cache-Control", "no-store"),
    ];
    let compiled = compile(&proxy_options(vec![p]));

    let vh = &compiled.route_configuration.virtual_hosts[1];
    for route in policy_routes(&vh.routes) {
        for header in [
            "x-pomerium-jwt-assertion",
            "x-pomerium-jwt-assertion-for",
            "x-pomerium-reproxy-policy",
            "x-pomerium-reproxy-policy-hmac",
        ] {
            assert!(route.request_headers_to_remove.iter().any(|h| h == header), "{header}");
        }
        for (key, value) in [("X-Frame-Options", "SAMEORIGIN"), ("X-XSS-Protection", "1; mode=block")] {
            assert!(
                route.response_headers_to_add.iter().any(|h| h.header.key == key
                    && h.header.value == value
                    && h.append_action == HeaderAppendAction::OverwriteIfExistsOrAdd),
                "{key}"
            );
        }
    }
}

#[test]
fn test_empty_policy_set_yields_catch_all_only() {
    let compiled = compile(&Options::default());
    let config = &compiled.route_configuration;
    assert_eq!(config.virtual_hosts.len(), 1);
    assert_eq!(config.virtual_hosts[0].name, "catch-all");
    assert_eq!(config.virtual_hosts[0].domains, vec!["*"]);
    assert!(config.virtual_hosts[0]
        .routes
        .iter()
        .all(|r| r.route.cluster == CONTROL_PLANE_CLUSTER));
}

#[test]
fn test_port_matching_flag() {
    let mut options = proxy_options(vec![policy("https://a.example.com", &["http://10.0.0.1"])]);
    let compiled = compile(&options);
    assert_eq!(
        compiled.route_configuration.virtual_hosts[1].domains,
        vec!["a.example.com", "a.example.com:*"]
    );

    options.runtime_flags.match_any_incoming_port = false;
    let compiled = compile(&options);
    assert_eq!(compiled.route_configuration.virtual_hosts[1].domains, vec!["a.example.com"]);
}

#[test]
fn test_policies_sharing_a_host_share_a_virtual_host() {
    let mut admin = policy("https://a.example.com", &["http://10.0.0.2"]);
    admin.prefix = Some("/admin".into());
    let options = proxy_options(vec![admin, policy("https://a.example.com", &["http://10.0.0.1"])]);
    let compiled = compile(&options);

    assert_eq!(compiled.route_configuration.virtual_hosts.len(), 2);
    let routes = policy_routes(&compiled.route_configuration.virtual_hosts[1].routes);
    assert_eq!(routes.len(), 2);
    // declaration order decides precedence
    assert_eq!(routes[0].route_match.path_specifier, PathSpecifier::Prefix("/admin".into()));
    assert_eq!(routes[1].route_match.path_specifier, PathSpecifier::Prefix("/".into()));
    assert_ne!(routes[0].route.cluster, routes[1].route.cluster);
}

#[test]
fn test_invalid_policy_aborts_build() {
    let options = proxy_options(vec![
        policy("https://a.example.com", &["http://10.0.0.1"]),
        policy("https://b.example.com", &[]),
    ]);
    let err = Builder::new(&options, &HtmlPageRenderer).build().unwrap_err();
    let message = err.to_string();
    assert!(message.contains("b.example.com"), "{message}");
    assert!(message.contains("policy-1"), "{message}");
}
