//! Config file to published snapshot.

use std::sync::Arc;

use route_compiler::config::loader::{load_config, parse_config};
use route_compiler::{ConfigPublisher, HtmlPageRenderer};

const CONFIG: &str = r#"
[options]
cookie_name = "pomerium"
default_upstream_timeout_secs = 3
services = "proxy"

[[options.policies]]
from = "https://*.example.com"
to = ["https://www.example.com"]

[[options.policies]]
id = "api"
from = "https://api.example.com"
to = ["http://10.0.0.1:8080,2", "http://10.0.0.2:8080,1"]
prefix = "/v1/"
allow_websockets = true
idle_timeout_ms = 30000
"#;

#[test]
fn test_compile_file_to_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("config.toml");
    let output = dir.path().join("routes.json");
    std::fs::write(&config_path, CONFIG).unwrap();

    let config = load_config(&config_path).unwrap();
    let publisher = ConfigPublisher::new(Arc::new(HtmlPageRenderer)).with_output(&output);
    let snapshot = publisher.publish(&config.options).unwrap();
    assert_eq!(snapshot.version, 1);

    let written: serde_json::Value = serde_json::from_slice(&std::fs::read(&output).unwrap()).unwrap();
    let hosts: Vec<&str> = written["routeConfiguration"]["virtualHosts"]
        .as_array()
        .unwrap()
        .iter()
        .map(|vh| vh["name"].as_str().unwrap())
        .collect();
    assert_eq!(hosts, vec!["catch-all", "*.example.com", "api.example.com"]);

    let api_routes = written["routeConfiguration"]["virtualHosts"][2]["routes"].as_array().unwrap();
    let api = api_routes.last().unwrap();
    assert_eq!(api["name"], "policy-1");
    assert_eq!(api["match"]["prefix"], "/v1/");
    assert_eq!(api["route"]["timeout"], "0s");
    assert_eq!(api["route"]["idleTimeout"], "30s");
    assert_eq!(api["route"]["upgradeConfigs"][0]["upgradeType"], "websocket");
    assert_eq!(api["route"]["upgradeConfigs"][0]["enabled"], true);
}

#[test]
fn test_reload_with_bad_config_keeps_last_snapshot() {
    let publisher = ConfigPublisher::new(Arc::new(HtmlPageRenderer));
    let good = parse_config(CONFIG).unwrap();
    let first = publisher.publish(&good.options).unwrap();

    // passes syntax checks but fails to build
    let mut bad = good.clone();
    bad.options.policies[1].regex = Some("(".into());
    assert!(publisher.publish(&bad.options).is_err());
    assert_eq!(publisher.current().unwrap(), first);

    let mut changed = good;
    changed.options.policies.pop();
    assert_eq!(publisher.publish(&changed.options).unwrap().version, 2);
}
