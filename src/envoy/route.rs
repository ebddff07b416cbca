//! `envoy.config.route.v3` types.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::envoy::core::{HeaderValueOption, ProtoDuration};

/// Filter name the response-rewrite metadata is keyed under.
pub const LUA_FILTER_NAME: &str = "envoy.filters.http.lua";

/// Filter name the authorization per-route config is keyed under.
pub const EXT_AUTHZ_FILTER_NAME: &str = "envoy.filters.http.ext_authz";

/// The compiled route table.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteConfiguration {
    pub name: String,
    pub virtual_hosts: Vec<VirtualHost>,
    /// Always serialized: `false` is meaningful here.
    pub validate_clusters: bool,
}

impl RouteConfiguration {
    /// Total routes across all virtual hosts.
    pub fn route_count(&self) -> usize {
        self.virtual_hosts.iter().map(|vh| vh.routes.len()).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VirtualHost {
    pub name: String,
    pub domains: Vec<String>,
    pub routes: Vec<Route>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    pub name: String,
    #[serde(rename = "match")]
    pub route_match: RouteMatch,
    pub route: RouteAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub request_headers_to_add: Vec<HeaderValueOption>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub request_headers_to_remove: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub response_headers_to_add: Vec<HeaderValueOption>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub typed_per_filter_config: BTreeMap<String, TypedFilterConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteMatch {
    #[serde(flatten)]
    pub path_specifier: PathSpecifier,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub headers: Vec<HeaderMatcher>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PathSpecifier {
    Prefix(String),
    Path(String),
    SafeRegex(RegexMatcher),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegexMatcher {
    pub regex: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeaderMatcher {
    pub name: String,
    pub string_match: StringMatcher,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum StringMatcher {
    SafeRegex(RegexMatcher),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteAction {
    pub cluster: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_host_rewrite: Option<bool>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub hash_policy: Vec<HashPolicy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<ProtoDuration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idle_timeout: Option<ProtoDuration>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub upgrade_configs: Vec<UpgradeConfig>,
}

impl RouteAction {
    /// Action forwarding to `cluster` with nothing else set.
    pub fn to_cluster(cluster: impl Into<String>) -> Self {
        Self {
            cluster: cluster.into(),
            auto_host_rewrite: None,
            hash_policy: Vec::new(),
            timeout: None,
            idle_timeout: None,
            upgrade_configs: Vec::new(),
        }
    }
}

/// One step of the hash policy; the first terminal step that yields a value wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HashPolicy {
    #[serde(flatten)]
    pub policy_specifier: HashPolicySpecifier,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub terminal: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum HashPolicySpecifier {
    Header(HeaderHash),
    Cookie(CookieHash),
    ConnectionProperties(ConnectionPropertiesHash),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeaderHash {
    pub header_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CookieHash {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttl: Option<ProtoDuration>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionPropertiesHash {
    pub source_ip: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpgradeConfig {
    pub upgrade_type: String,
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    pub filter_metadata: BTreeMap<String, FilterMetadata>,
}

/// Metadata block for one filter, serialized as the bare payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FilterMetadata {
    ResponseRewrite(ResponseRewriteMetadata),
}

/// Read by the response-rewrite (lua) filter. Keys are snake_case by contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResponseRewriteMetadata {
    pub remove_impersonate_headers: bool,
    pub remove_pomerium_authorization: bool,
    pub remove_pomerium_cookie: String,
    pub rewrite_response_headers: Vec<RewriteResponseHeaderMetadata>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RewriteResponseHeaderMetadata {
    pub header: String,
    pub prefix: String,
    pub value: String,
}

/// Typed per-filter config, tagged with its protobuf type URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "@type")]
pub enum TypedFilterConfig {
    #[serde(rename = "type.googleapis.com/envoy.extensions.filters.http.ext_authz.v3.ExtAuthzPerRoute")]
    ExtAuthzPerRoute(ExtAuthzPerRoute),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtAuthzPerRoute {
    pub check_settings: CheckSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckSettings {
    pub context_extensions: BTreeMap<String, String>,
}
