//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the compiler.
//! All types derive Serde traits for deserialization from config files.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::policy::Policy;

/// Root configuration for the route compiler.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct Config {
    /// Global options and the policy set compiled into routes.
    pub options: Options,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Global options consumed by every builder call.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Options {
    /// Session cookie name stripped before requests reach an upstream.
    pub cookie_name: String,

    /// Upstream timeout applied when a policy sets none, in seconds.
    pub default_upstream_timeout_secs: u64,

    /// Headers added to control-plane responses and local replies.
    pub set_response_headers: Vec<HeaderRule>,

    /// Runtime feature flags.
    pub runtime_flags: RuntimeFlags,

    /// Service roles this instance runs (e.g. "all", "proxy,authenticate").
    pub services: ServiceRoles,

    /// Branding values merged into rendered error pages.
    pub branding: BrandingOptions,

    /// Access policies, in declaration order.
    pub policies: Vec<Policy>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            cookie_name: "_pomerium".to_string(),
            default_upstream_timeout_secs: 30,
            set_response_headers: default_set_response_headers(),
            runtime_flags: RuntimeFlags::default(),
            services: ServiceRoles::default(),
            branding: BrandingOptions::default(),
            policies: Vec::new(),
        }
    }
}

impl Options {
    /// Upstream timeout used when a policy does not override it.
    pub fn default_upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.default_upstream_timeout_secs)
    }
}

fn default_set_response_headers() -> Vec<HeaderRule> {
    vec![
        HeaderRule::overwrite("X-Frame-Options", "SAMEORIGIN"),
        HeaderRule::overwrite("X-XSS-Protection", "1; mode=block"),
        HeaderRule::overwrite(
            "Strict-Transport-Security",
            "max-age=31536000; includeSubDomains; preload",
        ),
    ]
}

/// A single header mutation rule.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct HeaderRule {
    pub name: String,
    pub value: String,

    /// Replace an existing value instead of appending another one.
    #[serde(default = "default_overwrite")]
    pub overwrite: bool,
}

fn default_overwrite() -> bool {
    true
}

impl HeaderRule {
    /// Rule that replaces any existing header of the same name.
    pub fn overwrite(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            overwrite: true,
        }
    }

    /// Rule that appends to any existing header of the same name.
    pub fn append(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            overwrite: false,
        }
    }
}

/// Runtime feature flags.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RuntimeFlags {
    /// Add a `host:*` domain so requests carrying an unexpected port still match.
    pub match_any_incoming_port: bool,
}

impl Default for RuntimeFlags {
    fn default() -> Self {
        Self {
            match_any_incoming_port: true,
        }
    }
}

/// Optional branding for proxy-generated pages. Empty values are left out.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct BrandingOptions {
    pub primary_color: String,
    pub secondary_color: String,
    pub darkmode_primary_color: String,
    pub darkmode_secondary_color: String,
    pub logo_url: String,
    pub favicon_url: String,
    pub error_message_first_paragraph: String,
}

impl BrandingOptions {
    /// Key/value pairs for the page renderer, in a fixed order.
    pub fn entries(&self) -> impl Iterator<Item = (&'static str, &str)> {
        [
            ("primaryColor", self.primary_color.as_str()),
            ("secondaryColor", self.secondary_color.as_str()),
            ("darkmodePrimaryColor", self.darkmode_primary_color.as_str()),
            ("darkmodeSecondaryColor", self.darkmode_secondary_color.as_str()),
            ("logoUrl", self.logo_url.as_str()),
            ("faviconUrl", self.favicon_url.as_str()),
            (
                "errorMessageFirstParagraph",
                self.error_message_first_paragraph.as_str(),
            ),
        ]
        .into_iter()
        .filter(|(_, value)| !value.is_empty())
    }
}

/// A service role an instance can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ServiceRole {
    All,
    Authenticate,
    Authorize,
    Databroker,
    Proxy,
}

impl ServiceRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceRole::All => "all",
            ServiceRole::Authenticate => "authenticate",
            ServiceRole::Authorize => "authorize",
            ServiceRole::Databroker => "databroker",
            ServiceRole::Proxy => "proxy",
        }
    }
}

/// Error for an unrecognized service role name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown service role: {0:?}")]
pub struct ServiceRoleError(pub String);

impl FromStr for ServiceRole {
    type Err = ServiceRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(ServiceRole::All),
            "authenticate" => Ok(ServiceRole::Authenticate),
            "authorize" => Ok(ServiceRole::Authorize),
            "databroker" => Ok(ServiceRole::Databroker),
            "proxy" => Ok(ServiceRole::Proxy),
            other => Err(ServiceRoleError(other.to_string())),
        }
    }
}

/// The set of roles this instance runs, written as a comma separated list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(try_from = "String", into = "String")]
pub struct ServiceRoles(BTreeSet<ServiceRole>);

impl ServiceRoles {
    pub fn new(roles: impl IntoIterator<Item = ServiceRole>) -> Self {
        Self(roles.into_iter().collect())
    }

    pub fn contains(&self, role: ServiceRole) -> bool {
        self.0.contains(&ServiceRole::All) || self.0.contains(&role)
    }

    pub fn is_proxy(&self) -> bool {
        self.contains(ServiceRole::Proxy)
    }

    pub fn is_authenticate(&self) -> bool {
        self.contains(ServiceRole::Authenticate)
    }
}

impl Default for ServiceRoles {
    fn default() -> Self {
        Self::new([ServiceRole::All])
    }
}

impl FromStr for ServiceRoles {
    type Err = ServiceRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let roles = s
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(ServiceRole::from_str)
            .collect::<Result<BTreeSet<_>, _>>()?;
        if roles.is_empty() {
            return Ok(Self::default());
        }
        Ok(Self(roles))
    }
}

impl TryFrom<String> for ServiceRoles {
    type Error = ServiceRoleError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ServiceRoles> for String {
    fn from(roles: ServiceRoles) -> Self {
        roles.to_string()
    }
}

impl fmt::Display for ServiceRoles {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, role) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}", role.as_str())?;
        }
        Ok(())
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Prometheus scrape address for watch mode. Disabled when unset.
    pub metrics_address: Option<String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_address: None,
        }
    }
}
