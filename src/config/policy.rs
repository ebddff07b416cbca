//! Access policy definitions.
//!
//! # Responsibilities
//! - Describe one access rule: source pattern, weighted upstreams,
//!   path restriction, header rules and session settings
//! - Parse weighted upstream URLs (`url[,weight]`)
//! - Report malformed policies as `PolicyError`
//!
//! # Design Decisions
//! - Policies are immutable once loaded; a build always starts from the full set
//! - Raw strings are kept for `from` and path regexes so that validation and
//!   compilation report the same errors

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::schema::HeaderRule;

/// A single access policy.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct Policy {
    /// Optional human readable identifier used in error messages.
    pub id: Option<String>,

    /// Source URL, e.g. `https://app.example.com` or `https://*.example.com`.
    pub from: String,

    /// Weighted upstream targets.
    pub to: Vec<WeightedUrl>,

    /// Load balancing algorithm across `to`.
    pub lb_policy: Option<LbPolicy>,

    /// Match requests whose path starts with this prefix.
    pub prefix: Option<String>,

    /// Match requests with exactly this path.
    pub path: Option<String>,

    /// Match requests whose path matches this regular expression.
    pub regex: Option<String>,

    /// Extra request headers removed before forwarding.
    pub remove_request_headers: Vec<String>,

    /// Request headers added before forwarding.
    pub set_request_headers: Vec<HeaderRule>,

    /// Response headers added on the way back.
    pub set_response_headers: Vec<HeaderRule>,

    /// Response header rewrites handed to the response-rewrite filter.
    pub rewrite_response_headers: Vec<RewriteResponseHeader>,

    /// Upstream timeout override in milliseconds.
    pub timeout_ms: Option<u64>,

    /// Idle timeout for upgraded (websocket/spdy) connections in milliseconds.
    pub idle_timeout_ms: Option<u64>,

    /// Route is only reachable from inside the control plane.
    pub internal: bool,

    pub allow_websockets: bool,
    pub allow_spdy: bool,

    /// Cookie based session affinity between the routing key and the source IP.
    pub session_affinity: Option<SessionAffinity>,

    /// Token used for upstream impersonation; strips impersonation headers when set.
    pub service_account_token: Option<String>,
}

impl Policy {
    /// Name used in logs and errors.
    pub fn identity(&self, index: usize) -> String {
        match &self.id {
            Some(id) => format!("{} ({})", id, self.from),
            None => format!("policy-{} ({})", index, self.from),
        }
    }

    /// Timeout for the compiled route, falling back to `default`.
    pub fn upstream_timeout(&self, default: Duration) -> Duration {
        self.timeout_ms.map(Duration::from_millis).unwrap_or(default)
    }

    pub fn idle_timeout(&self) -> Option<Duration> {
        self.idle_timeout_ms.map(Duration::from_millis)
    }

    /// True when any upgrade protocol is allowed.
    pub fn allows_upgrades(&self) -> bool {
        self.allow_websockets || self.allow_spdy
    }

    /// Resolve the path restriction, validating regexes.
    pub fn path_rule(&self) -> Result<PathRule, PolicyError> {
        match (&self.prefix, &self.path, &self.regex) {
            (None, None, None) => Ok(PathRule::Prefix("/".to_string())),
            (Some(prefix), None, None) => Ok(PathRule::Prefix(prefix.clone())),
            (None, Some(path), None) => Ok(PathRule::Path(path.clone())),
            (None, None, Some(regex)) => {
                regex::Regex::new(regex).map_err(|source| PolicyError::InvalidPathRegex {
                    regex: regex.clone(),
                    source,
                })?;
                Ok(PathRule::Regex(regex.clone()))
            }
            _ => Err(PolicyError::ConflictingPathRules),
        }
    }
}

/// A resolved path restriction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathRule {
    Prefix(String),
    Path(String),
    Regex(String),
}

/// Load balancing algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LbPolicy {
    RoundRobin,
    LeastRequest,
    RingHash,
    Random,
    Maglev,
}

impl LbPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            LbPolicy::RoundRobin => "round_robin",
            LbPolicy::LeastRequest => "least_request",
            LbPolicy::RingHash => "ring_hash",
            LbPolicy::Random => "random",
            LbPolicy::Maglev => "maglev",
        }
    }
}

/// A response header rewrite rule.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RewriteResponseHeader {
    pub header: String,
    #[serde(default)]
    pub prefix: String,
    pub value: String,
}

/// Cookie based session affinity.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SessionAffinity {
    pub cookie_name: String,

    /// Lifetime of the generated cookie in seconds.
    #[serde(default)]
    pub ttl_secs: u64,
}

/// An upstream URL with an optional load balancing weight.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(try_from = "String", into = "String")]
pub struct WeightedUrl {
    pub url: Url,
    pub weight: Option<u32>,
}

/// Error parsing a weighted upstream URL.
#[derive(Debug, thiserror::Error)]
pub enum WeightedUrlError {
    #[error("invalid upstream url {input:?}: {source}")]
    Url {
        input: String,
        #[source]
        source: url::ParseError,
    },
    #[error("invalid weight in {0:?}: weights must be positive integers")]
    Weight(String),
    #[error("upstream url {0:?} has no host")]
    MissingHost(String),
}

impl FromStr for WeightedUrl {
    type Err = WeightedUrlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (raw_url, weight) = match s.rsplit_once(',') {
            Some((raw_url, raw_weight)) => {
                let weight = raw_weight
                    .trim()
                    .parse::<u32>()
                    .ok()
                    .filter(|w| *w > 0)
                    .ok_or_else(|| WeightedUrlError::Weight(s.to_string()))?;
                (raw_url.trim(), Some(weight))
            }
            None => (s.trim(), None),
        };

        let url = Url::parse(raw_url).map_err(|source| WeightedUrlError::Url {
            input: s.to_string(),
            source,
        })?;
        if url.host_str().is_none() {
            return Err(WeightedUrlError::MissingHost(s.to_string()));
        }
        Ok(Self { url, weight })
    }
}

impl TryFrom<String> for WeightedUrl {
    type Error = WeightedUrlError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<WeightedUrl> for String {
    fn from(value: WeightedUrl) -> Self {
        value.to_string()
    }
}

impl fmt::Display for WeightedUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.weight {
            Some(weight) => write!(f, "{},{}", self.url, weight),
            None => write!(f, "{}", self.url),
        }
    }
}

/// A policy that cannot be compiled.
#[derive(Debug, thiserror::Error)]
pub enum PolicyError {
    #[error("invalid source {from:?}: {reason}")]
    InvalidSource { from: String, reason: String },

    #[error("policy has no upstream targets")]
    NoTargets,

    #[error("only one of prefix, path and regex may be set")]
    ConflictingPathRules,

    #[error("invalid path regex {regex:?}: {source}")]
    InvalidPathRegex {
        regex: String,
        #[source]
        source: regex::Error,
    },

    #[error("invalid authority regex {regex:?}: {source}")]
    InvalidAuthorityRegex {
        regex: String,
        #[source]
        source: regex::Error,
    },
}
