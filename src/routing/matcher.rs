//! Source host pattern matching.
//!
//! # Responsibilities
//! - Parse a policy source (`scheme://host[:port]`) with an optional
//!   leading-label wildcard (`*.example.com`)
//! - Derive the virtual host domains for a host
//! - Derive `:authority` regexes for wildcard sources
//! - Decide which policies belong to which virtual host
//!
//! # Design Decisions
//! - Hosts are lowercased; authority regexes are case-sensitive and anchored
//! - A wildcard is only allowed as the whole leading label
//! - Wildcard https sources without a port also match an explicit `:443`
//!   (see [`DEFAULT_HTTPS_PORT_VARIANT`]); no other port variants are produced

use crate::config::policy::PolicyError;

/// Historical compatibility rule: clients that spell out the default https
/// port must be served by the same routes as clients that omit it.
pub const DEFAULT_HTTPS_PORT_VARIANT: &str = ":443";

/// Source URL scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Http,
    Https,
}

impl Scheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }
}

/// How a compiled route restricts the `:authority` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorityMatch {
    /// The virtual host domains already restrict the authority.
    Any,
    /// Anchored, case-sensitive regex on `:authority`.
    Regex(String),
}

/// A parsed policy source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourcePattern {
    scheme: Scheme,
    /// Host without the wildcard label or port, lowercased.
    host: String,
    port: Option<u16>,
    wildcard: bool,
}

impl SourcePattern {
    /// Parse a source URL such as `https://*.example.com` or `http://app.internal:8080`.
    pub fn parse(from: &str) -> Result<Self, PolicyError> {
        let invalid = |reason: &str| PolicyError::InvalidSource {
            from: from.to_string(),
            reason: reason.to_string(),
        };

        let (scheme, rest) = from
            .split_once("://")
            .ok_or_else(|| invalid("missing scheme"))?;
        let scheme = match scheme.to_ascii_lowercase().as_str() {
            "http" => Scheme::Http,
            "https" => Scheme::Https,
            _ => return Err(invalid("scheme must be http or https")),
        };

        let authority = rest.strip_suffix('/').unwrap_or(rest);
        if authority.contains(['/', '?', '#', '@']) {
            return Err(invalid("source must not contain a path, query or userinfo"));
        }

        let (host, port) = match authority.rsplit_once(':') {
            Some((host, port)) => {
                let port = port
                    .parse::<u16>()
                    .ok()
                    .filter(|p| *p > 0)
                    .ok_or_else(|| invalid("invalid port"))?;
                (host, Some(port))
            }
            None => (authority, None),
        };

        let host = host.to_ascii_lowercase();
        let (wildcard, bare) = match host.strip_prefix("*.") {
            Some(bare) => (true, bare.to_string()),
            None => (false, host),
        };

        if bare.is_empty() {
            return Err(invalid("missing host"));
        }
        let labels_valid = bare.split('.').all(|label| {
            !label.is_empty() && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        });
        if !labels_valid {
            return Err(invalid(
                "host labels may only contain letters, digits and '-', with '*' only as the whole first label",
            ));
        }

        Ok(Self {
            scheme,
            host: bare,
            port,
            wildcard,
        })
    }

    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    pub fn is_wildcard(&self) -> bool {
        self.wildcard
    }

    pub fn port(&self) -> Option<u16> {
        self.port
    }

    /// Host as used for virtual host names and domains, e.g. `*.example.com`
    /// or `app.example.com:8443`.
    pub fn hostname(&self) -> String {
        let mut hostname = String::new();
        if self.wildcard {
            hostname.push_str("*.");
        }
        hostname.push_str(&self.host);
        if let Some(port) = self.port {
            hostname.push(':');
            hostname.push_str(&port.to_string());
        }
        hostname
    }

    /// Normalized source URL, used as hash input.
    pub fn canonical(&self) -> String {
        format!("{}://{}", self.scheme.as_str(), self.hostname())
    }

    /// Authority restrictions for the routes compiled from this source.
    ///
    /// Concrete hosts need none. Wildcard hosts get one regex, or two for
    /// https without an explicit port.
    pub fn authority_matchers(&self) -> Result<Vec<AuthorityMatch>, PolicyError> {
        if !self.wildcard {
            return Ok(vec![AuthorityMatch::Any]);
        }

        let base = format!("^(.*){}", regex::escape(&format!(".{}", self.host)));
        let regexes = match (self.port, self.scheme) {
            (Some(port), _) => vec![format!("{}{}$", base, regex::escape(&format!(":{port}")))],
            (None, Scheme::Https) => vec![
                format!("{base}$"),
                format!("{}{}$", base, regex::escape(DEFAULT_HTTPS_PORT_VARIANT)),
            ],
            (None, Scheme::Http) => vec![format!("{base}$")],
        };

        regexes
            .into_iter()
            .map(|regex| match regex::Regex::new(&regex) {
                Ok(_) => Ok(AuthorityMatch::Regex(regex)),
                Err(source) => Err(PolicyError::InvalidAuthorityRegex { regex, source }),
            })
            .collect()
    }

    /// Returns true if routes from this source belong in the virtual host for `host`.
    pub fn matches_host(&self, host: &str) -> bool {
        if self.hostname() == host {
            return true;
        }
        if !self.wildcard || host.contains('*') {
            return false;
        }

        let (bare, port) = split_port(host);
        if port != self.port {
            return false;
        }
        bare.to_ascii_lowercase()
            .strip_suffix(&self.host)
            .and_then(|sub| sub.strip_suffix('.'))
            .is_some_and(|sub| !sub.is_empty())
    }
}

/// Returns true if `host` ends with an explicit numeric port.
pub fn has_port(host: &str) -> bool {
    split_port(host).1.is_some()
}

fn split_port(host: &str) -> (&str, Option<u16>) {
    match host.rsplit_once(':') {
        Some((bare, port)) => match port.parse::<u16>() {
            Ok(port) => (bare, Some(port)),
            Err(_) => (host, None),
        },
        None => (host, None),
    }
}

/// Domains for the virtual host serving `host`.
///
/// With `match_any_incoming_port`, a host with no wildcard and no port also
/// matches any port (`host:*`).
pub fn virtual_host_domains(host: &str, match_any_incoming_port: bool) -> Vec<String> {
    let mut domains = vec![host.to_string()];
    if match_any_incoming_port && !host.contains('*') && !has_port(host) {
        domains.push(format!("{host}:*"));
    }
    domains
}
