//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check every policy compiles: source pattern, targets, path rule
//! - Validate value ranges (timeouts > 0, cookie name present)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: Config → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system
//! - Uses the same parsing as the builder so both agree on what is valid

use crate::config::policy::{Policy, PolicyError};
use crate::config::schema::Config;
use crate::routing::matcher::SourcePattern;

/// A single semantic problem found in a configuration.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("cookie_name must not be empty")]
    EmptyCookieName,

    #[error("default_upstream_timeout_secs must be greater than zero")]
    ZeroUpstreamTimeout,

    #[error("{policy}: {source}")]
    Policy {
        policy: String,
        #[source]
        source: PolicyError,
    },
}

/// Validate a parsed configuration, returning every problem found.
pub fn validate_config(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let options = &config.options;

    if options.cookie_name.trim().is_empty() {
        errors.push(ValidationError::EmptyCookieName);
    }
    if options.default_upstream_timeout_secs == 0 {
        errors.push(ValidationError::ZeroUpstreamTimeout);
    }

    for (index, policy) in options.policies.iter().enumerate() {
        if let Err(source) = validate_policy(policy) {
            errors.push(ValidationError::Policy {
                policy: policy.identity(index),
                source,
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_policy(policy: &Policy) -> Result<(), PolicyError> {
    let source = SourcePattern::parse(&policy.from)?;
    source.authority_matchers()?;
    if policy.to.is_empty() {
        return Err(PolicyError::NoTargets);
    }
    policy.path_rule()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::policy::WeightedUrl;

    fn policy(from: &str) -> Policy {
        Policy {
            from: from.into(),
            to: vec!["https://upstream.internal".parse::<WeightedUrl>().unwrap()],
            ..Default::default()
        }
    }

    #[test]
    fn test_valid_config() {
        let mut config = Config::default();
        config.options.policies.push(policy("https://*.example.com"));
        config.options.policies.push(policy("http://app.example.com:8080"));
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_reports_all_errors() {
        let mut config = Config::default();
        config.options.cookie_name = " ".into();
        config.options.default_upstream_timeout_secs = 0;
        config.options.policies.push(policy("https://foo.*.example.com"));
        config.options.policies.push(Policy {
            to: Vec::new(),
            ..policy("https://ok.example.com")
        });

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(matches!(errors[0], ValidationError::EmptyCookieName));
        assert!(matches!(errors[1], ValidationError::ZeroUpstreamTimeout));
        assert!(matches!(
            &errors[2],
            ValidationError::Policy { source: PolicyError::InvalidSource { .. }, .. }
        ));
        assert!(matches!(
            &errors[3],
            ValidationError::Policy { source: PolicyError::NoTargets, .. }
        ));
        assert!(errors[3].to_string().starts_with("policy-1 (https://ok.example.com)"));
    }
}
