//! Stable identifiers derived from policy content.
//!
//! # Responsibilities
//! - Numeric route ids from the identity-relevant policy fields
//! - Cluster names as the hex form of the route id
//!
//! # Design Decisions
//! - Fields are written in a fixed, versioned, length-prefixed encoding so
//!   identifiers never depend on in-memory layout or map iteration order
//! - Target order does not matter: canonical targets are sorted first
//! - The first 8 bytes of a SHA-256 digest give the 64-bit value

use sha2::{Digest, Sha256};

use crate::config::policy::Policy;
use crate::routing::matcher::SourcePattern;

/// Bumping this changes every identifier; only do so with a data-plane migration.
const ENCODING_VERSION: &str = "route-compiler/stable-id/v1";

/// Prefix of generated cluster names.
pub const CLUSTER_PREFIX: &str = "route";

/// Incremental hasher over named fields.
pub struct StableHasher {
    digest: Sha256,
}

impl StableHasher {
    /// Create a hasher for one kind of identifier.
    pub fn new(kind: &str) -> Self {
        let mut hasher = Self {
            digest: Sha256::new(),
        };
        hasher.write_bytes(ENCODING_VERSION.as_bytes());
        hasher.write_bytes(kind.as_bytes());
        hasher
    }

    fn write_bytes(&mut self, bytes: &[u8]) {
        self.digest.update((bytes.len() as u64).to_be_bytes());
        self.digest.update(bytes);
    }

    pub fn field(&mut self, name: &str, value: &str) -> &mut Self {
        self.write_bytes(name.as_bytes());
        self.write_bytes(value.as_bytes());
        self
    }

    pub fn optional(&mut self, name: &str, value: Option<&str>) -> &mut Self {
        self.write_bytes(name.as_bytes());
        match value {
            Some(value) => {
                self.digest.update([1u8]);
                self.write_bytes(value.as_bytes());
            }
            None => self.digest.update([0u8]),
        }
        self
    }

    pub fn finish(self) -> u64 {
        let digest = self.digest.finalize();
        let mut head = [0u8; 8];
        head.copy_from_slice(&digest[..8]);
        u64::from_be_bytes(head)
    }
}

/// Targets as sorted `url|weight` strings.
fn canonical_targets(policy: &Policy) -> Vec<String> {
    let mut targets: Vec<String> = policy
        .to
        .iter()
        .map(|target| match target.weight {
            Some(weight) => format!("{}|{}", target.url.as_str(), weight),
            None => format!("{}|-", target.url.as_str()),
        })
        .collect();
    targets.sort();
    targets
}

fn write_upstreams(hasher: &mut StableHasher, policy: &Policy) {
    hasher.optional("lb_policy", policy.lb_policy.as_ref().map(|lb| lb.as_str()));
    let targets = canonical_targets(policy);
    hasher.field("targets", &targets.len().to_string());
    for target in &targets {
        hasher.field("target", target);
    }
}

/// Cluster name for a route id, e.g. `route-f6a1c77f275e05b4` for `17771704953515935156`.
pub fn cluster_name(route_id: u64) -> String {
    format!("{}-{}", CLUSTER_PREFIX, hex::encode(route_id.to_be_bytes()))
}

/// Opaque route id surfaced to the authorization filter.
pub fn route_id(policy: &Policy, source: &SourcePattern) -> u64 {
    let mut hasher = StableHasher::new("route");
    hasher.field("from", &source.canonical());
    write_upstreams(&mut hasher, policy);
    hasher
        .optional("prefix", policy.prefix.as_deref())
        .optional("path", policy.path.as_deref())
        .optional("regex", policy.regex.as_deref());
    hasher.finish()
}
