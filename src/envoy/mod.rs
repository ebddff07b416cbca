//! Data-plane configuration schema.
//!
//! Typed mirrors of the Envoy v3 resources the builder emits. Serialization
//! follows proto3 JSON: camelCase fields, defaults omitted, durations as
//! `"1.500s"` strings, bytes as base64.
//!
//! # Design Decisions
//! - Only the fields the builder sets are modelled
//! - Maps are `BTreeMap` so serialized output is byte-stable
//! - Per-filter payloads are typed per known filter

pub mod core;
pub mod local_reply;
pub mod route;

pub use self::core::{DataSource, HeaderAppendAction, HeaderValue, HeaderValueOption, ProtoDuration};
pub use local_reply::{LocalReplyConfig, ResponseFlag, ResponseMapper};
pub use route::{Route, RouteConfiguration, VirtualHost};
