//! Local reply types from the http connection manager.

use serde::{Serialize, Serializer};

use crate::envoy::core::{HeaderValueOption, SubstitutionFormatString};

/// Why the data plane failed a request itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ResponseFlag {
    DownstreamConnectionTermination,
    DnsResolutionFailed,
    DelayInjected,
    DurationTimeout,
    DownstreamProtocolError,
    DownstreamRemoteReset,
    FaultInjected,
    InvalidEnvoyRequestHeaders,
    LocalHealthCheckFailed,
    LocalReset,
    NoClusterFound,
    NoFilterConfigFound,
    NoRouteFound,
    OverloadManager,
    ResponseFromCacheFilter,
    RateLimited,
    RateLimitServiceError,
    StreamIdleTimeout,
    UnauthorizedExternalService,
    UpstreamConnectionTermination,
    UpstreamConnectionFailure,
    NoHealthyUpstream,
    UpstreamMaxStreamDurationReached,
    UpstreamOverflow,
    UpstreamProtocolError,
    UpstreamRemoteReset,
    UpstreamRetryLimitExceeded,
    UpstreamRequestTimeout,
}

impl ResponseFlag {
    /// Every flag, in short-code order.
    pub const ALL: [ResponseFlag; 28] = [
        ResponseFlag::DownstreamConnectionTermination,
        ResponseFlag::DnsResolutionFailed,
        ResponseFlag::DelayInjected,
        ResponseFlag::DurationTimeout,
        ResponseFlag::DownstreamProtocolError,
        ResponseFlag::DownstreamRemoteReset,
        ResponseFlag::FaultInjected,
        ResponseFlag::InvalidEnvoyRequestHeaders,
        ResponseFlag::LocalHealthCheckFailed,
        ResponseFlag::LocalReset,
        ResponseFlag::NoClusterFound,
        ResponseFlag::NoFilterConfigFound,
        ResponseFlag::NoRouteFound,
        ResponseFlag::OverloadManager,
        ResponseFlag::ResponseFromCacheFilter,
        ResponseFlag::RateLimited,
        ResponseFlag::RateLimitServiceError,
        ResponseFlag::StreamIdleTimeout,
        ResponseFlag::UnauthorizedExternalService,
        ResponseFlag::UpstreamConnectionTermination,
        ResponseFlag::UpstreamConnectionFailure,
        ResponseFlag::NoHealthyUpstream,
        ResponseFlag::UpstreamMaxStreamDurationReached,
        ResponseFlag::UpstreamOverflow,
        ResponseFlag::UpstreamProtocolError,
        ResponseFlag::UpstreamRemoteReset,
        ResponseFlag::UpstreamRetryLimitExceeded,
        ResponseFlag::UpstreamRequestTimeout,
    ];

    /// Short code used in access logs and filters.
    pub fn code(&self) -> &'static str {
        match self {
            ResponseFlag::DownstreamConnectionTermination => "DC",
            ResponseFlag::DnsResolutionFailed => "DF",
            ResponseFlag::DelayInjected => "DI",
            ResponseFlag::DurationTimeout => "DO",
            ResponseFlag::DownstreamProtocolError => "DPE",
            ResponseFlag::DownstreamRemoteReset => "DT",
            ResponseFlag::FaultInjected => "FI",
            ResponseFlag::InvalidEnvoyRequestHeaders => "IH",
            ResponseFlag::LocalHealthCheckFailed => "LH",
            ResponseFlag::LocalReset => "LR",
            ResponseFlag::NoClusterFound => "NC",
            ResponseFlag::NoFilterConfigFound => "NFCF",
            ResponseFlag::NoRouteFound => "NR",
            ResponseFlag::OverloadManager => "OM",
            ResponseFlag::ResponseFromCacheFilter => "RFCF",
            ResponseFlag::RateLimited => "RL",
            ResponseFlag::RateLimitServiceError => "RLSE",
            ResponseFlag::StreamIdleTimeout => "SI",
            ResponseFlag::UnauthorizedExternalService => "UAEX",
            ResponseFlag::UpstreamConnectionTermination => "UC",
            ResponseFlag::UpstreamConnectionFailure => "UF",
            ResponseFlag::NoHealthyUpstream => "UH",
            ResponseFlag::UpstreamMaxStreamDurationReached => "UMSDR",
            ResponseFlag::UpstreamOverflow => "UO",
            ResponseFlag::UpstreamProtocolError => "UPE",
            ResponseFlag::UpstreamRemoteReset => "UR",
            ResponseFlag::UpstreamRetryLimitExceeded => "URX",
            ResponseFlag::UpstreamRequestTimeout => "UT",
        }
    }
}

impl Serialize for ResponseFlag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.code())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalReplyConfig {
    pub mappers: Vec<ResponseMapper>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMapper {
    pub filter: AccessLogFilter,
    pub body_format_override: SubstitutionFormatString,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub headers_to_add: Vec<HeaderValueOption>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum AccessLogFilter {
    ResponseFlagFilter(ResponseFlagFilter),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResponseFlagFilter {
    pub flags: Vec<ResponseFlag>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_codes_are_unique_and_sorted() {
        let codes: Vec<&str> = ResponseFlag::ALL.iter().map(ResponseFlag::code).collect();
        let unique: HashSet<&str> = codes.iter().copied().collect();
        assert_eq!(unique.len(), codes.len());

        let mut sorted = codes.clone();
        sorted.sort();
        assert_eq!(codes, sorted);
    }

    #[test]
    fn test_flag_filter_json() {
        let filter = AccessLogFilter::ResponseFlagFilter(ResponseFlagFilter {
            flags: vec![ResponseFlag::UpstreamConnectionFailure, ResponseFlag::UpstreamRequestTimeout],
        });
        assert_eq!(
            serde_json::to_value(&filter).unwrap(),
            serde_json::json!({ "responseFlagFilter": { "flags": ["UF", "UT"] } })
        );
    }
}
