//! Shared `envoy.config.core.v3` types.

use std::time::Duration;

use base64::Engine;
use serde::{Serialize, Serializer};

/// How a header value combines with an existing header of the same name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HeaderAppendAction {
    #[default]
    AppendIfExistsOrAdd,
    OverwriteIfExistsOrAdd,
}

impl HeaderAppendAction {
    /// Proto3 JSON omits the zero value.
    pub fn is_default(&self) -> bool {
        *self == HeaderAppendAction::AppendIfExistsOrAdd
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeaderValue {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeaderValueOption {
    pub header: HeaderValue,
    #[serde(skip_serializing_if = "HeaderAppendAction::is_default")]
    pub append_action: HeaderAppendAction,
}

/// A `google.protobuf.Duration`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtoDuration(pub Duration);

impl ProtoDuration {
    /// Proto3 JSON form: seconds with 0, 3, 6 or 9 fractional digits.
    pub fn to_json_string(&self) -> String {
        let secs = self.0.as_secs();
        let nanos = self.0.subsec_nanos();
        if nanos == 0 {
            format!("{secs}s")
        } else if nanos % 1_000_000 == 0 {
            format!("{}.{:03}s", secs, nanos / 1_000_000)
        } else if nanos % 1_000 == 0 {
            format!("{}.{:06}s", secs, nanos / 1_000)
        } else {
            format!("{secs}.{nanos:09}s")
        }
    }
}

impl From<Duration> for ProtoDuration {
    fn from(duration: Duration) -> Self {
        Self(duration)
    }
}

impl Serialize for ProtoDuration {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_json_string())
    }
}

/// A data source; only inline bytes are produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DataSource {
    InlineBytes(#[serde(serialize_with = "serialize_base64")] Vec<u8>),
}

fn serialize_base64<T, S>(bytes: &T, serializer: S) -> Result<S::Ok, S::Error>
where
    T: AsRef<[u8]>,
    S: Serializer,
{
    serializer.serialize_str(&base64::engine::general_purpose::STANDARD.encode(bytes.as_ref()))
}

/// Body format override for generated responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubstitutionFormatString {
    pub content_type: String,
    pub text_format_source: DataSource,
}
