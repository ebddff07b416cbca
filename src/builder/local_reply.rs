//! Local reply compilation.
//!
//! # Responsibilities
//! - Render the error page once per build
//! - Match every proxy-generated failure except authorization rejections,
//!   which the authorization service renders itself
//! - Attach the global response headers on user-facing roles
//!
//! # Design Decisions
//! - Page data holds data-plane placeholders, filled in per request
//! - The rendered body is embedded inline so the config is self-contained

use serde_json::{Map, Value};

use crate::builder::headers::to_envoy_headers;
use crate::builder::{BuildError, Builder};
use crate::envoy::core::{DataSource, SubstitutionFormatString};
use crate::envoy::local_reply::{AccessLogFilter, LocalReplyConfig, ResponseFlag, ResponseFlagFilter, ResponseMapper};

/// Content type of the rendered error page.
pub const ERROR_PAGE_CONTENT_TYPE: &str = "text/html; charset=UTF-8";

const ERROR_PAGE: &str = "Error";

/// Every response flag except the authorization rejection, in code order.
pub fn local_reply_flags() -> Vec<ResponseFlag> {
    ResponseFlag::ALL
        .into_iter()
        .filter(|flag| *flag != ResponseFlag::UnauthorizedExternalService)
        .collect()
}

impl Builder<'_> {
    /// Build the local reply config shared by every route.
    pub fn build_local_reply_config(&self) -> Result<LocalReplyConfig, BuildError> {
        let options = self.options();

        let headers_to_add = if options.services.is_proxy() || options.services.is_authenticate() {
            to_envoy_headers(&options.set_response_headers)
        } else {
            Vec::new()
        };

        let mut data = Map::new();
        data.insert("status".into(), Value::from("%RESPONSE_CODE%"));
        data.insert("statusText".into(), Value::from("%RESPONSE_CODE_DETAILS%"));
        data.insert("requestId".into(), Value::from("%STREAM_ID%"));
        data.insert("responseFlags".into(), Value::from("%RESPONSE_FLAGS%"));
        for (key, value) in options.branding.entries() {
            data.insert(key.to_string(), Value::from(value));
        }

        let body = self.renderer.render_page(ERROR_PAGE, ERROR_PAGE, &data)?;
        tracing::debug!(bytes = body.len(), headers = headers_to_add.len(), "Rendered local reply page");

        Ok(LocalReplyConfig {
            mappers: vec![ResponseMapper {
                filter: AccessLogFilter::ResponseFlagFilter(ResponseFlagFilter {
                    flags: local_reply_flags(),
                }),
                body_format_override: SubstitutionFormatString {
                    content_type: ERROR_PAGE_CONTENT_TYPE.to_string(),
                    text_format_source: DataSource::InlineBytes(body),
                },
                headers_to_add,
            }],
        })
    }
}
