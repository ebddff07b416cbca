//! Error page rendering.
//!
//! # Responsibilities
//! - Define the renderer seam the local reply builder calls once per build
//! - Provide a self-contained HTML renderer with no external assets
//!
//! # Design Decisions
//! - Rendering is synchronous and side-effect free; failures are not retried
//! - Data values are embedded as JSON, so proxy placeholders such as
//!   `%RESPONSE_CODE%` survive untouched for the data plane to fill in

use serde_json::{Map, Value};

/// Error produced by a page renderer.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("unknown page: {0}")]
    UnknownPage(String),

    #[error("failed to encode page data: {0}")]
    Data(#[from] serde_json::Error),
}

/// Renders a named page to bytes.
pub trait PageRenderer: Send + Sync {
    fn render_page(&self, page: &str, title: &str, data: &Map<String, Value>) -> Result<Vec<u8>, RenderError>;
}

const PAGE_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{{title}}</title>
</head>
<body>
<noscript>JavaScript is required to display this page.</noscript>
<div id="root"></div>
<script>window.PAGE_DATA = {{data}};</script>
</body>
</html>
"#;

/// Built-in renderer for the pages the compiler knows about.
#[derive(Debug, Clone, Default)]
pub struct HtmlPageRenderer;

impl HtmlPageRenderer {
    pub const PAGES: [&'static str; 1] = ["Error"];
}

impl PageRenderer for HtmlPageRenderer {
    fn render_page(&self, page: &str, title: &str, data: &Map<String, Value>) -> Result<Vec<u8>, RenderError> {
        if !Self::PAGES.contains(&page) {
            return Err(RenderError::UnknownPage(page.to_string()));
        }

        let mut payload = data.clone();
        payload.insert("page".to_string(), Value::String(page.to_string()));
        let json = serde_json::to_string(&payload)?;

        let html = PAGE_TEMPLATE
            .replace("{{title}}", &escape_html(title))
            .replace("{{data}}", &escape_script(&json));
        Ok(html.into_bytes())
    }
}

fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

// JSON inside <script> must not be able to close the tag.
fn escape_script(json: &str) -> String {
    json.replace('<', "\\u003c").replace('>', "\\u003e").replace('&', "\\u0026")
}
