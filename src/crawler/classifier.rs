//! Fetch classification
//!
//! Turns the outcome of one fetch into what gets persisted for the URL and
//! which links, if any, are followed.

use crate::crawler::fetcher::{FetchError, FetchResponse};
use crate::crawler::parser::extract_links;
use crate::url::{normalize_url, SiteRoot};
use reqwest::StatusCode;
use url::Url;

/// Code recorded for a URL whose fetch failed below the HTTP layer
pub const TRANSPORT_FAILURE_CODE: u16 = 500;

/// Broad family of a Content-Type value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    /// HTML or XHTML; parsed for links
    Markup,
    /// Other textual content; stored verbatim, not parsed
    Text,
    /// Binary resource; stored as a descriptor
    Asset,
    Unsupported,
}

impl ContentKind {
    /// Classifies a raw Content-Type header value (parameters are ignored)
    pub fn from_content_type(content_type: &str) -> Self {
        let mime = media_type(content_type);

        match mime.as_str() {
            "text/html" | "application/xhtml+xml" => Self::Markup,
            "application/json" | "application/xml" | "application/javascript" => Self::Text,
            "application/pdf"
            | "application/zip"
            | "application/gzip"
            | "application/x-tar"
            | "application/octet-stream"
            | "application/msword"
            | "application/wasm" => Self::Asset,
            m if m.starts_with("text/") || m.ends_with("+xml") || m.ends_with("+json") => {
                Self::Text
            }
            m if m.starts_with("image/")
                || m.starts_with("audio/")
                || m.starts_with("video/")
                || m.starts_with("font/")
                || m.starts_with("application/vnd.") =>
            {
                Self::Asset
            }
            _ => Self::Unsupported,
        }
    }
}

/// What to persist for one fetched URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// Textual content stored verbatim; `links` are same-site, normalized
    /// children (empty for non-markup text)
    HtmlPage {
        code: u16,
        content: String,
        links: Vec<Url>,
    },

    /// Non-text resource stored as a short descriptor instead of its bytes
    Asset { code: u16, descriptor: String },

    /// Neither textual nor a recognized asset; recorded with a placeholder
    Unsupported { code: u16, placeholder: String },

    /// The fetch failed (transport error or non-2xx status)
    FetchFailed { code: u16, message: String },
}

impl Classification {
    /// Builds a failure record for an error raised while handling a URL
    pub fn failed(message: impl Into<String>) -> Self {
        Self::FetchFailed {
            code: TRANSPORT_FAILURE_CODE,
            message: message.into(),
        }
    }

    /// The code stored in the page row
    pub fn code(&self) -> u16 {
        match self {
            Self::HtmlPage { code, .. }
            | Self::Asset { code, .. }
            | Self::Unsupported { code, .. }
            | Self::FetchFailed { code, .. } => *code,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::FetchFailed { .. })
    }

    /// Splits into the page row parts: (code, content, children)
    pub fn into_parts(self) -> (u16, String, Vec<Url>) {
        match self {
            Self::HtmlPage {
                code,
                content,
                links,
            } => (code, content, links),
            Self::Asset { code, descriptor } => (code, descriptor, Vec::new()),
            Self::Unsupported { code, placeholder } => (code, placeholder, Vec::new()),
            Self::FetchFailed { code, message } => (code, message, Vec::new()),
        }
    }
}

/// Classifies a fetch outcome for a URL of the site rooted at `root`
pub fn classify(outcome: Result<FetchResponse, FetchError>, root: &SiteRoot) -> Classification {
    let response = match outcome {
        Ok(response) => response,
        Err(e) => return Classification::failed(format!("failed to load page: {}", e)),
    };

    let code = response.status_code;
    if !(200..300).contains(&code) {
        let reason = StatusCode::from_u16(code)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or("Unknown Status");
        return Classification::FetchFailed {
            code,
            message: format!("HTTP {} {}", code, reason),
        };
    }

    match ContentKind::from_content_type(&response.content_type) {
        ContentKind::Markup => {
            let content = String::from_utf8_lossy(&response.body).into_owned();
            let links = same_site_links(&content, &response.final_url, root);
            Classification::HtmlPage {
                code,
                content,
                links,
            }
        }
        ContentKind::Text => Classification::HtmlPage {
            code,
            content: String::from_utf8_lossy(&response.body).into_owned(),
            links: Vec::new(),
        },
        ContentKind::Asset => Classification::Asset {
            code,
            descriptor: format!(
                "[asset {}, {} bytes]",
                media_type(&response.content_type),
                response.body.len()
            ),
        },
        ContentKind::Unsupported => {
            let mime = media_type(&response.content_type);
            Classification::Unsupported {
                code,
                placeholder: format!(
                    "[unsupported content type: {}]",
                    if mime.is_empty() { "none" } else { mime.as_str() }
                ),
            }
        }
    }
}

/// Extracts, normalizes and filters the links of a markup document
fn same_site_links(html: &str, base_url: &Url, root: &SiteRoot) -> Vec<Url> {
    extract_links(html, base_url)
        .into_iter()
        .filter_map(|link| match normalize_url(link.as_str()) {
            Ok(normalized) => Some(normalized),
            Err(e) => {
                tracing::debug!("Dropping link {}: {}", link, e);
                None
            }
        })
        .filter(|link| root.contains(link))
        .collect()
}

/// Lowercased media type without parameters
fn media_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase()
}
