//! Data model for scrape requests and results.
//!
//! `ScrapeResult` is the single externally visible artifact. Everything here
//! is built once per request and read-only after return; field names
//! serialize in camelCase so the JSON shape is stable for consumers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which fetch path to take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchMode {
    /// Static first, escalate to the browser if the page looks script-rendered.
    #[default]
    Auto,
    /// Static fetch only, no browser.
    Static,
    /// Browser-rendered fetch only.
    Dynamic,
}

/// Per-run interaction limits, resolved from request overrides and config.
#[derive(Debug, Clone, Copy)]
pub struct FetchLimits {
    pub max_scrolls: u32,
    pub max_clicks: u32,
    pub max_pagination_pages: u32,
}

/// A validated scrape request.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub url: String,
    pub mode: FetchMode,
    pub limits: FetchLimits,
}

/// Which strategy produced the winning content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    #[default]
    Static,
    Dynamic,
}

/// Page-level metadata read from the document `<head>`.
///
/// Every field defaults to an empty string when the source element is absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    pub title: String,
    pub description: String,
    pub language: String,
    pub canonical_url: String,
    pub strategy_used: Strategy,
}

/// Structural origin of a section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SectionType {
    #[serde(rename = "landmark-header")]
    LandmarkHeader,
    #[serde(rename = "landmark-nav")]
    LandmarkNav,
    #[serde(rename = "landmark-main")]
    LandmarkMain,
    #[serde(rename = "landmark-section")]
    LandmarkSection,
    #[serde(rename = "landmark-article")]
    LandmarkArticle,
    #[serde(rename = "landmark-footer")]
    LandmarkFooter,
    #[serde(rename = "heading-group")]
    HeadingGroup,
}

impl SectionType {
    /// Map a landmark tag name to its section type.
    pub fn from_landmark_tag(tag: &str) -> Option<Self> {
        match tag {
            "header" => Some(Self::LandmarkHeader),
            "nav" => Some(Self::LandmarkNav),
            "main" => Some(Self::LandmarkMain),
            "section" => Some(Self::LandmarkSection),
            "article" => Some(Self::LandmarkArticle),
            "footer" => Some(Self::LandmarkFooter),
            _ => None,
        }
    }
}

/// A hyperlink found inside a section, href resolved to an absolute URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionLink {
    pub href: String,
    pub text: String,
}

/// An image found inside a section, src resolved to an absolute URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionImage {
    pub src: String,
    pub alt: String,
}

/// Extracted content of one section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SectionContent {
    /// All heading texts at any depth, in document order.
    pub headings: Vec<String>,
    /// Whitespace-normalized visible text.
    pub text: String,
    pub links: Vec<SectionLink>,
    pub images: Vec<SectionImage>,
    /// Text items of each list (`<ul>`/`<ol>`) inside the section.
    pub lists: Vec<Vec<String>>,
}

/// One labeled structural unit of the page. Value object, created once during
/// extraction and never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    pub label: String,
    #[serde(rename = "type")]
    pub section_type: SectionType,
    pub content: SectionContent,
    /// Outer markup, capped at the configured character limit (2000 default).
    pub raw_html: String,
    /// True iff the original markup exceeded the cap.
    pub truncated: bool,
}

/// Record of browser interactions performed during a dynamic run.
///
/// Append-only while the run executes; `pages[0]` is always the entry URL
/// when the dynamic path runs at all.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InteractionTrace {
    /// Selector strings actually activated, in activation order.
    pub clicks: Vec<String>,
    /// Number of scroll operations performed.
    pub scrolls: u32,
    /// URLs visited in pagination order.
    pub pages: Vec<String>,
}

/// Phase in which a failure occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Transport level: DNS, timeout, TLS, non-2xx status.
    Fetch,
    /// Browser level: navigation timeout, script evaluation failure.
    Render,
    /// Markup recovery failure during extraction.
    Parse,
}

/// A recorded, non-fatal failure. Collected, never thrown past phase
/// boundaries — the run continues with partial data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeError {
    pub phase: Phase,
    pub message: String,
}

impl ScrapeError {
    pub fn new(phase: Phase, message: impl Into<String>) -> Self {
        Self {
            phase,
            message: message.into(),
        }
    }
}

/// Final output envelope returned to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapeResult {
    pub url: String,
    pub scraped_at: DateTime<Utc>,
    pub meta: PageMeta,
    pub sections: Vec<Section>,
    pub interactions: InteractionTrace,
    pub errors: Vec<ScrapeError>,
}
