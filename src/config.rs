//! Engine configuration.
//!
//! All tunables live here rather than as scattered constants so tests can
//! run the engine with tiny or huge thresholds.

/// Configuration for the scrape engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Minimum total section text length (chars) for a static result to be
    /// considered sufficient. Below this, auto mode escalates to the browser.
    pub sufficiency_threshold: usize,
    /// Default maximum scroll-to-bottom operations per dynamic run.
    pub max_scrolls: u32,
    /// Default maximum tab/"load more" clicks per dynamic run.
    pub max_clicks: u32,
    /// Default maximum pages visited including the entry page.
    pub max_pagination_pages: u32,
    /// Static HTTP fetch timeout in milliseconds.
    pub fetch_timeout_ms: u64,
    /// Browser navigation timeout in milliseconds.
    pub nav_timeout_ms: u64,
    /// Settle wait after scroll/click actions in milliseconds.
    pub settle_ms: u64,
    /// Maximum characters of `rawHtml` retained per section.
    pub raw_html_cap: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sufficiency_threshold: 300,
            max_scrolls: 3,
            max_clicks: 5,
            max_pagination_pages: 3,
            fetch_timeout_ms: 12_000,
            nav_timeout_ms: 30_000,
            settle_ms: 700,
            raw_html_cap: 2000,
        }
    }
}
