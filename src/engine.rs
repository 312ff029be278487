//! Strategy orchestration: static-first fetch with browser escalation.
//!
//! The engine owns the time/cost tradeoff: try the cheap static fetch, ask
//! the classifier whether the result is sufficient, and only then pay for a
//! browser session. Nothing here raises past the engine boundary — every
//! failure becomes a `ScrapeError` alongside best-effort partial data.

use crate::config::EngineConfig;
use crate::extract::{self, meta};
use crate::fetch::http_client::HttpClient;
use crate::fetch::static_fetch::{self, StaticOutcome};
use crate::interact;
use crate::model::{
    FetchLimits, FetchMode, FetchRequest, InteractionTrace, PageMeta, Phase, ScrapeError,
    ScrapeResult, Section, Strategy,
};
use crate::renderer::Renderer;
use chrono::Utc;
use std::sync::Arc;
use url::Url;

/// Content classifier: is a static parse good enough, or must we render?
///
/// Sufficient iff the summed section text reaches the threshold. The
/// threshold separates server-rendered body copy from client-side loading
/// shells; it is configuration, not a computed statistic.
pub fn is_sufficient(sections: &[Section], threshold: usize) -> bool {
    let total: usize = sections
        .iter()
        .map(|s| s.content.text.chars().count())
        .sum();
    total >= threshold
}

/// The scrape engine. One instance serves many concurrent requests; each
/// request owns its own browser context for its lifetime.
pub struct ScrapeEngine {
    config: EngineConfig,
    http: HttpClient,
    renderer: Arc<dyn Renderer>,
}

impl ScrapeEngine {
    pub fn new(config: EngineConfig, renderer: Arc<dyn Renderer>) -> Self {
        let http = HttpClient::new(config.fetch_timeout_ms);
        Self {
            config,
            http,
            renderer,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Resolve per-run limits from request overrides and config defaults.
    pub fn limits(
        &self,
        scrolls: Option<u32>,
        clicks: Option<u32>,
        pagination: Option<u32>,
    ) -> FetchLimits {
        FetchLimits {
            max_scrolls: scrolls.unwrap_or(self.config.max_scrolls),
            max_clicks: clicks.unwrap_or(self.config.max_clicks),
            max_pagination_pages: pagination.unwrap_or(self.config.max_pagination_pages),
        }
    }

    /// Execute one scrape request end to end.
    pub async fn scrape(&self, req: FetchRequest) -> ScrapeResult {
        // Pre-flight: reject non-HTTP(S) schemes before any I/O.
        let url = match Url::parse(&req.url) {
            Ok(u) if matches!(u.scheme(), "http" | "https") => u,
            _ => {
                return assemble(
                    &req.url,
                    PageMeta::default(),
                    Vec::new(),
                    InteractionTrace::default(),
                    vec![ScrapeError::new(
                        Phase::Fetch,
                        "only HTTP/HTTPS URLs are supported",
                    )],
                );
            }
        };

        tracing::info!(url = url.as_str(), mode = ?req.mode, "scrape started");

        match req.mode {
            FetchMode::Static => {
                let mut out = static_fetch::fetch_static(&self.http, &url, &self.config).await;
                out.meta.strategy_used = Strategy::Static;
                assemble(
                    url.as_str(),
                    out.meta,
                    out.sections,
                    InteractionTrace::default(),
                    out.errors,
                )
            }
            FetchMode::Dynamic => {
                let (meta, sections, trace, errors) =
                    self.run_dynamic(&url, &req.limits).await;
                assemble(url.as_str(), meta, sections, trace, errors)
            }
            FetchMode::Auto => self.run_auto(&url, &req.limits).await,
        }
    }

    /// Auto mode: static first, escalate when the classifier says the page
    /// is a client-side shell. Escalation augments, never discards — static
    /// errors ride along with the dynamic result.
    async fn run_auto(&self, url: &Url, limits: &FetchLimits) -> ScrapeResult {
        let static_out = static_fetch::fetch_static(&self.http, url, &self.config).await;

        if static_out.errors.is_empty()
            && is_sufficient(&static_out.sections, self.config.sufficiency_threshold)
        {
            let StaticOutcome {
                mut meta,
                sections,
                errors,
            } = static_out;
            meta.strategy_used = Strategy::Static;
            return assemble(
                url.as_str(),
                meta,
                sections,
                InteractionTrace::default(),
                errors,
            );
        }

        tracing::info!(url = url.as_str(), "static result insufficient, escalating");

        let (dyn_meta, dyn_sections, trace, dyn_errors) = self.run_dynamic(url, limits).await;

        let mut errors = static_out.errors;
        errors.extend(dyn_errors);

        // Prefer rendered sections; fall back to whatever the static pass
        // produced if the browser came back empty-handed.
        let sections = if dyn_sections.is_empty() {
            static_out.sections
        } else {
            dyn_sections
        };

        let mut meta = merge_meta(static_out.meta, dyn_meta);
        meta.strategy_used = Strategy::Dynamic;

        assemble(url.as_str(), meta, sections, trace, errors)
    }

    /// Dynamic path: drive the browser, then extract from the rendered DOM.
    async fn run_dynamic(
        &self,
        url: &Url,
        limits: &FetchLimits,
    ) -> (PageMeta, Vec<Section>, InteractionTrace, Vec<ScrapeError>) {
        let out = interact::run_interactions(self.renderer.as_ref(), url, limits, &self.config)
            .await;

        let (mut meta, sections) = if out.html.is_empty() {
            (PageMeta::default(), Vec::new())
        } else {
            (
                meta::extract_meta(&out.html, url),
                extract::extract_sections(&out.html, url, self.config.raw_html_cap),
            )
        };
        meta.strategy_used = Strategy::Dynamic;

        (meta, sections, out.trace, out.errors)
    }
}

/// Fill empty static meta fields from the rendered page's meta.
fn merge_meta(static_meta: PageMeta, dyn_meta: PageMeta) -> PageMeta {
    let pick = |a: String, b: String| if a.is_empty() { b } else { a };
    PageMeta {
        title: pick(static_meta.title, dyn_meta.title),
        description: pick(static_meta.description, dyn_meta.description),
        language: pick(static_meta.language, dyn_meta.language),
        canonical_url: pick(static_meta.canonical_url, dyn_meta.canonical_url),
        strategy_used: static_meta.strategy_used,
    }
}

/// Result assembler: pure merge into the final envelope. Always succeeds;
/// absent upstream data is an empty collection, never a missing field.
fn assemble(
    url: &str,
    meta: PageMeta,
    sections: Vec<Section>,
    interactions: InteractionTrace,
    errors: Vec<ScrapeError>,
) -> ScrapeResult {
    ScrapeResult {
        url: url.to_string(),
        scraped_at: Utc::now(),
        meta,
        sections,
        interactions,
        errors,
    }
}
