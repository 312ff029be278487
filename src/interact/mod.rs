//! Interaction driver: the browser-side fetch path.
//!
//! Runs a strictly sequential state machine against one browser context:
//! Navigate → DismissOverlays → ActivateTabs → Scroll → Paginate, recording
//! every interaction into an [`InteractionTrace`]. Individual step failures
//! become `render`-phase errors; the driver always produces whatever DOM it
//! reached and always closes its context before returning.

pub mod rules;

use crate::config::EngineConfig;
use crate::extract::resolve_url;
use crate::model::{FetchLimits, InteractionTrace, Phase, ScrapeError};
use crate::renderer::{RenderContext, Renderer};
use rules::{MatcherRule, NEXT_PAGE_RULES, OVERLAY_RULES, TAB_RULES};
use std::time::Duration;
use url::Url;

/// What the dynamic path produced: the rendered DOM snapshot plus the
/// interaction trace and any per-step errors.
#[derive(Debug, Default)]
pub struct DriverOutcome {
    pub html: String,
    pub trace: InteractionTrace,
    pub errors: Vec<ScrapeError>,
}

/// Run the full interaction sequence for one URL.
///
/// Acquires a context from the renderer, drives the state machine, and
/// guarantees the context is closed on every path before returning.
pub async fn run_interactions(
    renderer: &dyn Renderer,
    url: &Url,
    limits: &FetchLimits,
    config: &EngineConfig,
) -> DriverOutcome {
    let mut outcome = DriverOutcome::default();
    outcome.trace.pages.push(url.to_string());

    let ctx = match renderer.new_context().await {
        Ok(ctx) => ctx,
        Err(e) => {
            outcome.errors.push(ScrapeError::new(
                Phase::Render,
                format!("browser context unavailable: {e:#}"),
            ));
            return outcome;
        }
    };

    let mut driver = Driver {
        ctx,
        config,
        limits,
        current_url: url.clone(),
        trace: std::mem::take(&mut outcome.trace),
        errors: Vec::new(),
        tab_clicks: 0,
    };

    driver.navigate(url.as_str()).await;
    driver.dismiss_overlays().await;
    driver.activate_tabs().await;
    driver.scroll().await;
    driver.paginate().await;

    match driver.ctx.get_html().await {
        Ok(html) => outcome.html = html,
        Err(e) => driver.errors.push(ScrapeError::new(
            Phase::Render,
            format!("failed to read rendered DOM: {e:#}"),
        )),
    }

    outcome.trace = driver.trace;
    outcome.errors = driver.errors;

    if let Err(e) = driver.ctx.close().await {
        tracing::warn!("failed to close browser context: {e:#}");
    }

    outcome
}

/// Maximum elements a single overlay rule may click.
const OVERLAY_CLICK_CAP: u32 = 3;

struct Driver<'a> {
    ctx: Box<dyn RenderContext>,
    config: &'a EngineConfig,
    limits: &'a FetchLimits,
    current_url: Url,
    trace: InteractionTrace,
    errors: Vec<ScrapeError>,
    tab_clicks: u32,
}

impl Driver<'_> {
    /// Navigate, recording a `render` error on failure but carrying on with
    /// whatever DOM is present.
    async fn navigate(&mut self, url: &str) {
        if let Err(e) = self.ctx.navigate(url, self.config.nav_timeout_ms).await {
            tracing::warn!(url, "navigation failed: {e:#}");
            self.errors.push(ScrapeError::new(
                Phase::Render,
                format!("navigation to {url} failed: {e:#}"),
            ));
        }
    }

    /// Best-effort overlay and cookie-banner dismissal. Absence of a match
    /// is not an error; these clicks do not consume the tab-click budget.
    async fn dismiss_overlays(&mut self) {
        for rule in OVERLAY_RULES {
            self.run_clicks(rule, OVERLAY_CLICK_CAP).await;
        }
    }

    /// Click tab-like and "load more" controls, bounded by `max_clicks`
    /// across the whole run.
    async fn activate_tabs(&mut self) {
        for rule in TAB_RULES {
            let remaining = self.limits.max_clicks.saturating_sub(self.tab_clicks);
            if remaining == 0 {
                break;
            }
            let clicked = self.run_clicks(rule, remaining).await;
            self.tab_clicks += clicked;
            if clicked > 0 {
                // Give activated content a moment to render.
                tokio::time::sleep(Duration::from_millis(self.config.settle_ms / 2)).await;
            }
        }
    }

    /// Execute a click rule; returns how many elements were activated and
    /// records each activation in the trace.
    async fn run_clicks(&mut self, rule: &MatcherRule, limit: u32) -> u32 {
        let script = rules::click_script(rule, limit);
        match self.ctx.execute_js(&script).await {
            Ok(value) => {
                // The count comes back from page-side JS; never let it
                // exceed the budget we passed in.
                let clicked = (value.as_u64().unwrap_or(0) as u32).min(limit);
                for _ in 0..clicked {
                    self.trace.clicks.push(rule.label());
                }
                clicked
            }
            Err(e) => {
                tracing::warn!(rule = %rule.label(), "click script failed: {e:#}");
                self.errors.push(ScrapeError::new(
                    Phase::Render,
                    format!("click script for {} failed: {e:#}", rule.label()),
                ));
                0
            }
        }
    }

    /// Scroll to the bottom repeatedly to trigger lazy loading, stopping
    /// early when the document height stops growing. The scroll budget is
    /// global across pagination pages.
    async fn scroll(&mut self) {
        let mut last_height: Option<i64> = None;
        while self.trace.scrolls < self.limits.max_scrolls {
            let script = r#"(() => {
                const h = document.body ? document.body.scrollHeight : 0;
                window.scrollTo(0, h);
                return h;
            })()"#;
            let height = match self.ctx.execute_js(script).await {
                Ok(v) => v.as_i64().unwrap_or(0),
                Err(e) => {
                    self.errors.push(ScrapeError::new(
                        Phase::Render,
                        format!("scroll failed: {e:#}"),
                    ));
                    break;
                }
            };
            self.trace.scrolls += 1;
            tokio::time::sleep(Duration::from_millis(self.config.settle_ms)).await;

            if last_height == Some(height) {
                break; // no further lazy content is loading
            }
            last_height = Some(height);
        }
    }

    /// Follow "next page" links up to the pagination limit, giving each new
    /// page the scroll and tab treatment.
    async fn paginate(&mut self) {
        while (self.trace.pages.len() as u32) < self.limits.max_pagination_pages {
            let Some(href) = self.find_next_href().await else {
                break;
            };
            let next_url = resolve_url(&self.current_url, &href);
            if self.trace.pages.contains(&next_url) {
                break; // pagination loop
            }

            let before_errors = self.errors.len();
            self.navigate(&next_url).await;
            if self.errors.len() > before_errors {
                break;
            }

            // Record where we actually landed, not where the link pointed —
            // pagination links often redirect.
            let landed = match self.ctx.get_url().await {
                Ok(u) if !u.is_empty() => u,
                _ => next_url.clone(),
            };
            if self.trace.pages.contains(&landed) {
                break; // redirect loop
            }

            self.trace.pages.push(landed.clone());
            if let Ok(u) = Url::parse(&landed) {
                self.current_url = u;
            }

            self.scroll().await;
            self.activate_tabs().await;
        }
    }

    /// Evaluate next-page rules in priority order; first non-empty href wins.
    async fn find_next_href(&mut self) -> Option<String> {
        for rule in NEXT_PAGE_RULES {
            let script = rules::find_href_script(rule);
            match self.ctx.execute_js(&script).await {
                Ok(value) => {
                    if let Some(href) = value.as_str() {
                        if !href.is_empty() {
                            return Some(href.to_string());
                        }
                    }
                }
                Err(e) => {
                    tracing::debug!(rule = %rule.label(), "next-link probe failed: {e:#}");
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Arc;
    use std::sync::Mutex;

    /// Scripted browser context: answers the driver's JS probes from canned
    /// queues, keyed by recognizable fragments of the generated scripts.
    struct MockContext {
        html: String,
        heights: Mutex<VecDeque<i64>>,
        next_hrefs: Mutex<VecDeque<Option<String>>>,
        click_counts: Mutex<VecDeque<u64>>,
        /// Post-navigation URLs reported by the page; falls back to the last
        /// navigated URL when empty.
        landed_urls: Mutex<VecDeque<String>>,
        navigations: Arc<Mutex<Vec<String>>>,
        fail_navigation: bool,
    }

    impl MockContext {
        fn new() -> Self {
            Self {
                html: "<html><body><main><p>rendered</p></main></body></html>".to_string(),
                heights: Mutex::new(VecDeque::new()),
                next_hrefs: Mutex::new(VecDeque::new()),
                click_counts: Mutex::new(VecDeque::new()),
                landed_urls: Mutex::new(VecDeque::new()),
                navigations: Arc::new(Mutex::new(Vec::new())),
                fail_navigation: false,
            }
        }
    }

    #[async_trait]
    impl RenderContext for MockContext {
        async fn navigate(&mut self, url: &str, _timeout_ms: u64) -> Result<()> {
            self.navigations.lock().unwrap().push(url.to_string());
            if self.fail_navigation {
                anyhow::bail!("navigation timed out");
            }
            Ok(())
        }

        async fn execute_js(&self, script: &str) -> Result<serde_json::Value> {
            if script.contains("scrollTo") {
                let h = self.heights.lock().unwrap().pop_front().unwrap_or(1000);
                return Ok(serde_json::json!(h));
            }
            if script.contains("getAttribute('href')") {
                let next = self.next_hrefs.lock().unwrap().pop_front().flatten();
                return Ok(match next {
                    Some(href) => serde_json::json!(href),
                    None => serde_json::Value::Null,
                });
            }
            if script.contains(".click()") {
                let n = self.click_counts.lock().unwrap().pop_front().unwrap_or(0);
                return Ok(serde_json::json!(n));
            }
            Ok(serde_json::Value::Null)
        }

        async fn get_html(&self) -> Result<String> {
            Ok(self.html.clone())
        }

        async fn get_url(&self) -> Result<String> {
            if let Some(landed) = self.landed_urls.lock().unwrap().pop_front() {
                return Ok(landed);
            }
            Ok(self
                .navigations
                .lock()
                .unwrap()
                .last()
                .cloned()
                .unwrap_or_default())
        }

        async fn close(self: Box<Self>) -> Result<()> {
            Ok(())
        }
    }

    struct MockRenderer {
        ctx: Mutex<Option<MockContext>>,
    }

    impl MockRenderer {
        fn with(ctx: MockContext) -> Self {
            Self {
                ctx: Mutex::new(Some(ctx)),
            }
        }
    }

    #[async_trait]
    impl Renderer for MockRenderer {
        async fn new_context(&self) -> Result<Box<dyn RenderContext>> {
            match self.ctx.lock().unwrap().take() {
                Some(ctx) => Ok(Box::new(ctx)),
                None => anyhow::bail!("no context"),
            }
        }
        async fn shutdown(&self) -> Result<()> {
            Ok(())
        }
        fn active_contexts(&self) -> usize {
            0
        }
    }

    fn fast_config() -> EngineConfig {
        EngineConfig {
            settle_ms: 1,
            ..EngineConfig::default()
        }
    }

    fn limits(scrolls: u32, clicks: u32, pages: u32) -> FetchLimits {
        FetchLimits {
            max_scrolls: scrolls,
            max_clicks: clicks,
            max_pagination_pages: pages,
        }
    }

    fn entry() -> Url {
        Url::parse("https://example.com/start").unwrap()
    }

    #[tokio::test]
    async fn test_entry_url_is_first_page() {
        let renderer = MockRenderer::with(MockContext::new());
        let out = run_interactions(&renderer, &entry(), &limits(3, 5, 3), &fast_config()).await;
        assert_eq!(out.trace.pages[0], "https://example.com/start");
        assert!(out.html.contains("rendered"));
        assert!(out.errors.is_empty());
    }

    #[tokio::test]
    async fn test_scroll_stops_when_height_constant() {
        let ctx = MockContext::new();
        // Height grows once, then stalls.
        *ctx.heights.lock().unwrap() = VecDeque::from([1000, 2000, 2000, 2000, 2000]);
        let renderer = MockRenderer::with(ctx);
        let out = run_interactions(&renderer, &entry(), &limits(10, 0, 1), &fast_config()).await;
        // 1000, 2000, 2000(stall) → three scrolls then early stop.
        assert_eq!(out.trace.scrolls, 3);
    }

    #[tokio::test]
    async fn test_scrolls_bounded_by_limit() {
        let ctx = MockContext::new();
        *ctx.heights.lock().unwrap() = (1..20).map(|i| i * 1000).collect();
        let renderer = MockRenderer::with(ctx);
        let out = run_interactions(&renderer, &entry(), &limits(3, 0, 1), &fast_config()).await;
        assert_eq!(out.trace.scrolls, 3);
    }

    #[tokio::test]
    async fn test_clicks_recorded_and_bounded() {
        let ctx = MockContext::new();
        // Overlay rules (5 probes) find nothing; tab rules report activations,
        // the second one claiming far more than the remaining budget.
        *ctx.click_counts.lock().unwrap() = VecDeque::from([0, 0, 0, 0, 0, 2, 9, 9]);
        let renderer = MockRenderer::with(ctx);
        let out = run_interactions(&renderer, &entry(), &limits(0, 4, 1), &fast_config()).await;
        // Even a hostile page-side count cannot push the trace past the limit.
        assert_eq!(
            out.trace.clicks,
            vec![
                "[role='tab']",
                "[role='tab']",
                "button:has-text('load more')",
                "button:has-text('load more')",
            ]
        );
    }

    #[tokio::test]
    async fn test_overlay_clicks_recorded_but_exempt_from_budget() {
        let ctx = MockContext::new();
        // First overlay rule dismisses one banner; with a tab budget of 2,
        // both tab activations still go through.
        *ctx.click_counts.lock().unwrap() = VecDeque::from([1, 0, 0, 0, 0, 2]);
        let renderer = MockRenderer::with(ctx);
        let out = run_interactions(&renderer, &entry(), &limits(0, 2, 1), &fast_config()).await;
        assert_eq!(
            out.trace.clicks,
            vec![
                "button[aria-label*='close']",
                "[role='tab']",
                "[role='tab']",
            ]
        );
    }

    #[tokio::test]
    async fn test_pagination_follows_next_links_in_order() {
        let ctx = MockContext::new();
        *ctx.next_hrefs.lock().unwrap() = VecDeque::from([
            Some("/page/2".to_string()),
            Some("/page/3".to_string()),
            Some("/page/4".to_string()),
        ]);
        let navs = Arc::clone(&ctx.navigations);
        let renderer = MockRenderer::with(ctx);
        let out = run_interactions(&renderer, &entry(), &limits(0, 0, 3), &fast_config()).await;

        assert_eq!(
            out.trace.pages,
            vec![
                "https://example.com/start",
                "https://example.com/page/2",
                "https://example.com/page/3",
            ]
        );
        // limit is total pages including the entry page
        assert!(out.trace.pages.len() as u32 <= 3);
        let navs = navs.lock().unwrap();
        assert_eq!(navs.len(), 3); // entry + two pagination hops
    }

    #[tokio::test]
    async fn test_pagination_records_post_redirect_url() {
        let ctx = MockContext::new();
        *ctx.next_hrefs.lock().unwrap() = VecDeque::from([Some("/page/2".to_string())]);
        // The link points at /page/2 but the server redirects.
        *ctx.landed_urls.lock().unwrap() =
            VecDeque::from(["https://example.com/page/2-final".to_string()]);
        let renderer = MockRenderer::with(ctx);
        let out = run_interactions(&renderer, &entry(), &limits(0, 0, 3), &fast_config()).await;
        assert_eq!(
            out.trace.pages,
            vec!["https://example.com/start", "https://example.com/page/2-final"]
        );
    }

    #[tokio::test]
    async fn test_pagination_stops_on_revisited_url() {
        let ctx = MockContext::new();
        // Second page links back to the first.
        *ctx.next_hrefs.lock().unwrap() = VecDeque::from([
            Some("/page/2".to_string()),
            Some("/start".to_string()),
        ]);
        let renderer = MockRenderer::with(ctx);
        let out = run_interactions(&renderer, &entry(), &limits(0, 0, 5), &fast_config()).await;
        assert_eq!(out.trace.pages.len(), 2);
    }

    #[tokio::test]
    async fn test_navigation_failure_is_recorded_not_fatal() {
        let mut ctx = MockContext::new();
        ctx.fail_navigation = true;
        let renderer = MockRenderer::with(ctx);
        let out = run_interactions(&renderer, &entry(), &limits(1, 0, 1), &fast_config()).await;

        assert!(out
            .errors
            .iter()
            .any(|e| e.phase == Phase::Render && e.message.contains("navigation")));
        // DOM snapshot still read from whatever state the page is in.
        assert!(out.html.contains("rendered"));
    }

    #[tokio::test]
    async fn test_unavailable_renderer_records_render_error() {
        let renderer = crate::renderer::NoopRenderer;
        let out = run_interactions(&renderer, &entry(), &limits(1, 1, 1), &fast_config()).await;
        assert_eq!(out.errors.len(), 1);
        assert_eq!(out.errors[0].phase, Phase::Render);
        assert!(out.html.is_empty());
    }
}
