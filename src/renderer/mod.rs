//! Renderer abstraction for browser-based page rendering.
//!
//! The interaction driver only talks to these traits, so it runs against
//! real Chromium in production and a scripted mock in tests.

pub mod chromium;

use anyhow::Result;
use async_trait::async_trait;

/// A browser engine that can create rendering contexts.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Create a new browser context (tab).
    async fn new_context(&self) -> Result<Box<dyn RenderContext>>;
    /// Shut down the browser engine.
    async fn shutdown(&self) -> Result<()>;
    /// Number of currently active contexts.
    fn active_contexts(&self) -> usize;
}

/// A single browser context (tab).
///
/// Clicking, scrolling, and selector queries all go through `execute_js`;
/// keeping this surface small is what makes the driver mockable.
#[async_trait]
pub trait RenderContext: Send + Sync {
    /// Navigate to a URL, bounded by a timeout, waiting for the page to settle.
    async fn navigate(&mut self, url: &str, timeout_ms: u64) -> Result<()>;
    /// Execute JavaScript in the page and return its JSON result.
    async fn execute_js(&self, script: &str) -> Result<serde_json::Value>;
    /// Get the full page HTML.
    async fn get_html(&self) -> Result<String>;
    /// Get the current URL.
    async fn get_url(&self) -> Result<String>;
    /// Close this context.
    async fn close(self: Box<Self>) -> Result<()>;
}

/// A no-op renderer used when Chromium is unavailable.
///
/// The static path works without a browser; with this stub, runs that need
/// the dynamic path record a `render` error and keep their static data.
pub struct NoopRenderer;

#[async_trait]
impl Renderer for NoopRenderer {
    async fn new_context(&self) -> Result<Box<dyn RenderContext>> {
        Err(anyhow::anyhow!("browser not available — static-only mode"))
    }
    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }
    fn active_contexts(&self) -> usize {
        0
    }
}
