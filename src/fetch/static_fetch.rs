//! Static fetcher: one HTTP GET, no script execution.
//!
//! Network-level failure is not fatal to the orchestrator — it becomes one
//! `fetch`-phase error with empty content.

use crate::config::EngineConfig;
use crate::extract::{self, meta};
use crate::fetch::http_client::HttpClient;
use crate::model::{PageMeta, Phase, ScrapeError, Section};
use url::Url;

/// Output of the static path: best-effort meta and sections plus any
/// recorded errors.
#[derive(Debug, Default)]
pub struct StaticOutcome {
    pub meta: PageMeta,
    pub sections: Vec<Section>,
    pub errors: Vec<ScrapeError>,
}

/// Fetch a URL statically and extract metadata and sections from the body.
pub async fn fetch_static(
    client: &HttpClient,
    url: &Url,
    config: &EngineConfig,
) -> StaticOutcome {
    let mut outcome = StaticOutcome::default();

    let resp = match client.get(url.as_str(), config.fetch_timeout_ms).await {
        Ok(resp) => resp,
        Err(e) => {
            tracing::warn!(url = url.as_str(), "static fetch failed: {e:#}");
            outcome.errors.push(ScrapeError::new(
                Phase::Fetch,
                format!("static fetch failed: {e:#}"),
            ));
            return outcome;
        }
    };

    if !(200..300).contains(&resp.status) {
        outcome.errors.push(ScrapeError::new(
            Phase::Fetch,
            format!("static fetch returned status {}", resp.status),
        ));
        return outcome;
    }

    if resp.body.is_empty() {
        outcome.errors.push(ScrapeError::new(
            Phase::Fetch,
            "static fetch returned empty body",
        ));
        return outcome;
    }

    outcome.meta = meta::extract_meta(&resp.body, url);
    outcome.sections = extract::extract_sections(&resp.body, url, config.raw_html_cap);
    tracing::debug!(
        url = url.as_str(),
        sections = outcome.sections.len(),
        "static fetch parsed"
    );
    outcome
}
