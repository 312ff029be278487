//! Async HTTP client wrapping reqwest.
//!
//! Not a browser — a single GET with a fixed timeout, limited redirects,
//! retry on transport errors, and an HTTP/1.1 fallback for sites that
//! reject HTTP/2.

use anyhow::Result;
use std::time::Duration;

const UA: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
                  AppleWebKit/537.36 (KHTML, like Gecko) \
                  Chrome/131.0.0.0 Safari/537.36";

/// Response from an HTTP GET request.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// Original requested URL.
    pub url: String,
    /// Final URL after redirects.
    pub final_url: String,
    /// HTTP status code.
    pub status: u16,
    /// Response body as text.
    pub body: String,
}

/// HTTP client for the static fetch path.
#[derive(Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    /// HTTP/1.1-only fallback client for sites that reject HTTP/2.
    h1_client: reqwest::Client,
}

impl HttpClient {
    /// Create a new client with a standard Chrome user-agent.
    pub fn new(timeout_ms: u64) -> Self {
        let build = |h1_only: bool| {
            let mut builder = reqwest::Client::builder()
                .timeout(Duration::from_millis(timeout_ms))
                .redirect(reqwest::redirect::Policy::limited(5))
                .user_agent(UA);
            if h1_only {
                builder = builder.http1_only();
            }
            builder.build().unwrap_or_default()
        };

        Self {
            client: build(false),
            h1_client: build(true),
        }
    }

    /// Perform a single GET request.
    ///
    /// Retries once with full browser-like headers on 403 (some origins gate
    /// on Accept/Referer), and falls back to HTTP/1.1 on protocol errors.
    pub async fn get(&self, url: &str, timeout_ms: u64) -> Result<HttpResponse> {
        match self.get_inner(&self.client, url, timeout_ms).await {
            Ok(resp) if resp.status == 403 => {
                tracing::debug!(url, "got 403, retrying with browser headers");
                self.get_browserlike(url, timeout_ms).await.or(Ok(resp))
            }
            Ok(resp) => Ok(resp),
            Err(e) => {
                let err_str = format!("{e}");
                if err_str.contains("http2")
                    || err_str.contains("protocol")
                    || err_str.contains("connection closed")
                {
                    self.get_inner(&self.h1_client, url, timeout_ms).await
                } else {
                    Err(e)
                }
            }
        }
    }

    async fn get_inner(
        &self,
        client: &reqwest::Client,
        url: &str,
        timeout_ms: u64,
    ) -> Result<HttpResponse> {
        let mut retries = 0u32;
        let max_retries = 2;

        loop {
            let resp = client
                .get(url)
                .timeout(Duration::from_millis(timeout_ms))
                .send()
                .await;

            match resp {
                Ok(r) => {
                    let status = r.status().as_u16();
                    let final_url = r.url().to_string();

                    // Retry on 5xx
                    if status >= 500 && retries < max_retries {
                        retries += 1;
                        let delay = Duration::from_millis(500 * 2u64.pow(retries - 1));
                        tokio::time::sleep(delay).await;
                        continue;
                    }

                    let body = r.text().await.unwrap_or_default();

                    return Ok(HttpResponse {
                        url: url.to_string(),
                        final_url,
                        status,
                        body,
                    });
                }
                Err(e) => {
                    if retries < max_retries {
                        retries += 1;
                        let delay = Duration::from_millis(500 * 2u64.pow(retries - 1));
                        tokio::time::sleep(delay).await;
                        continue;
                    }
                    return Err(e.into());
                }
            }
        }
    }

    /// GET with a full browser-like header set, used as a 403 fallback.
    async fn get_browserlike(&self, url: &str, timeout_ms: u64) -> Result<HttpResponse> {
        let r = self
            .client
            .get(url)
            .timeout(Duration::from_millis(timeout_ms))
            .header("Accept-Language", "en-US,en;q=0.9")
            .header(
                "Accept",
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            )
            .header("Referer", "https://google.com/")
            .send()
            .await?;

        let status = r.status().as_u16();
        let final_url = r.url().to_string();
        let body = r.text().await.unwrap_or_default();

        Ok(HttpResponse {
            url: url.to_string(),
            final_url,
            status,
            body,
        })
    }
}
