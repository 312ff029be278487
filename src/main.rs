// Copyright 2026 Skimmer Contributors
// SPDX-License-Identifier: Apache-2.0

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use skimmer::config::EngineConfig;
use skimmer::engine::ScrapeEngine;
use skimmer::model::{FetchMode, FetchRequest};
use skimmer::renderer::chromium::ChromiumRenderer;
use skimmer::renderer::{NoopRenderer, Renderer};
use skimmer::rest::{self, SharedState};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

#[derive(Parser)]
#[command(
    name = "skimmer",
    about = "Skimmer — adaptive web content extraction engine",
    version,
    after_help = "Run 'skimmer <command> --help' for details on each command."
)]
struct Cli {
    /// Enable verbose/debug logging
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API server
    Serve {
        /// Port to listen on
        #[arg(long, default_value = "7676")]
        port: u16,
    },
    /// Scrape a single URL and print the result JSON
    Scrape {
        /// URL to scrape
        url: String,
        /// Fetch mode (auto, static, dynamic)
        #[arg(long, default_value = "auto")]
        mode: String,
        /// Maximum scroll operations
        #[arg(long)]
        scrolls: Option<u32>,
        /// Maximum tab/"load more" clicks
        #[arg(long)]
        clicks: Option<u32>,
        /// Maximum pages visited including the entry page
        #[arg(long)]
        pagination_limit: Option<u32>,
        /// Pretty-print the output JSON
        #[arg(long)]
        pretty: bool,
    },
    /// Generate shell completion scripts
    Completions {
        /// Shell type (bash, zsh, fish, powershell)
        shell: Shell,
    },
}

/// Launch Chromium if available, falling back to static-only operation.
async fn build_renderer() -> (Arc<dyn Renderer>, bool) {
    match ChromiumRenderer::new().await {
        Ok(renderer) => {
            info!("Chromium renderer initialized");
            (Arc::new(renderer), true)
        }
        Err(e) => {
            warn!("Chromium unavailable, dynamic fetches will be degraded: {e:#}");
            (Arc::new(NoopRenderer), false)
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "skimmer=debug" } else { "skimmer=info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(default_level.parse().expect("static directive")),
        )
        .init();

    match cli.command {
        Commands::Serve { port } => {
            let (renderer, browser_available) = build_renderer().await;
            let state = Arc::new(SharedState {
                engine: ScrapeEngine::new(EngineConfig::default(), renderer),
                browser_available,
                started_at: Instant::now(),
            });
            info!("starting skimmer v{}", env!("CARGO_PKG_VERSION"));
            rest::start(port, state).await
        }
        Commands::Scrape {
            url,
            mode,
            scrolls,
            clicks,
            pagination_limit,
            pretty,
        } => {
            let mode = match mode.as_str() {
                "auto" => FetchMode::Auto,
                "static" => FetchMode::Static,
                "dynamic" => FetchMode::Dynamic,
                other => anyhow::bail!("unknown mode '{other}' (expected auto/static/dynamic)"),
            };

            // A static-only run does not need a browser at all.
            let (renderer, _) = if mode == FetchMode::Static {
                (Arc::new(NoopRenderer) as Arc<dyn Renderer>, false)
            } else {
                build_renderer().await
            };

            let engine = ScrapeEngine::new(EngineConfig::default(), renderer);
            let limits = engine.limits(scrolls, clicks, pagination_limit);
            let result = engine.scrape(FetchRequest { url, mode, limits }).await;

            let out = if pretty {
                serde_json::to_string_pretty(&result)?
            } else {
                serde_json::to_string(&result)?
            };
            println!("{out}");
            Ok(())
        }
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "skimmer", &mut std::io::stdout());
            Ok(())
        }
    }
}
