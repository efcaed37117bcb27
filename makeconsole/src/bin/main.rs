//! makeconsole service binary

#![forbid(unsafe_code)]

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use makeconsole::{config::MakeconsoleConfig, config::SERVICE_NAME, handlers, observability, state::AppState};

#[derive(Parser)]
#[command(name = "makeconsole")]
#[command(version)]
#[command(about = "Render lines of text as terminal and browser window SVGs", long_about = None)]
struct Cli {
    /// Public service URL, shown in the help image
    #[arg(long)]
    url: Option<String>,

    /// Read templates from disk on every request instead of caching them
    #[arg(long)]
    nocache: bool,

    /// Directory containing the `*.svg` templates
    #[arg(long)]
    template_dir: Option<PathBuf>,

    /// Load configuration from this file instead of the default locations
    #[arg(long)]
    config: Option<PathBuf>,
}

impl Cli {
    fn load_config(&self) -> Result<MakeconsoleConfig> {
        let mut config = match &self.config {
            Some(path) => MakeconsoleConfig::load_from(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
            None => MakeconsoleConfig::load_for_service(SERVICE_NAME)
                .context("Failed to load configuration")?,
        };

        if let Some(url) = &self.url {
            config.service.url.clone_from(url);
        }
        if let Some(dir) = &self.template_dir {
            config.templates.template_dir.clone_from(dir);
        }
        if self.nocache {
            config.templates.cache_enabled = false;
        }

        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    observability::init()?;

    let config = cli.load_config()?;
    let port = config.service.listen_port()?;
    let bind_address = config.service.bind_address.clone();

    tracing::info!(
        url = %config.service.url,
        template_dir = %config.templates.template_dir.display(),
        cache_enabled = config.templates.cache_enabled,
        "Configuration loaded"
    );

    // Templates are loaded before binding so a broken deployment never listens
    let state = AppState::new(config).context("Failed to load templates")?;
    let app = handlers::router(state);

    let listener = tokio::net::TcpListener::bind((bind_address.as_str(), port))
        .await
        .with_context(|| format!("Failed to bind {bind_address}:{port}"))?;
    tracing::info!("Listening on :{port}");

    axum::serve(listener, app).await?;

    Ok(())
}
