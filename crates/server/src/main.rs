use std::net::SocketAddr;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use lockbox_classify::Classifier;
use lockbox_extract::{CommandBackend, StatementPipeline};
use lockbox_recon::Reconciler;

mod config;
mod error;
mod routes;

use config::ServerConfig;
use routes::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::from_env();
    tracing::info!(
        parser = %config.parser_program,
        scratch = %config.scratch_dir.display(),
        "starting lockbox-server"
    );

    let classifier = match &config.rules_file {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("reading rules file {}", path.display()))?;
            let classifier = Classifier::from_toml(&raw)
                .with_context(|| format!("parsing rules file {}", path.display()))?;
            tracing::info!(rules = %path.display(), "loaded classifier rules");
            classifier
        }
        None => Classifier::with_default_rules(),
    };

    let backend = CommandBackend::new(config.parser_program.clone())
        .with_args(config.parser_args.clone());
    let pipeline = StatementPipeline::new(backend, config.scratch_dir.clone());
    let reconciler = Reconciler::new(pipeline, classifier);

    let app = routes::app(AppState::new(reconciler));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("listening on {addr}");
    axum::serve(listener, app).await?;

    Ok(())
}
