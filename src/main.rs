use anyhow::Context;
use tracing_subscriber::EnvFilter;

use vehicle_predictor::{router, AppState, Pipeline, ServerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cfg = ServerConfig::from_env().context("invalid configuration")?;

    let pipeline = Pipeline::load(cfg.schema, &cfg.model_path, &cfg.scaler_path)
        .context("failed to load model artifacts")?;
    tracing::info!(
        "loaded model {} and scaler {} for schema {} ({} features)",
        cfg.model_path.display(),
        cfg.scaler_path.display(),
        cfg.schema,
        cfg.schema.width()
    );

    // Warmup so a broken artifact pair fails here, not on the first request
    let y = pipeline.warmup()?;
    tracing::info!("warmup forward ok (zero-vector prediction {:.4})", y);

    let app = router(AppState::new(pipeline).with_log_pred(cfg.log_pred));

    let addr = cfg.addr();
    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    axum::serve(listener, app).await?;
    Ok(())
}
