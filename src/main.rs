/// Прогон конвейера и API сервер для результатов

use std::sync::Arc;

use anyhow::Context;

use gdp_forecast::{config::PipelineConfig, pipeline::Pipeline, server};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Инициализация логирования
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = PipelineConfig::from_env().context("failed to load pipeline configuration")?;
    let bind_addr = config.bind_addr.clone();

    // Обучение тяжёлое, выносим из async рантайма
    let artifacts = tokio::task::spawn_blocking(move || Pipeline::run(&config))
        .await
        .context("pipeline task panicked")?
        .context("pipeline run failed")?;
    tracing::info!(
        "Pipeline produced {} scenario forecasts at {}",
        artifacts.forecasts.len(),
        artifacts.generated_at
    );

    let app = server::router(Arc::new(artifacts));

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    tracing::info!("Server listening on http://{}", bind_addr);
    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
