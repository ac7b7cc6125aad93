mod api; // HTTP surface (POST /analyze)
mod config;
mod error;
mod handlers;
mod models;
mod services;

#[cfg(feature = "http-server")]
use api::server::create_router;

use anyhow::{Context, Result};
use dotenv::dotenv;
use std::env;

use config::AppConfig;
use handlers::AnalysisPipeline;
use models::ImagePayload;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenv().ok();

    // Initialize logger
    env_logger::init();

    log::info!("🚀 Starting food-lens...");

    let config = AppConfig::from_env()?;

    let gateway = services::build_gateway(&config.gateway)?;
    let pipeline = AnalysisPipeline::new(gateway);
    log::info!(
        "✅ {} gateway initialized with model: {}",
        config.gateway.provider,
        config.gateway.model
    );

    // One-shot mode: food-lens <image-path>
    if let Some(path) = env::args().nth(1) {
        return analyze_file(&pipeline, &path).await;
    }

    #[cfg(feature = "http-server")]
    {
        let app = create_router(pipeline, config.max_upload_bytes);

        let listener = tokio::net::TcpListener::bind(&config.bind_addr)
            .await
            .with_context(|| format!("Failed to bind {}", config.bind_addr))?;

        log::info!("🌐 Server listening on {}", config.bind_addr);
        log::info!(
            "📸 POST an image to http://{}/analyze (multipart field 'image')",
            config.bind_addr
        );

        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                tokio::signal::ctrl_c().await.ok();
            })
            .await
            .context("Server error")?;

        log::info!("🛑 Shutting down...");
    }

    #[cfg(not(feature = "http-server"))]
    {
        drop(pipeline);
        eprintln!("Usage: food-lens <image-path>");
    }

    Ok(())
}

async fn analyze_file(pipeline: &AnalysisPipeline, path: &str) -> Result<()> {
    let payload = ImagePayload::from_path(path).await?;
    log::info!("📸 Analyzing {} ({})", path, payload.mime_type);

    let result = tokio::select! {
        result = pipeline.submit(payload.bytes, &payload.mime_type) => result?,
        _ = tokio::signal::ctrl_c() => {
            log::info!("🛑 Interrupted, abandoning analysis");
            return Ok(());
        }
    };

    log::info!("✅ Got {} result", result.kind());
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
