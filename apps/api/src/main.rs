mod config;
mod errors;
mod layout;
mod models;
mod routes;
mod state;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::layout::height::ShapedSurface;
use crate::layout::template::TemplateConfig;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on malformed env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Pager API v{}", env!("CARGO_PKG_VERSION"));

    // Default template: configuration errors fail here, never inside a layout pass
    let default_template = TemplateConfig::with_font(config.default_font);
    default_template
        .validate()
        .context("Default page template is invalid")?;
    info!(
        "Layout template: {:?}, {}x{}px page, capacity {}px",
        default_template.typography.font,
        default_template.page.width_px,
        default_template.page.height_px,
        default_template.capacity()
    );
    info!(
        "Preview debounce {}ms, idle TTL {}s, max recommended pages {}",
        config.layout_debounce.as_millis(),
        config.preview_idle_ttl.as_secs(),
        config.max_recommended_pages
    );

    // Build app state
    let state = AppState::new(&config, default_template, Arc::new(ShapedSurface));
    state.previews.spawn_eviction();

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins once the editor UI has a fixed host

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
