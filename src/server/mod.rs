use anyhow::{Context, Result};
use axum::{
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{compression::CompressionLayer, cors::CorsLayer};
use tracing::{info, warn};

pub mod events;
pub mod handlers;
pub mod state;

use crate::utils::open_browser;

use self::state::AppState;
use handlers::{
    get_map_config, get_overlay, get_status, healthz, index_html, overlay_events_stream,
    script_js, select_basemap, set_overlay_visibility, style_css,
};

// Create the main application router
pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_html))
        .route("/style.css", get(style_css))
        .route("/script.js", get(script_js))
        .route("/healthz", get(healthz))
        .route("/api/map", get(get_map_config))
        .route("/api/status", get(get_status))
        .route("/api/events", get(overlay_events_stream))
        .route("/api/basemap", post(select_basemap))
        .route("/api/overlays/:slug", get(get_overlay))
        .route("/api/overlays/:slug/visibility", post(set_overlay_visibility))
        .layer(
            ServiceBuilder::new()
                .layer(CorsLayer::permissive())
                .layer(CompressionLayer::new()),
        )
        .with_state(state)
}

pub async fn start_server(state: AppState) -> Result<()> {
    let addr = state.settings.listen_addr();
    let auto_open = state.settings.auto_open_browser;
    let app = create_app(state);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    let url = format!("http://{addr}");
    println!("   ✅ HTTP server started successfully at {url}");
    info!("Serving map at {url}");

    if auto_open {
        if let Err(e) = open_browser(&url) {
            warn!("Could not open browser: {e}");
        }
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
            sigterm.recv().await;
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutting down");
}
