//! Camserver - Standalone Video Capture Server
//!
//! Main entry point for the capture server.

use camserver::capture::{CaptureOptions, CaptureService};
use camserver::event_log_service::{EventKind, EventLogService};
use camserver::state::{AppConfig, AppState, SystemHealth};
use camserver::web_api;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "camserver=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Camserver v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = AppConfig::default();
    tracing::info!(
        host = %config.host,
        port = config.port,
        camera_index = config.camera_index,
        width = config.width,
        height = config.height,
        fps = config.fps,
        backend = config.backend.as_str(),
        "Configuration loaded"
    );

    // Initialize capture
    let capture = Arc::new(CaptureService::new(
        config.camera_index,
        CaptureOptions {
            backend: config.backend,
            jpeg_quality: config.jpeg_quality,
            max_frame_bytes: config.max_frame_bytes,
        },
    ));
    if let Err(e) = capture.initialize() {
        tracing::error!(error = %e, "Failed to initialize video capture");
        return Err(e.into());
    }

    // Apply configured capture settings on top of the defaults
    capture.set_resolution(config.width, config.height)?;
    capture.set_fps(config.fps);
    tracing::info!("CaptureService initialized");

    let event_log = Arc::new(EventLogService::default());
    event_log
        .record(
            EventKind::Initialized,
            format!("camera {}", config.camera_index),
        )
        .await;

    // Initialize system health
    let system_health = Arc::new(RwLock::new(SystemHealth::default()));

    // Create application state
    let state = AppState {
        config: config.clone(),
        capture: capture.clone(),
        event_log,
        system_health: system_health.clone(),
        started_at: chrono::Utc::now(),
    };

    let app = web_api::create_router(state.clone())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http());

    // Start system health monitoring
    let health_monitor = system_health.clone();
    tokio::spawn(async move {
        use sysinfo::System;
        let mut sys = System::new_all();
        let mut interval = tokio::time::interval(Duration::from_secs(30));

        loop {
            interval.tick().await;
            sys.refresh_all();

            // Average CPU usage across all cores
            let cpu = {
                let cpus = sys.cpus();
                if cpus.is_empty() {
                    0.0
                } else {
                    cpus.iter().map(|c| c.cpu_usage()).sum::<f32>() / cpus.len() as f32
                }
            };
            let memory = if sys.total_memory() > 0 {
                (sys.used_memory() as f32 / sys.total_memory() as f32) * 100.0
            } else {
                0.0
            };

            let mut health = health_monitor.write().await;
            health.update(cpu, memory);
        }
    });

    // Start server
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutdown signal received");
        })
        .await?;

    // Stop the capture worker before exiting
    state
        .event_log
        .record(EventKind::Stopped, "server shutting down")
        .await;
    capture.stop();
    tracing::info!("Capture stopped, exiting");

    Ok(())
}
