//! HTTP host of the Dealpath MCP gateway.
//!
//! Provides a reusable serve function, used by the binary and by the integration tests.

#![deny(missing_docs)]

mod auth;
mod cors;
mod health;
mod local_files;
mod metrics;

use std::{net::SocketAddr, sync::Arc};

use anyhow::anyhow;
use auth::AuthLayer;
use axum::{Json, Router, routing::get};
use axum_server::tls_rustls::RustlsConfig;
use config::Config;
use mcp::AppContext;
use metrics::MetricsLayer;
use serde_json::{Value, json};
use tokio::net::TcpListener;

/// Configuration for serving the gateway.
pub struct ServeConfig {
    /// The socket address (IP and port) the server will bind to.
    pub listen_address: SocketAddr,
    /// The deserialized TOML configuration.
    pub config: Config,
}

/// Starts and runs the server with the provided configuration.
pub async fn serve(ServeConfig { listen_address, config }: ServeConfig) -> anyhow::Result<()> {
    let _telemetry = telemetry::init(&config.telemetry)?;
    let context = Arc::new(AppContext::new(&config).await?);

    if let Err(error) = context.files().ensure_root().await {
        log::warn!(
            "Could not create the storage root {}: {error}",
            context.files().root().display()
        );
    }

    let app = app(&config, context);

    let listener = TcpListener::bind(listen_address)
        .await
        .map_err(|e| anyhow!("Failed to bind to {listen_address}: {e}"))?;

    let make_service = app.into_make_service_with_connect_info::<SocketAddr>();

    match &config.server.tls {
        Some(tls_config) => {
            let rustls_config = RustlsConfig::from_pem_file(&tls_config.certificate, &tls_config.key)
                .await
                .map_err(|e| anyhow!("Failed to load TLS certificate and key: {e}"))?;

            if config.mcp.enabled {
                log::info!("MCP endpoint available at: https://{listen_address}{}", config.mcp.path);
            }

            axum_server::from_tcp_rustls(listener.into_std()?, rustls_config)
                .serve(make_service)
                .await
                .map_err(|e| anyhow!("Failed to start HTTPS server: {e}"))?;
        }
        None => {
            if config.mcp.enabled {
                log::info!("MCP endpoint available at: http://{listen_address}{}", config.mcp.path);
            }

            axum::serve(listener, make_service)
                .await
                .map_err(|e| anyhow!("Failed to start HTTP server: {e}"))?;
        }
    }

    Ok(())
}

fn app(config: &Config, context: Arc<AppContext>) -> Router {
    let cors = match &config.server.cors {
        Some(cors_config) => cors::generate(cors_config),
        None => cors::restrictive(&config.server.auth, &config.mcp.credential_header),
    };

    if config.server.auth.is_enforced() {
        log::info!("Bearer token required on the MCP endpoints");
    } else {
        log::info!("No bearer token configured; the MCP endpoints are open");
    }

    let mut app = Router::new();

    if config.mcp.enabled {
        let mcp_router = mcp::router(context.clone())
            .layer(AuthLayer::new(config.server.auth.clone(), &config.mcp.path))
            .layer(cors.clone());

        app = app.merge(mcp_router);
    } else {
        log::warn!("MCP endpoint disabled in the configuration");
    }

    if config.server.health.enabled {
        app = app.merge(health::router(&config.server.health.path, context.clone()).layer(cors.clone()));
    }

    let misc = Router::new()
        .route("/metrics", get(metrics::snapshot))
        .route("/version", get(version))
        .route("/local-files/{date}/{file_id}/{filename}", get(local_files::serve))
        .with_state(context);

    app.merge(misc).layer(MetricsLayer)
}

async fn version() -> Json<Value> {
    Json(json!({
        "name": "dealpath-mcp",
        "version": env!("CARGO_PKG_VERSION"),
        "protocolVersion": config::PROTOCOL_VERSION,
    }))
}
