//! HTTP server module
//!
//! Provides the Axum-based HTTP front end of the gateway.

pub mod handlers;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::{routing::get, Router};
use tokio::signal;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::Config;
use crate::error::AppResult;
use crate::request::{ProcessingConfig, RequestDecoder};
use crate::upstream::{JolokiaClient, RequestDispatcher, RetryConfig};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<Config>,
    /// Request decoder with the configured policy
    pub decoder: Arc<RequestDecoder>,
    /// Upstream dispatcher
    pub dispatcher: Arc<dyn RequestDispatcher>,
    /// Processing options from the config file
    pub defaults: ProcessingConfig,
}

impl AppState {
    /// Build the state around an existing dispatcher
    ///
    /// # Errors
    /// Returns an error if the policy or processing sections are invalid
    pub fn new(config: Config, dispatcher: Arc<dyn RequestDispatcher>) -> AppResult<Self> {
        let decoder = RequestDecoder::new(config.request_policy()?);
        let defaults = config.processing_defaults()?;
        Ok(Self {
            config: Arc::new(config),
            decoder: Arc::new(decoder),
            dispatcher,
            defaults,
        })
    }

    /// Build the state with a [`JolokiaClient`] for the configured upstream
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be created or the
    /// configuration is invalid
    pub fn from_config(config: Config) -> AppResult<Self> {
        let upstream = &config.upstream;
        let mut client = JolokiaClient::new(&upstream.url, upstream.timeout_ms)?.with_retry(
            RetryConfig {
                max_retries: upstream.max_retries,
                ..RetryConfig::default()
            },
        );
        if let (Some(ref username), Some(ref password)) = (&upstream.username, &upstream.password)
        {
            client = client.with_auth(username, password);
        }
        Self::new(config, Arc::new(client))
    }
}

/// Build the router
///
/// The gateway answers on the context path, with or without a path info,
/// and serves `/health` next to it.
pub fn router(state: AppState) -> Router {
    let context_path = state.config.context_path().to_string();
    let root = if context_path.is_empty() {
        "/".to_string()
    } else {
        context_path.clone()
    };

    let mut app = Router::new()
        .route("/health", get(handlers::health))
        .route(&root, get(handlers::get_root).post(handlers::post_root))
        .route(
            &format!("{}/*pathinfo", context_path),
            get(handlers::get_path).post(handlers::post_path),
        );

    if !context_path.is_empty() {
        app = app.route(
            &format!("{}/", context_path),
            get(handlers::get_root).post(handlers::post_root),
        );
    }

    let cors_enabled = state.config.server.cors_enabled;
    let app = app.layer(TraceLayer::new_for_http()).with_state(state);

    if cors_enabled {
        app.layer(CorsLayer::permissive())
    } else {
        app
    }
}

/// Run the HTTP server
///
/// # Arguments
/// * `config` - Application configuration, CLI overrides already applied
///
/// # Errors
/// Returns an error if the server fails to start
pub async fn run(config: Config) -> Result<()> {
    let bind_address = config.server.bind_address.clone();
    let port = config.server.port;
    let tls = config.server.tls.clone();

    let state = AppState::from_config(config)?;
    let context_path = state.config.context_path().to_string();
    let upstream = state.config.upstream.url.clone();
    let app = router(state);

    // Parse bind address from config
    // Handle "localhost" specially, otherwise parse as IP address
    let bind_addr: std::net::IpAddr = if bind_address == "localhost" {
        std::net::IpAddr::V4(std::net::Ipv4Addr::LOCALHOST)
    } else {
        bind_address
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid bind_address '{}': {}. Use an IP address (e.g., '0.0.0.0', '127.0.0.1') or 'localhost'.", bind_address, e))?
    };
    let addr = SocketAddr::from((bind_addr, port));

    if tls.enabled {
        let (Some(cert), Some(key)) = (tls.cert_file, tls.key_file) else {
            anyhow::bail!("TLS is enabled but cert_file or key_file is missing");
        };
        let rustls = axum_server::tls_rustls::RustlsConfig::from_pem_file(cert, key).await?;
        let handle = axum_server::Handle::new();
        tokio::spawn({
            let handle = handle.clone();
            async move {
                shutdown_signal().await;
                handle.graceful_shutdown(Some(Duration::from_secs(10)));
            }
        });

        info!(address = %addr, context_path = %context_path, upstream = %upstream, "Server listening (TLS)");
        axum_server::bind_rustls(addr, rustls)
            .handle(handle)
            .serve(app.into_make_service())
            .await?;
    } else {
        info!(address = %addr, context_path = %context_path, upstream = %upstream, "Server listening");
        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Wait for shutdown signal
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        }
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        }
    }
}
