//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the catch-all interception handler
//! - Wire up middleware (tracing, request ID)
//! - Bind server to listener
//! - Hand every request to the interception bridge
//! - Render passthrough failures as gateway errors

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::RouterConfig;
use crate::http::bridge::InterceptionBridge;
use crate::http::forward::{ForwardError, Forwarder, UpstreamForwarder};
use crate::http::request::X_REQUEST_ID;
use crate::routing::Router as RouteTable;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub bridge: Arc<InterceptionBridge>,
}

/// HTTP front end delivering request events to the bridge.
pub struct HttpServer {
    router: Router,
    config: RouterConfig,
}

impl HttpServer {
    /// Create a server forwarding unmatched requests to the configured upstream.
    pub fn new(config: RouterConfig, routes: Arc<RouteTable>) -> Result<Self, ForwardError> {
        let forwarder = Arc::new(UpstreamForwarder::new(&config.upstream, &config.timeouts)?);
        Ok(Self::with_forwarder(config, routes, forwarder))
    }

    /// Create a server with a custom passthrough implementation.
    pub fn with_forwarder(
        config: RouterConfig,
        routes: Arc<RouteTable>,
        forwarder: Arc<dyn Forwarder>,
    ) -> Self {
        routes.log_table();
        let bridge = InterceptionBridge::new(
            routes,
            forwarder,
            Duration::from_secs(config.timeouts.handler_secs),
            config.security.max_body_size,
        );
        let state = AppState {
            bridge: Arc::new(bridge),
        };

        let router = Self::build_router(state);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        let x_request_id = axum::http::HeaderName::from_static(X_REQUEST_ID);
        Router::new()
            .route("/{*path}", any(intercept_handler))
            .route("/", any(intercept_handler))
            .with_state(state)
            .layer(PropagateRequestIdLayer::new(x_request_id.clone()))
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::new(x_request_id, MakeRequestUuid))
    }

    /// Run the server until the shutdown signal fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &RouterConfig {
        &self.config
    }
}

/// Every request event enters here.
async fn intercept_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    match state.bridge.handle(request).await {
        Ok(response) => response,
        Err(e) => {
            let status = match e {
                ForwardError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
                _ => StatusCode::BAD_GATEWAY,
            };
            (status, format!("Upstream request failed: {e}")).into_response()
        }
    }
}
