//! The HTTP signing gateway.
//!
//! One [`Gateway`] instance owns the registered key list, the policy engine
//! and the backend signer for its lifetime; requests borrow it through an
//! `Arc`. The HTTP surface is deliberately small:
//! * `GET /authorized_keys` — always the empty object.
//! * `GET /keys/{pkh}` — public key lookup.
//! * `POST /keys/{pkh}` — the signing pipeline.
//! * `GET /metrics` — Prometheus exposition.
//!
//! No authentication is built in; the process is meant to listen inside the
//! baker's trusted network segment.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use axum::error_handling::HandleErrorLayer;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use axum::routing::get;
use axum::Router;
use tower::timeout::TimeoutLayer;
use tower::{BoxError, ServiceBuilder};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use bakergate_policy::{Policy, PolicyEngine};
use bakergate_protocol::Key;
use bakergate_signers::Signer;

pub mod config;
mod error;
mod handlers;
pub mod metrics;
pub mod telemetry;

pub use config::ConfigError;
pub use error::AppError;

/// Everything one server instance owns. Key list and policy are fixed at
/// startup; the watermark and spending state inside the engine are the only
/// mutable pieces and carry their own synchronization.
pub struct Gateway {
    keys: Vec<Key>,
    policy: PolicyEngine,
    signer: Arc<dyn Signer>,
}

impl Gateway {
    pub fn new(
        keys: Vec<Key>,
        policy: Policy,
        signer: Arc<dyn Signer>,
    ) -> Result<Self, ConfigError> {
        let mut seen = HashSet::new();
        for key in &keys {
            if !seen.insert(key.public_key_hash.as_str()) {
                return Err(ConfigError::DuplicateKey(key.public_key_hash.clone()));
            }
        }
        Ok(Self {
            keys,
            policy: PolicyEngine::new(policy)?,
            signer,
        })
    }

    pub fn key_count(&self) -> usize {
        self.keys.len()
    }

    fn find_key(&self, public_key_hash: &str) -> Option<&Key> {
        self.keys
            .iter()
            .find(|key| key.public_key_hash == public_key_hash)
    }
}

/// Knobs of the HTTP surface.
#[derive(Debug, Clone)]
pub struct ServerOptions {
    /// Per-request deadline, inherited by the backend call.
    pub request_timeout: Duration,
    /// Ceiling on request body size. Operations are small; anything large is
    /// not an operation.
    pub body_limit: usize,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(10),
            body_limit: 64 * 1024,
        }
    }
}

/// Build the HTTP service around one gateway instance.
pub fn router(gateway: Arc<Gateway>, options: &ServerOptions) -> Router {
    metrics::install();

    Router::new()
        .route("/authorized_keys", get(handlers::authorized_keys))
        .route(
            "/keys/:public_key_hash",
            get(handlers::lookup_key).post(handlers::sign),
        )
        .route("/metrics", get(handlers::metrics_exposition))
        .with_state(gateway)
        // `HandleErrorLayer` wraps the fallible timeout layer so the service
        // stays infallible.
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(handle_middleware_error))
                .layer(TimeoutLayer::new(options.request_timeout)),
        )
        .layer(CatchPanicLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(RequestBodyLimitLayer::new(options.body_limit))
}

async fn handle_middleware_error(err: BoxError) -> impl IntoResponse {
    if err.is::<tower::timeout::error::Elapsed>() {
        (
            StatusCode::GATEWAY_TIMEOUT,
            Json(serde_json::json!({ "error": "request timed out" })),
        )
    } else {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "error": err.to_string() })),
        )
    }
}
