use std::sync::Arc;
use std::time::Instant;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use bakergate_protocol::base58;
use bakergate_protocol::codec::parse_quoted_hex;
use bakergate_protocol::operation::Operation;

use crate::error::AppError;
use crate::metrics;
use crate::Gateway;

/// `GET /authorized_keys` — the server publishes no authorization list.
pub(crate) async fn authorized_keys() -> Json<serde_json::Value> {
    Json(json!({}))
}

/// `GET /keys/{pkh}` — public key lookup.
pub(crate) async fn lookup_key(
    State(gateway): State<Arc<Gateway>>,
    Path(public_key_hash): Path<String>,
) -> Response {
    match gateway.find_key(&public_key_hash) {
        Some(key) => {
            metrics::observe("lookup", "ok");
            Json(json!({ "public_key": key.public_key.clone() })).into_response()
        }
        None => {
            // An unknown key is simply absent; no error body.
            metrics::observe("lookup", "unknown_key");
            StatusCode::NOT_FOUND.into_response()
        }
    }
}

/// `POST /keys/{pkh}` — the signing pipeline.
pub(crate) async fn sign(
    State(gateway): State<Arc<Gateway>>,
    Path(public_key_hash): Path<String>,
    body: String,
) -> Response {
    let started = Instant::now();
    let result = sign_inner(&gateway, &public_key_hash, &body).await;
    let outcome = match &result {
        Ok(_) => "ok",
        Err(err) => err.outcome(),
    };
    metrics::observe("sign", outcome);
    metrics::observe_sign_duration(started.elapsed());
    match result {
        Ok(response) => Json(response).into_response(),
        Err(err) => err.into_response(),
    }
}

async fn sign_inner(
    gateway: &Gateway,
    public_key_hash: &str,
    body: &str,
) -> Result<serde_json::Value, AppError> {
    let key = gateway
        .find_key(public_key_hash)
        .ok_or(AppError::UnknownKey)?;
    let payload = parse_quoted_hex(body)?;
    let op = Operation::parse(payload)?;

    // The watermark advances inside `authorize`, before any backend traffic:
    // a crash past this point costs at most a missed signature. The grant
    // holds the daily-cap charge and refunds it unless committed.
    let grant = gateway.policy.authorize(&op, &key.public_key_hash)?;
    let raw = gateway
        .signer
        .sign(op.bytes(), key)
        .await
        .map_err(AppError::Backend)?;
    grant.commit();

    let signature = base58::encode(key.curve.signature_prefix(), &raw);
    Ok(json!({ "signature": signature }))
}

/// `GET /metrics` — Prometheus text exposition.
pub(crate) async fn metrics_exposition() -> ([(axum::http::HeaderName, String); 1], axum::body::Bytes)
{
    let encoder = prometheus::TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buf = Vec::new();
    if let Err(err) = prometheus::Encoder::encode(&encoder, &metric_families, &mut buf) {
        tracing::error!(error = %err, "failed to encode prometheus metrics");
    }
    (
        [(
            axum::http::header::CONTENT_TYPE,
            prometheus::Encoder::format_type(&encoder).to_string(),
        )],
        buf.into(),
    )
}
