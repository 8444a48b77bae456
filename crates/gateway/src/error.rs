use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use thiserror::Error;
use tracing::{error, warn};

use bakergate_policy::{PolicyError, PolicyViolation};
use bakergate_protocol::ProtocolError;
use bakergate_signers::SignerError;

/// Request-level failures of the signing pipeline, ordered by where in the
/// pipeline they arise.
#[derive(Debug, Error)]
pub enum AppError {
    /// The payload could not be decoded; nothing downstream ran.
    #[error("{0}")]
    Parse(#[from] ProtocolError),
    /// The requested key is not registered with this server.
    #[error("unknown key")]
    UnknownKey,
    /// The policy refused the operation.
    #[error("{0}")]
    Denied(PolicyViolation),
    /// The custody backend failed; detail goes to the log, not the client.
    #[error("signing backend failure")]
    Backend(#[source] SignerError),
}

impl From<PolicyError> for AppError {
    fn from(err: PolicyError) -> Self {
        match err {
            PolicyError::Parse(parse) => Self::Parse(parse),
            PolicyError::Denied(violation) => Self::Denied(violation),
        }
    }
}

impl AppError {
    /// Outcome label used by the request metrics.
    pub(crate) fn outcome(&self) -> &'static str {
        match self {
            Self::Parse(_) => "parse_error",
            Self::UnknownKey => "unknown_key",
            Self::Denied(_) => "denied",
            Self::Backend(_) => "backend_error",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::Parse(_) => StatusCode::BAD_REQUEST,
            Self::UnknownKey => StatusCode::NOT_FOUND,
            Self::Denied(_) => StatusCode::FORBIDDEN,
            Self::Backend(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        match &self {
            Self::Denied(violation) => {
                warn!(target: "gateway", code = violation.code(), "refused to sign: {violation}");
            }
            Self::Backend(source) => {
                error!(target: "gateway", "signing backend failed: {source}");
            }
            _ => {}
        }
        (
            status,
            Json(serde_json::json!({ "error": self.to_string() })),
        )
            .into_response()
    }
}
