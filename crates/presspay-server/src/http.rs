//! HTTP surface: the resource route and response mapping.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tokio::time::timeout;
use tower_http::trace::TraceLayer;
use tracing::error;

use presspay_core::errors::ValidationError;
use presspay_core::types::{ChallengeResponse, ResourceId, UnlockResponse};

use crate::orchestrator::{UnlockError, UnlockOrchestrator, UnlockOutcome};

/// Header carrying the JSON payment payload on retried requests.
pub const X_PAYMENT: &str = "X-PAYMENT";

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<UnlockOrchestrator>,
    /// Overall per-request deadline.
    pub request_deadline: Duration,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/resources/{id}", get(unlock_resource))
        .route("/healthz", get(healthz))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

async fn unlock_resource(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    headers: HeaderMap,
) -> Response {
    let payment = match headers.get(X_PAYMENT) {
        None => None,
        Some(value) => match value.to_str() {
            Ok(raw) => Some(raw.to_owned()),
            Err(_) => {
                return UnlockError::Validation(ValidationError::MalformedPayload(
                    "X-PAYMENT header is not valid UTF-8".to_string(),
                ))
                .into_response();
            }
        },
    };

    let unlock = state
        .orchestrator
        .unlock(ResourceId(id), payment.as_deref());
    match timeout(state.request_deadline, unlock).await {
        Ok(Ok(UnlockOutcome::Challenge(challenge))) => challenge_response(challenge),
        Ok(Ok(UnlockOutcome::Released(unlocked))) => released_response(unlocked),
        Ok(Err(err)) => err.into_response(),
        Err(_) => deadline_response(),
    }
}

fn challenge_response(challenge: ChallengeResponse) -> Response {
    let amount = HeaderValue::from_str(&challenge.price.to_string()).ok();
    let recipient = HeaderValue::from_str(&challenge.pay_to.to_string()).ok();

    let mut response = (StatusCode::PAYMENT_REQUIRED, Json(challenge)).into_response();
    let headers = response.headers_mut();
    headers.insert("X-Payment-Required", HeaderValue::from_static("true"));
    if let Some(value) = amount {
        headers.insert("X-Payment-Amount", value);
    }
    if let Some(value) = recipient {
        headers.insert("X-Payment-Recipient", value);
    }
    response
}

fn released_response(unlocked: UnlockResponse) -> Response {
    let transaction = HeaderValue::from_str(&unlocked.payment.transaction_ref).ok();

    let mut response = (StatusCode::OK, Json(unlocked)).into_response();
    let headers = response.headers_mut();
    headers.insert("X-Payment-Verified", HeaderValue::from_static("true"));
    if let Some(value) = transaction {
        headers.insert("X-Transaction-Ref", value);
    }
    response
}

fn deadline_response() -> Response {
    (
        StatusCode::GATEWAY_TIMEOUT,
        Json(ErrorBody {
            error: "Request deadline exceeded",
            details: None,
        }),
    )
        .into_response()
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl UnlockError {
    fn status(&self) -> StatusCode {
        match self {
            UnlockError::ResourceNotFound(_) => StatusCode::NOT_FOUND,
            UnlockError::Validation(_) => StatusCode::BAD_REQUEST,
            UnlockError::AlreadyUnlocked => StatusCode::CONFLICT,
            UnlockError::VerificationFailed { .. } | UnlockError::SettlementFailed { .. } => {
                StatusCode::PAYMENT_REQUIRED
            }
            UnlockError::Ledger(_) | UnlockError::Facilitator(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for UnlockError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "unlock attempt failed");
        }

        let body = match self {
            UnlockError::ResourceNotFound(_) => ErrorBody {
                error: "Resource not found",
                details: None,
            },
            UnlockError::Validation(err) => ErrorBody {
                error: "Invalid payment payload",
                details: Some(err.to_string()),
            },
            UnlockError::AlreadyUnlocked => ErrorBody {
                error: "Payment already processed",
                details: Some(
                    "nullifier already used; content may already be unlocked".to_string(),
                ),
            },
            UnlockError::VerificationFailed { reason } => ErrorBody {
                error: "Payment verification failed",
                details: Some(reason),
            },
            UnlockError::SettlementFailed { reason } => ErrorBody {
                error: "Payment settlement failed",
                details: Some(reason),
            },
            UnlockError::Ledger(err) => ErrorBody {
                error: "Ledger unavailable",
                details: Some(err.to_string()),
            },
            UnlockError::Facilitator(err) => ErrorBody {
                error: "Facilitator unavailable",
                details: Some(err.to_string()),
            },
        };

        (status, Json(body)).into_response()
    }
}
