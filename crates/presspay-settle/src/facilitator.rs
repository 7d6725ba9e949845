//! Typed client for the external payment facilitator.
//!
//! The facilitator exposes a two-phase settlement API: `verify` validates
//! the signed authorization (signature, funds, nonce) without moving money,
//! `settle` executes the transfer. Both calls share one canonical request
//! body built once per unlock attempt.

use alloy_primitives::{Address, B256, Bytes};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;
use url::Url;

use presspay_core::types::{Amount, PaymentPayload, Resource};

use crate::retry::{RetryPolicy, RetryableError};

/// Payment scheme accepted by this server.
pub const EXACT_SCHEME: &str = "exact";

/// Protocol version carried in facilitator requests.
pub const PROTOCOL_VERSION: u8 = 1;

/// The canonical request body shared by `verify` and `settle`.
///
/// Built once per unlock attempt and reused for both calls, so the two
/// payloads cannot diverge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FacilitatorRequest {
    pub payment_payload: PaymentEnvelope,
    pub payment_requirements: PaymentRequirements,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentEnvelope {
    pub scheme: String,
    pub network: String,
    pub version: u8,
    pub payload: ExactPayload,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExactPayload {
    pub signature: Bytes,
    pub authorization: Authorization,
}

/// The signed, time-bounded transfer instruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Authorization {
    pub from: Address,
    pub to: Address,
    pub value: Amount,
    pub valid_after: u64,
    pub valid_before: u64,
    pub nonce: B256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequirements {
    pub scheme: String,
    pub network: String,
    pub asset: Address,
    pub pay_to: Address,
    pub max_amount_required: Amount,
}

impl FacilitatorRequest {
    /// Assemble the canonical verify/settle body for one unlock attempt.
    pub fn for_unlock(
        payload: &PaymentPayload,
        resource: &Resource,
        network: &str,
        asset: Address,
    ) -> Self {
        FacilitatorRequest {
            payment_payload: PaymentEnvelope {
                scheme: EXACT_SCHEME.to_string(),
                network: network.to_string(),
                version: PROTOCOL_VERSION,
                payload: ExactPayload {
                    signature: payload.signature.clone(),
                    authorization: Authorization {
                        from: payload.from,
                        to: resource.creator,
                        value: resource.price,
                        valid_after: payload.valid_after,
                        valid_before: payload.valid_before,
                        nonce: payload.nonce,
                    },
                },
            },
            payment_requirements: PaymentRequirements {
                scheme: EXACT_SCHEME.to_string(),
                network: network.to_string(),
                asset,
                pay_to: resource.creator,
                max_amount_required: resource.price,
            },
        }
    }
}

/// Wire response of `POST {facilitator}/verify`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    pub is_valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invalid_reason: Option<String>,
    #[serde(default)]
    pub payer: String,
}

/// Wire response of `POST {facilitator}/settle`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettleResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_reason: Option<String>,
    #[serde(default)]
    pub payer: String,
    #[serde(default)]
    pub transaction: String,
    #[serde(default)]
    pub network: String,
}

/// Outcome of a verification call.
#[derive(Debug, Clone)]
pub enum Verification {
    Valid(VerifiedPayment),
    Invalid {
        reason: String,
        payer: Option<String>,
    },
}

#[derive(Debug, Clone)]
pub struct VerifiedPayment {
    /// Payer recovered from the authorization signature.
    pub payer: String,
}

/// Outcome of a settlement call.
#[derive(Debug, Clone)]
pub enum Settlement {
    Success(SettledPayment),
    Failed {
        reason: String,
        payer: Option<String>,
    },
}

#[derive(Debug, Clone)]
pub struct SettledPayment {
    pub payer: String,
    pub transaction: String,
    pub network: String,
}

impl From<VerifyResponse> for Verification {
    fn from(response: VerifyResponse) -> Self {
        if response.is_valid {
            Verification::Valid(VerifiedPayment {
                payer: response.payer,
            })
        } else {
            Verification::Invalid {
                reason: response.invalid_reason.unwrap_or_default(),
                payer: (!response.payer.is_empty()).then_some(response.payer),
            }
        }
    }
}

impl From<SettleResponse> for Settlement {
    fn from(response: SettleResponse) -> Self {
        if response.success {
            Settlement::Success(SettledPayment {
                payer: response.payer,
                transaction: response.transaction,
                network: response.network,
            })
        } else {
            Settlement::Failed {
                reason: response.error_reason.unwrap_or_default(),
                payer: (!response.payer.is_empty()).then_some(response.payer),
            }
        }
    }
}

/// Errors from facilitator calls.
///
/// `Unreachable` and `Timeout` are transport faults and retryable;
/// `Status` is the facilitator refusing the payment and is definitive.
#[derive(Debug, thiserror::Error)]
pub enum FacilitatorError {
    #[error("facilitator unreachable: {0}")]
    Unreachable(String),

    #[error("facilitator request timed out: {0}")]
    Timeout(String),

    #[error("facilitator returned status {status}: {detail}")]
    Status { status: u16, detail: String },

    #[error("failed to decode facilitator response: {0}")]
    Decode(String),

    #[error("invalid facilitator endpoint: {0}")]
    Endpoint(#[from] url::ParseError),
}

impl RetryableError for FacilitatorError {
    fn is_retryable(&self) -> bool {
        matches!(
            self,
            FacilitatorError::Unreachable(_) | FacilitatorError::Timeout(_)
        )
    }
}

fn classify_transport(err: reqwest::Error) -> FacilitatorError {
    if err.is_timeout() {
        FacilitatorError::Timeout(err.to_string())
    } else if err.is_decode() {
        FacilitatorError::Decode(err.to_string())
    } else {
        FacilitatorError::Unreachable(err.to_string())
    }
}

/// External payment facilitator interface.
#[async_trait]
pub trait Facilitator: Send + Sync {
    /// Validate the authorization without moving funds.
    async fn verify(&self, request: &FacilitatorRequest) -> Result<Verification, FacilitatorError>;

    /// Execute the transfer. Must only be called after a positive
    /// verification; the orchestrator enforces the ordering.
    async fn settle(&self, request: &FacilitatorRequest) -> Result<Settlement, FacilitatorError>;
}

/// Facilitator client speaking JSON over HTTP.
#[derive(Debug, Clone)]
pub struct HttpFacilitator {
    base_url: Url,
    client: reqwest::Client,
    retry: RetryPolicy,
}

impl HttpFacilitator {
    pub fn new(base_url: Url, client: reqwest::Client, retry: RetryPolicy) -> Self {
        Self {
            base_url,
            client,
            retry,
        }
    }

    /// Client with a default `reqwest::Client` and retry policy. Callers
    /// that need per-call timeouts should build the client themselves.
    pub fn from_url(base_url: Url) -> Self {
        Self::new(base_url, reqwest::Client::new(), RetryPolicy::default())
    }

    async fn post<T>(&self, path: &str, body: &FacilitatorRequest) -> Result<T, FacilitatorError>
    where
        T: DeserializeOwned,
    {
        let url = self.base_url.join(path)?;

        let response = self
            .retry
            .execute(|| {
                let request = self.client.post(url.clone()).json(body);
                async move { request.send().await.map_err(classify_transport) }
            })
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(FacilitatorError::Status {
                status: status.as_u16(),
                detail,
            });
        }

        response.json::<T>().await.map_err(classify_transport)
    }
}

#[async_trait]
impl Facilitator for HttpFacilitator {
    async fn verify(&self, request: &FacilitatorRequest) -> Result<Verification, FacilitatorError> {
        let response: VerifyResponse = self.post("verify", request).await?;
        Ok(response.into())
    }

    async fn settle(&self, request: &FacilitatorRequest) -> Result<Settlement, FacilitatorError> {
        let response: SettleResponse = self.post("settle", request).await?;
        Ok(response.into())
    }
}
