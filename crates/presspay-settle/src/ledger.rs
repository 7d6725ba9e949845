//! Read/write gateway to the distributed ledger.
//!
//! The ledger owns all durable state: resource metadata and the nullifier
//! usage map. Reads are idempotent and retried transparently; the single
//! write, [`LedgerGateway::mark_nullifier_used`], is attempted at most once
//! per unlock attempt because a retried write could double-consume a
//! nullifier whose first submission landed.

use alloy_primitives::{Address, B256, Bytes};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

use presspay_core::types::{Nullifier, PaymentPayload, Resource, ResourceId};

use crate::retry::{RetryPolicy, RetryableError};

/// Revert reason recorded when a nullifier is consumed twice.
pub const REVERT_NULLIFIER_USED: &str = "nullifier already used";

/// Errors from ledger calls.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("ledger unreachable: {0}")]
    Unreachable(String),

    #[error("ledger call timed out: {0}")]
    Timeout(String),

    #[error("ledger transaction reverted: {0}")]
    Reverted(String),
}

impl LedgerError {
    /// Whether this failure is the ledger refusing a second consumption of
    /// an already-used nullifier.
    pub fn is_nullifier_used(&self) -> bool {
        matches!(self, LedgerError::Reverted(reason) if reason.contains(REVERT_NULLIFIER_USED))
    }
}

impl RetryableError for LedgerError {
    fn is_retryable(&self) -> bool {
        matches!(self, LedgerError::Unreachable(_) | LedgerError::Timeout(_))
    }
}

/// Receipt for a confirmed ledger write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxReceipt {
    pub transaction: String,
    pub block_number: Option<u64>,
}

/// Parameters of the mark-nullifier-used ledger transaction: the resource,
/// the nullifier and proof, and the payer authorization tuple.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnlockRecord {
    pub resource_id: ResourceId,
    pub nullifier: Nullifier,
    pub proof: B256,
    pub from: Address,
    pub valid_after: u64,
    pub valid_before: u64,
    pub nonce: B256,
    pub signature: Bytes,
}

impl From<&PaymentPayload> for UnlockRecord {
    fn from(payload: &PaymentPayload) -> Self {
        UnlockRecord {
            resource_id: payload.resource_id,
            nullifier: payload.nullifier,
            proof: payload.proof,
            from: payload.from,
            valid_after: payload.valid_after,
            valid_before: payload.valid_before,
            nonce: payload.nonce,
            signature: payload.signature.clone(),
        }
    }
}

/// Distributed ledger interface.
#[async_trait]
pub trait LedgerGateway: Send + Sync {
    /// Read resource metadata. Returns `None` for unknown ids.
    async fn get_resource(&self, id: ResourceId) -> Result<Option<Resource>, LedgerError>;

    /// Read the nullifier usage flag.
    async fn is_nullifier_used(&self, nullifier: &Nullifier) -> Result<bool, LedgerError>;

    /// Record the nullifier as consumed. Attempted at most once per unlock
    /// attempt; implementations must not retry.
    async fn mark_nullifier_used(&self, record: &UnlockRecord) -> Result<TxReceipt, LedgerError>;
}

fn classify_transport(err: reqwest::Error) -> LedgerError {
    if err.is_timeout() {
        LedgerError::Timeout(err.to_string())
    } else {
        LedgerError::Unreachable(err.to_string())
    }
}

#[derive(Debug, Deserialize)]
struct NullifierStatus {
    used: bool,
}

#[derive(Debug, Deserialize)]
struct LedgerErrorBody {
    error: LedgerErrorDetail,
}

#[derive(Debug, Deserialize)]
struct LedgerErrorDetail {
    code: String,
    message: String,
}

/// Ledger gateway speaking JSON over HTTP to a ledger node that holds the
/// server's transaction-submission account.
#[derive(Debug, Clone)]
pub struct HttpLedgerGateway {
    base_url: Url,
    client: reqwest::Client,
    retry: RetryPolicy,
    /// Server-held key authorizing mark transactions at the ledger node.
    signer_key: String,
}

impl HttpLedgerGateway {
    pub fn new(
        base_url: Url,
        client: reqwest::Client,
        retry: RetryPolicy,
        signer_key: impl Into<String>,
    ) -> Self {
        Self {
            base_url,
            client,
            retry,
            signer_key: signer_key.into(),
        }
    }

    fn endpoint(&self, path: &str) -> Result<Url, LedgerError> {
        self.base_url
            .join(path)
            .map_err(|err| LedgerError::Unreachable(format!("invalid ledger endpoint: {err}")))
    }
}

#[async_trait]
impl LedgerGateway for HttpLedgerGateway {
    async fn get_resource(&self, id: ResourceId) -> Result<Option<Resource>, LedgerError> {
        let url = self.endpoint(&format!("resources/{id}"))?;

        self.retry
            .execute(|| {
                let request = self.client.get(url.clone());
                async move {
                    let response = request.send().await.map_err(classify_transport)?;
                    if response.status() == reqwest::StatusCode::NOT_FOUND {
                        return Ok(None);
                    }
                    let status = response.status();
                    if !status.is_success() {
                        return Err(LedgerError::Unreachable(format!(
                            "ledger returned status {status}"
                        )));
                    }
                    let resource = response
                        .json::<Resource>()
                        .await
                        .map_err(|err| LedgerError::Unreachable(err.to_string()))?;
                    Ok(Some(resource))
                }
            })
            .await
    }

    async fn is_nullifier_used(&self, nullifier: &Nullifier) -> Result<bool, LedgerError> {
        let url = self.endpoint(&format!("nullifiers/{nullifier}"))?;

        self.retry
            .execute(|| {
                let request = self.client.get(url.clone());
                async move {
                    let response = request.send().await.map_err(classify_transport)?;
                    let status = response.status();
                    if !status.is_success() {
                        return Err(LedgerError::Unreachable(format!(
                            "ledger returned status {status}"
                        )));
                    }
                    let flag = response
                        .json::<NullifierStatus>()
                        .await
                        .map_err(|err| LedgerError::Unreachable(err.to_string()))?;
                    Ok(flag.used)
                }
            })
            .await
    }

    async fn mark_nullifier_used(&self, record: &UnlockRecord) -> Result<TxReceipt, LedgerError> {
        let url = self.endpoint("unlocks")?;

        // Single attempt, no retry wrapper: the submission may have landed
        // even when the response is lost.
        let response = self
            .client
            .post(url)
            .bearer_auth(&self.signer_key)
            .json(record)
            .send()
            .await
            .map_err(classify_transport)?;

        let status = response.status();
        if status.is_success() {
            return response
                .json::<TxReceipt>()
                .await
                .map_err(|err| LedgerError::Unreachable(err.to_string()));
        }

        let text = response.text().await.unwrap_or_default();
        if let Ok(body) = serde_json::from_str::<LedgerErrorBody>(&text) {
            if body.error.code == "nullifierUsed" {
                return Err(LedgerError::Reverted(REVERT_NULLIFIER_USED.to_string()));
            }
            if status.is_client_error() {
                return Err(LedgerError::Reverted(body.error.message));
            }
        }

        if status.is_client_error() {
            Err(LedgerError::Reverted(format!(
                "ledger returned status {status}: {text}"
            )))
        } else {
            Err(LedgerError::Unreachable(format!(
                "ledger returned status {status}: {text}"
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nullifier_used_revert_is_classified() {
        let err = LedgerError::Reverted(REVERT_NULLIFIER_USED.to_string());
        assert!(err.is_nullifier_used());
        assert!(!err.is_retryable());

        let other = LedgerError::Reverted("insufficient gas".to_string());
        assert!(!other.is_nullifier_used());
    }

    #[test]
    fn transport_errors_are_retryable() {
        assert!(LedgerError::Unreachable("refused".into()).is_retryable());
        assert!(LedgerError::Timeout("deadline".into()).is_retryable());
        assert!(!LedgerError::Reverted("nope".into()).is_retryable());
    }
}
