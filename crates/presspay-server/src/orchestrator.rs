//! The unlock state machine.
//!
//! One inbound request drives at most one pass through
//! challenge → validate → precheck → verify → settle → record → release,
//! with typed failure exits from every step before release. All durable
//! state lives on the ledger; the orchestrator keeps only per-request
//! locals.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use alloy_primitives::Address;
use bon::Builder;
use tracing::debug;
use url::Url;

use presspay_core::challenge::{ChallengeContext, build_challenge, parse_payload};
use presspay_core::errors::ValidationError;
use presspay_core::types::{
    ChallengeResponse, ContentBody, MetadataBody, PaymentBody, PaymentPayload, Resource,
    ResourceId, UnlockResponse,
};
use presspay_settle::facilitator::{
    Facilitator, FacilitatorError, FacilitatorRequest, SettledPayment, Settlement, Verification,
};
use presspay_settle::ledger::{LedgerError, LedgerGateway, UnlockRecord};

use crate::reconcile::{LogSink, ReconciliationEvent, ReconciliationKind, ReconciliationSink};

/// Failure exits of the unlock state machine.
#[derive(Debug, thiserror::Error)]
pub enum UnlockError {
    #[error("resource {0} not found")]
    ResourceNotFound(ResourceId),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The nullifier is already consumed on the ledger.
    #[error("nullifier already used; content may already be unlocked")]
    AlreadyUnlocked,

    /// The facilitator rejected the authorization.
    #[error("payment verification failed: {reason}")]
    VerificationFailed { reason: String },

    /// The facilitator could not execute the transfer.
    #[error("payment settlement failed: {reason}")]
    SettlementFailed { reason: String },

    /// Ledger transport failure, after retries.
    #[error("ledger unavailable: {0}")]
    Ledger(LedgerError),

    /// Facilitator transport failure, after retries.
    #[error("facilitator unavailable: {0}")]
    Facilitator(FacilitatorError),
}

/// Terminal non-failure outcomes of an unlock attempt.
#[derive(Debug, Clone)]
pub enum UnlockOutcome {
    /// No payment was attached: the 402 challenge.
    Challenge(ChallengeResponse),
    /// Payment verified and settled, content released.
    Released(UnlockResponse),
}

#[derive(Builder)]
pub struct UnlockOrchestrator {
    ledger: Arc<dyn LedgerGateway>,
    facilitator: Arc<dyn Facilitator>,
    #[builder(default = Arc::new(LogSink) as Arc<dyn ReconciliationSink>)]
    sink: Arc<dyn ReconciliationSink>,
    /// Network payments settle on.
    #[builder(into)]
    network: String,
    /// Asset prices are denominated in.
    asset: Address,
    /// Facilitator endpoint advertised in challenges.
    facilitator_url: Url,
}

impl UnlockOrchestrator {
    fn challenge_context(&self) -> ChallengeContext {
        ChallengeContext::builder()
            .network(self.network.clone())
            .asset(self.asset)
            .facilitator(self.facilitator_url.clone())
            .build()
    }

    /// Drive one unlock attempt end to end.
    pub async fn unlock(
        &self,
        id: ResourceId,
        payment: Option<&str>,
    ) -> Result<UnlockOutcome, UnlockError> {
        let resource = self
            .ledger
            .get_resource(id)
            .await
            .map_err(UnlockError::Ledger)?
            .ok_or(UnlockError::ResourceNotFound(id))?;

        let Some(raw) = payment else {
            debug!(resource = %id, price = %resource.price, "no payment attached, issuing challenge");
            return Ok(UnlockOutcome::Challenge(build_challenge(
                &resource,
                &self.challenge_context(),
            )));
        };

        let payload = parse_payload(raw, id, unix_now())?;

        // Precheck runs before any facilitator call so an already-unlocked
        // payer is never re-charged. The ledger write below remains the
        // actual linearization point for concurrent attempts.
        if self
            .ledger
            .is_nullifier_used(&payload.nullifier)
            .await
            .map_err(UnlockError::Ledger)?
        {
            return Err(UnlockError::AlreadyUnlocked);
        }

        // One canonical request serves both verify and settle.
        let request =
            FacilitatorRequest::for_unlock(&payload, &resource, &self.network, self.asset);

        let verified = match self.facilitator.verify(&request).await {
            Ok(Verification::Valid(valid)) => valid,
            Ok(Verification::Invalid { reason, .. }) => {
                return Err(UnlockError::VerificationFailed { reason });
            }
            Err(FacilitatorError::Status { detail, .. }) => {
                return Err(UnlockError::VerificationFailed { reason: detail });
            }
            Err(err) => return Err(UnlockError::Facilitator(err)),
        };
        debug!(payer = %verified.payer, "payment verified");

        // Once settle has been issued this attempt is never re-driven. A
        // client that loses the response re-enters at the challenge with the
        // same nullifier, and the precheck stops it once recording lands.
        let settled = match self.facilitator.settle(&request).await {
            Ok(Settlement::Success(settled)) => settled,
            Ok(Settlement::Failed { reason, .. }) => {
                return Err(UnlockError::SettlementFailed { reason });
            }
            Err(FacilitatorError::Status { detail, .. }) => {
                return Err(UnlockError::SettlementFailed { reason: detail });
            }
            Err(err) => return Err(UnlockError::Facilitator(err)),
        };
        debug!(
            payer = %settled.payer,
            transaction = %settled.transaction,
            "payment settled"
        );

        // Recording is best-effort: the payer has already paid, so failures
        // go to the reconciliation sink, never to the client.
        self.record(&resource, &payload, &settled).await;

        Ok(UnlockOutcome::Released(released(resource, &payload, settled)))
    }

    async fn record(
        &self,
        resource: &Resource,
        payload: &PaymentPayload,
        settled: &SettledPayment,
    ) {
        match self
            .ledger
            .mark_nullifier_used(&UnlockRecord::from(payload))
            .await
        {
            Ok(receipt) => debug!(transaction = %receipt.transaction, "nullifier recorded"),
            Err(err) => {
                let kind = if err.is_nullifier_used() {
                    ReconciliationKind::SettledTwice
                } else {
                    ReconciliationKind::RecordingFailed
                };
                self.sink.report(ReconciliationEvent {
                    kind,
                    resource_id: resource.id,
                    nullifier: payload.nullifier,
                    transaction: settled.transaction.clone(),
                    payer: settled.payer.clone(),
                    detail: err.to_string(),
                });
            }
        }
    }
}

fn released(
    resource: Resource,
    payload: &PaymentPayload,
    settled: SettledPayment,
) -> UnlockResponse {
    UnlockResponse {
        content: ContentBody {
            pointer: resource.content_pointer,
            preview: resource.preview,
        },
        metadata: MetadataBody {
            creator: resource.creator,
            unlocks: resource.unlocks,
            timestamp: resource.created_at,
        },
        payment: PaymentBody {
            transaction_ref: settled.transaction,
            nullifier: payload.nullifier,
            paid_amount: resource.price,
            network: settled.network,
            payer: settled.payer,
        },
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or_default()
}
