//! Operator-visible reporting for post-settlement recording failures.
//!
//! Once settlement has succeeded the payer has paid; a failed nullifier
//! recording must never fail the client request. It surfaces only here.

use presspay_core::types::{Nullifier, ResourceId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconciliationKind {
    /// The ledger write failed. The nullifier is not recorded yet, so the
    /// same token can reach settlement again until an operator reconciles.
    RecordingFailed,
    /// The ledger already holds the nullifier: a concurrent request settled
    /// the same token first and both payers paid.
    SettledTwice,
}

/// A settlement that completed without its ledger recording.
#[derive(Debug, Clone)]
pub struct ReconciliationEvent {
    pub kind: ReconciliationKind,
    pub resource_id: ResourceId,
    pub nullifier: Nullifier,
    /// Settlement transaction that already succeeded for this request.
    pub transaction: String,
    pub payer: String,
    pub detail: String,
}

pub trait ReconciliationSink: Send + Sync {
    fn report(&self, event: ReconciliationEvent);
}

/// Sink writing reconciliation events to the tracing pipeline.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl ReconciliationSink for LogSink {
    fn report(&self, event: ReconciliationEvent) {
        tracing::warn!(
            kind = ?event.kind,
            resource_id = %event.resource_id,
            nullifier = %event.nullifier,
            transaction = %event.transaction,
            payer = %event.payer,
            detail = %event.detail,
            "settlement succeeded but nullifier recording requires reconciliation"
        );
    }
}
