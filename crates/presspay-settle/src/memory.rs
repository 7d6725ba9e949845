//! In-process ledger for tests and local development.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use presspay_core::types::{Nullifier, Resource, ResourceId};

use crate::ledger::{LedgerError, LedgerGateway, REVERT_NULLIFIER_USED, TxReceipt, UnlockRecord};

#[derive(Debug, Default)]
struct State {
    resources: HashMap<ResourceId, Resource>,
    used: HashSet<Nullifier>,
    height: u64,
}

/// Ledger backed by process memory.
///
/// Mirrors the on-ledger semantics the gateway relies on: the nullifier map
/// is consume-once and the write is atomic. Failure injection is provided
/// so orchestration tests can exercise the post-settlement recording paths.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    state: Mutex<State>,
    mark_calls: AtomicU32,
    mark_failure: Mutex<Option<LedgerError>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a resource.
    pub fn publish(&self, resource: Resource) {
        self.state().resources.insert(resource.id, resource);
    }

    /// Seed a nullifier as already consumed.
    pub fn mark_used(&self, nullifier: Nullifier) {
        self.state().used.insert(nullifier);
    }

    /// Make subsequent `mark_nullifier_used` calls fail with `error`
    /// (pass `None` to restore normal behavior).
    pub fn set_mark_failure(&self, error: Option<LedgerError>) {
        *self
            .mark_failure
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = error;
    }

    /// Number of `mark_nullifier_used` calls observed.
    pub fn mark_calls(&self) -> u32 {
        self.mark_calls.load(Ordering::SeqCst)
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl LedgerGateway for MemoryLedger {
    async fn get_resource(&self, id: ResourceId) -> Result<Option<Resource>, LedgerError> {
        Ok(self.state().resources.get(&id).cloned())
    }

    async fn is_nullifier_used(&self, nullifier: &Nullifier) -> Result<bool, LedgerError> {
        Ok(self.state().used.contains(nullifier))
    }

    async fn mark_nullifier_used(&self, record: &UnlockRecord) -> Result<TxReceipt, LedgerError> {
        self.mark_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(err) = self
            .mark_failure
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
        {
            return Err(err);
        }

        let mut state = self.state();
        if !state.used.insert(record.nullifier) {
            return Err(LedgerError::Reverted(REVERT_NULLIFIER_USED.to_string()));
        }
        if let Some(resource) = state.resources.get_mut(&record.resource_id) {
            resource.unlocks += 1;
        }
        state.height += 1;
        Ok(TxReceipt {
            transaction: format!("0x{:064x}", state.height),
            block_number: Some(state.height),
        })
    }
}
