//! Shared fixtures: a scriptable facilitator, a collecting reconciliation
//! sink, and orchestrator harness construction.

#![allow(dead_code)]

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use alloy_primitives::{Address, B256, Bytes};
use async_trait::async_trait;
use url::Url;

use presspay_core::types::{Nullifier, PaymentPayload, Resource, ResourceId};
use presspay_server::orchestrator::UnlockOrchestrator;
use presspay_server::reconcile::{ReconciliationEvent, ReconciliationSink};
use presspay_settle::facilitator::{
    Facilitator, FacilitatorError, FacilitatorRequest, SettledPayment, Settlement,
    VerifiedPayment, Verification,
};
use presspay_settle::memory::MemoryLedger;

pub const SETTLE_TX: &str = "0xsettled00000000000000000000000000000000000000000000000000000001";

/// Facilitator double with scriptable outcomes and call counters.
#[derive(Default)]
pub struct ScriptedFacilitator {
    pub verify_calls: AtomicU32,
    pub settle_calls: AtomicU32,
    reject_verify: Mutex<Option<String>>,
    fail_settle: Mutex<Option<String>>,
    unreachable: Mutex<bool>,
}

impl ScriptedFacilitator {
    pub fn approving() -> Self {
        Self::default()
    }

    pub fn rejecting_verify(reason: &str) -> Self {
        let facilitator = Self::default();
        *facilitator.reject_verify.lock().unwrap() = Some(reason.to_string());
        facilitator
    }

    pub fn failing_settle(reason: &str) -> Self {
        let facilitator = Self::default();
        *facilitator.fail_settle.lock().unwrap() = Some(reason.to_string());
        facilitator
    }

    pub fn unreachable() -> Self {
        let facilitator = Self::default();
        *facilitator.unreachable.lock().unwrap() = true;
        facilitator
    }

    pub fn verify_calls(&self) -> u32 {
        self.verify_calls.load(Ordering::SeqCst)
    }

    pub fn settle_calls(&self) -> u32 {
        self.settle_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Facilitator for ScriptedFacilitator {
    async fn verify(&self, request: &FacilitatorRequest) -> Result<Verification, FacilitatorError> {
        self.verify_calls.fetch_add(1, Ordering::SeqCst);
        if *self.unreachable.lock().unwrap() {
            return Err(FacilitatorError::Unreachable("injected outage".to_string()));
        }
        if let Some(reason) = self.reject_verify.lock().unwrap().clone() {
            return Ok(Verification::Invalid {
                reason,
                payer: None,
            });
        }
        Ok(Verification::Valid(VerifiedPayment {
            payer: request
                .payment_payload
                .payload
                .authorization
                .from
                .to_string(),
        }))
    }

    async fn settle(&self, request: &FacilitatorRequest) -> Result<Settlement, FacilitatorError> {
        self.settle_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(reason) = self.fail_settle.lock().unwrap().clone() {
            return Ok(Settlement::Failed {
                reason,
                payer: None,
            });
        }
        Ok(Settlement::Success(SettledPayment {
            payer: request
                .payment_payload
                .payload
                .authorization
                .from
                .to_string(),
            transaction: SETTLE_TX.to_string(),
            network: request.payment_payload.network.clone(),
        }))
    }
}

/// Sink collecting reconciliation events for assertions.
#[derive(Default)]
pub struct CollectingSink {
    events: Mutex<Vec<ReconciliationEvent>>,
}

impl CollectingSink {
    pub fn events(&self) -> Vec<ReconciliationEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl ReconciliationSink for CollectingSink {
    fn report(&self, event: ReconciliationEvent) {
        self.events.lock().unwrap().push(event);
    }
}

pub struct Harness {
    pub ledger: Arc<MemoryLedger>,
    pub facilitator: Arc<ScriptedFacilitator>,
    pub sink: Arc<CollectingSink>,
    pub orchestrator: UnlockOrchestrator,
}

pub fn harness(facilitator: ScriptedFacilitator) -> Harness {
    let ledger = Arc::new(MemoryLedger::new());
    let facilitator = Arc::new(facilitator);
    let sink = Arc::new(CollectingSink::default());

    let orchestrator = UnlockOrchestrator::builder()
        .ledger(Arc::clone(&ledger) as Arc<dyn presspay_settle::LedgerGateway>)
        .facilitator(Arc::clone(&facilitator) as Arc<dyn Facilitator>)
        .sink(Arc::clone(&sink) as Arc<dyn ReconciliationSink>)
        .network("arbitrum")
        .asset(Address::repeat_byte(0x55))
        .facilitator_url(Url::parse("https://facilitator.example.com/").unwrap())
        .build();

    Harness {
        ledger,
        facilitator,
        sink,
        orchestrator,
    }
}

pub fn resource(id: u64, price: u64) -> Resource {
    Resource::builder()
        .id(ResourceId(id))
        .price(price)
        .creator(Address::repeat_byte(0x66))
        .content_pointer("bafybeigdyrzt5example")
        .preview("The first two hundred words…")
        .unlocks(3)
        .created_at(1_700_000_000)
        .build()
}

pub fn payload(id: u64, nullifier_byte: u8) -> PaymentPayload {
    PaymentPayload {
        resource_id: ResourceId(id),
        nullifier: Nullifier(B256::repeat_byte(nullifier_byte)),
        proof: B256::repeat_byte(0x22),
        from: Address::repeat_byte(0x33),
        valid_after: 0,
        valid_before: u64::MAX,
        nonce: B256::repeat_byte(0x44),
        signature: Bytes::from(vec![0xab; 65]),
    }
}

pub fn payment_header(payload: &PaymentPayload) -> String {
    serde_json::to_string(payload).unwrap()
}
