//! Serve the unlock flow end to end against an in-memory ledger and an
//! always-approving facilitator stub.
//!
//! ```sh
//! cargo run -p presspay-server --example memory_server
//! curl -i http://127.0.0.1:3000/resources/1
//! ```

use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::Address;
use async_trait::async_trait;
use url::Url;

use presspay_core::types::{Resource, ResourceId};
use presspay_server::http::{AppState, router};
use presspay_server::orchestrator::UnlockOrchestrator;
use presspay_settle::facilitator::{
    Facilitator, FacilitatorError, FacilitatorRequest, SettledPayment, Settlement,
    VerifiedPayment, Verification,
};
use presspay_settle::memory::MemoryLedger;

struct ApprovingFacilitator;

#[async_trait]
impl Facilitator for ApprovingFacilitator {
    async fn verify(&self, request: &FacilitatorRequest) -> Result<Verification, FacilitatorError> {
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
        Ok(Settlement::Success(SettledPayment {
            payer: request
                .payment_payload
                .payload
                .authorization
                .from
                .to_string(),
            transaction: "0x0000000000000000000000000000000000000000000000000000000000000001"
                .to_string(),
            network: request.payment_payload.network.clone(),
        }))
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let ledger = Arc::new(MemoryLedger::new());
    ledger.publish(
        Resource::builder()
            .id(ResourceId(1))
            .price(10_000u64)
            .creator(Address::repeat_byte(0x66))
            .content_pointer("bafybeigdyrzt5example")
            .preview("A paid article about payment protocols.")
            .build(),
    );

    let orchestrator = UnlockOrchestrator::builder()
        .ledger(ledger)
        .facilitator(Arc::new(ApprovingFacilitator))
        .network("arbitrum")
        .asset(Address::repeat_byte(0x55))
        .facilitator_url(Url::parse("http://127.0.0.1:4020/").unwrap())
        .build();

    let app = router(AppState {
        orchestrator: Arc::new(orchestrator),
        request_deadline: Duration::from_secs(30),
    });

    let listener = tokio::net::TcpListener::bind("127.0.0.1:3000")
        .await
        .unwrap();
    tracing::info!("memory-backed presspay server on http://127.0.0.1:3000");
    axum::serve(listener, app).await.unwrap();
}
