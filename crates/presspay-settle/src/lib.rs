//! Remote collaborators of the presspay unlock protocol.
//!
//! The unlock flow composes two independently failing remote systems, both
//! modeled here behind object-safe traits:
//!
//! - [`Facilitator`]: verifies a signed transfer authorization and executes
//!   the on-chain transfer on the payer's behalf (two-phase verify/settle).
//! - [`LedgerGateway`]: reads resource metadata and the nullifier usage
//!   flag, and records consumed nullifiers after settlement.
//!
//! ```text
//! presspay-server              presspay-settle
//! ┌───────────────────┐       ┌──────────────────────────┐
//! │ UnlockOrchestrator│ ────► │ Facilitator (trait)      │
//! │                   │       │   └─ HttpFacilitator     │
//! │                   │ ────► │ LedgerGateway (trait)    │
//! │                   │       │   ├─ HttpLedgerGateway   │
//! │                   │       │   └─ MemoryLedger        │
//! └───────────────────┘       └──────────────────────────┘
//! ```
//!
//! Transport-level failures (connection refused, timeouts) are retried with
//! bounded exponential backoff via [`RetryPolicy`]; definitive negative
//! responses are protocol-level rejections and are never retried. The
//! ledger write is attempted at most once per unlock attempt.

pub mod facilitator;
pub mod ledger;
pub mod memory;
pub mod retry;

pub use facilitator::{
    Facilitator, FacilitatorError, FacilitatorRequest, HttpFacilitator, SettledPayment,
    Settlement, Verification, VerifiedPayment,
};
pub use ledger::{
    HttpLedgerGateway, LedgerError, LedgerGateway, REVERT_NULLIFIER_USED, TxReceipt, UnlockRecord,
};
pub use memory::MemoryLedger;
pub use retry::{RetryConfig, RetryPolicy, RetryableError};
