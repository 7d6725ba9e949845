use alloy_primitives::{Address, B256, Bytes};
use serde::{Deserialize, Serialize};

use crate::types::{Nullifier, ResourceId};

/// Fields a payment payload must carry, in wire order.
pub const REQUIRED_FIELDS: [&str; 8] = [
    "resourceId",
    "nullifier",
    "proof",
    "from",
    "validAfter",
    "validBefore",
    "nonce",
    "signature",
];

/// Length of the detached authorization signature in bytes.
pub const SIGNATURE_LEN: usize = 65;

/// Payment evidence attached to a retried request via the `X-PAYMENT` header.
///
/// Unknown fields are rejected at the boundary; see
/// [`parse_payload`](crate::challenge::parse_payload) for the validating
/// entry point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PaymentPayload {
    pub resource_id: ResourceId,
    pub nullifier: Nullifier,
    /// Opaque unlock proof, forwarded to the ledger unverified.
    pub proof: B256,
    /// Payer account that signed the authorization.
    pub from: Address,
    /// Start of the authorization validity window (unix seconds, inclusive).
    pub valid_after: u64,
    /// End of the authorization validity window (unix seconds, exclusive).
    pub valid_before: u64,
    /// Single-use authorization nonce, consumed at the facilitator.
    pub nonce: B256,
    /// Detached 65-byte signature over the canonical authorization message
    /// (payer, payee, amount, validity window, nonce).
    pub signature: Bytes,
}

impl PaymentPayload {
    /// Whether the authorization validity window is open at `now`.
    ///
    /// `valid_after` is inclusive, `valid_before` exclusive.
    pub fn window_open(&self, now: u64) -> bool {
        self.valid_after <= now && now < self.valid_before
    }
}
