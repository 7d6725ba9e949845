use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::types::{Amount, Nullifier, ResourceId};

/// Body of a 402 response: everything a client needs to construct payment.
///
/// Regenerated on every unpaid request; carries no server state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeResponse {
    pub price: Amount,
    pub pay_to: Address,
    pub asset: Address,
    pub network: String,
    pub resource_id: ResourceId,
    pub preview: String,
    pub facilitator: Url,
}

/// Body of a 200 response releasing the content pointer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnlockResponse {
    pub content: ContentBody,
    pub metadata: MetadataBody,
    pub payment: PaymentBody,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentBody {
    /// Pointer into external content storage.
    pub pointer: String,
    pub preview: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataBody {
    pub creator: Address,
    pub unlocks: u64,
    pub timestamp: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentBody {
    /// Settlement transaction reference returned by the facilitator.
    pub transaction_ref: String,
    pub nullifier: Nullifier,
    pub paid_amount: Amount,
    pub network: String,
    /// Payer recovered from the authorization signature by the facilitator.
    pub payer: String,
}
