use alloy_primitives::Address;
use bon::Builder;
use serde::{Deserialize, Serialize};

use crate::types::{Amount, ResourceId};

/// A gated content item as recorded on the ledger.
///
/// Owned and mutated exclusively by the ledger; the server only reads it.
#[derive(Builder, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    pub id: ResourceId,
    /// Unlock price in smallest units.
    #[builder(into)]
    pub price: Amount,
    /// Payee for unlock payments.
    pub creator: Address,
    /// Opaque pointer into external content storage.
    #[builder(into)]
    pub content_pointer: String,
    /// Publicly visible excerpt, served with challenges.
    #[builder(into)]
    pub preview: String,
    /// Monotonic count of successful unlocks.
    #[builder(default)]
    pub unlocks: u64,
    /// Unix timestamp of publication.
    #[builder(default)]
    pub created_at: u64,
}
