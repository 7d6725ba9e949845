mod amount;
mod ids;
mod payload;
mod resource;
mod response;

pub use amount::Amount;
pub use ids::{Nullifier, ResourceId};
pub use payload::{PaymentPayload, REQUIRED_FIELDS, SIGNATURE_LEN};
pub use resource::Resource;
pub use response::{ChallengeResponse, ContentBody, MetadataBody, PaymentBody, UnlockResponse};
