//! Builds 402 payment challenges and validates client payment payloads.

use alloy_primitives::Address;
use bon::Builder;
use url::Url;

use crate::errors::ValidationError;
use crate::types::{
    ChallengeResponse, PaymentPayload, REQUIRED_FIELDS, Resource, ResourceId, SIGNATURE_LEN,
};

/// Server-side parameters folded into every challenge.
#[derive(Builder, Debug, Clone)]
pub struct ChallengeContext {
    /// Network the payment must settle on.
    #[builder(into)]
    pub network: String,
    /// Asset the price is denominated in.
    pub asset: Address,
    /// Facilitator endpoint the client should route payment through.
    pub facilitator: Url,
}

/// Build the 402 challenge for `resource`.
///
/// Pure function of the resource metadata and server context; always
/// succeeds given valid metadata.
pub fn build_challenge(resource: &Resource, ctx: &ChallengeContext) -> ChallengeResponse {
    ChallengeResponse {
        price: resource.price,
        pay_to: resource.creator,
        asset: ctx.asset,
        network: ctx.network.clone(),
        resource_id: resource.id,
        preview: resource.preview.clone(),
        facilitator: ctx.facilitator.clone(),
    }
}

/// Parse and validate a raw `X-PAYMENT` header value.
///
/// Checks, in order: well-formedness, presence of every required field,
/// typed decode (unknown fields rejected), resource id match against the
/// request path, signature length, and the authorization validity window
/// (`valid_after` inclusive, `valid_before` exclusive).
pub fn parse_payload(
    raw: &str,
    expected: ResourceId,
    now: u64,
) -> Result<PaymentPayload, ValidationError> {
    let value: serde_json::Value =
        serde_json::from_str(raw).map_err(|err| ValidationError::MalformedPayload(err.to_string()))?;

    let fields = value.as_object().ok_or_else(|| {
        ValidationError::MalformedPayload("payload must be a JSON object".to_string())
    })?;

    for name in REQUIRED_FIELDS {
        if !fields.contains_key(name) {
            return Err(ValidationError::MissingField(name));
        }
    }

    let payload: PaymentPayload = serde_json::from_value(value)
        .map_err(|err| ValidationError::MalformedPayload(err.to_string()))?;

    if payload.resource_id != expected {
        return Err(ValidationError::ResourceMismatch {
            expected,
            got: payload.resource_id,
        });
    }

    if payload.signature.len() != SIGNATURE_LEN {
        return Err(ValidationError::MalformedPayload(format!(
            "signature must be {SIGNATURE_LEN} bytes, got {}",
            payload.signature.len()
        )));
    }

    if !payload.window_open(now) {
        return Err(ValidationError::ExpiredAuthorization {
            valid_after: payload.valid_after,
            valid_before: payload.valid_before,
            now,
        });
    }

    Ok(payload)
}

#[cfg(test)]
mod tests {
    use alloy_primitives::B256;
    use serde_json::json;

    use super::*;
    use crate::types::{Amount, Nullifier};

    const NOW: u64 = 1_700_000_000;

    fn resource() -> Resource {
        Resource::builder()
            .id(ResourceId(7))
            .price(10_000u64)
            .creator(Address::repeat_byte(0x33))
            .content_pointer("bafybeigdyrzt5example")
            .preview("The first two hundred words…")
            .unlocks(3)
            .created_at(NOW - 86_400)
            .build()
    }

    fn context() -> ChallengeContext {
        ChallengeContext::builder()
            .network("arbitrum")
            .asset(Address::repeat_byte(0x55))
            .facilitator(Url::parse("https://facilitator.example.com/").unwrap())
            .build()
    }

    fn payload_json() -> serde_json::Value {
        json!({
            "resourceId": 7,
            "nullifier": Nullifier(B256::repeat_byte(0x11)).to_string(),
            "proof": B256::repeat_byte(0x22).to_string(),
            "from": Address::repeat_byte(0x33).to_string(),
            "validAfter": 0,
            "validBefore": NOW + 3_600,
            "nonce": B256::repeat_byte(0x44).to_string(),
            "signature": format!("0x{}", "ab".repeat(SIGNATURE_LEN)),
        })
    }

    fn parse(value: &serde_json::Value) -> Result<PaymentPayload, ValidationError> {
        parse_payload(&value.to_string(), ResourceId(7), NOW)
    }

    #[test]
    fn challenge_copies_resource_and_context() {
        let challenge = build_challenge(&resource(), &context());
        assert_eq!(challenge.price, Amount(10_000));
        assert_eq!(challenge.pay_to, Address::repeat_byte(0x33));
        assert_eq!(challenge.asset, Address::repeat_byte(0x55));
        assert_eq!(challenge.network, "arbitrum");
        assert_eq!(challenge.resource_id, ResourceId(7));
        assert_eq!(challenge.preview, "The first two hundred words…");
    }

    #[test]
    fn challenge_carries_no_content_pointer() {
        let challenge = build_challenge(&resource(), &context());
        let body = serde_json::to_string(&challenge).unwrap();
        assert!(!body.contains("pointer"));
        assert!(!body.contains("bafybeigdyrzt5example"));
    }

    #[test]
    fn parses_valid_payload() {
        let payload = parse(&payload_json()).unwrap();
        assert_eq!(payload.resource_id, ResourceId(7));
        assert_eq!(payload.nullifier, Nullifier(B256::repeat_byte(0x11)));
        assert_eq!(payload.from, Address::repeat_byte(0x33));
    }

    #[test]
    fn accepts_resource_id_as_string() {
        let mut value = payload_json();
        value["resourceId"] = json!("7");
        assert!(parse(&value).is_ok());
    }

    #[test]
    fn rejects_non_json_input() {
        let err = parse_payload("not json", ResourceId(7), NOW).unwrap_err();
        assert!(matches!(err, ValidationError::MalformedPayload(_)));
    }

    #[test]
    fn rejects_non_object_payload() {
        let err = parse_payload("[1, 2, 3]", ResourceId(7), NOW).unwrap_err();
        assert!(matches!(err, ValidationError::MalformedPayload(_)));
    }

    #[test]
    fn reports_each_missing_field_by_name() {
        for name in REQUIRED_FIELDS {
            let mut value = payload_json();
            value.as_object_mut().unwrap().remove(name);
            assert_eq!(
                parse(&value).unwrap_err(),
                ValidationError::MissingField(name),
            );
        }
    }

    #[test]
    fn rejects_unknown_fields() {
        let mut value = payload_json();
        value["extra"] = json!("surprise");
        assert!(matches!(
            parse(&value).unwrap_err(),
            ValidationError::MalformedPayload(_)
        ));
    }

    #[test]
    fn rejects_resource_mismatch() {
        let mut value = payload_json();
        value["resourceId"] = json!(8);
        assert_eq!(
            parse(&value).unwrap_err(),
            ValidationError::ResourceMismatch {
                expected: ResourceId(7),
                got: ResourceId(8),
            },
        );
    }

    #[test]
    fn rejects_short_signature() {
        let mut value = payload_json();
        value["signature"] = json!(format!("0x{}", "ab".repeat(SIGNATURE_LEN - 1)));
        assert!(matches!(
            parse(&value).unwrap_err(),
            ValidationError::MalformedPayload(_)
        ));
    }

    #[test]
    fn valid_before_is_exclusive() {
        let mut value = payload_json();
        value["validBefore"] = json!(NOW);
        assert!(matches!(
            parse(&value).unwrap_err(),
            ValidationError::ExpiredAuthorization { .. }
        ));

        value["validBefore"] = json!(NOW + 1);
        assert!(parse(&value).is_ok());
    }

    #[test]
    fn valid_after_is_inclusive() {
        let mut value = payload_json();
        value["validAfter"] = json!(NOW + 1);
        assert!(matches!(
            parse(&value).unwrap_err(),
            ValidationError::ExpiredAuthorization { .. }
        ));

        value["validAfter"] = json!(NOW);
        assert!(parse(&value).is_ok());
    }
}
