//! Route-level tests: status codes, protocol headers, and body shapes.

mod common;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use presspay_server::http::{AppState, X_PAYMENT, router};
use presspay_settle::memory::MemoryLedger;

use common::{Harness, ScriptedFacilitator, harness, payload, payment_header, resource};

fn app(harness: Harness) -> (Router, Arc<MemoryLedger>, Arc<ScriptedFacilitator>) {
    let router = router(AppState {
        orchestrator: Arc::new(harness.orchestrator),
        request_deadline: Duration::from_secs(5),
    });
    (router, harness.ledger, harness.facilitator)
}

fn get_resource(id: u64, payment: Option<&str>) -> Request<Body> {
    let builder = Request::builder().uri(format!("/resources/{id}"));
    let builder = match payment {
        Some(header) => builder.header(X_PAYMENT, header),
        None => builder,
    };
    builder.body(Body::empty()).unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn unpaid_request_gets_402_with_challenge_headers() {
    let fixture = harness(ScriptedFacilitator::approving());
    fixture.ledger.publish(resource(7, 10_000));
    let (app, _, _) = app(fixture);

    let response = app.oneshot(get_resource(7, None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::PAYMENT_REQUIRED);
    assert_eq!(
        response.headers().get("X-Payment-Required").unwrap(),
        "true"
    );
    assert_eq!(response.headers().get("X-Payment-Amount").unwrap(), "10000");
    assert!(response.headers().contains_key("X-Payment-Recipient"));

    let body = body_json(response).await;
    assert_eq!(body["price"], "10000");
    assert_eq!(body["resourceId"], "7");
    assert_eq!(body["network"], "arbitrum");
    assert!(body["facilitator"].is_string());
    // The challenge must not leak the content pointer.
    assert!(body.get("pointer").is_none());
    assert!(body.get("content").is_none());
}

#[tokio::test]
async fn malformed_payment_header_gets_400() {
    let fixture = harness(ScriptedFacilitator::approving());
    fixture.ledger.publish(resource(7, 10_000));
    let (app, _, _) = app(fixture);

    let response = app
        .oneshot(get_resource(7, Some("not json")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Invalid payment payload");
}

#[tokio::test]
async fn paid_request_gets_200_with_content_and_payment_metadata() {
    let fixture = harness(ScriptedFacilitator::approving());
    fixture.ledger.publish(resource(7, 10_000));
    let (app, _, _) = app(fixture);
    let header = payment_header(&payload(7, 0x11));

    let response = app.oneshot(get_resource(7, Some(&header))).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("X-Payment-Verified").unwrap(),
        "true"
    );
    assert!(response.headers().contains_key("X-Transaction-Ref"));

    let body = body_json(response).await;
    assert_eq!(body["content"]["pointer"], "bafybeigdyrzt5example");
    assert_eq!(body["payment"]["transactionRef"], common::SETTLE_TX);
    assert_eq!(body["payment"]["paidAmount"], "10000");
    assert_eq!(body["metadata"]["unlocks"], 3);
}

#[tokio::test]
async fn replayed_unlock_gets_409() {
    let fixture = harness(ScriptedFacilitator::approving());
    fixture.ledger.publish(resource(7, 10_000));
    let (app, _, facilitator) = app(fixture);
    let header = payment_header(&payload(7, 0x11));

    let first = app
        .clone()
        .oneshot(get_resource(7, Some(&header)))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    let second = app.oneshot(get_resource(7, Some(&header))).await.unwrap();
    assert_eq!(second.status(), StatusCode::CONFLICT);
    let body = body_json(second).await;
    assert_eq!(body["error"], "Payment already processed");

    assert_eq!(facilitator.settle_calls(), 1);
}

#[tokio::test]
async fn verification_rejection_gets_402_with_details() {
    let fixture = harness(ScriptedFacilitator::rejecting_verify("bad signature"));
    fixture.ledger.publish(resource(7, 10_000));
    let (app, _, facilitator) = app(fixture);
    let header = payment_header(&payload(7, 0x11));

    let response = app.oneshot(get_resource(7, Some(&header))).await.unwrap();

    assert_eq!(response.status(), StatusCode::PAYMENT_REQUIRED);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Payment verification failed");
    assert_eq!(body["details"], "bad signature");
    assert_eq!(facilitator.settle_calls(), 0);
}

#[tokio::test]
async fn unknown_resource_gets_404() {
    let fixture = harness(ScriptedFacilitator::approving());
    let (app, _, _) = app(fixture);

    let response = app.oneshot(get_resource(404, None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn healthz_responds_ok() {
    let fixture = harness(ScriptedFacilitator::approving());
    let (app, _, _) = app(fixture);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/healthz")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}
