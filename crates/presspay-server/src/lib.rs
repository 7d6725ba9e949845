//! HTTP resource server gating ledger-recorded content behind a 402
//! payment challenge.
//!
//! An unpaid `GET /resources/{id}` receives a machine-readable challenge;
//! a request retried with payment evidence in the `X-PAYMENT` header is
//! validated, prechecked against the ledger's nullifier map, verified and
//! settled with the external facilitator, recorded back to the ledger, and
//! answered with the content pointer. The [`orchestrator`] module holds the
//! state machine; [`http`] maps its outcomes to responses.

pub mod config;
pub mod http;
pub mod orchestrator;
pub mod reconcile;
