use std::sync::Arc;

use presspay_server::config::ServerConfig;
use presspay_server::http::{AppState, router};
use presspay_server::orchestrator::UnlockOrchestrator;
use presspay_settle::{HttpFacilitator, HttpLedgerGateway, RetryPolicy};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let config = ServerConfig::from_env().expect("invalid server configuration");
    let retry = RetryPolicy::from_config(&config.retry);

    let facilitator_client = reqwest::Client::builder()
        .timeout(config.facilitator_timeout)
        .build()
        .expect("failed to build facilitator HTTP client");
    let facilitator = HttpFacilitator::new(
        config.facilitator_url.clone(),
        facilitator_client,
        retry.clone(),
    );

    let ledger_client = reqwest::Client::builder()
        .timeout(config.ledger_timeout)
        .build()
        .expect("failed to build ledger HTTP client");
    let ledger = HttpLedgerGateway::new(
        config.ledger_url.clone(),
        ledger_client,
        retry,
        config.signer_key.clone(),
    );

    let orchestrator = UnlockOrchestrator::builder()
        .ledger(Arc::new(ledger))
        .facilitator(Arc::new(facilitator))
        .network(config.network.clone())
        .asset(config.asset)
        .facilitator_url(config.facilitator_url.clone())
        .build();

    let app = router(AppState {
        orchestrator: Arc::new(orchestrator),
        request_deadline: config.request_deadline,
    });

    tracing::info!(
        bind = %config.bind,
        facilitator = %config.facilitator_url,
        ledger = %config.ledger_url,
        network = %config.network,
        "starting presspay server"
    );
    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .expect("failed to bind listener");
    axum::serve(listener, app).await.expect("server failed");
}
