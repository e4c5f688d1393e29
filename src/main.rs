use std::sync::Arc;

use anyhow::{Error, Result};
use notification_gateway::{
    api::{GatewayState, gateway_router, serve},
    clients::{broker::ConnectionManager, rbmq::RabbitMqConnector},
    config::GatewayConfig,
    dispatch::Dispatcher,
    utils::{init_tracing, shutdown_signal},
};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Error> {
    init_tracing();

    let config = GatewayConfig::load()?;

    let broker = ConnectionManager::new(
        Arc::new(RabbitMqConnector::new(config.rabbitmq_url.clone())),
        config.reconnect_policy(),
    );
    let broker_shutdown = CancellationToken::new();
    let supervisor = broker.spawn(broker_shutdown.clone());

    let state = Arc::new(GatewayState {
        dispatcher: Dispatcher::new(Arc::clone(&broker)),
    });

    let listener = TcpListener::bind(("0.0.0.0", config.port)).await?;
    info!(port = config.port, "API Gateway listening");

    serve(listener, gateway_router(state), shutdown_signal()).await?;

    broker_shutdown.cancel();
    supervisor.await?;

    info!("API Gateway stopped");

    Ok(())
}
