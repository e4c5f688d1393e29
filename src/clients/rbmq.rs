use std::sync::Arc;

use async_trait::async_trait;
use lapin::{
    BasicProperties, Channel, Connection, ConnectionProperties, ExchangeKind,
    options::{BasicPublishOptions, ExchangeDeclareOptions},
    types::FieldTable,
};
use tracing::{debug, error, info, warn};

use crate::{
    clients::broker::{BrokerConnector, BrokerSession, EXCHANGE_NAME, LossNotifier},
    models::error::BrokerError,
};

const PERSISTENT: u8 = 2;

pub struct RabbitMqConnector {
    rabbitmq_url: String,
}

impl RabbitMqConnector {
    pub fn new(rabbitmq_url: impl Into<String>) -> Self {
        Self {
            rabbitmq_url: rabbitmq_url.into(),
        }
    }
}

#[async_trait]
impl BrokerConnector for RabbitMqConnector {
    async fn connect(&self, on_lost: LossNotifier) -> Result<Arc<dyn BrokerSession>, BrokerError> {
        let client = RabbitMqClient::connect(&self.rabbitmq_url, on_lost).await?;
        Ok(Arc::new(client))
    }
}

pub struct RabbitMqClient {
    connection: Connection,
    channel: Channel,
}

impl RabbitMqClient {
    pub async fn connect(rabbitmq_url: &str, on_lost: LossNotifier) -> Result<Self, BrokerError> {
        debug!("Connecting to RabbitMQ...");

        let connection = Connection::connect(rabbitmq_url, ConnectionProperties::default())
            .await
            .map_err(|e| BrokerError::Connection(format!("Failed to connect to RabbitMQ: {}", e)))?;

        connection.on_error(move |e| {
            error!(error = %e, "RabbitMQ connection error");
            on_lost.notify();
        });

        debug!("RabbitMQ connection established");

        let channel = connection.create_channel().await.map_err(|e| {
            BrokerError::Connection(format!("RabbitMQ channel creation failed: {}", e))
        })?;

        debug!("RabbitMQ channel created");

        channel
            .exchange_declare(
                EXCHANGE_NAME,
                ExchangeKind::Direct,
                ExchangeDeclareOptions {
                    durable: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(|e| BrokerError::Connection(format!("Failed to declare exchange: {}", e)))?;

        info!(exchange = EXCHANGE_NAME, "Connected to RabbitMQ and exchange asserted");

        Ok(Self {
            connection,
            channel,
        })
    }
}

#[async_trait]
impl BrokerSession for RabbitMqClient {
    fn is_open(&self) -> bool {
        self.connection.status().connected() && self.channel.status().connected()
    }

    async fn publish(&self, routing_key: &str, payload: &[u8]) -> Result<(), BrokerError> {
        // The returned confirm is dropped: no broker acknowledgement is awaited.
        let _confirm = self
            .channel
            .basic_publish(
                EXCHANGE_NAME,
                routing_key,
                BasicPublishOptions::default(),
                payload,
                BasicProperties::default()
                    .with_content_type("application/json".into())
                    .with_delivery_mode(PERSISTENT),
            )
            .await
            .map_err(|e| BrokerError::Publish(format!("Failed to publish message: {}", e)))?;

        debug!(exchange = EXCHANGE_NAME, routing_key, "Message published");

        Ok(())
    }

    async fn close(&self) {
        if let Err(e) = self.channel.close(200, "OK").await {
            warn!(error = %e, "Failed to close RabbitMQ channel");
        }
        if let Err(e) = self.connection.close(200, "OK").await {
            warn!(error = %e, "Failed to close RabbitMQ connection");
        }
    }
}
