#![allow(dead_code)]

use std::{
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicU32, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use notification_gateway::{
    api::{GatewayState, gateway_router, serve},
    clients::broker::{BrokerConnector, BrokerSession, ConnectionManager, LossNotifier},
    dispatch::Dispatcher,
    models::{error::BrokerError, retry::ReconnectPolicy},
};
use tokio::{net::TcpListener, time::sleep};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
pub struct Published {
    pub routing_key: String,
    pub payload: serde_json::Value,
}

/// In-memory broker: records publishes, can refuse connections or fail writes.
#[derive(Default)]
pub struct FakeBroker {
    pub accept_connections: AtomicBool,
    pub fail_publish: AtomicBool,
    pub connect_attempts: AtomicU32,
    pub published: Mutex<Vec<Published>>,
}

impl FakeBroker {
    pub fn reachable() -> Arc<Self> {
        let broker = Self::default();
        broker.accept_connections.store(true, Ordering::SeqCst);
        Arc::new(broker)
    }

    pub fn unreachable() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn published(&self) -> Vec<Published> {
        self.published.lock().unwrap().clone()
    }
}

struct FakeSession {
    broker: Arc<FakeBroker>,
}

#[async_trait]
impl BrokerSession for FakeSession {
    fn is_open(&self) -> bool {
        true
    }

    async fn publish(&self, routing_key: &str, payload: &[u8]) -> Result<(), BrokerError> {
        if self.broker.fail_publish.load(Ordering::SeqCst) {
            return Err(BrokerError::Publish("channel write failed".to_string()));
        }

        let payload = serde_json::from_slice(payload)
            .map_err(|e| BrokerError::Publish(format!("payload is not JSON: {}", e)))?;

        self.broker.published.lock().unwrap().push(Published {
            routing_key: routing_key.to_string(),
            payload,
        });
        Ok(())
    }

    async fn close(&self) {}
}

pub struct FakeConnector(pub Arc<FakeBroker>);

#[async_trait]
impl BrokerConnector for FakeConnector {
    async fn connect(&self, _on_lost: LossNotifier) -> Result<Arc<dyn BrokerSession>, BrokerError> {
        self.0.connect_attempts.fetch_add(1, Ordering::SeqCst);

        if !self.0.accept_connections.load(Ordering::SeqCst) {
            return Err(BrokerError::Connection("connection refused".to_string()));
        }

        Ok(Arc::new(FakeSession {
            broker: Arc::clone(&self.0),
        }))
    }
}

pub struct TestGateway {
    pub base_url: String,
    pub broker: Arc<FakeBroker>,
    pub manager: Arc<ConnectionManager>,
    pub client: reqwest::Client,
    shutdown: CancellationToken,
}

impl TestGateway {
    pub async fn start(broker: Arc<FakeBroker>) -> Self {
        let manager = ConnectionManager::new(
            Arc::new(FakeConnector(Arc::clone(&broker))),
            ReconnectPolicy::Fixed {
                delay: Duration::from_secs(5),
            },
        );
        let shutdown = CancellationToken::new();
        manager.spawn(shutdown.clone());

        let state = Arc::new(GatewayState {
            dispatcher: Dispatcher::new(Arc::clone(&manager)),
        });

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());

        let stop = shutdown.clone();
        tokio::spawn(serve(listener, gateway_router(state), async move {
            stop.cancelled().await
        }));

        Self {
            base_url,
            broker,
            manager,
            client: reqwest::Client::new(),
            shutdown,
        }
    }

    /// Starts a gateway whose broker accepts connections and waits until it is ready.
    pub async fn ready() -> Self {
        let gateway = Self::start(FakeBroker::reachable()).await;

        for _ in 0..200 {
            if gateway.manager.is_ready() {
                return gateway;
            }
            sleep(Duration::from_millis(10)).await;
        }
        panic!("gateway never became ready");
    }

    pub async fn post_notification(&self, body: serde_json::Value) -> (u16, serde_json::Value) {
        let response = self
            .client
            .post(format!("{}/api/v1/notifications", self.base_url))
            .json(&body)
            .send()
            .await
            .unwrap();

        let status = response.status().as_u16();
        (status, response.json().await.unwrap())
    }
}

impl Drop for TestGateway {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
