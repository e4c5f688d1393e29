//! Broker connection lifecycle.
//!
//! [`ConnectionManager`] owns the single broker session of the process. A
//! supervisor task connects, waits for the session to be reported lost, drops
//! it and connects again, forever. Request handlers only ever see
//! [`ConnectionManager::is_ready`] and [`ConnectionManager::publish`].

use std::{
    sync::{Arc, RwLock},
    time::Duration,
};

use async_trait::async_trait;
use tokio::{
    sync::mpsc,
    task::JoinHandle,
    time::{Instant, sleep},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::models::{error::BrokerError, retry::ReconnectPolicy};

pub const EXCHANGE_NAME: &str = "notifications.direct";

/// A session lost sooner than this after connecting counts as a failed attempt.
pub const STABLE_SESSION: Duration = Duration::from_secs(10);

/// An open channel on a live broker connection.
#[async_trait]
pub trait BrokerSession: Send + Sync {
    fn is_open(&self) -> bool;

    /// Persistent, unconfirmed publish to the notifications exchange.
    async fn publish(&self, routing_key: &str, payload: &[u8]) -> Result<(), BrokerError>;

    async fn close(&self);
}

/// Opens sessions. Implementations must declare the exchange before returning.
#[async_trait]
pub trait BrokerConnector: Send + Sync {
    async fn connect(&self, on_lost: LossNotifier) -> Result<Arc<dyn BrokerSession>, BrokerError>;
}

/// Handed to each new session so the transport can report its own death.
#[derive(Clone)]
pub struct LossNotifier {
    generation: u64,
    tx: mpsc::UnboundedSender<u64>,
}

impl LossNotifier {
    pub fn notify(&self) {
        let _ = self.tx.send(self.generation);
    }
}

struct CurrentSession {
    generation: u64,
    session: Arc<dyn BrokerSession>,
}

pub struct ConnectionManager {
    connector: Arc<dyn BrokerConnector>,
    policy: ReconnectPolicy,
    current: RwLock<Option<CurrentSession>>,
    lost_tx: mpsc::UnboundedSender<u64>,
    lost_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<u64>>,
}

impl ConnectionManager {
    pub fn new(connector: Arc<dyn BrokerConnector>, policy: ReconnectPolicy) -> Arc<Self> {
        let (lost_tx, lost_rx) = mpsc::unbounded_channel();

        Arc::new(Self {
            connector,
            policy,
            current: RwLock::new(None),
            lost_tx,
            lost_rx: tokio::sync::Mutex::new(lost_rx),
        })
    }

    /// True only while a session exists and reports itself open.
    ///
    /// A session found closed is invalidated here so that a dead connection is
    /// never reported ready.
    pub fn is_ready(&self) -> bool {
        let stale = {
            let guard = match self.current.read() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            match guard.as_ref() {
                None => return false,
                Some(current) if current.session.is_open() => return true,
                Some(current) => current.generation,
            }
        };

        self.invalidate(stale);
        false
    }

    /// Publishes on the current session. Callers check [`Self::is_ready`] first.
    pub async fn publish(&self, routing_key: &str, payload: &[u8]) -> Result<(), BrokerError> {
        let (generation, session) = self.snapshot().ok_or(BrokerError::NotReady)?;

        let result = session.publish(routing_key, payload).await;

        if result.is_err() && !session.is_open() {
            self.invalidate(generation);
        }

        result
    }

    /// Starts the connection supervisor. It runs until `shutdown` is cancelled.
    pub fn spawn(self: &Arc<Self>, shutdown: CancellationToken) -> JoinHandle<()> {
        let manager = Arc::clone(self);
        tokio::spawn(async move { manager.run(shutdown).await })
    }

    pub async fn run(&self, shutdown: CancellationToken) {
        let mut lost_rx = self.lost_rx.lock().await;
        let mut generation: u64 = 0;
        let mut failures: u32 = 0;

        loop {
            generation += 1;

            let notifier = LossNotifier {
                generation,
                tx: self.lost_tx.clone(),
            };

            debug!(generation, "Connecting to message broker");

            let attempt = tokio::select! {
                _ = shutdown.cancelled() => break,
                attempt = self.connector.connect(notifier) => attempt,
            };

            match attempt {
                Ok(session) => {
                    self.install(generation, session);
                    let installed_at = Instant::now();
                    info!(generation, exchange = EXCHANGE_NAME, "Connected to message broker");

                    loop {
                        tokio::select! {
                            _ = shutdown.cancelled() => {
                                self.close().await;
                                return;
                            }
                            notice = lost_rx.recv() => match notice {
                                Some(lost) if lost == generation => break,
                                Some(lost) => {
                                    debug!(lost, generation, "Ignoring loss notice for a replaced session");
                                }
                                None => return,
                            },
                        }
                    }

                    self.invalidate(generation);

                    if installed_at.elapsed() >= STABLE_SESSION {
                        failures = 0;
                        warn!(generation, "Message broker connection lost, reconnecting");
                        continue;
                    }

                    failures = failures.saturating_add(1);
                    let delay = self.policy.delay_for(failures);

                    warn!(
                        generation,
                        failures,
                        delay_ms = delay.as_millis() as u64,
                        "Message broker connection dropped right after connecting, retry scheduled"
                    );

                    tokio::select! {
                        _ = shutdown.cancelled() => break,
                        _ = sleep(delay) => {}
                    }
                }
                Err(e) => {
                    failures = failures.saturating_add(1);
                    let delay = self.policy.delay_for(failures);

                    warn!(
                        error = %e,
                        failures,
                        delay_ms = delay.as_millis() as u64,
                        "Failed to connect to message broker, retry scheduled"
                    );

                    tokio::select! {
                        _ = shutdown.cancelled() => break,
                        _ = sleep(delay) => {}
                    }
                }
            }
        }

        self.close().await;
    }

    /// Drops the current session and closes it.
    pub async fn close(&self) {
        let taken = match self.current.write() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };

        if let Some(current) = taken {
            current.session.close().await;
            info!(generation = current.generation, "Message broker session closed");
        }
    }

    fn snapshot(&self) -> Option<(u64, Arc<dyn BrokerSession>)> {
        let guard = match self.current.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        guard
            .as_ref()
            .map(|current| (current.generation, Arc::clone(&current.session)))
    }

    fn install(&self, generation: u64, session: Arc<dyn BrokerSession>) {
        let mut guard = match self.current.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = Some(CurrentSession {
            generation,
            session,
        });
    }

    /// Clears the session if it still belongs to `generation` and tells the
    /// supervisor to reconnect.
    fn invalidate(&self, generation: u64) {
        let cleared = {
            let mut guard = match self.current.write() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            match guard.as_ref() {
                Some(current) if current.generation == generation => {
                    *guard = None;
                    true
                }
                _ => false,
            }
        };

        if cleared {
            let _ = self.lost_tx.send(generation);
        }
    }
}
