use std::sync::{
    Arc,
    atomic::{AtomicI64, Ordering},
};

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use crate::{
    clients::broker::{ConnectionManager, EXCHANGE_NAME},
    models::{
        message::{NotificationEnvelope, NotificationRequest, NotificationType},
        response::ApiResponse,
    },
};

/// Terminal state of one notification request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Accepted,
    Rejected,
    Unavailable,
    PublishFailed,
}

impl DispatchOutcome {
    pub fn status_code(&self) -> StatusCode {
        match self {
            DispatchOutcome::Accepted => StatusCode::ACCEPTED,
            DispatchOutcome::Rejected => StatusCode::BAD_REQUEST,
            DispatchOutcome::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            DispatchOutcome::PublishFailed => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn body(&self) -> ApiResponse<()> {
        match self {
            DispatchOutcome::Accepted => ApiResponse::accepted("Notification request accepted"),
            DispatchOutcome::Rejected => ApiResponse::error("Invalid notification_type"),
            DispatchOutcome::Unavailable => ApiResponse::error("Message service not ready"),
            DispatchOutcome::PublishFailed => ApiResponse::error("Internal server error"),
        }
    }
}

impl IntoResponse for DispatchOutcome {
    fn into_response(self) -> Response {
        (self.status_code(), Json(self.body())).into_response()
    }
}

/// Hands out envelope timestamps that never go backwards.
#[derive(Debug, Default)]
pub struct EnvelopeClock {
    last_millis: AtomicI64,
}

impl EnvelopeClock {
    pub fn now(&self) -> DateTime<Utc> {
        let now = Utc::now();
        let millis = now.timestamp_millis();
        let previous = self.last_millis.fetch_max(millis, Ordering::SeqCst);

        if previous > millis {
            DateTime::from_timestamp_millis(previous).unwrap_or(now)
        } else {
            now
        }
    }
}

pub struct Dispatcher {
    broker: Arc<ConnectionManager>,
    clock: EnvelopeClock,
}

impl Dispatcher {
    pub fn new(broker: Arc<ConnectionManager>) -> Self {
        Self {
            broker,
            clock: EnvelopeClock::default(),
        }
    }

    /// Gates on broker readiness, validates, then publishes exactly once.
    pub async fn dispatch(&self, request: NotificationRequest) -> DispatchOutcome {
        if !self.broker.is_ready() {
            warn!("Message service not ready");
            return DispatchOutcome::Unavailable;
        }

        let notification_type = match request
            .notification_type
            .as_deref()
            .map(str::parse::<NotificationType>)
        {
            Some(Ok(notification_type)) => notification_type,
            Some(Err(e)) => {
                warn!(error = %e, "Rejecting notification request");
                return DispatchOutcome::Rejected;
            }
            None => {
                warn!("Rejecting notification request without notification_type");
                return DispatchOutcome::Rejected;
            }
        };

        let envelope = NotificationEnvelope::new(request, self.clock.now());
        let routing_key = notification_type.routing_key();

        let payload = match envelope.to_bytes() {
            Ok(payload) => payload,
            Err(e) => {
                error!(error = %e, "Failed to serialize notification envelope");
                return DispatchOutcome::PublishFailed;
            }
        };

        match self.broker.publish(routing_key, &payload).await {
            Ok(()) => {
                info!(
                    exchange = EXCHANGE_NAME,
                    routing_key,
                    "Message published"
                );
                DispatchOutcome::Accepted
            }
            Err(e) => {
                error!(error = %e, routing_key, "Failed to publish message");
                DispatchOutcome::PublishFailed
            }
        }
    }
}
