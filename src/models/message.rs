use std::{fmt, str::FromStr};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// Inbound body of `POST /api/v1/notifications`.
///
/// `notification_type` stays a raw string here so that unknown values can be
/// answered with the gateway's own 400 body instead of a deserializer error.
/// The pass-through fields are `None` only when absent; an explicit `null`
/// is kept as `Some(Value::Null)`.
#[derive(Debug, Clone, Deserialize)]
pub struct NotificationRequest {
    #[serde(default)]
    pub notification_type: Option<String>,

    #[serde(default, deserialize_with = "present")]
    pub user_id: Option<Value>,

    #[serde(default, deserialize_with = "present")]
    pub template_code: Option<Value>,

    #[serde(default, deserialize_with = "present")]
    pub variables: Option<Value>,
}

fn present<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Value>, D::Error> {
    Value::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationType {
    Email,
    Push,
}

impl NotificationType {
    /// Routing key bound by the consumers for this notification type.
    pub fn routing_key(&self) -> &'static str {
        match self {
            NotificationType::Email => "email",
            NotificationType::Push => "push",
        }
    }
}

impl FromStr for NotificationType {
    type Err = UnknownNotificationType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "email" => Ok(NotificationType::Email),
            "push" => Ok(NotificationType::Push),
            other => Err(UnknownNotificationType(other.to_string())),
        }
    }
}

impl fmt::Display for NotificationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.routing_key())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown notification type '{0}'")]
pub struct UnknownNotificationType(pub String);

/// Payload placed on the wire for the delivery workers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NotificationEnvelope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_code: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variables: Option<Value>,

    #[serde(serialize_with = "serialize_millis")]
    pub timestamp: DateTime<Utc>,
}

impl NotificationEnvelope {
    pub fn new(request: NotificationRequest, timestamp: DateTime<Utc>) -> Self {
        Self {
            user_id: request.user_id,
            template_code: request.template_code,
            variables: request.variables,
            timestamp,
        }
    }

    pub fn to_bytes(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}

fn serialize_millis<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Millis, true))
}
