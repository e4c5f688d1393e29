use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Ok,
}

/// Liveness body. Reported regardless of broker or database state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheckResponse {
    pub status: HealthStatus,
}

impl HealthCheckResponse {
    pub fn ok() -> Self {
        Self {
            status: HealthStatus::Ok,
        }
    }
}
