use std::time::Duration;

use anyhow::{Error, Result, anyhow};
use dotenvy::dotenv;
use serde::Deserialize;

use crate::models::retry::ReconnectPolicy;

#[derive(Clone, Copy, Deserialize, Debug, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReconnectStrategy {
    #[default]
    Fixed,
    Exponential,
}

#[derive(Clone, Deserialize, Debug)]
pub struct GatewayConfig {
    #[serde(default = "default_gateway_port")]
    pub port: u16,

    pub rabbitmq_url: String,

    #[serde(default)]
    pub reconnect_strategy: ReconnectStrategy,
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,
    #[serde(default = "default_reconnect_max_delay_ms")]
    pub reconnect_max_delay_ms: u64,
    #[serde(default = "default_reconnect_backoff_multiplier")]
    pub reconnect_backoff_multiplier: u32,
}

#[derive(Clone, Deserialize, Debug)]
pub struct UserServiceConfig {
    #[serde(default = "default_user_service_port")]
    pub port: u16,

    pub database_url: String,

    pub redis_url: String,
    #[serde(default = "default_user_cache_ttl_seconds")]
    pub user_cache_ttl_seconds: u64,
}

impl GatewayConfig {
    pub fn load() -> Result<Self, Error> {
        dotenv().ok();

        envy::from_env::<Self>()
            .map_err(|e| anyhow!("Invalid or missing environmental variable: {}", e))
    }

    pub fn reconnect_policy(&self) -> ReconnectPolicy {
        let delay = Duration::from_millis(self.reconnect_delay_ms);

        match self.reconnect_strategy {
            ReconnectStrategy::Fixed => ReconnectPolicy::Fixed { delay },
            ReconnectStrategy::Exponential => ReconnectPolicy::Exponential {
                initial: delay,
                max: Duration::from_millis(self.reconnect_max_delay_ms),
                multiplier: self.reconnect_backoff_multiplier,
            },
        }
    }
}

impl UserServiceConfig {
    pub fn load() -> Result<Self, Error> {
        dotenv().ok();

        envy::from_env::<Self>()
            .map_err(|e| anyhow!("Invalid or missing environmental variable: {}", e))
    }
}

fn default_gateway_port() -> u16 {
    3000
}

fn default_user_service_port() -> u16 {
    3001
}

fn default_reconnect_delay_ms() -> u64 {
    5000
}

fn default_reconnect_max_delay_ms() -> u64 {
    60_000
}

fn default_reconnect_backoff_multiplier() -> u32 {
    2
}

fn default_user_cache_ttl_seconds() -> u64 {
    3600
}
