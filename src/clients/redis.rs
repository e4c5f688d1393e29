use anyhow::{Error, Result, anyhow};
use async_trait::async_trait;
use redis::{AsyncCommands, Client, aio::MultiplexedConnection};
use tracing::{debug, info};

#[async_trait]
pub trait UserCache: Send + Sync {
    async fn cache_email(&self, user_id: i32, email: &str) -> Result<(), Error>;
}

pub struct RedisClient {
    connection: MultiplexedConnection,
    ttl_seconds: u64,
}

impl RedisClient {
    pub async fn connect(redis_url: &str, ttl_seconds: u64) -> Result<Self, Error> {
        info!("Connecting to Redis");

        let client =
            Client::open(redis_url).map_err(|e| anyhow!("Failed to create redis client: {}", e))?;

        let connection = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| anyhow!("Failed to connect to redis client: {}", e))?;

        info!("Redis connection established");

        Ok(Self {
            connection,
            ttl_seconds,
        })
    }
}

pub fn user_key(user_id: i32) -> String {
    format!("user:{}", user_id)
}

#[async_trait]
impl UserCache for RedisClient {
    async fn cache_email(&self, user_id: i32, email: &str) -> Result<(), Error> {
        let key = user_key(user_id);
        let mut conn = self.connection.clone();

        conn.set_ex::<_, _, ()>(&key, email, self.ttl_seconds)
            .await
            .map_err(|e| anyhow!("Failed to cache user email: {}", e))?;

        debug!(key = %key, ttl_seconds = self.ttl_seconds, "User email cached");

        Ok(())
    }
}
