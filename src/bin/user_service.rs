use std::sync::Arc;

use anyhow::{Error, Result};
use notification_gateway::{
    api::{UserServiceState, serve, user_service_router},
    clients::{database::DatabaseClient, redis::RedisClient},
    config::UserServiceConfig,
    utils::{init_tracing, shutdown_signal},
};
use tokio::net::TcpListener;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Error> {
    init_tracing();

    let config = UserServiceConfig::load()?;

    let database = DatabaseClient::connect(&config.database_url).await?;
    database.ensure_users_table().await?;

    let cache = RedisClient::connect(&config.redis_url, config.user_cache_ttl_seconds).await?;

    let state = Arc::new(UserServiceState {
        store: Arc::new(database),
        cache: Arc::new(cache),
    });

    let listener = TcpListener::bind(("0.0.0.0", config.port)).await?;
    info!(port = config.port, "User service listening");

    serve(listener, user_service_router(state), shutdown_signal()).await?;

    Ok(())
}
