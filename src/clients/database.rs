use anyhow::{Error, Result, anyhow};
use async_trait::async_trait;
use tokio_postgres::{Client, NoTls};
use tracing::{debug, error, info};

use crate::models::user::{NewUser, UserRecord};

// TODO: hash passwords before they reach the users table.
const PASSWORD_PLACEHOLDER: &str = "hashed_password_placeholder";

const CREATE_USERS_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS users (
        id SERIAL PRIMARY KEY,
        name VARCHAR(100) NOT NULL,
        email VARCHAR(100) UNIQUE NOT NULL,
        push_token TEXT,
        preferences JSONB,
        password VARCHAR(255) NOT NULL,
        created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
    )
"#;

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn create_user(&self, user: &NewUser) -> Result<UserRecord, Error>;
}

pub struct DatabaseClient {
    client: Client,
}

impl DatabaseClient {
    pub async fn connect(database_url: &str) -> Result<Self, Error> {
        info!("Connecting to PostgreSQL database");

        let (client, connection) = tokio_postgres::connect(database_url, NoTls)
            .await
            .map_err(|e| anyhow!("Failed to connect to database: {}", e))?;

        tokio::spawn(async move {
            if let Err(e) = connection.await {
                error!(error = %e, "PostgreSQL connection closed with error");
            }
        });

        info!("PostgreSQL connection established");

        Ok(Self { client })
    }

    pub async fn ensure_users_table(&self) -> Result<(), Error> {
        self.client
            .batch_execute(CREATE_USERS_TABLE)
            .await
            .map_err(|e| anyhow!("Failed to create users table: {}", e))?;

        info!("Users table checked/created successfully");

        Ok(())
    }
}

#[async_trait]
impl UserStore for DatabaseClient {
    async fn create_user(&self, user: &NewUser) -> Result<UserRecord, Error> {
        let row = self
            .client
            .query_one(
                "INSERT INTO users(name, email, password) VALUES($1, $2, $3) RETURNING id, name, email",
                &[&user.name, &user.email, &PASSWORD_PLACEHOLDER],
            )
            .await
            .map_err(|e| anyhow!("Database write failed: {}", e))?;

        let record = UserRecord {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            email: row.try_get("email")?,
        };

        debug!(user_id = record.id, "User row inserted");

        Ok(record)
    }
}
