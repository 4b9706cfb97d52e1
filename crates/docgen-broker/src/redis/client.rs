//! Redis connection management.

use std::sync::Arc;

use redis::Client;
use redis::aio::ConnectionManager;
use tokio::sync::OnceCell;
use tracing::info;

use docgen_core::config::RedisBrokerConfig;
use docgen_core::error::{AppError, ErrorKind};
use docgen_core::result::AppResult;

/// Redis client wrapper with lazy connection management.
///
/// Nothing is dialed until the first command. The resulting
/// [`ConnectionManager`] reconnects on its own after connection loss, so a
/// broker restart only fails the commands issued while it is down.
#[derive(Debug, Clone)]
pub struct RedisClient {
    client: Client,
    conn: Arc<OnceCell<ConnectionManager>>,
    key_prefix: String,
}

impl RedisClient {
    /// Create a client from configuration without connecting.
    pub fn open(config: &RedisBrokerConfig) -> AppResult<Self> {
        info!(url = %mask_redis_url(&config.url), "Configuring Redis broker");

        let client = Client::open(config.url.as_str()).map_err(|e| {
            AppError::with_source(ErrorKind::Configuration, "Invalid Redis URL", e)
        })?;

        Ok(Self {
            client,
            conn: Arc::new(OnceCell::new()),
            key_prefix: config.key_prefix.clone(),
        })
    }

    /// A handle to the shared connection, connecting on first use.
    pub async fn conn_mut(&self) -> AppResult<ConnectionManager> {
        let conn = self
            .conn
            .get_or_try_init(|| async {
                let conn = ConnectionManager::new(self.client.clone()).await?;
                info!("Connected to Redis");
                Ok::<_, redis::RedisError>(conn)
            })
            .await
            .map_err(|e| {
                AppError::with_source(
                    ErrorKind::ServiceUnavailable,
                    format!("Failed to connect to Redis: {e}"),
                    e,
                )
            })?;
        Ok(conn.clone())
    }

    /// Return the key prefix.
    pub fn prefix(&self) -> &str {
        &self.key_prefix
    }
}

/// Mask password in Redis URL for safe logging.
fn mask_redis_url(url: &str) -> String {
    if let Some(at_pos) = url.find('@') {
        if let Some(colon_pos) = url[..at_pos].rfind(':') {
            let scheme_end = url.find("://").map(|p| p + 3).unwrap_or(0);
            if colon_pos > scheme_end {
                return format!("{}:****@{}", &url[..colon_pos], &url[at_pos + 1..]);
            }
        }
    }
    url.to_string()
}
