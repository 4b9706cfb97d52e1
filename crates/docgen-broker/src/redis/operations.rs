//! Redis queue broker implementation.
//!
//! Per queue: job bodies are plain strings, `wait` and `active` are lists,
//! `delayed`, `completed`, and `failed` are sorted sets scored by unix
//! millis. Multi-key moves run as Lua scripts so concurrent workers never
//! observe a half-moved job.

use async_trait::async_trait;
use redis::{AsyncCommands, Script};
use tracing::debug;

use docgen_core::error::{AppError, ErrorKind};
use docgen_core::result::AppResult;
use docgen_core::traits::{FinishedSet, QueueBroker, QueueCounts};
use docgen_core::types::JobId;

use super::client::RedisClient;
use crate::keys::QueueKeys;

const PROMOTE_DUE: &str = r"
local ids = redis.call('ZRANGEBYSCORE', KEYS[1], '-inf', ARGV[1])
for _, id in ipairs(ids) do
    redis.call('ZREM', KEYS[1], id)
    redis.call('RPUSH', KEYS[2], id)
end
return #ids
";

const RECORD_FINISHED: &str = r"
redis.call('ZADD', KEYS[1], ARGV[2], ARGV[1])
local keep = tonumber(ARGV[3])
local count = redis.call('ZCARD', KEYS[1])
if count <= keep then
    return {}
end
local evicted = redis.call('ZRANGE', KEYS[1], 0, count - keep - 1)
redis.call('ZREMRANGEBYRANK', KEYS[1], 0, count - keep - 1)
return evicted
";

/// Redis-backed [`QueueBroker`].
#[derive(Debug, Clone)]
pub struct RedisQueueBroker {
    client: RedisClient,
}

impl RedisQueueBroker {
    /// Create a broker over a (possibly not yet connected) client.
    pub fn new(client: RedisClient) -> Self {
        Self { client }
    }

    fn keys(&self, queue: &str) -> QueueKeys {
        QueueKeys::new(self.client.prefix(), queue)
    }

    /// Map a Redis error to an AppError.
    fn map_err(e: redis::RedisError) -> AppError {
        let kind = if e.is_io_error() || e.is_connection_dropped() || e.is_timeout() {
            ErrorKind::ServiceUnavailable
        } else {
            ErrorKind::Broker
        };
        AppError::with_source(kind, format!("Redis error: {e}"), e)
    }

    fn parse_ids(raw: Vec<String>) -> Vec<JobId> {
        raw.iter().filter_map(|s| s.parse().ok()).collect()
    }
}

#[async_trait]
impl QueueBroker for RedisQueueBroker {
    async fn store_job(&self, queue: &str, id: JobId, body: &str) -> AppResult<()> {
        let mut conn = self.client.conn_mut().await?;
        let _: () = conn
            .set(self.keys(queue).job(id), body)
            .await
            .map_err(Self::map_err)?;
        Ok(())
    }

    async fn load_job(&self, queue: &str, id: JobId) -> AppResult<Option<String>> {
        let mut conn = self.client.conn_mut().await?;
        conn.get(self.keys(queue).job(id))
            .await
            .map_err(Self::map_err)
    }

    async fn remove_job(&self, queue: &str, id: JobId) -> AppResult<()> {
        let mut conn = self.client.conn_mut().await?;
        let _: i64 = conn
            .del(self.keys(queue).job(id))
            .await
            .map_err(Self::map_err)?;
        Ok(())
    }

    async fn push_waiting(&self, queue: &str, id: JobId) -> AppResult<()> {
        let mut conn = self.client.conn_mut().await?;
        let _: i64 = conn
            .rpush(self.keys(queue).wait(), id.to_string())
            .await
            .map_err(Self::map_err)?;
        Ok(())
    }

    async fn push_delayed(&self, queue: &str, id: JobId, ready_at_ms: i64) -> AppResult<()> {
        let mut conn = self.client.conn_mut().await?;
        let _: i64 = conn
            .zadd(self.keys(queue).delayed(), id.to_string(), ready_at_ms)
            .await
            .map_err(Self::map_err)?;
        Ok(())
    }

    async fn promote_due(&self, queue: &str, now_ms: i64) -> AppResult<u64> {
        let keys = self.keys(queue);
        let mut conn = self.client.conn_mut().await?;
        let moved: u64 = Script::new(PROMOTE_DUE)
            .key(keys.delayed())
            .key(keys.wait())
            .arg(now_ms)
            .invoke_async(&mut conn)
            .await
            .map_err(Self::map_err)?;
        if moved > 0 {
            debug!(queue, moved, "Promoted delayed jobs");
        }
        Ok(moved)
    }

    async fn claim_next(&self, queue: &str) -> AppResult<Option<JobId>> {
        let keys = self.keys(queue);
        let mut conn = self.client.conn_mut().await?;
        let claimed: Option<String> = redis::cmd("LMOVE")
            .arg(keys.wait())
            .arg(keys.active())
            .arg("LEFT")
            .arg("RIGHT")
            .query_async(&mut conn)
            .await
            .map_err(Self::map_err)?;
        Ok(claimed.and_then(|raw| raw.parse().ok()))
    }

    async fn release_active(&self, queue: &str, id: JobId) -> AppResult<bool> {
        let mut conn = self.client.conn_mut().await?;
        let removed: i64 = conn
            .lrem(self.keys(queue).active(), 0, id.to_string())
            .await
            .map_err(Self::map_err)?;
        Ok(removed > 0)
    }

    async fn list_active(&self, queue: &str) -> AppResult<Vec<JobId>> {
        let mut conn = self.client.conn_mut().await?;
        let raw: Vec<String> = conn
            .lrange(self.keys(queue).active(), 0, -1)
            .await
            .map_err(Self::map_err)?;
        Ok(Self::parse_ids(raw))
    }

    async fn record_finished(
        &self,
        queue: &str,
        set: FinishedSet,
        id: JobId,
        finished_at_ms: i64,
        keep: usize,
    ) -> AppResult<Vec<JobId>> {
        let mut conn = self.client.conn_mut().await?;
        let evicted: Vec<String> = Script::new(RECORD_FINISHED)
            .key(self.keys(queue).finished(set))
            .arg(id.to_string())
            .arg(finished_at_ms)
            .arg(keep)
            .invoke_async(&mut conn)
            .await
            .map_err(Self::map_err)?;
        Ok(Self::parse_ids(evicted))
    }

    async fn counts(&self, queue: &str) -> AppResult<QueueCounts> {
        let keys = self.keys(queue);
        let mut conn = self.client.conn_mut().await?;
        let (waiting, active, delayed, completed, failed): (u64, u64, u64, u64, u64) =
            redis::pipe()
                .cmd("LLEN")
                .arg(keys.wait())
                .cmd("LLEN")
                .arg(keys.active())
                .cmd("ZCARD")
                .arg(keys.delayed())
                .cmd("ZCARD")
                .arg(keys.finished(FinishedSet::Completed))
                .cmd("ZCARD")
                .arg(keys.finished(FinishedSet::Failed))
                .query_async(&mut conn)
                .await
                .map_err(Self::map_err)?;
        Ok(QueueCounts {
            waiting,
            active,
            delayed,
            completed,
            failed,
        })
    }

    async fn health_check(&self) -> AppResult<bool> {
        let mut conn = self.client.conn_mut().await?;
        let pong: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(Self::map_err)?;
        Ok(pong == "PONG")
    }
}
