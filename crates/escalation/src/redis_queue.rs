//! Redis-backed escalation queue shared by every server instance.
//!
//! Jobs live in a sorted set of conversation IDs scored by due time (epoch
//! milliseconds) plus a hash of JSON payloads. Every mutation is a single Lua
//! script so arm, disarm and claim are atomic across instances.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::Script;
use tracing::{debug, info};

use crate::error::Result;
use crate::queue::{EscalationJob, EscalationQueue};

/// Default key prefix.
pub const DEFAULT_KEY_PREFIX: &str = "escalations";

const ARM_SCRIPT: &str = r#"
local added = redis.call('ZADD', KEYS[1], 'NX', ARGV[2], ARGV[1])
if added == 1 then
  redis.call('HSET', KEYS[2], ARGV[1], ARGV[3])
end
return added
"#;

const DISARM_SCRIPT: &str = r#"
local removed = redis.call('ZREM', KEYS[1], ARGV[1])
redis.call('HDEL', KEYS[2], ARGV[1])
return removed
"#;

const CLAIM_SCRIPT: &str = r#"
local ids = redis.call('ZRANGEBYSCORE', KEYS[1], '-inf', ARGV[1], 'LIMIT', 0, ARGV[2])
local jobs = {}
for _, id in ipairs(ids) do
  redis.call('ZREM', KEYS[1], id)
  local payload = redis.call('HGET', KEYS[2], id)
  redis.call('HDEL', KEYS[2], id)
  if payload then
    table.insert(jobs, payload)
  end
end
return jobs
"#;

/// Escalation queue in Redis.
#[derive(Clone)]
pub struct RedisQueue {
    conn: ConnectionManager,
    due_key: String,
    jobs_key: String,
    arm_script: Script,
    disarm_script: Script,
    claim_script: Script,
}

impl RedisQueue {
    /// Connect using the default key prefix.
    pub async fn connect(url: &str) -> Result<Self> {
        Self::connect_with_prefix(url, DEFAULT_KEY_PREFIX).await
    }

    /// Connect storing jobs under `{prefix}:due` and `{prefix}:jobs`.
    pub async fn connect_with_prefix(url: &str, prefix: &str) -> Result<Self> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        info!(prefix, "Redis escalation queue connected");

        Ok(Self {
            conn,
            due_key: format!("{}:due", prefix),
            jobs_key: format!("{}:jobs", prefix),
            arm_script: Script::new(ARM_SCRIPT),
            disarm_script: Script::new(DISARM_SCRIPT),
            claim_script: Script::new(CLAIM_SCRIPT),
        })
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

#[async_trait]
impl EscalationQueue for RedisQueue {
    async fn arm(&self, job: EscalationJob, delay: Duration) -> Result<bool> {
        let due_at = now_millis().saturating_add(delay.as_millis() as u64);
        let payload = serde_json::to_string(&job)?;
        let mut conn = self.conn.clone();

        let added: i64 = self
            .arm_script
            .key(&self.due_key)
            .key(&self.jobs_key)
            .arg(&job.conversation_id)
            .arg(due_at)
            .arg(payload)
            .invoke_async(&mut conn)
            .await?;

        debug!(conversation_id = %job.conversation_id, added, "Arm");
        Ok(added == 1)
    }

    async fn disarm(&self, conversation_id: &str) -> Result<bool> {
        let mut conn = self.conn.clone();
        let removed: i64 = self
            .disarm_script
            .key(&self.due_key)
            .key(&self.jobs_key)
            .arg(conversation_id)
            .invoke_async(&mut conn)
            .await?;
        Ok(removed == 1)
    }

    async fn claim_due(&self, limit: usize) -> Result<Vec<EscalationJob>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let mut conn = self.conn.clone();
        let payloads: Vec<String> = self
            .claim_script
            .key(&self.due_key)
            .key(&self.jobs_key)
            .arg(now_millis())
            .arg(limit)
            .invoke_async(&mut conn)
            .await?;

        payloads
            .iter()
            .map(|p| serde_json::from_str(p).map_err(Into::into))
            .collect()
    }

    async fn pending(&self, conversation_id: &str) -> Result<Option<EscalationJob>> {
        let mut conn = self.conn.clone();
        let payload: Option<String> = redis::cmd("HGET")
            .arg(&self.jobs_key)
            .arg(conversation_id)
            .query_async(&mut conn)
            .await?;

        payload
            .map(|p| serde_json::from_str(&p))
            .transpose()
            .map_err(Into::into)
    }
}
