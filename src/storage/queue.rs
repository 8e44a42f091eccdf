use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tokio::sync::Mutex;

use async_trait::async_trait;

use crate::engine::ports::{Notification, NotificationQueue};
use crate::types::RedisConfig;

/// Redis list the downstream notification sender drains.
const NOTIFICATIONS_KEY: &str = "notifications";

/// Redis-backed notification queue.
///
/// Messages are JSON-serialized `Notification`s pushed onto a list; the
/// sender process pops and delivers them at `scheduled_at`.
pub struct RedisNotificationQueue {
    conn: Mutex<ConnectionManager>,
}

impl RedisNotificationQueue {
    pub async fn new(cfg: &RedisConfig) -> anyhow::Result<Self> {
        let client = redis::Client::open(cfg.url.as_str())?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

#[async_trait]
impl NotificationQueue for RedisNotificationQueue {
    async fn enqueue(&self, notification: &Notification) -> anyhow::Result<()> {
        let payload = serde_json::to_string(notification)?;
        let mut conn = self.conn.lock().await;
        let _: () = conn.lpush(NOTIFICATIONS_KEY, payload).await?;
        Ok(())
    }
}
