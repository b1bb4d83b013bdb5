use redis::AsyncCommands;
use redis::Client;
use std::fmt::Display;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::error::AppError;
use crate::error::AppResult;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// Personalized feed computed for a username
    Feed(String),
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheKey::Feed(username) => write!(f, "feed:{}", username),
        }
    }
}

/// Creates a Redis client for caching
///
/// Only parses the URL; no connection is made until the cache is used.
pub fn create_redis_client(redis_url: &str) -> anyhow::Result<Client> {
    let client = Client::open(redis_url)?;
    Ok(client)
}

/// Raw key/value backend behind [`Cache`]
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> AppResult<Option<String>>;

    /// Queues a write; must not wait for the backend
    fn put(&self, key: String, value: String, ttl: u64);
}

/// Message for asynchronous cache writes
struct CacheWriteMessage {
    key: String,
    value: String,
    ttl: u64,
}

/// Redis-backed store with a background writer task
struct RedisStore {
    redis_client: Client,
    write_tx: mpsc::UnboundedSender<CacheWriteMessage>,
}

#[async_trait::async_trait]
impl CacheStore for RedisStore {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;
        let cached: Option<String> = conn.get(key).await?;
        Ok(cached)
    }

    fn put(&self, key: String, value: String, ttl: u64) {
        if let Err(e) = self.write_tx.send(CacheWriteMessage { key, value, ttl }) {
            tracing::error!(error = %e, "Failed to send cache write message");
        }
    }
}

/// Cache handler for storing and retrieving JSON values
#[derive(Clone)]
pub struct Cache {
    store: Arc<dyn CacheStore>,
}

/// Handle for gracefully shutting down the cache writer
pub struct CacheWriterHandle {
    shutdown_tx: mpsc::Sender<()>,
    task: tokio::task::JoinHandle<()>,
}

impl CacheWriterHandle {
    /// Signals the writer task and waits until queued writes are flushed
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        tracing::info!("Cache writer shutdown signal sent");
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "Cache writer task panicked");
        }
    }
}

impl Cache {
    /// Creates a Redis-backed cache and spawns its background writer
    ///
    /// Writes go through a channel so cache operations never block responses.
    pub fn new(redis_client: Client) -> (Self, CacheWriterHandle) {
        let (write_tx, write_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let client = redis_client.clone();
        let task = tokio::spawn(async move {
            cache_writer_task(client, write_rx, shutdown_rx).await;
        });

        let store = RedisStore {
            redis_client,
            write_tx,
        };

        (
            Self::from_store(Arc::new(store)),
            CacheWriterHandle { shutdown_tx, task },
        )
    }

    pub fn from_store(store: Arc<dyn CacheStore>) -> Self {
        Self { store }
    }

    /// Retrieves a value from the cache by key
    ///
    /// Returns `None` when the key is absent. Connection and decode failures
    /// are returned as errors.
    pub async fn get_from_cache<T: serde::de::DeserializeOwned>(
        &self,
        key: &CacheKey,
    ) -> AppResult<Option<T>> {
        match self.store.get(&key.to_string()).await? {
            Some(json) => {
                let data = serde_json::from_str(&json).map_err(|e| {
                    AppError::Internal(format!("Cache deserialization error: {}", e))
                })?;
                Ok(Some(data))
            }
            None => Ok(None),
        }
    }

    /// Like [`get_from_cache`](Self::get_from_cache), but any failure is
    /// logged and reported as a miss.
    pub async fn lookup<T: serde::de::DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        match self.get_from_cache(key).await {
            Ok(hit) => {
                tracing::debug!(key = %key, hit = hit.is_some(), "Cache lookup");
                hit
            }
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Cache unavailable, treating as miss");
                None
            }
        }
    }

    /// Stores a value in the cache asynchronously without blocking
    ///
    /// The value is serialized here and handed to the store; the call returns
    /// before the backend has seen it.
    pub fn set_in_background<T: serde::Serialize>(&self, key: &CacheKey, value: &T, ttl: u64) {
        match serde_json::to_string(value) {
            Ok(json) => self.store.put(key.to_string(), json, ttl),
            Err(e) => tracing::error!(error = %e, "Cache serialization error"),
        }
    }
}

/// Background task that processes cache write messages
///
/// On shutdown signal, drains whatever is already queued before exiting.
async fn cache_writer_task(
    client: Client,
    mut write_rx: mpsc::UnboundedReceiver<CacheWriteMessage>,
    mut shutdown_rx: mpsc::Receiver<()>,
) {
    tracing::info!("Cache writer task started");

    loop {
        tokio::select! {
            Some(msg) = write_rx.recv() => {
                if let Err(e) = write_to_redis(&client, msg).await {
                    tracing::warn!(error = %e, "Failed to write to Redis cache");
                }
            }
            _ = shutdown_rx.recv() => {
                write_rx.close();
                let mut flushed = 0usize;
                while let Some(msg) = write_rx.recv().await {
                    if let Err(e) = write_to_redis(&client, msg).await {
                        tracing::warn!(error = %e, "Failed to flush cache write during shutdown");
                    } else {
                        flushed += 1;
                    }
                }

                tracing::info!(flushed, "Cache writer task stopped");
                break;
            }
        }
    }
}

async fn write_to_redis(client: &Client, msg: CacheWriteMessage) -> AppResult<()> {
    let mut conn = client.get_multiplexed_async_connection().await?;
    let _: () = conn.set_ex(msg.key, msg.value, msg.ttl).await?;
    Ok(())
}
