//! Cross-instance pub/sub adapter, kept as a small trait so the Redis
//! channel implementation and an in-process loopback are interchangeable.

use async_trait::async_trait;
use futures_util::StreamExt;
use tokio::sync::mpsc;

use super::errors::{BroadcastError, BroadcastResult};

/// Publishes to and subscribes from a named channel. A production instance
/// publishing to a channel must be visible to every other instance
/// subscribed to that same channel, including itself.
#[async_trait]
pub trait PubSub: Send + Sync {
    async fn publish(&self, channel: &str, payload: String) -> BroadcastResult<()>;

    /// Subscribe to a channel, returning a receiver fed by a background task
    /// for as long as the returned sender side stays alive.
    async fn subscribe(&self, channel: &str) -> BroadcastResult<mpsc::Receiver<String>>;
}

/// Redis-backed implementation using `PUBLISH`/`SUBSCRIBE`.
#[derive(Clone)]
pub struct RedisPubSub {
    client: redis::Client,
}

impl RedisPubSub {
    pub fn new(url: &str) -> BroadcastResult<Self> {
        Ok(Self {
            client: redis::Client::open(url).map_err(BroadcastError::from)?,
        })
    }
}

#[async_trait]
impl PubSub for RedisPubSub {
    async fn publish(&self, channel: &str, payload: String) -> BroadcastResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let _: () = redis::cmd("PUBLISH")
            .arg(channel)
            .arg(payload)
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn subscribe(&self, channel: &str) -> BroadcastResult<mpsc::Receiver<String>> {
        let client = self.client.clone();
        let channel = channel.to_string();
        let (tx, rx) = mpsc::channel(256);

        tokio::spawn(async move {
            let pubsub_conn = match client.get_async_pubsub().await {
                Ok(c) => c,
                Err(e) => {
                    log::error!("redis pub/sub connect failed for {channel}: {e}");
                    return;
                }
            };
            let mut pubsub_conn = pubsub_conn;
            if let Err(e) = pubsub_conn.subscribe(&channel).await {
                log::error!("redis subscribe failed for {channel}: {e}");
                return;
            }
            let mut stream = pubsub_conn.on_message();
            while let Some(msg) = stream.next().await {
                let payload: String = match msg.get_payload() {
                    Ok(p) => p,
                    Err(e) => {
                        log::warn!("undecodable pub/sub payload on {channel}: {e}");
                        continue;
                    }
                };
                if tx.send(payload).await.is_err() {
                    break;
                }
            }
        });

        Ok(rx)
    }
}

/// In-process loopback used by tests and single-instance deployments: a
/// publish is delivered directly to every local subscriber.
#[derive(Default)]
pub struct LoopbackPubSub {
    channels: std::sync::Mutex<std::collections::HashMap<String, Vec<mpsc::Sender<String>>>>,
}

impl LoopbackPubSub {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PubSub for LoopbackPubSub {
    async fn publish(&self, channel: &str, payload: String) -> BroadcastResult<()> {
        let senders = {
            let channels = self.channels.lock().unwrap();
            channels.get(channel).cloned().unwrap_or_default()
        };
        for sender in senders {
            let _ = sender.send(payload.clone()).await;
        }
        Ok(())
    }

    async fn subscribe(&self, channel: &str) -> BroadcastResult<mpsc::Receiver<String>> {
        let (tx, rx) = mpsc::channel(256);
        self.channels
            .lock()
            .unwrap()
            .entry(channel.to_string())
            .or_default()
            .push(tx);
        Ok(rx)
    }
}
