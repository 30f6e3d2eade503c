//! Socket session registry and per-game fan-out rooms.
//!
//! Rooms are identified `game:{gameId}`. `emit` never delivers directly to
//! local sockets: it always round-trips through the [`pubsub::PubSub`]
//! channel, so the single code path works identically whether the
//! publishing instance has zero or many local subscribers in that room.

pub mod errors;
pub mod pubsub;

pub use errors::{BroadcastError, BroadcastResult};
pub use pubsub::{LoopbackPubSub, PubSub, RedisPubSub};

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::game::entities::GameId;
use crate::game::messages::OutboundEvent;

pub type SocketId = Uuid;

fn room_name(game_id: GameId) -> String {
    format!("game:{game_id}")
}

struct RoomState {
    sockets: HashMap<SocketId, mpsc::Sender<OutboundEvent>>,
}

/// Process-local registry of connected sockets plus the cross-instance
/// pub/sub relay that makes `emit` visible everywhere.
pub struct Broadcaster {
    pubsub: Arc<dyn PubSub>,
    rooms: Arc<Mutex<HashMap<String, RoomState>>>,
}

impl Broadcaster {
    pub fn new(pubsub: Arc<dyn PubSub>) -> Self {
        Self {
            pubsub,
            rooms: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Register a socket in `game:{gameId}`'s room. Spawns the relay task
    /// for that room's channel on first local subscriber.
    pub async fn join(&self, game_id: GameId, socket_id: SocketId, sender: mpsc::Sender<OutboundEvent>) {
        let room = room_name(game_id);
        let needs_relay = {
            let mut rooms = self.rooms.lock().unwrap();
            let state = rooms.entry(room.clone()).or_insert_with(|| RoomState {
                sockets: HashMap::new(),
            });
            let was_empty = state.sockets.is_empty();
            state.sockets.insert(socket_id, sender);
            was_empty
        };

        if needs_relay {
            self.spawn_relay(room).await;
        }
    }

    pub fn leave(&self, game_id: GameId, socket_id: SocketId) {
        let room = room_name(game_id);
        if let Some(state) = self.rooms.lock().unwrap().get_mut(&room) {
            state.sockets.remove(&socket_id);
        }
    }

    /// Publish an event to every socket in the room, on every instance.
    pub async fn emit(&self, game_id: GameId, event: OutboundEvent) -> BroadcastResult<()> {
        let room = room_name(game_id);
        let payload = serde_json::to_string(&event)?;
        self.pubsub.publish(&room, payload).await
    }

    /// Deliver an event to a single socket without going through pub/sub;
    /// used for point-to-point acks which are never cross-instance.
    pub fn emit_to(&self, game_id: GameId, socket_id: SocketId, event: OutboundEvent) {
        let room = room_name(game_id);
        let rooms = self.rooms.lock().unwrap();
        if let Some(state) = rooms.get(&room) {
            if let Some(sender) = state.sockets.get(&socket_id) {
                let _ = sender.try_send(event);
            }
        }
    }

    async fn spawn_relay(&self, room: String) {
        let mut rx = match self.pubsub.subscribe(&room).await {
            Ok(rx) => rx,
            Err(e) => {
                log::error!("failed to subscribe broadcaster to {room}: {e}");
                return;
            }
        };

        let rooms = self.rooms_handle();
        let room_for_task = room.clone();
        tokio::spawn(async move {
            while let Some(payload) = rx.recv().await {
                let event: OutboundEvent = match serde_json::from_str(&payload) {
                    Ok(e) => e,
                    Err(e) => {
                        log::warn!("undecodable broadcast payload on {room_for_task}: {e}");
                        continue;
                    }
                };
                let senders: Vec<_> = {
                    let rooms = rooms.lock().unwrap();
                    match rooms.get(&room_for_task) {
                        Some(state) => state.sockets.values().cloned().collect(),
                        None => Vec::new(),
                    }
                };
                for sender in senders {
                    let _ = sender.send(event.clone()).await;
                }
            }
        });
    }

    fn rooms_handle(&self) -> Arc<Mutex<HashMap<String, RoomState>>> {
        self.rooms.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn emit_reaches_every_socket_in_room() {
        let broadcaster = Broadcaster::new(Arc::new(LoopbackPubSub::new()));
        let game_id = GameId::new_v4();
        let (tx1, mut rx1) = mpsc::channel(8);
        let (tx2, mut rx2) = mpsc::channel(8);
        broadcaster.join(game_id, Uuid::new_v4(), tx1).await;
        broadcaster.join(game_id, Uuid::new_v4(), tx2).await;

        broadcaster
            .emit(game_id, OutboundEvent::NumberCalled { number: 42 })
            .await
            .unwrap();

        let got1 = rx1.recv().await.unwrap();
        let got2 = rx2.recv().await.unwrap();
        assert!(matches!(got1, OutboundEvent::NumberCalled { number: 42 }));
        assert!(matches!(got2, OutboundEvent::NumberCalled { number: 42 }));
    }

    #[tokio::test]
    async fn leave_stops_further_delivery() {
        let broadcaster = Broadcaster::new(Arc::new(LoopbackPubSub::new()));
        let game_id = GameId::new_v4();
        let socket_id = Uuid::new_v4();
        let (tx, mut rx) = mpsc::channel(8);
        broadcaster.join(game_id, socket_id, tx).await;
        broadcaster.leave(game_id, socket_id);

        broadcaster
            .emit(game_id, OutboundEvent::NumberCalled { number: 1 })
            .await
            .unwrap();

        let result = tokio::time::timeout(std::time::Duration::from_millis(50), rx.recv()).await;
        assert!(result.is_err(), "socket that left should receive nothing");
    }
}
