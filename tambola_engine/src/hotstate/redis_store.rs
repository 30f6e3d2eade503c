//! Production `HotState` backed by Redis.
#![allow(clippy::needless_raw_string_hashes)]

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;

use super::{GameHotRow, HotState, HotStateError, HotStateResult, keys};
use crate::constants::{HOT_STATE_TTL_SECS, WINNER_LOCK_TTL_SECS};
use crate::game::entities::{Category, GameId, PlayerId, TicketState};

/// Redis-backed hot state.
///
/// Holds a [`ConnectionManager`], which multiplexes commands over a single
/// auto-reconnecting connection the way the durable store holds a
/// connection pool — callers never see the underlying transport.
#[derive(Clone)]
pub struct RedisHotState {
    conn: ConnectionManager,
}

impl RedisHotState {
    /// Connect to Redis at `url` (e.g. `redis://127.0.0.1:6379`).
    pub async fn connect(url: &str) -> HotStateResult<Self> {
        let client = redis::Client::open(url).map_err(HotStateError::from)?;
        let conn = client
            .get_connection_manager()
            .await
            .map_err(HotStateError::from)?;
        Ok(Self { conn })
    }

    fn encode_state(row: &GameHotRow) -> Vec<(&'static str, String)> {
        let called = row
            .called_numbers
            .iter()
            .map(u8::to_string)
            .collect::<Vec<_>>()
            .join(",");
        let won = row
            .won_categories
            .iter()
            .map(|c| c.as_str())
            .collect::<Vec<_>>()
            .join(",");
        vec![
            ("status", row.status.as_str().to_string()),
            ("calledNumbers", called),
            (
                "currentNumber",
                row.current_number.map(|n| n.to_string()).unwrap_or_default(),
            ),
            ("wonCategories", won),
            ("playerCount", row.player_count.to_string()),
        ]
    }

    fn decode_state(key: &str, fields: Vec<(String, String)>) -> HotStateResult<Option<GameHotRow>> {
        if fields.is_empty() {
            return Ok(None);
        }
        let mut status = None;
        let mut called_numbers = Vec::new();
        let mut current_number = None;
        let mut won_categories = std::collections::BTreeSet::new();
        let mut player_count = 0u32;

        for (field, value) in fields {
            match field.as_str() {
                "status" => {
                    status = Some(crate::game::entities::GameStatus::parse(&value).ok_or_else(|| {
                        HotStateError::Corrupt {
                            key: key.to_string(),
                            reason: format!("unrecognized status {value:?}"),
                        }
                    })?)
                }
                "calledNumbers" if !value.is_empty() => {
                    for part in value.split(',') {
                        called_numbers.push(part.parse::<u8>().map_err(|e| HotStateError::Corrupt {
                            key: key.to_string(),
                            reason: e.to_string(),
                        })?);
                    }
                }
                "currentNumber" if !value.is_empty() => {
                    current_number = Some(value.parse::<u8>().map_err(|e| HotStateError::Corrupt {
                        key: key.to_string(),
                        reason: e.to_string(),
                    })?);
                }
                "wonCategories" if !value.is_empty() => {
                    for part in value.split(',') {
                        let category = Category::parse(part).ok_or_else(|| HotStateError::Corrupt {
                            key: key.to_string(),
                            reason: format!("unrecognized category {part:?}"),
                        })?;
                        won_categories.insert(category);
                    }
                }
                "playerCount" => {
                    player_count = value.parse().unwrap_or(0);
                }
                _ => {}
            }
        }

        let status = status.ok_or_else(|| HotStateError::Corrupt {
            key: key.to_string(),
            reason: "missing status field".to_string(),
        })?;

        Ok(Some(GameHotRow {
            status,
            called_numbers,
            current_number,
            won_categories,
            player_count,
        }))
    }
}

#[async_trait]
impl HotState for RedisHotState {
    async fn write_state(&self, game_id: GameId, row: &GameHotRow) -> HotStateResult<()> {
        let key = keys::state(game_id);
        let mut conn = self.conn.clone();
        let fields = Self::encode_state(row);
        let _: () = conn.hset_multiple(&key, &fields).await?;
        let _: () = conn.expire(&key, HOT_STATE_TTL_SECS as i64).await?;
        Ok(())
    }

    async fn read_state(&self, game_id: GameId) -> HotStateResult<Option<GameHotRow>> {
        let key = keys::state(game_id);
        let mut conn = self.conn.clone();
        let fields: Vec<(String, String)> = conn.hgetall(&key).await?;
        Self::decode_state(&key, fields)
    }

    async fn set_player_count(&self, game_id: GameId, count: u32) -> HotStateResult<()> {
        let key = keys::state(game_id);
        let mut conn = self.conn.clone();
        let _: () = conn.hset(&key, "playerCount", count).await?;
        let _: () = conn.expire(&key, HOT_STATE_TTL_SECS as i64).await?;
        Ok(())
    }

    async fn write_ticket_state(
        &self,
        game_id: GameId,
        player_id: PlayerId,
        state: &TicketState,
    ) -> HotStateResult<()> {
        let key = keys::ticket(game_id, player_id);
        let marked = state
            .marked_numbers
            .iter()
            .map(u8::to_string)
            .collect::<Vec<_>>()
            .join(",");
        let mut conn = self.conn.clone();
        let _: () = conn
            .hset_multiple(
                &key,
                &[
                    ("markedNumbers", marked),
                    ("markedCount", state.marked_numbers.len().to_string()),
                ],
            )
            .await?;
        let _: () = conn.expire(&key, HOT_STATE_TTL_SECS as i64).await?;
        Ok(())
    }

    async fn read_ticket_state(
        &self,
        game_id: GameId,
        player_id: PlayerId,
    ) -> HotStateResult<Option<TicketState>> {
        let key = keys::ticket(game_id, player_id);
        let mut conn = self.conn.clone();
        let marked: Option<String> = conn.hget(&key, "markedNumbers").await?;
        Ok(marked.map(|s| TicketState {
            marked_numbers: if s.is_empty() {
                Default::default()
            } else {
                s.split(',').filter_map(|p| p.parse().ok()).collect()
            },
        }))
    }

    async fn try_acquire_winner_lock(
        &self,
        game_id: GameId,
        category: Category,
    ) -> HotStateResult<bool> {
        let key = keys::winner_lock(game_id, category);
        let mut conn = self.conn.clone();
        let acquired: bool = redis::cmd("SET")
            .arg(&key)
            .arg(1)
            .arg("NX")
            .arg("EX")
            .arg(WINNER_LOCK_TTL_SECS)
            .query_async::<Option<String>>(&mut conn)
            .await?
            .is_some();
        Ok(acquired)
    }

    async fn release_winner_lock(&self, game_id: GameId, category: Category) -> HotStateResult<()> {
        let key = keys::winner_lock(game_id, category);
        let mut conn = self.conn.clone();
        let _: () = conn.del(&key).await?;
        Ok(())
    }

    async fn delete_game_keys(&self, game_id: GameId) -> HotStateResult<()> {
        let pattern = keys::game_prefix(game_id);
        let mut conn = self.conn.clone();
        let mut cursor = 0u64;
        loop {
            let (next_cursor, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(200)
                .query_async(&mut conn)
                .await?;
            if !batch.is_empty() {
                let _: () = conn.del(&batch).await?;
            }
            cursor = next_cursor;
            if cursor == 0 {
                break;
            }
        }
        Ok(())
    }
}
