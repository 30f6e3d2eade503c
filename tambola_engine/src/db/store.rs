//! Durable store trait and its two implementations: the production
//! PostgreSQL-backed store and an in-memory double used by tests.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgPool, Row};

use super::errors::{DbError, DbResult};
use super::timeouts::with_default_timeout;
use crate::game::entities::{Category, Game, GameId, Player, PlayerId, Ticket, UserId, Winner};
use crate::prize_queue::models::{PrizeQueueItem, PrizeQueueItemId, PrizeStatus};

/// Relational persistence for games, players, winners and prize-queue rows.
///
/// Every insert that the design marks idempotent (`(gameId, userId)` on
/// Player, `(gameId, category)` on Winner, `(userId, gameId, category)` on
/// PrizeQueueItem) returns the existing row instead of erroring on conflict,
/// so callers never have to special-case "already there".
#[async_trait]
pub trait DurableStore: Send + Sync {
    async fn get_game(&self, game_id: GameId) -> DbResult<Option<Game>>;
    async fn insert_game(&self, game: &Game) -> DbResult<()>;
    async fn set_game_status(&self, game_id: GameId, status: crate::game::entities::GameStatus) -> DbResult<()>;
    async fn mark_started(&self, game_id: GameId) -> DbResult<()>;
    async fn mark_ended(&self, game_id: GameId, status: crate::game::entities::GameStatus) -> DbResult<()>;
    async fn sync_called_numbers(
        &self,
        game_id: GameId,
        called_numbers: &[u8],
        current_number: Option<u8>,
    ) -> DbResult<()>;

    /// Idempotent insert by `(gameId, userId)`: returns the pre-existing
    /// player on rejoin instead of erroring.
    async fn upsert_player(
        &self,
        game_id: GameId,
        user_id: UserId,
        user_name: &str,
        ticket: Ticket,
    ) -> DbResult<Player>;
    async fn find_player_by_user(&self, game_id: GameId, user_id: UserId) -> DbResult<Option<Player>>;
    async fn find_player(&self, player_id: PlayerId) -> DbResult<Option<Player>>;
    async fn list_players(&self, game_id: GameId) -> DbResult<Vec<Player>>;
    async fn count_players(&self, game_id: GameId) -> DbResult<u32>;

    /// Idempotent insert by `(gameId, category)`: `Ok(None)` means another
    /// caller already holds that category's Winner row.
    async fn try_insert_winner(&self, winner: &Winner) -> DbResult<Option<Winner>>;
    async fn get_winner(&self, game_id: GameId, category: Category) -> DbResult<Option<Winner>>;
    async fn list_winners(&self, game_id: GameId) -> DbResult<Vec<Winner>>;
    async fn mark_prize_claimed(&self, winner_id: crate::game::entities::WinnerId, prize_value: i64) -> DbResult<()>;

    /// Idempotent insert by `(userId, gameId, category)`.
    async fn try_enqueue_prize(&self, item: &PrizeQueueItem) -> DbResult<PrizeQueueItem>;
    async fn get_prize_item(&self, id: PrizeQueueItemId) -> DbResult<Option<PrizeQueueItem>>;
    async fn cas_prize_status(
        &self,
        id: PrizeQueueItemId,
        expected: PrizeStatus,
        next: PrizeStatus,
    ) -> DbResult<bool>;
    async fn record_prize_attempt(
        &self,
        id: PrizeQueueItemId,
        attempts: u32,
        status: PrizeStatus,
        error: Option<String>,
    ) -> DbResult<()>;
    async fn reap_stale_processing(&self, lease_secs: i64) -> DbResult<Vec<PrizeQueueItemId>>;
    async fn reset_for_manual_retry(&self, id: PrizeQueueItemId) -> DbResult<()>;

    /// Every `FAILED` item whose backoff window (per
    /// [`PrizeQueueItem::retry_delay_secs`]) has elapsed as of `now`.
    async fn list_retry_ready(&self, now: chrono::DateTime<Utc>) -> DbResult<Vec<PrizeQueueItemId>>;

    /// Freshly-enqueued items still at `PENDING`, never yet attempted.
    async fn list_pending(&self) -> DbResult<Vec<PrizeQueueItemId>>;
}

/// Production implementation backed by a pooled `sqlx::PgPool`.
#[derive(Clone)]
pub struct PgDurableStore {
    pool: PgPool,
}

impl PgDurableStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_game(row: &sqlx::postgres::PgRow) -> DbResult<Game> {
        use crate::game::entities::{GameStatus, PrizeTable};
        let status_str: String = row.get("status");
        let status = GameStatus::parse(&status_str).unwrap_or(GameStatus::Lobby);
        let called_numbers: Vec<i32> = row.get("called_numbers");
        Ok(Game {
            id: row.get("id"),
            scheduled_time: row.get::<chrono::NaiveDateTime, _>("scheduled_time").and_utc(),
            started_at: row
                .get::<Option<chrono::NaiveDateTime>, _>("started_at")
                .map(|t| t.and_utc()),
            ended_at: row
                .get::<Option<chrono::NaiveDateTime>, _>("ended_at")
                .map(|t| t.and_utc()),
            status,
            created_by: row.get("created_by"),
            prizes: PrizeTable {
                early5: row.get("prize_early5"),
                top_line: row.get("prize_top_line"),
                middle_line: row.get("prize_middle_line"),
                bottom_line: row.get("prize_bottom_line"),
                full_house: row.get("prize_full_house"),
            },
            called_numbers: called_numbers.into_iter().map(|n| n as u8).collect(),
            current_number: row.get::<Option<i32>, _>("current_number").map(|n| n as u8),
        })
    }

    fn row_to_player(row: &sqlx::postgres::PgRow) -> DbResult<Player> {
        let grid: Vec<Vec<i32>> = serde_json::from_value(row.get("ticket")).map_err(|e| {
            DbError::Query(sqlx::Error::Decode(Box::new(e)))
        })?;
        let mut flat = [[0u8; crate::constants::TICKET_COLS]; crate::constants::TICKET_ROWS];
        for (r, cols) in grid.iter().enumerate().take(crate::constants::TICKET_ROWS) {
            for (c, v) in cols.iter().enumerate().take(crate::constants::TICKET_COLS) {
                flat[r][c] = *v as u8;
            }
        }
        Ok(Player {
            id: row.get("id"),
            game_id: row.get("game_id"),
            user_id: row.get("user_id"),
            user_name: row.get("user_name"),
            ticket: Ticket(flat),
            joined_at: row.get::<chrono::NaiveDateTime, _>("joined_at").and_utc(),
        })
    }

    fn row_to_winner(row: &sqlx::postgres::PgRow) -> DbResult<Winner> {
        let category_str: String = row.get("category");
        let category = Category::parse(&category_str).ok_or_else(|| {
            DbError::Query(sqlx::Error::ColumnDecode {
                index: "category".into(),
                source: "unrecognized category".into(),
            })
        })?;
        Ok(Winner {
            id: row.get("id"),
            game_id: row.get("game_id"),
            player_id: row.get("player_id"),
            category,
            claimed_at: row.get::<chrono::NaiveDateTime, _>("claimed_at").and_utc(),
            prize_claimed: row.get("prize_claimed"),
            prize_value: row.get("prize_value"),
        })
    }

    fn row_to_prize_item(row: &sqlx::postgres::PgRow) -> DbResult<PrizeQueueItem> {
        let category_str: String = row.get("category");
        let category = Category::parse(&category_str).ok_or_else(|| {
            DbError::Query(sqlx::Error::ColumnDecode {
                index: "category".into(),
                source: "unrecognized category".into(),
            })
        })?;
        let status_str: String = row.get("status");
        let status = PrizeStatus::parse(&status_str).unwrap_or(PrizeStatus::Pending);
        Ok(PrizeQueueItem {
            id: row.get("id"),
            user_id: row.get("user_id"),
            game_id: row.get("game_id"),
            category,
            prize_value: row.get("prize_value"),
            status,
            attempts: row.get::<i32, _>("attempts") as u32,
            last_attempt: row
                .get::<Option<chrono::NaiveDateTime>, _>("last_attempt")
                .map(|t| t.and_utc()),
            error: row.get("error"),
            idempotency_key: row.get("idempotency_key"),
            created_at: row.get::<chrono::NaiveDateTime, _>("created_at").and_utc(),
        })
    }
}

#[async_trait]
impl DurableStore for PgDurableStore {
    async fn get_game(&self, game_id: GameId) -> DbResult<Option<Game>> {
        let row = with_default_timeout(
            sqlx::query(
                "SELECT id, scheduled_time, started_at, ended_at, status, created_by,
                        prize_early5, prize_top_line, prize_middle_line, prize_bottom_line, prize_full_house,
                        called_numbers, current_number
                 FROM games WHERE id = $1",
            )
            .bind(game_id)
            .fetch_optional(&self.pool),
        )
        .await?;
        row.as_ref().map(Self::row_to_game).transpose()
    }

    async fn insert_game(&self, game: &Game) -> DbResult<()> {
        let called: Vec<i32> = game.called_numbers.iter().map(|&n| n as i32).collect();
        with_default_timeout(
            sqlx::query(
                "INSERT INTO games (id, scheduled_time, status, created_by,
                    prize_early5, prize_top_line, prize_middle_line, prize_bottom_line, prize_full_house,
                    called_numbers, current_number)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
                 ON CONFLICT (id) DO NOTHING",
            )
            .bind(game.id)
            .bind(game.scheduled_time.naive_utc())
            .bind(game.status.as_str())
            .bind(game.created_by)
            .bind(game.prizes.early5)
            .bind(game.prizes.top_line)
            .bind(game.prizes.middle_line)
            .bind(game.prizes.bottom_line)
            .bind(game.prizes.full_house)
            .bind(&called)
            .bind(game.current_number.map(|n| n as i32))
            .execute(&self.pool),
        )
        .await?;
        Ok(())
    }

    async fn set_game_status(&self, game_id: GameId, status: crate::game::entities::GameStatus) -> DbResult<()> {
        with_default_timeout(
            sqlx::query("UPDATE games SET status = $1 WHERE id = $2")
                .bind(status.as_str())
                .bind(game_id)
                .execute(&self.pool),
        )
        .await?;
        Ok(())
    }

    async fn mark_started(&self, game_id: GameId) -> DbResult<()> {
        with_default_timeout(
            sqlx::query(
                "UPDATE games SET status = 'ACTIVE', started_at = NOW() WHERE id = $1",
            )
            .bind(game_id)
            .execute(&self.pool),
        )
        .await?;
        Ok(())
    }

    async fn mark_ended(&self, game_id: GameId, status: crate::game::entities::GameStatus) -> DbResult<()> {
        with_default_timeout(
            sqlx::query("UPDATE games SET status = $1, ended_at = NOW() WHERE id = $2")
                .bind(status.as_str())
                .bind(game_id)
                .execute(&self.pool),
        )
        .await?;
        Ok(())
    }

    async fn sync_called_numbers(
        &self,
        game_id: GameId,
        called_numbers: &[u8],
        current_number: Option<u8>,
    ) -> DbResult<()> {
        let called: Vec<i32> = called_numbers.iter().map(|&n| n as i32).collect();
        with_default_timeout(
            sqlx::query("UPDATE games SET called_numbers = $1, current_number = $2 WHERE id = $3")
                .bind(&called)
                .bind(current_number.map(|n| n as i32))
                .bind(game_id)
                .execute(&self.pool),
        )
        .await?;
        Ok(())
    }

    async fn upsert_player(
        &self,
        game_id: GameId,
        user_id: UserId,
        user_name: &str,
        ticket: Ticket,
    ) -> DbResult<Player> {
        if let Some(existing) = self.find_player_by_user(game_id, user_id).await? {
            return Ok(existing);
        }
        let grid: Vec<Vec<u8>> = ticket.0.iter().map(|row| row.to_vec()).collect();
        let ticket_json = serde_json::to_value(&grid).expect("ticket grid is always serializable");
        let row = with_default_timeout(
            sqlx::query(
                "INSERT INTO players (id, game_id, user_id, user_name, ticket)
                 VALUES (gen_random_uuid(), $1, $2, $3, $4)
                 ON CONFLICT (game_id, user_id) DO UPDATE SET user_name = players.user_name
                 RETURNING id, game_id, user_id, user_name, ticket, joined_at",
            )
            .bind(game_id)
            .bind(user_id)
            .bind(user_name)
            .bind(ticket_json)
            .fetch_one(&self.pool),
        )
        .await?;
        Self::row_to_player(&row)
    }

    async fn find_player_by_user(&self, game_id: GameId, user_id: UserId) -> DbResult<Option<Player>> {
        let row = with_default_timeout(
            sqlx::query(
                "SELECT id, game_id, user_id, user_name, ticket, joined_at
                 FROM players WHERE game_id = $1 AND user_id = $2",
            )
            .bind(game_id)
            .bind(user_id)
            .fetch_optional(&self.pool),
        )
        .await?;
        row.as_ref().map(Self::row_to_player).transpose()
    }

    async fn find_player(&self, player_id: PlayerId) -> DbResult<Option<Player>> {
        let row = with_default_timeout(
            sqlx::query("SELECT id, game_id, user_id, user_name, ticket, joined_at FROM players WHERE id = $1")
                .bind(player_id)
                .fetch_optional(&self.pool),
        )
        .await?;
        row.as_ref().map(Self::row_to_player).transpose()
    }

    async fn list_players(&self, game_id: GameId) -> DbResult<Vec<Player>> {
        let rows = with_default_timeout(
            sqlx::query(
                "SELECT id, game_id, user_id, user_name, ticket, joined_at
                 FROM players WHERE game_id = $1 ORDER BY joined_at",
            )
            .bind(game_id)
            .fetch_all(&self.pool),
        )
        .await?;
        rows.iter().map(Self::row_to_player).collect()
    }

    async fn count_players(&self, game_id: GameId) -> DbResult<u32> {
        let row = with_default_timeout(
            sqlx::query("SELECT COUNT(*) AS n FROM players WHERE game_id = $1")
                .bind(game_id)
                .fetch_one(&self.pool),
        )
        .await?;
        Ok(row.get::<i64, _>("n") as u32)
    }

    async fn try_insert_winner(&self, winner: &Winner) -> DbResult<Option<Winner>> {
        let row = with_default_timeout(
            sqlx::query(
                "INSERT INTO winners (id, game_id, player_id, category, claimed_at, prize_claimed, prize_value)
                 VALUES ($1, $2, $3, $4, $5, $6, $7)
                 ON CONFLICT (game_id, category) DO NOTHING
                 RETURNING id, game_id, player_id, category, claimed_at, prize_claimed, prize_value",
            )
            .bind(winner.id)
            .bind(winner.game_id)
            .bind(winner.player_id)
            .bind(winner.category.as_str())
            .bind(winner.claimed_at.naive_utc())
            .bind(winner.prize_claimed)
            .bind(winner.prize_value)
            .fetch_optional(&self.pool),
        )
        .await?;
        row.as_ref().map(Self::row_to_winner).transpose()
    }

    async fn get_winner(&self, game_id: GameId, category: Category) -> DbResult<Option<Winner>> {
        let row = with_default_timeout(
            sqlx::query(
                "SELECT id, game_id, player_id, category, claimed_at, prize_claimed, prize_value
                 FROM winners WHERE game_id = $1 AND category = $2",
            )
            .bind(game_id)
            .bind(category.as_str())
            .fetch_optional(&self.pool),
        )
        .await?;
        row.as_ref().map(Self::row_to_winner).transpose()
    }

    async fn list_winners(&self, game_id: GameId) -> DbResult<Vec<Winner>> {
        let rows = with_default_timeout(
            sqlx::query(
                "SELECT id, game_id, player_id, category, claimed_at, prize_claimed, prize_value
                 FROM winners WHERE game_id = $1 ORDER BY claimed_at",
            )
            .bind(game_id)
            .fetch_all(&self.pool),
        )
        .await?;
        rows.iter().map(Self::row_to_winner).collect()
    }

    async fn mark_prize_claimed(&self, winner_id: crate::game::entities::WinnerId, prize_value: i64) -> DbResult<()> {
        with_default_timeout(
            sqlx::query("UPDATE winners SET prize_claimed = TRUE, prize_value = $1 WHERE id = $2")
                .bind(prize_value)
                .bind(winner_id)
                .execute(&self.pool),
        )
        .await?;
        Ok(())
    }

    async fn try_enqueue_prize(&self, item: &PrizeQueueItem) -> DbResult<PrizeQueueItem> {
        let row = with_default_timeout(
            sqlx::query(
                "INSERT INTO prize_queue_items
                    (id, user_id, game_id, category, prize_value, status, attempts, idempotency_key, created_at)
                 VALUES ($1, $2, $3, $4, $5, $6, 0, $7, $8)
                 ON CONFLICT (user_id, game_id, category) DO UPDATE SET user_id = prize_queue_items.user_id
                 RETURNING id, user_id, game_id, category, prize_value, status, attempts,
                           last_attempt, error, idempotency_key, created_at",
            )
            .bind(item.id)
            .bind(item.user_id)
            .bind(item.game_id)
            .bind(item.category.as_str())
            .bind(item.prize_value)
            .bind(PrizeStatus::Pending.as_str())
            .bind(&item.idempotency_key)
            .bind(item.created_at.naive_utc())
            .fetch_one(&self.pool),
        )
        .await?;
        Self::row_to_prize_item(&row)
    }

    async fn get_prize_item(&self, id: PrizeQueueItemId) -> DbResult<Option<PrizeQueueItem>> {
        let row = with_default_timeout(
            sqlx::query(
                "SELECT id, user_id, game_id, category, prize_value, status, attempts,
                        last_attempt, error, idempotency_key, created_at
                 FROM prize_queue_items WHERE id = $1",
            )
            .bind(id)
            .fetch_optional(&self.pool),
        )
        .await?;
        row.as_ref().map(Self::row_to_prize_item).transpose()
    }

    async fn cas_prize_status(
        &self,
        id: PrizeQueueItemId,
        expected: PrizeStatus,
        next: PrizeStatus,
    ) -> DbResult<bool> {
        let result = with_default_timeout(
            sqlx::query("UPDATE prize_queue_items SET status = $1 WHERE id = $2 AND status = $3")
                .bind(next.as_str())
                .bind(id)
                .bind(expected.as_str())
                .execute(&self.pool),
        )
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn record_prize_attempt(
        &self,
        id: PrizeQueueItemId,
        attempts: u32,
        status: PrizeStatus,
        error: Option<String>,
    ) -> DbResult<()> {
        with_default_timeout(
            sqlx::query(
                "UPDATE prize_queue_items
                 SET attempts = $1, status = $2, error = $3, last_attempt = NOW()
                 WHERE id = $4",
            )
            .bind(attempts as i32)
            .bind(status.as_str())
            .bind(error)
            .bind(id)
            .execute(&self.pool),
        )
        .await?;
        Ok(())
    }

    async fn reap_stale_processing(&self, lease_secs: i64) -> DbResult<Vec<PrizeQueueItemId>> {
        let rows = with_default_timeout(
            sqlx::query(
                "UPDATE prize_queue_items
                 SET status = 'PENDING'
                 WHERE status = 'PROCESSING' AND last_attempt < NOW() - ($1 || ' seconds')::interval
                 RETURNING id",
            )
            .bind(lease_secs.to_string())
            .fetch_all(&self.pool),
        )
        .await?;
        Ok(rows.iter().map(|r| r.get("id")).collect())
    }

    async fn reset_for_manual_retry(&self, id: PrizeQueueItemId) -> DbResult<()> {
        with_default_timeout(
            sqlx::query(
                "UPDATE prize_queue_items SET attempts = 0, status = 'PENDING', error = NULL WHERE id = $1",
            )
            .bind(id)
            .execute(&self.pool),
        )
        .await?;
        Ok(())
    }

    async fn list_retry_ready(&self, now: chrono::DateTime<Utc>) -> DbResult<Vec<PrizeQueueItemId>> {
        let rows = with_default_timeout(
            sqlx::query("SELECT id, attempts, last_attempt FROM prize_queue_items WHERE status = 'FAILED'")
                .fetch_all(&self.pool),
        )
        .await?;
        Ok(rows
            .iter()
            .filter_map(|row| {
                let attempts: i32 = row.get("attempts");
                let last_attempt: Option<chrono::NaiveDateTime> = row.get("last_attempt");
                let due = last_attempt
                    .map(|t| t.and_utc())
                    .zip(PrizeQueueItem::retry_delay_secs(attempts as u32))
                    .is_some_and(|(last, delay)| now - last >= chrono::Duration::seconds(delay as i64));
                due.then(|| row.get("id"))
            })
            .collect())
    }

    async fn list_pending(&self) -> DbResult<Vec<PrizeQueueItemId>> {
        let rows = with_default_timeout(
            sqlx::query("SELECT id FROM prize_queue_items WHERE status = 'PENDING'").fetch_all(&self.pool),
        )
        .await?;
        Ok(rows.iter().map(|r| r.get("id")).collect())
    }
}

/// In-memory double used by GameEngine/PrizeQueue tests so neither needs a
/// running Postgres.
#[derive(Default)]
pub struct InMemoryDurableStore {
    games: std::sync::Mutex<std::collections::HashMap<GameId, Game>>,
    players: std::sync::Mutex<std::collections::HashMap<PlayerId, Player>>,
    winners: std::sync::Mutex<std::collections::HashMap<(GameId, Category), Winner>>,
    prize_items: std::sync::Mutex<std::collections::HashMap<PrizeQueueItemId, PrizeQueueItem>>,
}

impl InMemoryDurableStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DurableStore for InMemoryDurableStore {
    async fn get_game(&self, game_id: GameId) -> DbResult<Option<Game>> {
        Ok(self.games.lock().unwrap().get(&game_id).cloned())
    }

    async fn insert_game(&self, game: &Game) -> DbResult<()> {
        self.games.lock().unwrap().entry(game.id).or_insert_with(|| game.clone());
        Ok(())
    }

    async fn set_game_status(&self, game_id: GameId, status: crate::game::entities::GameStatus) -> DbResult<()> {
        if let Some(g) = self.games.lock().unwrap().get_mut(&game_id) {
            g.status = status;
        }
        Ok(())
    }

    async fn mark_started(&self, game_id: GameId) -> DbResult<()> {
        if let Some(g) = self.games.lock().unwrap().get_mut(&game_id) {
            g.status = crate::game::entities::GameStatus::Active;
            g.started_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn mark_ended(&self, game_id: GameId, status: crate::game::entities::GameStatus) -> DbResult<()> {
        if let Some(g) = self.games.lock().unwrap().get_mut(&game_id) {
            g.status = status;
            g.ended_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn sync_called_numbers(
        &self,
        game_id: GameId,
        called_numbers: &[u8],
        current_number: Option<u8>,
    ) -> DbResult<()> {
        if let Some(g) = self.games.lock().unwrap().get_mut(&game_id) {
            g.called_numbers = called_numbers.to_vec();
            g.current_number = current_number;
        }
        Ok(())
    }

    async fn upsert_player(
        &self,
        game_id: GameId,
        user_id: UserId,
        user_name: &str,
        ticket: Ticket,
    ) -> DbResult<Player> {
        if let Some(existing) = self.find_player_by_user(game_id, user_id).await? {
            return Ok(existing);
        }
        let player = Player {
            id: PlayerId::new_v4(),
            game_id,
            user_id,
            user_name: user_name.to_string(),
            ticket,
            joined_at: Utc::now(),
        };
        self.players.lock().unwrap().insert(player.id, player.clone());
        Ok(player)
    }

    async fn find_player_by_user(&self, game_id: GameId, user_id: UserId) -> DbResult<Option<Player>> {
        Ok(self
            .players
            .lock()
            .unwrap()
            .values()
            .find(|p| p.game_id == game_id && p.user_id == user_id)
            .cloned())
    }

    async fn find_player(&self, player_id: PlayerId) -> DbResult<Option<Player>> {
        Ok(self.players.lock().unwrap().get(&player_id).cloned())
    }

    async fn list_players(&self, game_id: GameId) -> DbResult<Vec<Player>> {
        Ok(self
            .players
            .lock()
            .unwrap()
            .values()
            .filter(|p| p.game_id == game_id)
            .cloned()
            .collect())
    }

    async fn count_players(&self, game_id: GameId) -> DbResult<u32> {
        Ok(self.list_players(game_id).await?.len() as u32)
    }

    async fn try_insert_winner(&self, winner: &Winner) -> DbResult<Option<Winner>> {
        let mut winners = self.winners.lock().unwrap();
        let key = (winner.game_id, winner.category);
        if winners.contains_key(&key) {
            return Ok(None);
        }
        winners.insert(key, winner.clone());
        Ok(Some(winner.clone()))
    }

    async fn get_winner(&self, game_id: GameId, category: Category) -> DbResult<Option<Winner>> {
        Ok(self.winners.lock().unwrap().get(&(game_id, category)).cloned())
    }

    async fn list_winners(&self, game_id: GameId) -> DbResult<Vec<Winner>> {
        Ok(self
            .winners
            .lock()
            .unwrap()
            .values()
            .filter(|w| w.game_id == game_id)
            .cloned()
            .collect())
    }

    async fn mark_prize_claimed(&self, winner_id: crate::game::entities::WinnerId, prize_value: i64) -> DbResult<()> {
        let mut winners = self.winners.lock().unwrap();
        if let Some(w) = winners.values_mut().find(|w| w.id == winner_id) {
            w.prize_claimed = true;
            w.prize_value = Some(prize_value);
        }
        Ok(())
    }

    async fn try_enqueue_prize(&self, item: &PrizeQueueItem) -> DbResult<PrizeQueueItem> {
        let mut items = self.prize_items.lock().unwrap();
        if let Some(existing) = items
            .values()
            .find(|i| i.user_id == item.user_id && i.game_id == item.game_id && i.category == item.category)
        {
            return Ok(existing.clone());
        }
        items.insert(item.id, item.clone());
        Ok(item.clone())
    }

    async fn get_prize_item(&self, id: PrizeQueueItemId) -> DbResult<Option<PrizeQueueItem>> {
        Ok(self.prize_items.lock().unwrap().get(&id).cloned())
    }

    async fn cas_prize_status(
        &self,
        id: PrizeQueueItemId,
        expected: PrizeStatus,
        next: PrizeStatus,
    ) -> DbResult<bool> {
        let mut items = self.prize_items.lock().unwrap();
        match items.get_mut(&id) {
            Some(item) if item.status == expected => {
                item.status = next;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn record_prize_attempt(
        &self,
        id: PrizeQueueItemId,
        attempts: u32,
        status: PrizeStatus,
        error: Option<String>,
    ) -> DbResult<()> {
        if let Some(item) = self.prize_items.lock().unwrap().get_mut(&id) {
            item.attempts = attempts;
            item.status = status;
            item.error = error;
            item.last_attempt = Some(Utc::now());
        }
        Ok(())
    }

    async fn reap_stale_processing(&self, lease_secs: i64) -> DbResult<Vec<PrizeQueueItemId>> {
        let mut items = self.prize_items.lock().unwrap();
        let now = Utc::now();
        let mut reaped = Vec::new();
        for item in items.values_mut() {
            if item.status == PrizeStatus::Processing {
                if let Some(last) = item.last_attempt {
                    if (now - last).num_seconds() >= lease_secs {
                        item.status = PrizeStatus::Pending;
                        reaped.push(item.id);
                    }
                }
            }
        }
        Ok(reaped)
    }

    async fn reset_for_manual_retry(&self, id: PrizeQueueItemId) -> DbResult<()> {
        if let Some(item) = self.prize_items.lock().unwrap().get_mut(&id) {
            item.attempts = 0;
            item.status = PrizeStatus::Pending;
            item.error = None;
        }
        Ok(())
    }

    async fn list_retry_ready(&self, now: chrono::DateTime<Utc>) -> DbResult<Vec<PrizeQueueItemId>> {
        let items = self.prize_items.lock().unwrap();
        Ok(items
            .values()
            .filter(|item| {
                item.status == PrizeStatus::Failed
                    && item
                        .last_attempt
                        .zip(PrizeQueueItem::retry_delay_secs(item.attempts))
                        .is_some_and(|(last, delay)| now - last >= chrono::Duration::seconds(delay as i64))
            })
            .map(|item| item.id)
            .collect())
    }

    async fn list_pending(&self) -> DbResult<Vec<PrizeQueueItemId>> {
        Ok(self
            .prize_items
            .lock()
            .unwrap()
            .values()
            .filter(|item| item.status == PrizeStatus::Pending)
            .map(|item| item.id)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::entities::{GameStatus, PrizeTable, Ticket};

    fn sample_game() -> Game {
        Game::new(GameId::new_v4(), UserId::new_v4(), Utc::now(), PrizeTable::default())
    }

    #[tokio::test]
    async fn player_upsert_is_idempotent() {
        let store = InMemoryDurableStore::new();
        let game = sample_game();
        store.insert_game(&game).await.unwrap();
        let user_id = UserId::new_v4();
        let ticket = Ticket([[0u8; 9]; 3]);

        let first = store
            .upsert_player(game.id, user_id, "alice", ticket.clone())
            .await
            .unwrap();
        let second = store
            .upsert_player(game.id, user_id, "alice-again", ticket)
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(store.count_players(game.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn winner_insert_rejects_second_category_claim() {
        let store = InMemoryDurableStore::new();
        let game = sample_game();
        store.insert_game(&game).await.unwrap();
        let player_id = PlayerId::new_v4();

        let winner_a = Winner {
            id: uuid::Uuid::new_v4(),
            game_id: game.id,
            player_id,
            category: Category::FullHouse,
            claimed_at: Utc::now(),
            prize_claimed: false,
            prize_value: None,
        };
        let winner_b = Winner {
            id: uuid::Uuid::new_v4(),
            ..winner_a.clone()
        };

        assert!(store.try_insert_winner(&winner_a).await.unwrap().is_some());
        assert!(store.try_insert_winner(&winner_b).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn game_status_defaults_to_lobby() {
        let game = sample_game();
        assert_eq!(game.status, GameStatus::Lobby);
    }
}
