//! Per-game actor: the authoritative, single-writer execution of one game's
//! state machine. A [`GameHandle`] is a cheap, cloneable mailbox to it.

use rand::SeedableRng;
use rand::rngs::StdRng;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

use super::entities::{
    Category, Game, GameId, GameStatus, JoinOutcome, Player, PlayerId, PlayerSummary, StateSync,
    TicketState, UserId, WinnerSummary,
};
use super::errors::{GameError, GameResult};
use super::messages::{GameMessage, OutboundEvent};
use crate::broadcast::Broadcaster;
use crate::constants::{MAX_NUMBER, MIN_NUMBER};
use crate::db::DurableStore;
use crate::hotstate::{GameHotRow, HotState};
use crate::prize_queue::PrizeQueueManager;
use crate::ticket;
use crate::win_validator;

/// Cheap, cloneable handle to a running [`GameActor`]'s mailbox.
#[derive(Clone)]
pub struct GameHandle {
    sender: mpsc::Sender<GameMessage>,
    pub game_id: GameId,
}

impl GameHandle {
    async fn call<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<GameResult<T>>) -> GameMessage,
    ) -> GameResult<T> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(build(tx))
            .await
            .map_err(|_| GameError::GameNotFound)?;
        rx.await.map_err(|_| GameError::GameNotFound)?
    }

    pub async fn join(&self, user_id: UserId, user_name: Option<String>) -> GameResult<JoinOutcome> {
        self.call(|response| GameMessage::Join {
            user_id,
            user_name,
            response,
        })
        .await
    }

    pub async fn leave(&self, user_id: UserId) -> GameResult<()> {
        self.call(|response| GameMessage::Leave { user_id, response }).await
    }

    pub async fn start(&self, user_id: UserId) -> GameResult<()> {
        self.call(|response| GameMessage::Start { user_id, response }).await
    }

    pub async fn call_number(&self, user_id: UserId, number: u8) -> GameResult<()> {
        self.call(|response| GameMessage::CallNumber {
            user_id,
            number,
            response,
        })
        .await
    }

    pub async fn mark_number(&self, user_id: UserId, player_id: PlayerId, number: u8) -> GameResult<()> {
        self.call(|response| GameMessage::MarkNumber {
            user_id,
            player_id,
            number,
            response,
        })
        .await
    }

    pub async fn claim_win(&self, user_id: UserId, category: Category) -> GameResult<()> {
        self.call(|response| GameMessage::ClaimWin {
            user_id,
            category,
            response,
        })
        .await
    }

    pub async fn cancel(&self, user_id: UserId) -> GameResult<()> {
        self.call(|response| GameMessage::Cancel { user_id, response }).await
    }

    pub async fn get_state_sync(&self, user_id: UserId) -> GameResult<StateSync> {
        self.call(|response| GameMessage::GetStateSync { user_id, response })
            .await
    }
}

/// How long the actor keeps running after the game reaches a terminal
/// status before it reaps itself, to let straggling `getStateSync` calls
/// through.
const POST_TERMINAL_IDLE_SECS: u64 = 300;

pub struct GameActor {
    inbox: mpsc::Receiver<GameMessage>,
    hot: Arc<dyn HotState>,
    db: Arc<dyn DurableStore>,
    prize_queue: Arc<PrizeQueueManager>,
    broadcaster: Arc<Broadcaster>,
    rng: StdRng,

    game: Game,
    won_categories: BTreeSet<Category>,
    winners: HashMap<Category, WinnerSummary>,
    players_by_id: HashMap<PlayerId, Player>,
    player_id_by_user: HashMap<UserId, PlayerId>,
    ticket_states: HashMap<PlayerId, TicketState>,
}

impl GameActor {
    /// Spawn an actor for `game`, hydrating its player roster and any
    /// recorded winners from the durable store (hot state is consulted
    /// first by [`super::registry::GameRegistry`] before this is called).
    pub async fn spawn(
        game: Game,
        hot: Arc<dyn HotState>,
        db: Arc<dyn DurableStore>,
        prize_queue: Arc<PrizeQueueManager>,
        broadcaster: Arc<Broadcaster>,
    ) -> GameResult<GameHandle> {
        let game_id = game.id;
        let players = db.list_players(game_id).await?;
        let winner_rows = db.list_winners(game_id).await?;
        let won_categories = winner_rows.iter().map(|w| w.category).collect();

        let mut players_by_id = HashMap::new();
        let mut player_id_by_user = HashMap::new();
        let mut ticket_states = HashMap::new();
        for player in players {
            player_id_by_user.insert(player.user_id, player.id);
            let state = hot
                .read_ticket_state(game_id, player.id)
                .await?
                .unwrap_or_default();
            ticket_states.insert(player.id, state);
            players_by_id.insert(player.id, player);
        }

        let winners = winner_rows
            .into_iter()
            .map(|w| {
                let user_name = players_by_id
                    .get(&w.player_id)
                    .map(|p| p.user_name.clone())
                    .unwrap_or_default();
                (
                    w.category,
                    WinnerSummary {
                        player_id: w.player_id,
                        user_name,
                        category: w.category,
                    },
                )
            })
            .collect();

        let (sender, inbox) = mpsc::channel(128);
        let actor = GameActor {
            inbox,
            hot,
            db,
            prize_queue,
            broadcaster,
            rng: StdRng::from_os_rng(),
            game,
            won_categories,
            winners,
            players_by_id,
            player_id_by_user,
            ticket_states,
        };
        tokio::spawn(actor.run());
        Ok(GameHandle { sender, game_id })
    }

    async fn run(mut self) {
        let game_id = self.game.id;
        log::debug!("game actor {game_id} started in status {:?}", self.game.status);
        loop {
            let terminal = matches!(self.game.status, GameStatus::Completed | GameStatus::Cancelled);
            if terminal {
                let idle = tokio::time::sleep(std::time::Duration::from_secs(POST_TERMINAL_IDLE_SECS));
                tokio::select! {
                    message = self.inbox.recv() => {
                        match message {
                            Some(message) => self.handle(message).await,
                            None => break,
                        }
                    }
                    _ = idle => {
                        log::debug!("game actor {game_id} reaping after idle period");
                        break;
                    }
                }
            } else {
                match self.inbox.recv().await {
                    Some(message) => self.handle(message).await,
                    None => break,
                }
            }
        }
        log::debug!("game actor {game_id} stopped");
    }

    async fn handle(&mut self, message: GameMessage) {
        match message {
            GameMessage::Join {
                user_id,
                user_name,
                response,
            } => {
                let result = self.handle_join(user_id, user_name).await;
                let _ = response.send(result);
            }
            GameMessage::Leave { user_id: _, response } => {
                let _ = response.send(Ok(()));
            }
            GameMessage::Start { user_id, response } => {
                let result = self.handle_start(user_id).await;
                let _ = response.send(result);
            }
            GameMessage::CallNumber {
                user_id,
                number,
                response,
            } => {
                let result = self.handle_call_number(user_id, number).await;
                let _ = response.send(result);
            }
            GameMessage::MarkNumber {
                user_id,
                player_id,
                number,
                response,
            } => {
                let result = self.handle_mark_number(user_id, player_id, number).await;
                let _ = response.send(result);
            }
            GameMessage::ClaimWin {
                user_id,
                category,
                response,
            } => {
                let result = self.handle_claim_win(user_id, category).await;
                let _ = response.send(result);
            }
            GameMessage::Cancel { user_id, response } => {
                let result = self.handle_cancel(user_id).await;
                let _ = response.send(result);
            }
            GameMessage::GetStateSync { user_id, response } => {
                let result = self.handle_get_state_sync(user_id);
                let _ = response.send(result);
            }
        }
    }

    async fn handle_join(&mut self, user_id: UserId, user_name: Option<String>) -> GameResult<JoinOutcome> {
        log::debug!("game {} join by {}", self.game.id, user_id);
        if user_id == self.game.created_by {
            return Ok(JoinOutcome::Observer);
        }
        if self.game.status != GameStatus::Lobby {
            if let Some(&player_id) = self.player_id_by_user.get(&user_id) {
                let player = self.players_by_id[&player_id].clone();
                return Ok(JoinOutcome::Player(player));
            }
            return Err(GameError::GameAlreadyStarted);
        }

        if let Some(&player_id) = self.player_id_by_user.get(&user_id) {
            let player = self.players_by_id[&player_id].clone();
            return Ok(JoinOutcome::Player(player));
        }

        let ticket = ticket::generate(&mut self.rng);
        let name = user_name.unwrap_or_else(|| format!("player-{}", &user_id.to_string()[..8]));
        let player = self
            .db
            .upsert_player(self.game.id, user_id, &name, ticket)
            .await?;

        self.player_id_by_user.insert(user_id, player.id);
        self.players_by_id.insert(player.id, player.clone());
        self.ticket_states.insert(player.id, TicketState::default());
        self.hot
            .write_ticket_state(self.game.id, player.id, &TicketState::default())
            .await?;
        self.hot
            .set_player_count(self.game.id, self.players_by_id.len() as u32)
            .await?;

        self.broadcaster
            .emit(
                self.game.id,
                OutboundEvent::PlayerJoined {
                    player_id: player.id,
                    user_name: player.user_name.clone(),
                },
            )
            .await
            .ok();

        Ok(JoinOutcome::Player(player))
    }

    async fn handle_start(&mut self, user_id: UserId) -> GameResult<()> {
        log::debug!("game {} start by {}", self.game.id, user_id);
        if user_id != self.game.created_by {
            return Err(GameError::Forbidden);
        }
        if self.game.status != GameStatus::Lobby {
            return Err(GameError::InvalidStatus);
        }
        if self.players_by_id.is_empty() {
            return Err(GameError::NoPlayers);
        }

        self.game.status = GameStatus::Active;
        self.game.started_at = Some(chrono::Utc::now());
        self.db.mark_started(self.game.id).await?;
        self.write_hot_state().await?;

        log::info!("game {} started with {} players", self.game.id, self.players_by_id.len());
        self.broadcaster
            .emit(self.game.id, OutboundEvent::Started { game_id: self.game.id })
            .await
            .ok();
        Ok(())
    }

    async fn handle_call_number(&mut self, user_id: UserId, number: u8) -> GameResult<()> {
        if user_id != self.game.created_by {
            return Err(GameError::Forbidden);
        }
        if self.game.status != GameStatus::Active {
            return Err(GameError::GameNotActive);
        }
        if number < MIN_NUMBER || number > MAX_NUMBER {
            return Err(GameError::OutOfRange(number));
        }
        if self.game.called_numbers.contains(&number) {
            return Err(GameError::NumberAlreadyCalled(number));
        }
        if self.game.called_numbers.len() as u16 >= (MAX_NUMBER - MIN_NUMBER + 1) as u16 {
            return Err(GameError::GameExhausted);
        }

        self.game.called_numbers.push(number);
        self.game.current_number = Some(number);
        self.write_hot_state().await?;
        self.db
            .sync_called_numbers(self.game.id, &self.game.called_numbers, self.game.current_number)
            .await?;

        log::debug!("game {} called {}", self.game.id, number);
        self.broadcaster
            .emit(self.game.id, OutboundEvent::NumberCalled { number })
            .await
            .ok();
        Ok(())
    }

    async fn handle_mark_number(&mut self, user_id: UserId, player_id: PlayerId, number: u8) -> GameResult<()> {
        match self.player_id_by_user.get(&user_id) {
            Some(&owned) if owned == player_id => {}
            _ => return Err(GameError::InvalidPlayer),
        }
        if !self.game.called_numbers.contains(&number) {
            return Err(GameError::NumberNotCalled(number));
        }

        let state = self.ticket_states.entry(player_id).or_default();
        state.marked_numbers.insert(number);
        let snapshot = state.clone();
        self.hot.write_ticket_state(self.game.id, player_id, &snapshot).await?;
        Ok(())
    }

    async fn handle_claim_win(&mut self, user_id: UserId, category: Category) -> GameResult<()> {
        if self.game.status != GameStatus::Active {
            return Err(GameError::GameNotActive);
        }
        let player_id = *self
            .player_id_by_user
            .get(&user_id)
            .ok_or(GameError::PlayerNotFound)?;
        let player = self.players_by_id.get(&player_id).ok_or(GameError::PlayerNotFound)?.clone();

        let called = self.game.called_set();
        if !win_validator::validate(&player.ticket, &called, category) {
            return Err(GameError::InvalidClaim);
        }

        let acquired = self.hot.try_acquire_winner_lock(self.game.id, category).await?;
        if !acquired {
            return Err(GameError::CategoryAlreadyClaimed(category.as_str()));
        }

        let outcome = self.finish_claim(player_id, &player, category).await;
        self.hot.release_winner_lock(self.game.id, category).await?;
        outcome
    }

    async fn finish_claim(&mut self, player_id: PlayerId, player: &Player, category: Category) -> GameResult<()> {
        if self.won_categories.contains(&category) {
            return Err(GameError::CategoryAlreadyWon(category.as_str()));
        }

        let winner = super::entities::Winner {
            id: uuid::Uuid::new_v4(),
            game_id: self.game.id,
            player_id,
            category,
            claimed_at: chrono::Utc::now(),
            prize_claimed: false,
            prize_value: None,
        };
        let inserted = self.db.try_insert_winner(&winner).await?;
        let Some(winner) = inserted else {
            return Err(GameError::CategoryAlreadyWon(category.as_str()));
        };

        self.won_categories.insert(category);
        self.winners.insert(
            category,
            WinnerSummary {
                player_id,
                user_name: player.user_name.clone(),
                category,
            },
        );
        self.write_hot_state().await?;

        if let Some(prize_value) = self.game.prizes.get(category) {
            self.prize_queue
                .enqueue(player.user_id, self.game.id, category, prize_value)
                .await?;
        }

        log::info!(
            "game {} category {} won by player {}",
            self.game.id,
            category.as_str(),
            player_id
        );
        self.broadcaster
            .emit(
                self.game.id,
                OutboundEvent::WinClaimed {
                    category,
                    success: true,
                    message: "win recorded".to_string(),
                },
            )
            .await
            .ok();
        self.broadcaster
            .emit(
                self.game.id,
                OutboundEvent::Winner {
                    player_id,
                    user_name: player.user_name.clone(),
                    category,
                },
            )
            .await
            .ok();

        let _ = winner;

        if category == Category::FullHouse {
            self.game.status = GameStatus::Completed;
            self.game.ended_at = Some(chrono::Utc::now());
            self.db.mark_ended(self.game.id, GameStatus::Completed).await?;
            self.db
                .sync_called_numbers(self.game.id, &self.game.called_numbers, self.game.current_number)
                .await?;
            self.broadcaster
                .emit(self.game.id, OutboundEvent::Completed { game_id: self.game.id })
                .await
                .ok();
            self.hot.delete_game_keys(self.game.id).await?;
        }

        Ok(())
    }

    async fn handle_cancel(&mut self, user_id: UserId) -> GameResult<()> {
        if user_id != self.game.created_by {
            return Err(GameError::Forbidden);
        }
        if matches!(self.game.status, GameStatus::Completed | GameStatus::Cancelled) {
            return Err(GameError::InvalidStatus);
        }

        self.game.status = GameStatus::Cancelled;
        self.game.ended_at = Some(chrono::Utc::now());
        self.db.mark_ended(self.game.id, GameStatus::Cancelled).await?;
        self.hot.delete_game_keys(self.game.id).await?;

        log::info!("game {} cancelled by {}", self.game.id, user_id);
        self.broadcaster
            .emit(self.game.id, OutboundEvent::Cancelled { game_id: self.game.id })
            .await
            .ok();
        Ok(())
    }

    fn handle_get_state_sync(&self, user_id: UserId) -> GameResult<StateSync> {
        let players = self
            .players_by_id
            .values()
            .map(|p| PlayerSummary {
                player_id: p.id,
                user_name: p.user_name.clone(),
            })
            .collect();
        let winners = self.won_categories.iter().filter_map(|c| self.winners.get(c).cloned()).collect();

        let marked_numbers = self
            .player_id_by_user
            .get(&user_id)
            .and_then(|pid| self.ticket_states.get(pid))
            .map(|state| state.marked_numbers.clone());

        Ok(StateSync {
            called_numbers: self.game.called_numbers.clone(),
            current_number: self.game.current_number,
            players,
            winners,
            marked_numbers,
        })
    }

    async fn write_hot_state(&self) -> GameResult<()> {
        let row = GameHotRow {
            status: self.game.status,
            called_numbers: self.game.called_numbers.clone(),
            current_number: self.game.current_number,
            won_categories: self.won_categories.clone(),
            player_count: self.players_by_id.len() as u32,
        };
        self.hot.write_state(self.game.id, &row).await?;
        Ok(())
    }
}
