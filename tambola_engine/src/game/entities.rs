//! Core data types shared by the game engine, hot state, and durable store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use uuid::Uuid;

use crate::constants::{TICKET_COLS, TICKET_ROWS};

pub type GameId = Uuid;
pub type PlayerId = Uuid;
pub type UserId = Uuid;
pub type WinnerId = Uuid;

/// A 3x9 grid of numbers, `0` meaning blank.
///
/// Wire format is a 3-element array of 9-element integer arrays, matching
/// the protocol's `Ticket` shape verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket(pub [[u8; TICKET_COLS]; TICKET_ROWS]);

impl Ticket {
    /// All non-zero numbers on the ticket, in row-major order.
    pub fn numbers(&self) -> impl Iterator<Item = u8> + '_ {
        self.0.iter().flatten().copied().filter(|&n| n != 0)
    }

    /// Non-zero numbers in a single row.
    pub fn row_numbers(&self, row: usize) -> impl Iterator<Item = u8> + '_ {
        self.0[row].iter().copied().filter(|&n| n != 0)
    }
}

/// Lifecycle status of a [`Game`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GameStatus {
    Lobby,
    Active,
    Completed,
    Cancelled,
}

impl fmt::Display for GameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            GameStatus::Lobby => "LOBBY",
            GameStatus::Active => "ACTIVE",
            GameStatus::Completed => "COMPLETED",
            GameStatus::Cancelled => "CANCELLED",
        };
        write!(f, "{s}")
    }
}

impl GameStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            GameStatus::Lobby => "LOBBY",
            GameStatus::Active => "ACTIVE",
            GameStatus::Completed => "COMPLETED",
            GameStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "LOBBY" => Some(GameStatus::Lobby),
            "ACTIVE" => Some(GameStatus::Active),
            "COMPLETED" => Some(GameStatus::Completed),
            "CANCELLED" => Some(GameStatus::Cancelled),
            _ => None,
        }
    }
}

/// A winning pattern a player can claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    Early5,
    TopLine,
    MiddleLine,
    BottomLine,
    FullHouse,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Early5,
        Category::TopLine,
        Category::MiddleLine,
        Category::BottomLine,
        Category::FullHouse,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Early5 => "EARLY_5",
            Category::TopLine => "TOP_LINE",
            Category::MiddleLine => "MIDDLE_LINE",
            Category::BottomLine => "BOTTOM_LINE",
            Category::FullHouse => "FULL_HOUSE",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "EARLY_5" => Some(Category::Early5),
            "TOP_LINE" => Some(Category::TopLine),
            "MIDDLE_LINE" => Some(Category::MiddleLine),
            "BOTTOM_LINE" => Some(Category::BottomLine),
            "FULL_HOUSE" => Some(Category::FullHouse),
            _ => None,
        }
    }

    /// Row index for the line categories; `None` for `Early5`/`FullHouse`.
    pub fn row(self) -> Option<usize> {
        match self {
            Category::TopLine => Some(0),
            Category::MiddleLine => Some(1),
            Category::BottomLine => Some(2),
            Category::Early5 | Category::FullHouse => None,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Prize values configured by the organizer at creation time, keyed by
/// category. A missing entry means that category has no prize and cannot
/// be claimed for payout (the win itself can still be recorded).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrizeTable {
    pub early5: Option<i64>,
    pub top_line: Option<i64>,
    pub middle_line: Option<i64>,
    pub bottom_line: Option<i64>,
    pub full_house: Option<i64>,
}

impl PrizeTable {
    pub fn get(&self, category: Category) -> Option<i64> {
        match category {
            Category::Early5 => self.early5,
            Category::TopLine => self.top_line,
            Category::MiddleLine => self.middle_line,
            Category::BottomLine => self.bottom_line,
            Category::FullHouse => self.full_house,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.early5.is_none()
            && self.top_line.is_none()
            && self.middle_line.is_none()
            && self.bottom_line.is_none()
            && self.full_house.is_none()
    }
}

/// The authoritative row for a single game (mirrors the durable schema).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Game {
    pub id: GameId,
    pub scheduled_time: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub status: GameStatus,
    pub created_by: UserId,
    pub prizes: PrizeTable,
    pub called_numbers: Vec<u8>,
    pub current_number: Option<u8>,
}

impl Game {
    pub fn new(id: GameId, created_by: UserId, scheduled_time: DateTime<Utc>, prizes: PrizeTable) -> Self {
        Self {
            id,
            scheduled_time,
            started_at: None,
            ended_at: None,
            status: GameStatus::Lobby,
            created_by,
            prizes,
            called_numbers: Vec::new(),
            current_number: None,
        }
    }

    pub fn called_set(&self) -> BTreeSet<u8> {
        self.called_numbers.iter().copied().collect()
    }
}

/// A seated player holding a ticket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub game_id: GameId,
    pub user_id: UserId,
    pub user_name: String,
    pub ticket: Ticket,
    pub joined_at: DateTime<Utc>,
}

/// A recorded win for a (game, category) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Winner {
    pub id: WinnerId,
    pub game_id: GameId,
    pub player_id: PlayerId,
    pub category: Category,
    pub claimed_at: DateTime<Utc>,
    pub prize_claimed: bool,
    pub prize_value: Option<i64>,
}

/// The outcome of a join attempt: an observer (the organizer) never gets a
/// seat, while anyone else receives a [`Player`] row (freshly created or
/// the one from a prior session, on idempotent rejoin).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum JoinOutcome {
    Observer,
    Player(Player),
}

/// Advisory, cache-only per-player marking state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketState {
    pub marked_numbers: BTreeSet<u8>,
}

/// A lightweight snapshot of game state used both as the hot-state payload
/// and as the body of `game:stateSync`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateSync {
    pub called_numbers: Vec<u8>,
    pub current_number: Option<u8>,
    pub players: Vec<PlayerSummary>,
    pub winners: Vec<WinnerSummary>,
    pub marked_numbers: Option<BTreeSet<u8>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSummary {
    pub player_id: PlayerId,
    pub user_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WinnerSummary {
    pub player_id: PlayerId,
    pub user_name: String,
    pub category: Category,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticket_numbers_skip_blanks() {
        let mut grid = [[0u8; TICKET_COLS]; TICKET_ROWS];
        grid[0][0] = 3;
        grid[1][4] = 42;
        let ticket = Ticket(grid);
        let nums: Vec<u8> = ticket.numbers().collect();
        assert_eq!(nums, vec![3, 42]);
    }

    #[test]
    fn category_round_trips_through_wire_string() {
        for category in Category::ALL {
            let parsed = Category::parse(category.as_str());
            assert_eq!(parsed, Some(category));
        }
    }

    #[test]
    fn game_status_round_trips() {
        for status in [
            GameStatus::Lobby,
            GameStatus::Active,
            GameStatus::Completed,
            GameStatus::Cancelled,
        ] {
            assert_eq!(GameStatus::parse(status.as_str()), Some(status));
        }
    }

    #[test]
    fn prize_table_empty_when_no_categories_configured() {
        assert!(PrizeTable::default().is_empty());
        let table = PrizeTable {
            full_house: Some(500),
            ..Default::default()
        };
        assert!(!table.is_empty());
        assert_eq!(table.get(Category::FullHouse), Some(500));
        assert_eq!(table.get(Category::Early5), None);
    }
}
