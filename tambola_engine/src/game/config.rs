//! Game creation settings.
//!
//! Game *creation* itself is an external collaborator's concern (the admin
//! CRUD surface); this type exists so the engine and its tests have one
//! validated shape to build a [`super::entities::Game`] from, the way the
//! old table configuration validated itself before a table came online.

use chrono::{DateTime, Utc};

use super::entities::{Game, GameId, PrizeTable, UserId};

#[derive(Debug, Clone)]
pub struct GameSettings {
    pub created_by: UserId,
    pub scheduled_time: DateTime<Utc>,
    pub prizes: PrizeTable,
}

impl GameSettings {
    pub fn validate(&self) -> Result<(), String> {
        if self.prizes.is_empty() {
            return Err("at least one prize category must be configured".to_string());
        }
        for (label, value) in [
            ("early5", self.prizes.early5),
            ("topLine", self.prizes.top_line),
            ("middleLine", self.prizes.middle_line),
            ("bottomLine", self.prizes.bottom_line),
            ("fullHouse", self.prizes.full_house),
        ] {
            if let Some(v) = value {
                if v <= 0 {
                    return Err(format!("prize for {label} must be positive, got {v}"));
                }
            }
        }
        Ok(())
    }

    pub fn into_game(self, id: GameId) -> Game {
        Game::new(id, self.created_by, self.scheduled_time, self.prizes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_prize_table() {
        let settings = GameSettings {
            created_by: UserId::new_v4(),
            scheduled_time: Utc::now(),
            prizes: PrizeTable::default(),
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn rejects_non_positive_prize_value() {
        let settings = GameSettings {
            created_by: UserId::new_v4(),
            scheduled_time: Utc::now(),
            prizes: PrizeTable {
                full_house: Some(0),
                ..Default::default()
            },
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn accepts_valid_prize_table() {
        let settings = GameSettings {
            created_by: UserId::new_v4(),
            scheduled_time: Utc::now(),
            prizes: PrizeTable {
                full_house: Some(500),
                ..Default::default()
            },
        };
        assert!(settings.validate().is_ok());
    }
}
