//! Pure win-condition evaluation. No I/O, no shared state.

use std::collections::BTreeSet;

use crate::constants::EARLY_FIVE_COUNT;
use crate::game::entities::{Category, Ticket};

/// Does `ticket` satisfy `category` given the numbers called so far?
///
/// This function reads only its arguments and is safe to call from any
/// number of concurrent claimants without coordination — the coordination
/// (single-winner-per-category) happens one layer up, around the *recording*
/// of a win, not around this check.
pub fn validate(ticket: &Ticket, called: &BTreeSet<u8>, category: Category) -> bool {
    match category {
        Category::Early5 => {
            ticket.numbers().filter(|n| called.contains(n)).count() >= EARLY_FIVE_COUNT
        }
        Category::TopLine | Category::MiddleLine | Category::BottomLine => {
            let row = category.row().expect("line categories carry a row index");
            ticket.row_numbers(row).all(|n| called.contains(&n))
        }
        Category::FullHouse => ticket.numbers().all(|n| called.contains(&n)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{TICKET_COLS, TICKET_ROWS};

    fn ticket_from_rows(rows: [[u8; TICKET_COLS]; TICKET_ROWS]) -> Ticket {
        Ticket(rows)
    }

    fn sample_ticket() -> Ticket {
        #[rustfmt::skip]
        let rows = [
            [5, 11, 21, 37, 0, 55, 0, 0, 88],
            [0, 12, 0, 0, 44, 0, 60, 0, 0],
            [0, 0, 23, 0, 0, 56, 0, 79, 0],
        ];
        ticket_from_rows(rows)
    }

    #[test]
    fn early5_requires_at_least_five_matches() {
        let ticket = sample_ticket();
        let mut called: BTreeSet<u8> = [5, 37, 88, 11].into_iter().collect();
        assert!(!validate(&ticket, &called, Category::Early5));
        called.insert(21);
        assert!(validate(&ticket, &called, Category::Early5));
    }

    #[test]
    fn line_categories_require_full_row_coverage() {
        let ticket = sample_ticket();
        let row0_numbers: BTreeSet<u8> = ticket.row_numbers(0).collect();
        assert!(validate(&ticket, &row0_numbers, Category::TopLine));

        let mut partial = row0_numbers.clone();
        partial.remove(partial.iter().next().copied().as_ref().unwrap());
        assert!(!validate(&ticket, &partial, Category::TopLine));
    }

    #[test]
    fn full_house_requires_all_fifteen_numbers() {
        let ticket = sample_ticket();
        let all: BTreeSet<u8> = ticket.numbers().collect();
        assert!(validate(&ticket, &all, Category::FullHouse));

        let mut missing_one = all.clone();
        let first = *missing_one.iter().next().unwrap();
        missing_one.remove(&first);
        assert!(!validate(&ticket, &missing_one, Category::FullHouse));
    }

    #[test]
    fn validator_is_pure() {
        let ticket = sample_ticket();
        let called: BTreeSet<u8> = [5, 11].into_iter().collect();
        let first = validate(&ticket, &called, Category::Early5);
        let second = validate(&ticket, &called, Category::Early5);
        assert_eq!(first, second);
    }
}
