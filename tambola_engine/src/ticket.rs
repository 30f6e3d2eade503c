//! Generates and validates 3x9 Tambola tickets.
//!
//! A valid ticket has exactly five non-blank numbers per row, fifteen
//! distinct numbers overall, column-banded ranges (column `c` draws from
//! `[10c+1, 10c+9]` for `c` in `0..=7` and `[81, 90]` for `c == 8`), and at
//! least one non-blank number in every column.

use rand::Rng;
use rand::seq::SliceRandom;

use crate::constants::{NUMBERS_PER_ROW, TICKET_COLS, TICKET_ROWS};
use crate::game::entities::Ticket;

/// Generate a single valid ticket using the given RNG.
///
/// Deterministic given a seeded RNG, which is how property tests exercise
/// this function without flakiness.
pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> Ticket {
    let assignments = pick_column_assignments(rng);

    let mut grid = [[0u8; TICKET_COLS]; TICKET_ROWS];
    for (col, rows) in assignments.iter().enumerate() {
        if rows.is_empty() {
            continue;
        }
        let mut numbers = draw_numbers_for_column(rng, col, rows.len() as u8);
        numbers.sort_unstable();
        for (slot, &row) in rows.iter().enumerate() {
            grid[row][col] = numbers[slot];
        }
    }

    Ticket(grid)
}

/// Checks every structural rule a generated ticket must satisfy.
pub fn validate(ticket: &Ticket) -> bool {
    let mut column_counts = [0u8; TICKET_COLS];
    let mut seen = std::collections::HashSet::new();

    for row in 0..TICKET_ROWS {
        let mut row_count = 0u8;
        for col in 0..TICKET_COLS {
            let n = ticket.0[row][col];
            if n == 0 {
                continue;
            }
            row_count += 1;
            if !seen.insert(n) {
                return false; // duplicate number across the whole ticket
            }
            if !column_range(col).contains(&n) {
                return false;
            }
            column_counts[col] += 1;
        }
        if row_count != NUMBERS_PER_ROW as u8 {
            return false;
        }
    }

    if seen.len() != crate::constants::NUMBERS_PER_TICKET {
        return false;
    }

    column_counts.iter().all(|&c| c >= 1 && c <= 3)
}

/// Inclusive numeric range for a given column.
fn column_range(col: usize) -> std::ops::RangeInclusive<u8> {
    if col == TICKET_COLS - 1 {
        81..=90
    } else {
        let lo = (10 * col + 1) as u8;
        let hi = (10 * col + 9) as u8;
        lo..=hi
    }
}

/// Picks, per row, 5 of the 9 columns to populate, then rebalances so that
/// no column is left empty. Returns, for each column, the sorted list of
/// rows that occupy it — counts (`rows.len()`) sum to 15 with each column
/// touched by 1..=3 rows, by construction.
fn pick_column_assignments<R: Rng + ?Sized>(rng: &mut R) -> [Vec<usize>; TICKET_COLS] {
    let mut row_columns: [Vec<usize>; TICKET_ROWS] = Default::default();
    let mut counts = [0u8; TICKET_COLS];

    for row in 0..TICKET_ROWS {
        let mut columns: Vec<usize> = (0..TICKET_COLS).collect();
        columns.shuffle(rng);
        columns.truncate(NUMBERS_PER_ROW);
        for &col in &columns {
            counts[col] += 1;
        }
        row_columns[row] = columns;
    }

    // Rebalance: while some column has zero occupants, steal a slot from a
    // row that occupies a count-3 column but not the empty one.
    loop {
        let Some(empty_col) = counts.iter().position(|&c| c == 0) else {
            break;
        };

        let mut fixed = false;
        for row in 0..TICKET_ROWS {
            if row_columns[row].contains(&empty_col) {
                continue;
            }
            if let Some(pos) = row_columns[row].iter().position(|&c| counts[c] == 3) {
                let donor_col = row_columns[row][pos];
                row_columns[row][pos] = empty_col;
                counts[donor_col] -= 1;
                counts[empty_col] += 1;
                fixed = true;
                break;
            }
        }

        // With 3 rows x 5 columns there is always a donor; this is an
        // invariant of the 3x9/5-per-row shape, not a best-effort fallback.
        debug_assert!(fixed, "rebalance must always find a donor column");
    }

    let mut assignments: [Vec<usize>; TICKET_COLS] = Default::default();
    for (row, columns) in row_columns.iter().enumerate() {
        for &col in columns {
            assignments[col].push(row);
        }
    }
    for rows in &mut assignments {
        rows.sort_unstable();
    }
    assignments
}

/// Draws `count` distinct numbers uniformly from the column's range.
fn draw_numbers_for_column<R: Rng + ?Sized>(rng: &mut R, col: usize, count: u8) -> Vec<u8> {
    let range = column_range(col);
    let mut pool: Vec<u8> = range.collect();
    pool.shuffle(rng);
    pool.truncate(count as usize);
    pool
}
