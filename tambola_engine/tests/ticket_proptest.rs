//! Property-based tests for ticket generation and win validation using
//! proptest.
//!
//! These verify that the ticket generator only ever produces structurally
//! valid tickets, and that win validation is pure and monotone in the set
//! of called numbers, across a wide range of random seeds and call orders.

use std::collections::BTreeSet;

use proptest::prelude::*;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tambola_engine::game::entities::Category;
use tambola_engine::{ticket, win_validator};

fn seed_strategy() -> impl Strategy<Value = u64> {
    any::<u64>()
}

// A subset of 1..=90, generated as a sorted BTreeSet so it matches the
// shape GameEngine hands to the validator.
fn called_numbers_strategy() -> impl Strategy<Value = BTreeSet<u8>> {
    prop::collection::btree_set(1u8..=90, 0..=90)
}

fn category_strategy() -> impl Strategy<Value = Category> {
    prop_oneof![
        Just(Category::Early5),
        Just(Category::TopLine),
        Just(Category::MiddleLine),
        Just(Category::BottomLine),
        Just(Category::FullHouse),
    ]
}

proptest! {
    #[test]
    fn generated_tickets_are_always_valid(seed in seed_strategy()) {
        let mut rng = StdRng::seed_from_u64(seed);
        let t = ticket::generate(&mut rng);
        prop_assert!(ticket::validate(&t), "seed {seed} produced an invalid ticket: {t:?}");
    }

    #[test]
    fn generated_tickets_have_fifteen_distinct_numbers(seed in seed_strategy()) {
        let mut rng = StdRng::seed_from_u64(seed);
        let t = ticket::generate(&mut rng);
        let numbers: BTreeSet<u8> = t.numbers().collect();
        prop_assert_eq!(numbers.len(), 15);
    }

    #[test]
    fn same_seed_is_deterministic(seed in seed_strategy()) {
        let mut a = StdRng::seed_from_u64(seed);
        let mut b = StdRng::seed_from_u64(seed);
        prop_assert_eq!(ticket::generate(&mut a), ticket::generate(&mut b));
    }

    #[test]
    fn win_validator_is_pure(seed in seed_strategy(), called in called_numbers_strategy(), category in category_strategy()) {
        let mut rng = StdRng::seed_from_u64(seed);
        let t = ticket::generate(&mut rng);
        let first = win_validator::validate(&t, &called, category);
        let second = win_validator::validate(&t, &called, category);
        prop_assert_eq!(first, second);
    }

    /// Calling more numbers can only ever turn a loss into a win, never the
    /// reverse — every category is a monotone coverage predicate over the
    /// called set.
    #[test]
    fn win_validator_is_monotone_in_called_numbers(
        seed in seed_strategy(),
        called in called_numbers_strategy(),
        extra in 1u8..=90,
        category in category_strategy(),
    ) {
        let mut rng = StdRng::seed_from_u64(seed);
        let t = ticket::generate(&mut rng);
        let before = win_validator::validate(&t, &called, category);

        let mut expanded = called.clone();
        expanded.insert(extra);
        let after = win_validator::validate(&t, &expanded, category);

        prop_assert!(!before || after, "adding a called number must not turn a win back into a loss");
    }

    #[test]
    fn full_house_requires_every_ticket_number_called(seed in seed_strategy(), called in called_numbers_strategy()) {
        let mut rng = StdRng::seed_from_u64(seed);
        let t = ticket::generate(&mut rng);
        let is_win = win_validator::validate(&t, &called, Category::FullHouse);
        let all_covered = t.numbers().all(|n| called.contains(&n));
        prop_assert_eq!(is_win, all_covered);
    }
}
