use criterion::{Criterion, criterion_group, criterion_main};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tambola_engine::{ticket, win_validator};
use tambola_engine::game::entities::Category;

fn bench_ticket_generation(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(42);
    c.bench_function("ticket_generate", |b| {
        b.iter(|| ticket::generate(&mut rng));
    });
}

fn bench_ticket_validate(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(7);
    let t = ticket::generate(&mut rng);
    c.bench_function("ticket_validate", |b| {
        b.iter(|| ticket::validate(&t));
    });
}

fn bench_win_validator_full_house(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(99);
    let t = ticket::generate(&mut rng);
    let called: std::collections::BTreeSet<u8> = (1..=90).collect();
    c.bench_function("win_validator_full_house", |b| {
        b.iter(|| win_validator::validate(&t, &called, Category::FullHouse));
    });
}

criterion_group!(
    benches,
    bench_ticket_generation,
    bench_ticket_validate,
    bench_win_validator_full_house
);
criterion_main!(benches);
