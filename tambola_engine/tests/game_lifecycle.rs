//! End-to-end exercises of the actor/registry/prize-queue pipeline, wired
//! entirely with the in-memory fakes so nothing here touches a real
//! Postgres or Redis instance.

use std::sync::Arc;
use std::time::Duration;

use tambola_engine::broadcast::{Broadcaster, LoopbackPubSub};
use tambola_engine::db::{DurableStore, InMemoryDurableStore};
use tambola_engine::game::entities::{Category, Game, GameId, GameStatus, JoinOutcome, PrizeTable};
use tambola_engine::game::{GameError, GameRegistry};
use tambola_engine::hotstate::{HotState, InMemoryHotState};
use tambola_engine::prize_queue::payout_client::ScriptedPayoutClient;
use tambola_engine::prize_queue::{PrizeQueueManager, PrizeQueueResult, PrizeStatus};

struct Harness {
    registry: Arc<GameRegistry>,
    hot: Arc<dyn HotState>,
    db: Arc<dyn DurableStore>,
    prize_queue: Arc<PrizeQueueManager>,
}

fn harness(payout_outcomes: Vec<PrizeQueueResult<()>>) -> Harness {
    let hot: Arc<dyn HotState> = Arc::new(InMemoryHotState::new());
    let db: Arc<dyn DurableStore> = Arc::new(InMemoryDurableStore::new());
    let prize_queue = Arc::new(PrizeQueueManager::new(
        db.clone(),
        Arc::new(ScriptedPayoutClient::new(payout_outcomes)),
    ));
    let broadcaster = Arc::new(Broadcaster::new(Arc::new(LoopbackPubSub::new())));
    let registry = Arc::new(GameRegistry::new(hot.clone(), db.clone(), prize_queue.clone(), broadcaster));
    Harness {
        registry,
        hot,
        db,
        prize_queue,
    }
}

async fn new_game(h: &Harness, created_by: GameId) -> GameId {
    let game = Game::new(
        GameId::new_v4(),
        created_by,
        chrono::Utc::now(),
        PrizeTable {
            early5: Some(50),
            top_line: Some(75),
            middle_line: Some(75),
            bottom_line: Some(75),
            full_house: Some(200),
        },
    );
    let game_id = game.id;
    h.registry.spawn_new(game).await.unwrap();
    game_id
}

#[tokio::test]
async fn happy_path_join_start_call_claim_early5() {
    let h = harness(vec![Ok(())]);
    let host = GameId::new_v4();
    let game_id = new_game(&h, host).await;
    let handle = h.registry.get_or_spawn(game_id).await.unwrap();

    let player_id = GameId::new_v4();
    let JoinOutcome::Player(player) = handle.join(player_id, Some("alice".into())).await.unwrap() else {
        panic!("non-host joiner must become a player");
    };

    handle.start(host).await.unwrap();

    let first_five: Vec<u8> = player.ticket.numbers().take(5).collect();
    for &n in &first_five {
        handle.call_number(host, n).await.unwrap();
        handle.mark_number(player_id, player.id, n).await.unwrap();
    }

    handle.claim_win(player_id, Category::Early5).await.unwrap();

    let sync = handle.get_state_sync(player_id).await.unwrap();
    assert_eq!(sync.winners.len(), 1);
    assert_eq!(sync.winners[0].category, Category::Early5);

    // The sweep loop is what actually drives a payout attempt; call it
    // directly rather than waiting out a real 1s tick.
    let items = h.db.list_pending().await.unwrap();
    assert_eq!(items.len(), 1);
    h.prize_queue.process(items[0]).await.unwrap();
    let item = h.db.get_prize_item(items[0]).await.unwrap().unwrap();
    assert_eq!(item.status, PrizeStatus::Completed);
}

#[tokio::test]
async fn only_one_concurrent_claimant_wins_the_category() {
    let h = harness(vec![]);
    let host = GameId::new_v4();
    let game_id = new_game(&h, host).await;
    let handle = h.registry.get_or_spawn(game_id).await.unwrap();

    let alice = GameId::new_v4();
    let bob = GameId::new_v4();
    let JoinOutcome::Player(alice_player) = handle.join(alice, Some("alice".into())).await.unwrap() else {
        panic!()
    };
    let JoinOutcome::Player(bob_player) = handle.join(bob, Some("bob".into())).await.unwrap() else {
        panic!()
    };
    handle.start(host).await.unwrap();

    // Call every number on the board so both tickets qualify for full house.
    for n in 1..=90u8 {
        handle.call_number(host, n).await.unwrap();
    }

    let h1 = handle.clone();
    let h2 = handle.clone();
    let (r1, r2) = tokio::join!(
        h1.claim_win(alice, Category::FullHouse),
        h2.claim_win(bob, Category::FullHouse),
    );

    let outcomes = [r1, r2];
    let wins = outcomes.iter().filter(|r| r.is_ok()).count();
    let losses = outcomes
        .iter()
        .filter(|r| matches!(r, Err(GameError::CategoryAlreadyWon(_))))
        .count();
    assert_eq!(wins, 1, "exactly one claimant must win full house");
    assert_eq!(losses, 1);

    let _ = (alice_player, bob_player);
}

#[tokio::test]
async fn rejoin_preserves_marked_numbers_via_state_sync() {
    let h = harness(vec![]);
    let host = GameId::new_v4();
    let game_id = new_game(&h, host).await;
    let handle = h.registry.get_or_spawn(game_id).await.unwrap();

    let alice = GameId::new_v4();
    let JoinOutcome::Player(player) = handle.join(alice, Some("alice".into())).await.unwrap() else {
        panic!()
    };
    handle.start(host).await.unwrap();

    let n = player.ticket.numbers().next().unwrap();
    handle.call_number(host, n).await.unwrap();
    handle.mark_number(alice, player.id, n).await.unwrap();

    // Rejoining mid-game returns the same player rather than a fresh ticket.
    let rejoined = handle.join(alice, None).await.unwrap();
    let JoinOutcome::Player(same_player) = rejoined else {
        panic!("rejoining an active game must resolve to the existing player")
    };
    assert_eq!(same_player.id, player.id);
    assert_eq!(same_player.ticket, player.ticket);

    let sync = handle.get_state_sync(alice).await.unwrap();
    assert!(sync.marked_numbers.unwrap().contains(&n));
}

#[tokio::test]
async fn duplicate_call_is_rejected() {
    let h = harness(vec![]);
    let host = GameId::new_v4();
    let game_id = new_game(&h, host).await;
    let handle = h.registry.get_or_spawn(game_id).await.unwrap();

    let alice = GameId::new_v4();
    handle.join(alice, Some("alice".into())).await.unwrap();
    handle.start(host).await.unwrap();

    handle.call_number(host, 42).await.unwrap();
    let result = handle.call_number(host, 42).await;
    assert!(matches!(result, Err(GameError::NumberAlreadyCalled(42))));
}

#[tokio::test]
async fn full_house_completes_game_and_clears_hot_keys() {
    let h = harness(vec![Ok(())]);
    let host = GameId::new_v4();
    let game_id = new_game(&h, host).await;
    let handle = h.registry.get_or_spawn(game_id).await.unwrap();

    let alice = GameId::new_v4();
    let JoinOutcome::Player(player) = handle.join(alice, Some("alice".into())).await.unwrap() else {
        panic!()
    };
    handle.start(host).await.unwrap();

    for n in 1..=90u8 {
        handle.call_number(host, n).await.unwrap();
    }
    handle.claim_win(alice, Category::FullHouse).await.unwrap();

    // The hot row is gone, but the actor's own in-memory state (and the
    // durable store behind it) still answer getStateSync for stragglers.
    assert!(h.hot.read_state(game_id).await.unwrap().is_none());
    let sync = handle.get_state_sync(alice).await.unwrap();
    assert_eq!(sync.winners.len(), 1);

    let game = h.db.get_game(game_id).await.unwrap().unwrap();
    assert_eq!(game.status, GameStatus::Completed);

    let _ = player;
}

#[tokio::test]
async fn prize_retries_after_transient_failure_then_succeeds() {
    use tambola_engine::prize_queue::PrizeQueueError;

    let h = harness(vec![Err(PrizeQueueError::PayoutFailed("timeout".into())), Ok(())]);
    let host = GameId::new_v4();
    let game_id = new_game(&h, host).await;
    let handle = h.registry.get_or_spawn(game_id).await.unwrap();

    let alice = GameId::new_v4();
    let JoinOutcome::Player(player) = handle.join(alice, Some("alice".into())).await.unwrap() else {
        panic!()
    };
    handle.start(host).await.unwrap();

    let first_five: Vec<u8> = player.ticket.numbers().take(5).collect();
    for &n in &first_five {
        handle.call_number(host, n).await.unwrap();
    }
    handle.claim_win(alice, Category::Early5).await.unwrap();

    let items = h.db.list_pending().await.unwrap();
    assert_eq!(items.len(), 1);
    let id = items[0];

    h.prize_queue.process(id).await.unwrap();
    let after_first = h.db.get_prize_item(id).await.unwrap().unwrap();
    assert_eq!(after_first.status, PrizeStatus::Failed);
    assert_eq!(after_first.attempts, 1);

    // The backoff window (1s for the first retry) hasn't elapsed yet, so a
    // sweep right now must not pick this item back up.
    let not_yet_ready = h.db.list_retry_ready(chrono::Utc::now()).await.unwrap();
    assert!(not_yet_ready.is_empty());

    let ready = h
        .db
        .list_retry_ready(chrono::Utc::now() + chrono::Duration::seconds(2))
        .await
        .unwrap();
    assert_eq!(ready, vec![id]);

    h.prize_queue.process(id).await.unwrap();
    let after_second = h.db.get_prize_item(id).await.unwrap().unwrap();
    assert_eq!(after_second.status, PrizeStatus::Completed);
}

#[tokio::test]
async fn sweep_loop_drains_pending_and_retry_ready_items() {
    let h = harness(vec![Ok(())]);
    let host = GameId::new_v4();
    let game_id = new_game(&h, host).await;
    let handle = h.registry.get_or_spawn(game_id).await.unwrap();

    let alice = GameId::new_v4();
    let JoinOutcome::Player(player) = handle.join(alice, Some("alice".into())).await.unwrap() else {
        panic!()
    };
    handle.start(host).await.unwrap();
    for n in player.ticket.numbers().take(5) {
        handle.call_number(host, n).await.unwrap();
    }
    handle.claim_win(alice, Category::Early5).await.unwrap();

    let runner = h.prize_queue.clone();
    let task = tokio::spawn(runner.run_retry_loop());
    tokio::time::sleep(Duration::from_millis(1_200)).await;
    task.abort();

    let items = h.db.list_pending().await.unwrap();
    assert!(items.is_empty(), "sweep loop must have picked up the pending item");
}
