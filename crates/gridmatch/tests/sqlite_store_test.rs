//! Tests for the SQLite store and the services running on top of it.

use std::sync::Arc;

use chrono::{SubsecRound, Utc};
use tempfile::NamedTempFile;

use gridmatch::{
    ChaosRule, Fingerprint, Mark, Match, MatchErrorKind, MatchFilter, MatchLifecycle,
    MatchQuery, MatchSortField, MatchStatus, MatchStore, Move, MoveAdjudicator, MoveFilter,
    MoveId, MoveQuery, MoveSortField, MoveSubmission, PageRequest, Participant, PlayerDirectory,
    PlayerId, SortKey, SqliteStore, UniqueConstraint,
};

/// Creates a temporary database file with schema applied, returns the file
/// handle (must stay in scope to keep the file alive) and a ready store.
fn setup_test_db() -> (NamedTempFile, Arc<SqliteStore>) {
    let db_file = NamedTempFile::new().expect("Failed to create temp file");
    let db_path = db_file.path().to_str().expect("Invalid path").to_string();

    let store = SqliteStore::new(db_path).expect("Failed to create store");
    store.run_migrations().expect("Migrations failed");
    (db_file, Arc::new(store))
}

async fn two_players(store: &SqliteStore) -> (Participant, Participant) {
    let a = store
        .register_player("alice".to_string())
        .await
        .expect("Register failed");
    let b = store
        .register_player("bob".to_string())
        .await
        .expect("Register failed");
    (a, b)
}

fn move_at(game: &Match, player: PlayerId, sequence: u32, x: u32, y: u32, token: &str) -> Move {
    Move::new(
        MoveId::generate(),
        *game.id(),
        sequence,
        player,
        if sequence % 2 == 1 { Mark::X } else { Mark::O },
        x,
        y,
        Utc::now().trunc_subsecs(6),
        token.to_string(),
        false,
    )
}

#[test]
fn test_memory_url_rejected() {
    assert!(SqliteStore::new(":memory:".to_string()).is_err());
    assert!(SqliteStore::new("  ".to_string()).is_err());
}

#[test]
fn test_migrations_are_idempotent() {
    let (_db, store) = setup_test_db();
    store.run_migrations().expect("Second run failed");
}

#[tokio::test]
async fn test_register_and_resolve_player() {
    let (_db, store) = setup_test_db();
    let alice = store.register_player("Alice".to_string()).await.unwrap();
    let found = store.resolve(*alice.id()).await.unwrap();
    assert_eq!(found.as_ref().map(|p| p.username().as_str()), Some("Alice"));
    assert!(store.resolve(PlayerId::generate()).await.unwrap().is_none());
}

#[tokio::test]
async fn test_duplicate_username_is_unique_violation() {
    let (_db, store) = setup_test_db();
    store.register_player("Bob".to_string()).await.unwrap();
    let err = store.register_player("bob".to_string()).await.unwrap_err();
    assert_eq!(err.violated(), Some(UniqueConstraint::PlayerUsername));
}

#[tokio::test]
async fn test_match_round_trip() {
    let (_db, store) = setup_test_db();
    let (a, b) = two_players(&store).await;
    let game = Match::start(*a.id(), *b.id(), 5, 4, Utc::now().trunc_subsecs(6));
    store.insert_match(&game).await.unwrap();

    let loaded = store.find_match(*game.id()).await.unwrap().expect("Missing match");
    assert_eq!(loaded, game);
    assert!(store.find_match(gridmatch::MatchId::generate()).await.unwrap().is_none());
}

#[tokio::test]
async fn test_commit_move_updates_match_and_keeps_precision() {
    let (_db, store) = setup_test_db();
    let (a, b) = two_players(&store).await;
    let mut game = Match::start(*a.id(), *b.id(), 3, 3, Utc::now().trunc_subsecs(6));
    store.insert_match(&game).await.unwrap();

    let first = move_at(&game, *a.id(), 1, 0, 0, "t1");
    let progress = gridmatch::MatchProgress::new(
        *game.id(),
        Mark::O,
        MatchStatus::InProgress,
        None,
        None,
    );
    store.commit_move(&first, &progress).await.unwrap();
    game.record(first.clone(), &progress);

    let loaded = store.find_match(*game.id()).await.unwrap().unwrap();
    assert_eq!(loaded, game);
    assert_eq!(*loaded.current_turn(), Mark::O);

    let stored = store.find_move(*first.id()).await.unwrap().unwrap();
    assert_eq!(stored, first);
    assert_eq!(Fingerprint::of(&stored), Fingerprint::of(&first));

    let by_token = store
        .find_move_by_client_id(*game.id(), "t1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(by_token.id(), first.id());
    assert!(
        store
            .find_move_by_client_id(*game.id(), "t2")
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn test_commit_move_violations_leave_match_untouched() {
    let (_db, store) = setup_test_db();
    let (a, b) = two_players(&store).await;
    let game = Match::start(*a.id(), *b.id(), 3, 3, Utc::now().trunc_subsecs(6));
    store.insert_match(&game).await.unwrap();

    let first = move_at(&game, *a.id(), 1, 1, 1, "t1");
    let progress = gridmatch::MatchProgress::new(
        *game.id(),
        Mark::O,
        MatchStatus::InProgress,
        None,
        None,
    );
    store.commit_move(&first, &progress).await.unwrap();

    let finish = gridmatch::MatchProgress::new(
        *game.id(),
        Mark::X,
        MatchStatus::Finished,
        Some(Mark::O),
        Some(Utc::now().trunc_subsecs(6)),
    );

    let same_cell = move_at(&game, *b.id(), 2, 1, 1, "t2");
    let err = store.commit_move(&same_cell, &finish).await.unwrap_err();
    assert_eq!(err.violated(), Some(UniqueConstraint::MoveCell));

    let same_token = move_at(&game, *b.id(), 2, 2, 2, "t1");
    let err = store.commit_move(&same_token, &finish).await.unwrap_err();
    assert_eq!(err.violated(), Some(UniqueConstraint::MoveClientId));

    let same_sequence = move_at(&game, *b.id(), 1, 0, 2, "t3");
    let err = store.commit_move(&same_sequence, &finish).await.unwrap_err();
    assert_eq!(err.violated(), Some(UniqueConstraint::MoveSequence));

    let loaded = store.find_match(*game.id()).await.unwrap().unwrap();
    assert_eq!(*loaded.status(), MatchStatus::InProgress);
    assert_eq!(*loaded.current_turn(), Mark::O);
    assert_eq!(loaded.moves().len(), 1);
}

#[tokio::test]
async fn test_search_matches_filters_sorts_and_pages() {
    let (_db, store) = setup_test_db();
    let (a, b) = two_players(&store).await;
    let c = store.register_player("carol".to_string()).await.unwrap();
    let lifecycle = MatchLifecycle::new(store.clone(), store.clone());

    let ab = lifecycle.create_match(*a.id(), *b.id(), 3, 3).await.unwrap();
    let bc = lifecycle.create_match(*b.id(), *c.id(), 3, 3).await.unwrap();
    let ca = lifecycle.create_match(*c.id(), *a.id(), 4, 3).await.unwrap();

    let all = lifecycle.search_matches(&MatchQuery::default()).await.unwrap();
    assert_eq!(*all.total_count(), 3);
    let ids: Vec<_> = all.items().iter().map(|m| *m.id()).collect();
    assert_eq!(ids, vec![*ab.id(), *bc.id(), *ca.id()]);

    let with_a = MatchQuery::new(
        MatchFilter::new(None, vec![*a.id()]),
        vec![SortKey::desc(MatchSortField::CreatedAt)],
        PageRequest::default(),
    );
    let page = lifecycle.search_matches(&with_a).await.unwrap();
    let ids: Vec<_> = page.items().iter().map(|m| *m.id()).collect();
    assert_eq!(ids, vec![*ca.id(), *ab.id()]);

    let finished = MatchQuery::new(
        MatchFilter::new(Some(MatchStatus::Finished), vec![]),
        vec![],
        PageRequest::default(),
    );
    assert_eq!(*lifecycle.search_matches(&finished).await.unwrap().total_count(), 0);

    let second_page = MatchQuery::new(
        MatchFilter::default(),
        vec![],
        PageRequest::new(2, 2).unwrap(),
    );
    let page = lifecycle.search_matches(&second_page).await.unwrap();
    assert_eq!(*page.total_count(), 3);
    assert_eq!(*page.page_number(), 2);
    assert_eq!(page.items().len(), 1);
    assert_eq!(page.items()[0].id(), ca.id());
}

#[tokio::test]
async fn test_search_moves_default_order_and_filters() {
    let (_db, store) = setup_test_db();
    let (a, b) = two_players(&store).await;
    let lifecycle = MatchLifecycle::new(store.clone(), store.clone());
    let adjudicator = MoveAdjudicator::new(
        store.clone(),
        store.clone(),
        Arc::new(ChaosRule::disabled()),
    );
    let game = lifecycle.create_match(*a.id(), *b.id(), 3, 3).await.unwrap();
    for (i, (player, x, y)) in [(&a, 0, 0), (&b, 1, 1), (&a, 2, 2)].into_iter().enumerate() {
        adjudicator
            .submit_move(MoveSubmission::new(
                *game.id(),
                *player.id(),
                x,
                y,
                format!("t{}", i),
            ))
            .await
            .unwrap();
    }

    let all = adjudicator
        .search_moves(&MoveQuery::new(
            MoveFilter::new(Some(*game.id()), None),
            vec![],
            PageRequest::default(),
        ))
        .await
        .unwrap();
    let sequences: Vec<u32> = all.items().iter().map(|m| *m.sequence()).collect();
    assert_eq!(sequences, vec![1, 2, 3]);

    let by_alice = adjudicator
        .search_moves(&MoveQuery::new(
            MoveFilter::new(None, Some(*a.id())),
            vec![SortKey::desc(MoveSortField::Sequence)],
            PageRequest::default(),
        ))
        .await
        .unwrap();
    let sequences: Vec<u32> = by_alice.items().iter().map(|m| *m.sequence()).collect();
    assert_eq!(sequences, vec![3, 1]);
}

#[tokio::test]
async fn test_winning_move_persists_match_state() {
    let (_db, store) = setup_test_db();
    let (a, b) = two_players(&store).await;
    let lifecycle = MatchLifecycle::new(store.clone(), store.clone());
    let adjudicator = MoveAdjudicator::new(
        store.clone(),
        store.clone(),
        Arc::new(ChaosRule::disabled()),
    );
    let game = lifecycle.create_match(*a.id(), *b.id(), 3, 3).await.unwrap();
    let script = [(&a, 0, 0), (&b, 1, 0), (&a, 0, 1), (&b, 1, 1), (&a, 0, 2)];
    for (i, (player, x, y)) in script.into_iter().enumerate() {
        adjudicator
            .submit_move(MoveSubmission::new(
                *game.id(),
                *player.id(),
                x,
                y,
                format!("t{}", i),
            ))
            .await
            .unwrap();
    }

    let finished = lifecycle.get_match(*game.id()).await.unwrap();
    assert_eq!(*finished.status(), MatchStatus::Finished);
    assert_eq!(*finished.winner(), Some(Mark::X));
    assert!(finished.ended_at().is_some());
}

async fn race(
    adjudicator: &Arc<MoveAdjudicator>,
    game: &Match,
    player: PlayerId,
    cells: impl Fn(usize) -> (i64, i64),
    tokens: impl Fn(usize) -> String,
) -> Vec<Result<gridmatch::MoveReceipt, gridmatch::MatchError>> {
    let handles: Vec<_> = (0..8)
        .map(|i| {
            let adjudicator = adjudicator.clone();
            let (x, y) = cells(i);
            let submission = MoveSubmission::new(*game.id(), player, x, y, tokens(i));
            tokio::spawn(async move { adjudicator.submit_move(submission).await })
        })
        .collect();
    let mut results = Vec::new();
    for handle in handles {
        results.push(handle.await.expect("Task panicked"));
    }
    results
}

async fn race_fixture() -> (NamedTempFile, Arc<SqliteStore>, Arc<MoveAdjudicator>, Match, Participant) {
    let (db, store) = setup_test_db();
    let (a, b) = two_players(&store).await;
    let lifecycle = MatchLifecycle::new(store.clone(), store.clone());
    let adjudicator = Arc::new(MoveAdjudicator::new(
        store.clone(),
        store.clone(),
        Arc::new(ChaosRule::disabled()),
    ));
    let game = lifecycle.create_match(*a.id(), *b.id(), 3, 3).await.unwrap();
    (db, store, adjudicator, game, a)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_race_for_one_cell_has_one_winner() {
    let (_db, store, adjudicator, game, alice) = race_fixture().await;
    let results = race(&adjudicator, &game, *alice.id(), |_| (1, 1), |i| format!("cell{}", i)).await;

    let accepted = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(accepted, 1);
    for err in results.iter().filter_map(|r| r.as_ref().err()) {
        assert_eq!(err.kind(), MatchErrorKind::Conflict, "{}", err);
    }
    let loaded = store.find_match(*game.id()).await.unwrap().unwrap();
    assert_eq!(loaded.moves().len(), 1);
    assert_eq!(*loaded.current_turn(), Mark::O);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_race_across_cells_keeps_sequence() {
    let (_db, store, adjudicator, game, alice) = race_fixture().await;
    let results = race(
        &adjudicator,
        &game,
        *alice.id(),
        |i| ((i % 3) as i64, (i / 3) as i64),
        |i| format!("spread{}", i),
    )
    .await;

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    for err in results.iter().filter_map(|r| r.as_ref().err()) {
        assert_eq!(err.kind(), MatchErrorKind::Conflict, "{}", err);
    }
    let loaded = store.find_match(*game.id()).await.unwrap().unwrap();
    assert_eq!(loaded.moves().len(), 1);
    assert_eq!(*loaded.moves()[0].sequence(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_race_with_one_token_replays() {
    let (_db, store, adjudicator, game, alice) = race_fixture().await;
    let results = race(&adjudicator, &game, *alice.id(), |_| (0, 0), |_| "dup".to_string()).await;

    let receipts: Vec<_> = results
        .into_iter()
        .map(|r| r.expect("Duplicate token should succeed"))
        .collect();
    let first = &receipts[0];
    assert!(receipts.iter().all(|r| r.record() == first.record()));
    assert!(receipts.iter().all(|r| r.fingerprint() == first.fingerprint()));
    assert_eq!(receipts.iter().filter(|r| !*r.replayed()).count(), 1);

    let loaded = store.find_match(*game.id()).await.unwrap().unwrap();
    assert_eq!(loaded.moves().len(), 1);
}
