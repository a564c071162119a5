
use futures_util::StreamExt;
use game_core::{GuessValidator, WordValidator};
use game_session::{ChangeSync, PlayerSession, RoomView, SessionConfig, SessionCoordinator};
use game_store::{DocumentStore, RoomRepository};
use game_types::{GameError, RoomStatus};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use test_helpers::*;

/// A coordinator on its own connection to the host. Every room it creates
/// targets CRANE.
async fn remote_coordinator(addr: SocketAddr) -> Arc<SessionCoordinator> {
    let store = remote_store(addr).await;
    Arc::new(SessionCoordinator::new(
        Arc::new(store),
        Arc::new(WordValidator::from_word_list("crane")),
        SessionConfig::default(),
    ))
}

fn guesses() -> Arc<dyn GuessValidator> {
    Arc::new(WordValidator::from_word_list("crane\nslate"))
}

fn type_word(session: &mut PlayerSession, word: &str) {
    for letter in word.chars() {
        assert!(session.type_letter(letter), "letter {letter} refused");
    }
}

async fn refresh(coordinator: &SessionCoordinator, session: &mut PlayerSession) {
    let room = coordinator.fetch_room(session.room_id()).await.unwrap();
    let view = room.map_or(RoomView::Gone, RoomView::Present);
    session.apply_snapshot(&view);
}

#[tokio::test]
async fn test_two_clients_play_one_room_through_host() {
    let setup = TestServerSetup::new();
    let addr = setup.serve();
    let alice_side = remote_coordinator(addr).await;
    let bob_side = remote_coordinator(addr).await;

    let mut alice = PlayerSession::create(alice_side.clone(), guesses(), "Alice")
        .await
        .unwrap();
    let room_id = alice.room_id().to_string();
    let mut bob = PlayerSession::join(bob_side.clone(), guesses(), &room_id, "Bob")
        .await
        .unwrap();

    // Bob follows the room live over his own connection
    let sync = ChangeSync::new(bob_side.rooms().clone());
    let mut bob_view = sync.subscribe(&room_id);
    wait_for_view(&mut bob_view, |view| {
        view.room().is_some_and(|room| room.player_count() == 2)
    })
    .await;

    refresh(&alice_side, &mut alice).await;
    assert!(alice.is_host());
    assert_eq!(alice.start().await, Ok(true));

    let view = wait_for_view(&mut bob_view, |view| {
        view.room().is_some_and(|room| room.status == RoomStatus::Playing)
    })
    .await;
    bob.apply_snapshot(&view);

    type_word(&mut bob, "slate");
    let outcome = bob.submit().await.unwrap();
    assert!(!outcome.won && !outcome.game_over);

    refresh(&alice_side, &mut alice).await;
    assert_eq!(alice.opponent().unwrap().guesses, vec!["SLATE".to_string()]);
    type_word(&mut alice, "crane");
    assert!(alice.submit().await.unwrap().won);

    let view = wait_for_view(&mut bob_view, |view| {
        view.room().is_some_and(|room| room.status == RoomStatus::Finished)
    })
    .await;
    bob.apply_snapshot(&view);
    assert_eq!(
        bob.room().unwrap().winner.as_deref(),
        Some(alice.player_id())
    );
    assert_eq!(bob.submit().await, Err(GameError::GameOver));

    // The host's own copy agrees
    let hosted = RoomRepository::new(setup.store.clone())
        .find(&room_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(hosted.status, RoomStatus::Finished);
    assert_eq!(hosted.winner.as_deref(), Some(alice.player_id()));

    // Both leave; the room is gone for everyone
    bob.leave().await.unwrap();
    alice.leave().await.unwrap();
    wait_for_view(&mut bob_view, RoomView::is_gone).await;
    assert!(bob_side.fetch_room(&room_id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_host_outage_reaches_remote_clients() {
    let setup = TestServerSetup::new();
    let addr = setup.serve();
    let coordinator = remote_coordinator(addr).await;
    let (room_id, _) = coordinator.create_room("Alice").await.unwrap();

    let sync = ChangeSync::new(coordinator.rooms().clone());
    let mut view = sync.subscribe(&room_id);
    wait_for_view(&mut view, |view| view.room().is_some()).await;

    setup.store.set_available(false);
    wait_for_view(&mut view, |view| matches!(view, RoomView::ConnectionLost(_))).await;
    let err = coordinator.fetch_room(&room_id).await.unwrap_err();
    assert!(err.is_retryable());

    // The view comes back on its own once the host's store does
    setup.store.set_available(true);
    wait_for_view(&mut view, |view| view.room().is_some()).await;
    assert!(coordinator.fetch_room(&room_id).await.unwrap().is_some());
}

#[tokio::test]
async fn test_remote_subscriptions_are_shared_and_released() {
    let setup = TestServerSetup::new();
    let addr = setup.serve();
    let store = remote_store(addr).await;
    store.set("rooms/A", json!({ "status": "waiting" })).await.unwrap();

    let mut first = store.subscribe("rooms/A").await.unwrap();
    let mut second = store.subscribe("rooms/A").await.unwrap();
    assert_eq!(store.subscription_count(), 1);

    let expected = Some(json!({ "status": "waiting" }));
    assert_eq!(first.next().await, Some(Ok(expected.clone())));
    assert_eq!(second.next().await, Some(Ok(expected)));

    store.remove("rooms/A").await.unwrap();
    assert_eq!(first.next().await, Some(Ok(None)));

    drop(first);
    assert_eq!(store.subscription_count(), 1);
    drop(second);
    assert_eq!(store.subscription_count(), 0);

    // Replies still line up after the unsubscribe
    assert!(!store.update("rooms/A", vec![]).await.unwrap());
    assert_eq!(store.get("rooms/A").await.unwrap(), None);
}
