
use game_core::RoomEvent;
use game_session::{ChangeSync, PlayerSession, RoomView};
use game_types::{GameError, LetterStatus, MAX_GUESSES, RoomStatus};
use test_helpers::*;

async fn sessions(setup: &TestSessionSetup) -> (PlayerSession, PlayerSession) {
    let alice = PlayerSession::create(setup.coordinator.clone(), setup.validator(), "Alice")
        .await
        .unwrap();
    let bob = PlayerSession::join(
        setup.coordinator.clone(),
        setup.validator(),
        &alice.room_id().to_ascii_lowercase(),
        "Bob",
    )
    .await
    .unwrap();
    (alice, bob)
}

async fn refresh(setup: &TestSessionSetup, session: &mut PlayerSession) -> Vec<RoomEvent> {
    let view = match setup.coordinator.fetch_room(session.room_id()).await.unwrap() {
        Some(room) => RoomView::Present(room),
        None => RoomView::Gone,
    };
    session.apply_snapshot(&view)
}

fn type_word(session: &mut PlayerSession, word: &str) {
    for letter in word.chars() {
        assert!(session.type_letter(letter), "letter {letter} refused");
    }
}

#[tokio::test]
async fn test_join_uses_canonical_room_code() {
    let setup = TestSessionSetup::new();
    let alice = PlayerSession::create(setup.coordinator.clone(), setup.validator(), "Alice")
        .await
        .unwrap();

    let padded = format!("\t{} ", alice.room_id().to_ascii_lowercase());
    let bob = PlayerSession::join(setup.coordinator.clone(), setup.validator(), &padded, "Bob")
        .await
        .unwrap();
    assert_eq!(bob.room_id(), alice.room_id());

    let refused = PlayerSession::join(setup.coordinator.clone(), setup.validator(), "ab-12", "Cy").await;
    assert!(matches!(refused, Err(GameError::NotFound { .. })));
}

#[tokio::test]
async fn test_only_host_starts() {
    let setup = TestSessionSetup::new();
    let (mut alice, bob) = sessions(&setup).await;
    assert_eq!(alice.room_id(), bob.room_id());

    refresh(&setup, &mut alice).await;
    assert!(alice.is_host());
    assert!(!bob.is_host());

    assert_eq!(bob.start().await, Err(GameError::NotHost));
    assert_eq!(alice.start().await, Ok(true));
}

#[tokio::test]
async fn test_typing_rules() {
    let setup = TestSessionSetup::new();
    let (mut alice, mut bob) = sessions(&setup).await;

    // Nothing to type into before the game starts
    assert!(!bob.type_letter('a'));

    refresh(&setup, &mut alice).await;
    alice.start().await.unwrap();
    refresh(&setup, &mut bob).await;

    assert!(bob.type_letter('c'));
    assert!(!bob.type_letter('1'));
    assert!(!bob.type_letter('é'));
    type_word(&mut bob, "rane");
    assert!(!bob.type_letter('s'));
    assert_eq!(bob.input(), "CRANE");

    assert!(bob.backspace());
    assert_eq!(bob.input(), "CRAN");

    bob.publish_input().await.unwrap();
    let room = setup.stored_room(bob.room_id()).await.unwrap();
    assert_eq!(room.players[bob.player_id()].current_guess, "CRAN");
}

#[tokio::test]
async fn test_rejected_guesses_keep_input() {
    let setup = TestSessionSetup::new();
    let (mut alice, mut bob) = sessions(&setup).await;
    refresh(&setup, &mut alice).await;
    alice.start().await.unwrap();
    refresh(&setup, &mut bob).await;

    type_word(&mut bob, "cra");
    assert_eq!(
        bob.submit().await,
        Err(GameError::InvalidGuessLength { length: 3 })
    );
    assert_eq!(bob.input(), "CRA");

    type_word(&mut bob, "zy");
    assert_eq!(
        bob.submit().await,
        Err(GameError::InvalidGuessWord {
            word: "CRAZY".to_string()
        })
    );
    assert_eq!(bob.input(), "CRAZY");

    for _ in 0..5 {
        bob.backspace();
    }
    type_word(&mut bob, "slate");
    setup.store.set_available(false);
    let err = bob.submit().await.unwrap_err();
    assert!(err.is_retryable());
    assert_eq!(bob.input(), "SLATE");

    setup.store.set_available(true);
    let outcome = bob.submit().await.unwrap();
    assert!(!outcome.won);
    assert_eq!(bob.input(), "");
}

#[tokio::test]
async fn test_full_round() {
    let setup = TestSessionSetup::new();
    let (mut alice, mut bob) = sessions(&setup).await;
    refresh(&setup, &mut alice).await;
    alice.start().await.unwrap();
    refresh(&setup, &mut alice).await;
    refresh(&setup, &mut bob).await;

    // Bob misses
    type_word(&mut bob, "slate");
    bob.submit().await.unwrap();
    assert_eq!(bob.hints().get('A'), Some(LetterStatus::Correct));
    assert_eq!(bob.hints().get('S'), Some(LetterStatus::Absent));
    assert_eq!(bob.my_rows().len(), 1);

    // Alice sees Bob's colors but not his letters
    let events = refresh(&setup, &mut alice).await;
    assert!(events
        .iter()
        .any(|e| matches!(e, RoomEvent::GuessSubmitted { guess_count: 1, .. })));
    let rows = alice.opponent_rows();
    assert_eq!(rows.len(), 1);
    assert!(rows[0].letters.iter().all(|l| l.letter.is_empty()));
    assert_eq!(rows[0].letters[2].status, LetterStatus::Correct);

    // Alice solves it
    type_word(&mut alice, "crane");
    let outcome = alice.submit().await.unwrap();
    assert!(outcome.won && outcome.game_over);
    assert_eq!(alice.room().unwrap().status, RoomStatus::Finished);

    let events = refresh(&setup, &mut bob).await;
    assert!(events.iter().any(|e| matches!(
        e,
        RoomEvent::GameFinished { winner: Some(w), .. } if w == alice.player_id()
    )));

    // No more typing or guessing for Bob
    assert!(!bob.type_letter('a'));
    assert_eq!(bob.submit().await, Err(GameError::GameOver));
}

#[tokio::test]
async fn test_guess_budget() {
    let setup = TestSessionSetup::new();
    let (mut alice, mut bob) = sessions(&setup).await;
    refresh(&setup, &mut alice).await;
    alice.start().await.unwrap();
    refresh(&setup, &mut bob).await;

    for i in 0..MAX_GUESSES {
        type_word(&mut bob, "stone");
        let outcome = bob.submit().await.unwrap();
        assert_eq!(outcome.game_over, i + 1 == MAX_GUESSES);
    }

    let room = setup.stored_room(bob.room_id()).await.unwrap();
    let me = &room.players[bob.player_id()];
    assert!(me.game_over && !me.won);
    assert_eq!(me.guesses.len(), MAX_GUESSES);
    assert_eq!(room.status, RoomStatus::Playing);

    assert!(!bob.type_letter('s'));
}

#[tokio::test]
async fn test_reset_clears_local_state() {
    let setup = TestSessionSetup::new();
    let (mut alice, mut bob) = sessions(&setup).await;
    refresh(&setup, &mut alice).await;
    alice.start().await.unwrap();
    refresh(&setup, &mut alice).await;
    refresh(&setup, &mut bob).await;

    type_word(&mut bob, "slate");
    bob.submit().await.unwrap();
    type_word(&mut bob, "tra");

    type_word(&mut alice, "crane");
    alice.submit().await.unwrap();

    assert_eq!(bob.reset().await, Err(GameError::NotHost));
    assert_eq!(alice.reset().await, Ok(true));
    assert!(alice.hints().is_empty());

    let events = refresh(&setup, &mut bob).await;
    assert!(events.iter().any(|e| matches!(e, RoomEvent::GameReset { .. })));
    assert_eq!(bob.input(), "");
    assert!(bob.hints().is_empty());
    assert!(bob.my_rows().is_empty());
    assert_eq!(bob.room().unwrap().target_word, "SLATE");
}

#[tokio::test]
async fn test_leave_and_room_gone() {
    let setup = TestSessionSetup::new();
    let (mut alice, bob) = sessions(&setup).await;
    let room_id = alice.room_id().to_string();
    let sync = ChangeSync::new(setup.coordinator.rooms().clone());
    let mut view = sync.subscribe(&room_id);

    let current = wait_for_view(&mut view, |v| v.room().is_some()).await;
    alice.apply_snapshot(&current);

    bob.leave().await.unwrap();
    let current = wait_for_view(&mut view, |v| {
        v.room().is_some_and(|room| room.player_count() == 1)
    })
    .await;
    let events = alice.apply_snapshot(&current);
    assert!(matches!(events.as_slice(), [RoomEvent::PlayerLeft { .. }]));

    alice.leave().await.unwrap();
    let current = wait_for_view(&mut view, |v| v.is_gone()).await;
    assert!(setup.stored_room(&room_id).await.is_none());
    assert_eq!(current, RoomView::Gone);
}
