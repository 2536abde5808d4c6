mod common;

use common::{harness, harness_with, single_result, Harness, HostEvent};
use std::sync::Arc;
use std::time::Duration;
use wildcard::game::{
    start_engine, Ledger, OutcomeKind, SessionError, SessionInput, SessionStatus, TriggerContext,
};

fn input(session: wildcard::game::SessionId, user: &str, choice: usize) -> SessionInput {
    SessionInput {
        session,
        user: user.to_string(),
        choice,
    }
}

#[tokio::test]
async fn only_the_owner_may_choose() {
    let mut h = harness();
    h.engine
        .run_outcome(&TriggerContext::new("u1"), OutcomeKind::DoubleOrNothing)
        .await;
    let session = h.host.last_prompt().session;

    let err = h.engine.handle_input(input(session, "u2", 0)).await.unwrap_err();
    assert!(matches!(err, SessionError::NotOwner { .. }));
    assert_eq!(h.host.notices_for("u2").len(), 1);
    assert!(h.host.results().is_empty());
    assert_eq!(
        h.engine.sessions().get(session).unwrap().status,
        SessionStatus::Pending
    );
    assert_eq!(h.ledger.balance("u2").await.unwrap(), 10_000);

    h.engine.handle_input(input(session, "u1", 1)).await.unwrap();
    assert_eq!(single_result(&h.host).user, "u1");
}

#[tokio::test]
async fn second_click_is_a_duplicate() {
    let mut h = harness();
    h.engine
        .run_outcome(&TriggerContext::new("u1"), OutcomeKind::TriviaChallenge)
        .await;
    let session = h.host.last_prompt().session;
    h.engine.handle_input(input(session, "u1", 1)).await.unwrap();
    let balance = h.ledger.balance("u1").await.unwrap();

    let err = h.engine.handle_input(input(session, "u1", 1)).await.unwrap_err();
    assert_eq!(err, SessionError::AlreadyResolved(session));
    assert_eq!(h.host.results().len(), 1);
    assert_eq!(h.ledger.balance("u1").await.unwrap(), balance);
    assert_eq!(h.host.notices_for("u1").len(), 1);
}

#[tokio::test]
async fn out_of_range_choice_leaves_session_open() {
    let mut h = harness();
    h.engine
        .run_outcome(&TriggerContext::new("u1"), OutcomeKind::ExploreRooms)
        .await;
    let session = h.host.last_prompt().session;
    let err = h.engine.handle_input(input(session, "u1", 3)).await.unwrap_err();
    assert_eq!(err, SessionError::InvalidChoice { choice: 3, options: 3 });
    assert!(h.engine.sessions().get(session).unwrap().is_pending());
    h.engine.handle_input(input(session, "u1", 2)).await.unwrap();
    assert_eq!(h.host.results().len(), 1);
}

#[tokio::test]
async fn unknown_session_is_not_found() {
    let mut h = harness();
    let ghost = uuid::Uuid::new_v4();
    let err = h.engine.handle_input(input(ghost, "u1", 0)).await.unwrap_err();
    assert_eq!(err, SessionError::NotFound(ghost));
}

#[tokio::test(start_paused = true)]
async fn deadline_expires_with_a_single_neutral_result() {
    let mut h = harness();
    let total = h.ledger.total();
    h.engine
        .run_outcome(&TriggerContext::new("u1"), OutcomeKind::DoubleOrNothing)
        .await;
    let session = h.host.last_prompt().session;

    let fired = h.expiries.recv().await.unwrap();
    assert_eq!(fired, session);
    assert!(h.engine.expire(fired).await);
    assert!(!h.engine.expire(fired).await, "second expiry must be ignored");

    let report = single_result(&h.host);
    assert_eq!(report.kind, OutcomeKind::DoubleOrNothing);
    assert_eq!(report.delta, 0);
    assert_eq!(h.host.closed(), vec![session]);
    assert_eq!(h.ledger.total(), total);

    let err = h.engine.handle_input(input(session, "u1", 0)).await.unwrap_err();
    assert_eq!(err, SessionError::Expired(session));
    assert_eq!(h.host.results().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn click_after_deadline_loses_to_queued_expiry() {
    let mut h = harness();
    h.engine
        .run_outcome(&TriggerContext::new("u1"), OutcomeKind::TriviaChallenge)
        .await;
    let session = h.host.last_prompt().session;
    tokio::time::advance(Duration::from_secs(31)).await;

    let err = h.engine.handle_input(input(session, "u1", 1)).await.unwrap_err();
    assert_eq!(err, SessionError::Expired(session));
    assert_eq!(h.ledger.balance("u1").await.unwrap(), 10_000);

    let fired = h.expiries.recv().await.unwrap();
    assert!(h.engine.expire(fired).await);
    let report = single_result(&h.host);
    assert!(report.text.contains("Oslo"), "text: {}", report.text);
}

#[tokio::test(start_paused = true)]
async fn resolving_early_cancels_the_deadline() {
    let mut h = harness();
    h.engine
        .run_outcome(&TriggerContext::new("u1"), OutcomeKind::ExploreRooms)
        .await;
    let session = h.host.last_prompt().session;
    h.engine.handle_input(input(session, "u1", 0)).await.unwrap();
    tokio::time::sleep(Duration::from_secs(120)).await;
    assert!(h.expiries.try_recv().is_err());
    assert_eq!(h.host.results().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn suspense_is_shown_after_the_ledger_moves() {
    let mut options = common::options();
    options.session.suspense_delay_ms = 1_500;
    let mut h = harness_with(common::documents(), options);
    h.engine
        .run_outcome(&TriggerContext::new("u1"), OutcomeKind::DoubleOrNothing)
        .await;
    let session = h.host.last_prompt().session;
    h.engine.handle_input(input(session, "u1", 0)).await.unwrap();

    // Balance already settled while the coin is still "in the air".
    assert_ne!(h.ledger.balance("u1").await.unwrap(), 10_000);
    tokio::time::sleep(Duration::from_millis(10)).await;
    let events = h.host.events();
    assert!(events.iter().any(|e| matches!(e, HostEvent::Suspense { .. })));
    assert!(h.host.results().is_empty());

    tokio::time::sleep(Duration::from_secs(2)).await;
    let events = h.host.events();
    let retracted = events
        .iter()
        .position(|e| matches!(e, HostEvent::Retracted(_)))
        .expect("suspense retracted");
    let result = events
        .iter()
        .position(|e| matches!(e, HostEvent::Result(_)))
        .expect("result sent");
    assert!(retracted < result);
    assert_eq!(h.host.results().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn actor_routes_triggers_clicks_and_deadlines() {
    let h = harness();
    let host = h.host.clone();
    let handle = start_engine(h.engine, h.expiries);

    handle.run_outcome(TriggerContext::new("u1"), OutcomeKind::DoubleOrNothing);
    handle.run_outcome(TriggerContext::new("u2"), OutcomeKind::ExploreRooms);
    let stats = handle.snapshot().await.unwrap();
    assert_eq!(stats.triggers, 2);
    assert_eq!(stats.pending_sessions, 2);

    let rooms = host
        .prompts()
        .into_iter()
        .find(|p| p.owner == "u2")
        .unwrap()
        .session;
    assert_eq!(handle.submit(input(rooms, "u2", 0)).await, Some(Ok(())));
    assert_eq!(
        handle.submit(input(rooms, "u2", 0)).await,
        Some(Err(SessionError::AlreadyResolved(rooms)))
    );

    tokio::time::sleep(Duration::from_secs(31)).await;
    let stats = handle.snapshot().await.unwrap();
    assert_eq!(stats.pending_sessions, 0);
    assert_eq!(stats.expired_total, 1);
    assert_eq!(host.results().len(), 2);

    assert!(handle.roll(TriggerContext::new("u1")).await.is_some());
    handle.shutdown().await;
    assert!(handle.snapshot().await.is_none());
}

#[tokio::test(start_paused = true)]
async fn shutdown_waits_for_results_behind_suspense() {
    let mut options = common::options();
    options.session.suspense_delay_ms = 1_500;
    let Harness {
        engine,
        expiries,
        ledger,
        host,
    } = harness_with(common::documents(), options);
    let handle = start_engine(engine, expiries);

    handle.run_outcome(TriggerContext::new("u1"), OutcomeKind::DoubleOrNothing);
    handle.snapshot().await.unwrap();
    let session = host.last_prompt().session;
    assert_eq!(handle.submit(input(session, "u1", 0)).await, Some(Ok(())));
    assert_ne!(ledger.balance("u1").await.unwrap(), 10_000);
    assert!(host.results().is_empty());

    handle.shutdown().await;
    let events = host.events();
    let retracted = events
        .iter()
        .position(|e| matches!(e, HostEvent::Retracted(_)))
        .expect("suspense retracted");
    let result = events
        .iter()
        .position(|e| matches!(e, HostEvent::Result(_)))
        .expect("result sent before shutdown returned");
    assert!(retracted < result);
    assert_eq!(host.results().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn engine_task_ends_when_every_handle_is_dropped() {
    let Harness {
        engine,
        expiries,
        host,
        ..
    } = harness();
    let handle = start_engine(engine, expiries);
    let other = handle.clone();
    handle.run_outcome(TriggerContext::new("u1"), OutcomeKind::DoubleOrNothing);
    assert_eq!(other.snapshot().await.unwrap().pending_sessions, 1);
    assert_eq!(Arc::strong_count(&host), 2);

    drop(handle);
    drop(other);
    tokio::time::sleep(Duration::from_millis(50)).await;
    // Only the test's own reference is left once the engine is dropped.
    assert_eq!(Arc::strong_count(&host), 1);
}
