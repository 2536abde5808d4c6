mod common;

use common::{harness, single_result};
use rand::rngs::mock::StepRng;
use std::sync::Arc;
use wildcard::game::outcome::WeightTable;
use wildcard::game::{Engine, Ledger, OutcomeKind, TriggerContext};

#[tokio::test]
async fn add_low_credits_the_sampled_amount() {
    let mut h = harness();
    h.engine
        .run_outcome(&TriggerContext::new("u1"), OutcomeKind::AddLow)
        .await;
    let report = single_result(&h.host);
    assert_eq!(report.kind, OutcomeKind::AddLow);
    assert_eq!(report.delta, 300);
    assert_eq!(report.balance, Some(10_300));
    assert!(report.text.contains("Ann"), "text: {}", report.text);
    assert!(report.text.contains("300"), "text: {}", report.text);
    assert_eq!(h.ledger.balance("u1").await.unwrap(), 10_300);
}

#[tokio::test]
async fn add_high_uses_its_own_range() {
    let mut h = harness();
    h.engine
        .run_outcome(&TriggerContext::new("u2"), OutcomeKind::AddHigh)
        .await;
    assert_eq!(single_result(&h.host).delta, 5_000);
    assert_eq!(h.ledger.balance("u2").await.unwrap(), 15_000);
}

#[tokio::test]
async fn remove_is_clamped_to_the_balance() {
    let mut h = harness();
    h.ledger.open_account("poor", "Pat", 250);
    h.engine
        .run_outcome(&TriggerContext::new("poor"), OutcomeKind::RemoveHigh)
        .await;
    let report = single_result(&h.host);
    assert_eq!(report.delta, -250);
    assert_eq!(report.balance, Some(0));
    assert_eq!(h.ledger.balance("poor").await.unwrap(), 0);
}

#[tokio::test]
async fn remove_from_empty_wallet_changes_nothing() {
    let mut h = harness();
    h.ledger.open_account("broke", "Bea", 0);
    h.engine
        .run_outcome(&TriggerContext::new("broke"), OutcomeKind::RemoveLow)
        .await;
    let report = single_result(&h.host);
    assert_eq!(report.delta, 0);
    assert!(report.text.contains("empty"), "text: {}", report.text);
    assert_eq!(h.ledger.balance("broke").await.unwrap(), 0);
}

#[tokio::test]
async fn strip_all_takes_everything() {
    let mut h = harness();
    h.engine
        .run_outcome(&TriggerContext::new("u1"), OutcomeKind::StripAllBalance)
        .await;
    let report = single_result(&h.host);
    assert_eq!(report.delta, -10_000);
    assert_eq!(h.ledger.balance("u1").await.unwrap(), 0);
    assert!(report.text.contains("10,000"), "text: {}", report.text);
}

#[tokio::test]
async fn joke_and_media_touch_no_balance() {
    let mut h = harness();
    let before = h.ledger.total();
    h.engine
        .run_outcome(&TriggerContext::new("u1"), OutcomeKind::Joke)
        .await;
    h.engine
        .run_outcome(&TriggerContext::new("u1"), OutcomeKind::MediaClip)
        .await;
    let results = h.host.results();
    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|r| r.delta == 0));
    assert!(results[0].text.contains('\n'), "joke should follow the intro");
    assert!(results[1].attachment.is_some());
    assert_eq!(h.ledger.total(), before);
}

#[tokio::test]
async fn unknown_subject_gets_a_friendly_no_op() {
    let mut h = harness();
    let before = h.ledger.total();
    h.engine
        .run_outcome(&TriggerContext::new("ghost"), OutcomeKind::AddHigh)
        .await;
    let report = single_result(&h.host);
    assert_eq!(report.delta, 0);
    assert!(report.text.contains("unavailable"), "text: {}", report.text);
    assert_eq!(h.ledger.total(), before);
}

#[tokio::test]
async fn failed_presentation_keeps_the_ledger_change() {
    let mut h = harness();
    h.host.fail_results();
    h.engine
        .run_outcome(&TriggerContext::new("u1"), OutcomeKind::AddLow)
        .await;
    assert!(h.host.results().is_empty());
    assert_eq!(h.ledger.balance("u1").await.unwrap(), 10_300);
}

#[tokio::test]
async fn heavy_weight_wins_every_constant_draw() {
    let table = WeightTable::new(vec![(OutcomeKind::Joke, 999), (OutcomeKind::Jackpot, 1)]).unwrap();
    let mut documents = common::documents();
    documents.weights = table;
    let ledger = common::members();
    let host = Arc::new(common::RecordingHost::new());
    let (engine, _expiries) = Engine::new(documents, common::options(), ledger.clone(), host.clone());
    let mut engine = engine.with_rng(StepRng::new(0, 0));

    let before = ledger.total();
    for _ in 0..100 {
        let kind = engine.run_random_outcome(&TriggerContext::new("u1")).await;
        assert_eq!(kind, OutcomeKind::Joke);
    }
    assert_eq!(host.results().len(), 100);
    assert_eq!(engine.triggers(), 100);
    assert_eq!(ledger.total(), before);
    assert!(!engine.jackpot().is_claimed());
}
