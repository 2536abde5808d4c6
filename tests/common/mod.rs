//! Shared fixtures for integration tests: a host that records everything it is asked to show,
//! a ledger wrapper that can be told to fail, and an engine builder with pinned amounts.
#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use wildcard::config::ranges::{BackroomsRanges, JackpotRange, TriviaRanges};
use wildcard::config::{AmountRange, GameDocuments, Ranges, RotationConfig, SessionConfig};
use wildcard::game::content::{ContentDocument, TriviaQuestion};
use wildcard::game::session::ExpiryReceiver;
use wildcard::game::{
    ChoicePrompt, Engine, EngineOptions, Ledger, LedgerError, MemoryLedger, MessageRef,
    OutcomeKind, OutcomeReport, OutcomeWeights, PresentError, Presenter, SessionId,
};

#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    Prompt(ChoicePrompt),
    Closed(SessionId),
    Result(OutcomeReport),
    Notice { user: String, text: String },
    Suspense { user: String, text: String },
    Retracted(MessageRef),
}

#[derive(Debug, Default)]
pub struct RecordingHost {
    events: Mutex<Vec<HostEvent>>,
    fail_results: AtomicBool,
    next_message: AtomicU64,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every `send_result` fail from now on.
    pub fn fail_results(&self) {
        self.fail_results.store(true, Ordering::SeqCst);
    }

    pub fn events(&self) -> Vec<HostEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn results(&self) -> Vec<OutcomeReport> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                HostEvent::Result(r) => Some(r),
                _ => None,
            })
            .collect()
    }

    pub fn prompts(&self) -> Vec<ChoicePrompt> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                HostEvent::Prompt(p) => Some(p),
                _ => None,
            })
            .collect()
    }

    pub fn last_prompt(&self) -> ChoicePrompt {
        self.prompts().pop().expect("no prompt was presented")
    }

    pub fn notices_for(&self, user: &str) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                HostEvent::Notice { user: u, text } if u == user => Some(text),
                _ => None,
            })
            .collect()
    }

    pub fn closed(&self) -> Vec<SessionId> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                HostEvent::Closed(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    fn record(&self, event: HostEvent) {
        self.events.lock().unwrap().push(event);
    }
}

#[async_trait]
impl Presenter for RecordingHost {
    async fn present_choice(&self, prompt: &ChoicePrompt) -> Result<(), PresentError> {
        self.record(HostEvent::Prompt(prompt.clone()));
        Ok(())
    }

    async fn close_choice(&self, session: SessionId) -> Result<(), PresentError> {
        self.record(HostEvent::Closed(session));
        Ok(())
    }

    async fn send_result(&self, report: &OutcomeReport) -> Result<(), PresentError> {
        if self.fail_results.load(Ordering::SeqCst) {
            return Err(PresentError::Unavailable("test host is down".into()));
        }
        self.record(HostEvent::Result(report.clone()));
        Ok(())
    }

    async fn send_notice(&self, user: &str, text: &str) -> Result<(), PresentError> {
        self.record(HostEvent::Notice {
            user: user.to_string(),
            text: text.to_string(),
        });
        Ok(())
    }

    async fn send_suspense(&self, user: &str, text: &str) -> Result<MessageRef, PresentError> {
        let n = self.next_message.fetch_add(1, Ordering::SeqCst);
        self.record(HostEvent::Suspense {
            user: user.to_string(),
            text: text.to_string(),
        });
        Ok(MessageRef(format!("m{}", n)))
    }

    async fn retract(&self, message: &MessageRef) -> Result<(), PresentError> {
        self.record(HostEvent::Retracted(message.clone()));
        Ok(())
    }
}

/// Wraps a [`MemoryLedger`] and refuses credits to one subject.
pub struct FlakyLedger {
    pub inner: Arc<MemoryLedger>,
    pub refuse_credit_to: String,
}

#[async_trait]
impl Ledger for FlakyLedger {
    async fn adjust_balance(&self, subject: &str, delta: i64, reason: &str) -> Result<i64, LedgerError> {
        if delta > 0 && subject == self.refuse_credit_to {
            return Err(LedgerError::Backend("write refused".into()));
        }
        self.inner.adjust_balance(subject, delta, reason).await
    }

    async fn balance(&self, subject: &str) -> Result<i64, LedgerError> {
        self.inner.balance(subject).await
    }

    async fn display_name(&self, subject: &str) -> Result<String, LedgerError> {
        self.inner.display_name(subject).await
    }
}

/// Single-value ranges so every sampled amount is known up front.
pub fn pinned_ranges() -> Ranges {
    Ranges {
        jackpot: JackpotRange { amount: 1_000_000 },
        add_low: AmountRange::new(300, 301),
        add_high: AmountRange::new(5_000, 5_001),
        remove_low: AmountRange::new(400, 401),
        remove_high: AmountRange::new(6_000, 6_001),
        double_or_nothing: AmountRange::new(1_000, 1_001),
        steal: AmountRange::new(1_000, 1_001),
        trivia: TriviaRanges {
            correct_min: 700,
            correct_max: 701,
            penalty_min: 200,
            penalty_max: 201,
            penalty_chance: 1.0,
        },
        backrooms: BackroomsRanges {
            treasure_min: 2_000,
            treasure_max: 2_001,
            monster_min: 900,
            monster_max: 901,
        },
    }
}

pub fn capital_question() -> TriviaQuestion {
    TriviaQuestion {
        question: "Capital of Norway?".into(),
        options: vec!["Bergen".into(), "Oslo".into(), "Tromsø".into(), "Trondheim".into()],
        answer: 1,
    }
}

pub fn documents() -> GameDocuments {
    let content = ContentDocument {
        trivia: vec![capital_question()],
        ..ContentDocument::default()
    };
    GameDocuments {
        ranges: pinned_ranges(),
        weights: OutcomeWeights::default(),
        content,
    }
}

pub fn options() -> EngineOptions {
    EngineOptions {
        session: SessionConfig {
            timeout_secs: 30,
            suspense_delay_ms: 0,
            retention_secs: 600,
        },
        rotation: RotationConfig::default(),
        seed: Some(7),
    }
}

pub struct Harness {
    pub engine: Engine,
    pub expiries: ExpiryReceiver,
    pub ledger: Arc<MemoryLedger>,
    pub host: Arc<RecordingHost>,
}

/// Ann (u1) and Bo (u2) with 10,000 each, plus Cy (u3) holding 3,000,000.
pub fn members() -> Arc<MemoryLedger> {
    Arc::new(
        MemoryLedger::new()
            .with_account("u1", "Ann", 10_000)
            .with_account("u2", "Bo", 10_000)
            .with_account("u3", "Cy", 3_000_000),
    )
}

pub fn harness() -> Harness {
    harness_with(documents(), options())
}

pub fn harness_with(documents: GameDocuments, options: EngineOptions) -> Harness {
    let ledger = members();
    let host = Arc::new(RecordingHost::new());
    let (engine, expiries) = Engine::new(documents, options, ledger.clone(), host.clone());
    Harness {
        engine,
        expiries,
        ledger,
        host,
    }
}

pub fn single_result(host: &RecordingHost) -> OutcomeReport {
    let results = host.results();
    assert_eq!(results.len(), 1, "expected exactly one result, got {:?}", results);
    results.into_iter().next().unwrap()
}

pub fn kinds_of(reports: &[OutcomeReport]) -> Vec<OutcomeKind> {
    reports.iter().map(|r| r.kind).collect()
}
