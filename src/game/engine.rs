//! Outcome dispatcher.
//!
//! [`Engine::run_random_outcome`] is the one entry point a trigger needs: it draws a kind,
//! runs its handler, and either emits a result right away or opens a session whose
//! resolution ([`Engine::handle_input`]) or expiry ([`Engine::expire`]) emits it later.
//!
//! The engine is not shared: it is owned by a single task (see [`super::actor`]) and every
//! method takes `&mut self`, which is what makes the session guard sufficient.

use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;

use super::content::{ContentLibrary, TemplateKey, Vars};
use super::host::{ChoicePrompt, OutcomeReport, Presenter};
use super::jackpot::JackpotState;
use super::ledger::{Ledger, LedgerError};
use super::outcome::{OutcomeKind, OutcomeWeights};
use super::outcomes::Pending;
use super::session::{ExpiryReceiver, SessionError, SessionId, SessionManager};
use crate::config::{Config, GameDocuments, Ranges, RotationConfig, SessionConfig};
use crate::logutil::escape_log;

/// Who triggered, and who else is around to be stolen from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TriggerContext {
    pub user: String,
    /// Recently active subjects; the caller is filtered out.
    pub candidates: Vec<String>,
}

impl TriggerContext {
    pub fn new(user: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            candidates: Vec::new(),
        }
    }

    pub fn with_candidates<I, S>(mut self, candidates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.candidates = candidates.into_iter().map(Into::into).collect();
        self
    }
}

/// A click on one of a session's options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInput {
    pub session: SessionId,
    pub user: String,
    pub choice: usize,
}

/// Runtime knobs taken from [`Config`].
#[derive(Debug, Clone, Default)]
pub struct EngineOptions {
    pub session: SessionConfig,
    pub rotation: RotationConfig,
    pub seed: Option<u64>,
}

impl From<&Config> for EngineOptions {
    fn from(config: &Config) -> Self {
        Self {
            session: config.session.clone(),
            rotation: config.rotation.clone(),
            seed: config.engine.seed,
        }
    }
}

pub type EngineRng = Box<dyn RngCore + Send + Sync>;

pub struct Engine {
    pub(super) ranges: Ranges,
    weights: OutcomeWeights,
    pub(super) content: ContentLibrary,
    pub(super) sessions: SessionManager<Pending>,
    pub(super) jackpot: Arc<JackpotState>,
    pub(super) ledger: Arc<dyn Ledger>,
    pub(super) host: Arc<dyn Presenter>,
    pub(super) rng: EngineRng,
    suspense_delay: Duration,
    /// Results still waiting behind a suspense message.
    suspense: JoinSet<()>,
    triggers: u64,
}

impl Engine {
    /// Build an engine and the receiver its session deadlines report to.
    pub fn new(
        documents: GameDocuments,
        options: EngineOptions,
        ledger: Arc<dyn Ledger>,
        host: Arc<dyn Presenter>,
    ) -> (Self, ExpiryReceiver) {
        let (sessions, expiries) =
            SessionManager::new(options.session.timeout(), options.session.retention());
        let rng: EngineRng = match options.seed {
            Some(seed) => Box::new(StdRng::seed_from_u64(seed)),
            None => Box::new(StdRng::from_entropy()),
        };
        let engine = Engine {
            ranges: documents.ranges,
            weights: documents.weights,
            content: ContentLibrary::new(documents.content, &options.rotation),
            sessions,
            jackpot: Arc::new(JackpotState::new()),
            ledger,
            host,
            rng,
            suspense_delay: options.session.suspense_delay(),
            suspense: JoinSet::new(),
            triggers: 0,
        };
        (engine, expiries)
    }

    /// Replace the random source (tests, replays).
    pub fn with_rng(mut self, rng: impl RngCore + Send + Sync + 'static) -> Self {
        self.rng = Box::new(rng);
        self
    }

    /// Share a jackpot gate between engines (e.g. one engine per channel).
    pub fn with_jackpot(mut self, jackpot: Arc<JackpotState>) -> Self {
        self.jackpot = jackpot;
        self
    }

    pub fn jackpot(&self) -> &JackpotState {
        &self.jackpot
    }

    pub fn reset_jackpot(&self) {
        self.jackpot.reset();
    }

    pub fn sessions(&self) -> &SessionManager<Pending> {
        &self.sessions
    }

    pub fn triggers(&self) -> u64 {
        self.triggers
    }

    pub fn weights(&self) -> &OutcomeWeights {
        &self.weights
    }

    /// Draw one outcome for `ctx` and run it.
    pub async fn run_random_outcome(&mut self, ctx: &TriggerContext) -> OutcomeKind {
        let kind = self.weights.draw(&mut self.rng);
        self.run_outcome(ctx, kind).await;
        kind
    }

    /// Run a specific outcome, bypassing the draw.
    pub async fn run_outcome(&mut self, ctx: &TriggerContext, kind: OutcomeKind) {
        self.triggers += 1;
        info!("outcome: {} drew {}", escape_log(&ctx.user), kind);
        let report = match kind {
            OutcomeKind::Jackpot => self.jackpot_outcome(ctx).await,
            OutcomeKind::StripAllBalance => self.strip_all_outcome(ctx).await,
            OutcomeKind::AddLow | OutcomeKind::AddHigh => self.add_outcome(ctx, kind).await,
            OutcomeKind::RemoveLow | OutcomeKind::RemoveHigh => {
                self.remove_outcome(ctx, kind).await
            }
            OutcomeKind::Joke => self.joke_outcome(ctx).await,
            OutcomeKind::MediaClip => self.media_outcome(ctx).await,
            OutcomeKind::DoubleOrNothing => self.double_or_nothing_outcome(ctx).await,
            OutcomeKind::Steal => self.steal_outcome(ctx).await,
            OutcomeKind::TriviaChallenge => self.trivia_outcome(ctx).await,
            OutcomeKind::ExploreRooms => self.rooms_outcome(ctx).await,
        };
        // Interactive kinds return None once their session is open.
        if let Some(report) = report {
            self.deliver(report, None).await;
        }
    }

    /// Route a click to its session. Rejections are answered with a notice to the clicker and
    /// leave the session as it was.
    pub async fn handle_input(&mut self, input: SessionInput) -> Result<(), SessionError> {
        let options = match self.sessions.authorize(input.session, &input.user) {
            Ok(session) => session.payload.option_count(),
            Err(e) => {
                self.reject(&input.user, &e).await;
                return Err(e);
            }
        };
        if input.choice >= options {
            let e = SessionError::InvalidChoice {
                choice: input.choice,
                options,
            };
            self.reject(&input.user, &e).await;
            return Err(e);
        }

        let payload = match self.sessions.resolve(input.session, &input.user) {
            Ok(session) => session.payload.clone(),
            Err(e) => {
                self.reject(&input.user, &e).await;
                return Err(e);
            }
        };
        if let Err(e) = self.host.close_choice(input.session).await {
            warn!("host: close_choice {} failed: {}", input.session, e);
        }

        let (report, suspense) = self.resolve_pending(&input.user, payload, input.choice).await;
        self.deliver(report, suspense).await;
        Ok(())
    }

    /// Expire a session whose deadline fired. Returns `false` for stale timers.
    pub async fn expire(&mut self, id: SessionId) -> bool {
        let (owner, payload) = match self.sessions.expire(id) {
            Some(session) => (session.owner.clone(), session.payload.clone()),
            None => return false,
        };
        if let Err(e) = self.host.close_choice(id).await {
            warn!("host: close_choice {} failed: {}", id, e);
        }
        let report = self.expired_report(&owner, &payload).await;
        self.deliver(report, None).await;
        true
    }

    async fn reject(&self, user: &str, error: &SessionError) {
        debug!("session input from {} rejected: {}", escape_log(user), error);
        let notice = match error {
            SessionError::NotFound(_) => "That game is over.",
            SessionError::NotOwner { .. } => "That's not your game.",
            SessionError::AlreadyResolved(_) => "You already made your choice.",
            SessionError::Expired(_) => "Too late, time ran out.",
            SessionError::InvalidChoice { .. } => "That's not one of the options.",
        };
        if let Err(e) = self.host.send_notice(user, notice).await {
            warn!("host: notice to {} failed: {}", escape_log(user), e);
        }
    }

    /// Show a prompt for a freshly opened session.
    pub(super) async fn open_session(
        &mut self,
        owner: &str,
        kind: OutcomeKind,
        text: String,
        payload: Pending,
    ) {
        let options = payload.options();
        let session = self.sessions.open(owner, payload);
        let prompt = ChoicePrompt {
            session: session.id,
            owner: owner.to_string(),
            kind,
            text,
            options,
            timeout: self.sessions.timeout(),
        };
        // A prompt that fails to render still expires normally.
        if let Err(e) = self.host.present_choice(&prompt).await {
            warn!("host: present_choice {} failed: {}", prompt.session, e);
        }
    }

    /// Wait until every result held behind a suspense message has been sent.
    pub async fn flush(&mut self) {
        while let Some(joined) = self.suspense.join_next().await {
            if let Err(e) = joined {
                warn!("suspense delivery task failed: {}", e);
            }
        }
    }

    /// Emit the one result of a terminal path, optionally behind a suspense message.
    pub(super) async fn deliver(&mut self, report: OutcomeReport, suspense: Option<String>) {
        while let Some(joined) = self.suspense.try_join_next() {
            if let Err(e) = joined {
                warn!("suspense delivery task failed: {}", e);
            }
        }
        match suspense {
            Some(text) if !self.suspense_delay.is_zero() => {
                let host = self.host.clone();
                let delay = self.suspense_delay;
                self.suspense.spawn(async move {
                    let interim = match host.send_suspense(&report.user, &text).await {
                        Ok(message) => Some(message),
                        Err(e) => {
                            warn!("host: suspense message failed: {}", e);
                            None
                        }
                    };
                    tokio::time::sleep(delay).await;
                    if let Some(message) = interim {
                        if let Err(e) = host.retract(&message).await {
                            warn!("host: retract {:?} failed: {}", message, e);
                        }
                    }
                    if let Err(e) = host.send_result(&report).await {
                        warn!("host: result for {} failed: {}", escape_log(&report.user), e);
                    }
                });
            }
            _ => {
                if let Err(e) = self.host.send_result(&report).await {
                    warn!("host: result for {} failed: {}", escape_log(&report.user), e);
                }
            }
        }
    }

    /// Display name, falling back to the raw id.
    pub(super) async fn name_of(&self, subject: &str) -> String {
        match self.ledger.display_name(subject).await {
            Ok(name) => name,
            Err(_) => subject.to_string(),
        }
    }

    pub(super) fn line(&mut self, key: TemplateKey, vars: &Vars<'_>) -> String {
        self.content.line(key, vars, &mut self.rng)
    }

    /// Friendly no-op result for a ledger failure; nothing was applied.
    pub(super) fn ledger_failure(
        &mut self,
        user: &str,
        name: &str,
        kind: OutcomeKind,
        error: &LedgerError,
    ) -> OutcomeReport {
        warn!("outcome {} for {}: ledger error: {}", kind, escape_log(user), error);
        let text = self.line(TemplateKey::LedgerUnavailable, &Vars::user(name));
        OutcomeReport {
            user: user.to_string(),
            kind,
            text,
            delta: 0,
            balance: None,
            attachment: None,
        }
    }
}
