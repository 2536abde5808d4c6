//! Engine event loop.
//!
//! One task owns the [`Engine`]; triggers, clicks and session deadlines are all funnelled into
//! it through channels and handled one at a time. That single owner is the serialization
//! point for session state.

use log::{debug, info};
use tokio::sync::{mpsc, oneshot};

use super::engine::{Engine, SessionInput, TriggerContext};
use super::outcome::OutcomeKind;
use super::session::{ExpiryReceiver, SessionError};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStats {
    pub triggers: u64,
    pub pending_sessions: usize,
    pub expired_total: u64,
    pub jackpot_claimed: bool,
}

enum EngineCommand {
    Trigger(TriggerContext, Option<oneshot::Sender<OutcomeKind>>),
    Run(TriggerContext, OutcomeKind),
    Input(SessionInput, Option<oneshot::Sender<Result<(), SessionError>>>),
    ResetJackpot,
    Snapshot(oneshot::Sender<EngineStats>),
    Shutdown(oneshot::Sender<()>),
}

#[derive(Clone)]
pub struct EngineHandle {
    tx: mpsc::UnboundedSender<EngineCommand>,
}

impl EngineHandle {
    /// Fire-and-forget trigger.
    pub fn trigger(&self, ctx: TriggerContext) {
        let _ = self.tx.send(EngineCommand::Trigger(ctx, None));
    }

    /// Trigger and wait for the drawn kind.
    pub async fn roll(&self, ctx: TriggerContext) -> Option<OutcomeKind> {
        let (tx, rx) = oneshot::channel();
        self.tx.send(EngineCommand::Trigger(ctx, Some(tx))).ok()?;
        rx.await.ok()
    }

    /// Admin: run a chosen outcome.
    pub fn run_outcome(&self, ctx: TriggerContext, kind: OutcomeKind) {
        let _ = self.tx.send(EngineCommand::Run(ctx, kind));
    }

    pub fn input(&self, input: SessionInput) {
        let _ = self.tx.send(EngineCommand::Input(input, None));
    }

    /// Submit a click and wait for its verdict. `None` when the engine is gone.
    pub async fn submit(&self, input: SessionInput) -> Option<Result<(), SessionError>> {
        let (tx, rx) = oneshot::channel();
        self.tx.send(EngineCommand::Input(input, Some(tx))).ok()?;
        rx.await.ok()
    }

    pub fn reset_jackpot(&self) {
        let _ = self.tx.send(EngineCommand::ResetJackpot);
    }

    pub async fn snapshot(&self) -> Option<EngineStats> {
        let (tx, rx) = oneshot::channel();
        if self.tx.send(EngineCommand::Snapshot(tx)).is_ok() {
            rx.await.ok()
        } else {
            None
        }
    }

    /// Stop the engine once pending suspense results are out. Open sessions are dropped.
    pub async fn shutdown(&self) {
        let (tx, rx) = oneshot::channel();
        let _ = self.tx.send(EngineCommand::Shutdown(tx));
        let _ = rx.await;
    }
}

/// Move `engine` onto its own task. Must be called inside a tokio runtime.
pub fn start_engine(mut engine: Engine, mut expiries: ExpiryReceiver) -> EngineHandle {
    let (tx, mut rx) = mpsc::unbounded_channel::<EngineCommand>();
    let handle = EngineHandle { tx };

    tokio::spawn(async move {
        let mut expired_total: u64 = 0;
        let mut stopped_by: Option<oneshot::Sender<()>> = None;
        loop {
            tokio::select! {
                cmd = rx.recv() => {
                    // Every handle is gone: nobody can trigger or click any more.
                    let Some(cmd) = cmd else { break };
                    match cmd {
                        EngineCommand::Trigger(ctx, reply) => {
                            let kind = engine.run_random_outcome(&ctx).await;
                            if let Some(reply) = reply {
                                let _ = reply.send(kind);
                            }
                        }
                        EngineCommand::Run(ctx, kind) => engine.run_outcome(&ctx, kind).await,
                        EngineCommand::Input(input, reply) => {
                            let verdict = engine.handle_input(input).await;
                            if let Some(reply) = reply {
                                let _ = reply.send(verdict);
                            }
                        }
                        EngineCommand::ResetJackpot => engine.reset_jackpot(),
                        EngineCommand::Snapshot(reply) => {
                            let _ = reply.send(EngineStats {
                                triggers: engine.triggers(),
                                pending_sessions: engine.sessions().pending_count(),
                                expired_total,
                                jackpot_claimed: engine.jackpot().is_claimed(),
                            });
                        }
                        EngineCommand::Shutdown(done) => {
                            stopped_by = Some(done);
                            break;
                        }
                    }
                }
                Some(id) = expiries.recv() => {
                    if engine.expire(id).await {
                        expired_total += 1;
                    } else {
                        debug!("engine: ignored stale deadline for {}", id);
                    }
                }
            }
        }
        // Settled effects still owe their result.
        engine.flush().await;
        info!("engine: stopped after {} triggers", engine.triggers());
        if let Some(done) = stopped_by {
            let _ = done.send(());
        }
    });

    handle
}
