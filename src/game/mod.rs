//! # Game Engine
//!
//! Everything between "someone triggered a draw" and "the chat shows what happened".
//!
//! ## Components
//!
//! - [`outcome`] - Outcome kinds and the weighted table they are drawn from
//! - [`effects`] - Pure economic calculators (clamping, steal tiers, coin flips, doors)
//! - [`rotation`] - Recent-history windows that keep content from repeating
//! - [`content`] - Message templates, jokes, media links and trivia
//! - [`jackpot`] - The once-only jackpot gate
//! - [`session`] - Pending interactive decisions with owners and deadlines
//! - [`ledger`] - The balance store interface and two adapters
//! - [`host`] - The presentation interface
//! - [`engine`] / [`outcomes`] - The dispatcher and the per-outcome handlers
//! - [`actor`] - The task that owns the engine
//!
//! ## Flow
//!
//! ```text
//! trigger ─▶ EngineHandle ─▶ actor ─▶ Engine::run_random_outcome
//!                               │            │
//!                               │      immediate: ledger ─▶ host.send_result
//!                               │      interactive: session ─▶ host.present_choice
//!                               │
//!      click ─▶ EngineHandle ───┤─▶ Engine::handle_input ─▶ ledger ─▶ host.send_result
//!   deadline ─▶ expiry channel ─┘─▶ Engine::expire ──────────────────▶ host.send_result
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use wildcard::config::Config;
//! use wildcard::game::{start_engine, Engine, EngineOptions, MemoryLedger, TriggerContext};
//! # use wildcard::console::ConsoleHost;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.toml").await?;
//!     let documents = config.load_documents().await?;
//!     let ledger = Arc::new(MemoryLedger::new().with_account("u1", "Ann", 5_000));
//!     let (engine, expiries) = Engine::new(
//!         documents,
//!         EngineOptions::from(&config),
//!         ledger,
//!         Arc::new(ConsoleHost::new()),
//!     );
//!     let handle = start_engine(engine, expiries);
//!     handle.trigger(TriggerContext::new("u1"));
//!     Ok(())
//! }
//! ```

pub mod actor;
pub mod content;
pub mod effects;
pub mod engine;
pub mod host;
pub mod jackpot;
pub mod ledger;
pub mod outcome;
pub mod outcomes;
pub mod rotation;
pub mod session;

pub use actor::{start_engine, EngineHandle, EngineStats};
pub use engine::{Engine, EngineOptions, SessionInput, TriggerContext};
pub use host::{ChoicePrompt, MessageRef, OutcomeReport, PresentError, Presenter};
pub use jackpot::JackpotState;
pub use ledger::{JsonFileLedger, Ledger, LedgerError, MemoryLedger};
pub use outcome::{OutcomeKind, OutcomeWeights};
pub use outcomes::{Mark, Pending};
pub use session::{SessionError, SessionId, SessionStatus};
