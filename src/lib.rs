//! # Wildcard - weighted random minigames for community chat
//!
//! Wildcard is the engine behind a "feeling lucky?" button in a chat community. Every trigger
//! draws one of twelve outcomes from a weighted table and applies it to the member's balance:
//! small wins and losses, a once-only jackpot, jokes and clips, or an interactive minigame
//! (double-or-nothing, steal, trivia, the backrooms) that waits for the member's choice.
//!
//! ## Features
//!
//! - **Weighted draws**: twelve outcome kinds, integer weights summing to 1000, validated at
//!   startup.
//! - **Interactive sessions**: owner-only choices with deadlines; exactly one result per
//!   session whether it is resolved, expired, or clicked twice.
//! - **Safe economics**: debits are clamped to the balance held, steals debit the mark before
//!   crediting the thief, and the jackpot can be claimed once.
//! - **Fresh content**: rotation windows keep jokes, clips, questions and message templates
//!   from repeating.
//! - **Pluggable edges**: the balance store ([`game::Ledger`]) and the chat surface
//!   ([`game::Presenter`]) are traits; a console host and JSON-file ledger ship in the box.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use wildcard::config::Config;
//! use wildcard::console::ConsoleHost;
//! use wildcard::game::{start_engine, Engine, EngineOptions, MemoryLedger, TriggerContext};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.toml").await?;
//!     let documents = config.load_documents().await?;
//!     let ledger = Arc::new(MemoryLedger::new().with_account("u1", "Ann", 10_000));
//!     let (engine, expiries) = Engine::new(
//!         documents,
//!         EngineOptions::from(&config),
//!         ledger,
//!         Arc::new(ConsoleHost::new()),
//!     );
//!     let handle = start_engine(engine, expiries);
//!     handle.roll(TriggerContext::new("u1")).await;
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`config`] - application config and the ranges, weights and content documents
//! - [`game`] - outcomes, sessions, ledger and presentation interfaces, and the dispatcher
//! - [`console`] - line-oriented host used by `wildcard start`
//! - [`logutil`] - log escaping for chat-sourced strings

pub mod config;
pub mod console;
pub mod game;
pub mod logutil;
