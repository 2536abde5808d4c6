//! Console host: a line-oriented stand-in for a chat platform.
//!
//! `wildcard start` wires the engine to stdin/stdout. Prompts and results are printed, and
//! button clicks become `pick <user> <n> [#prompt]` lines. Without a prompt number the user's
//! newest open prompt is meant. Balances live in a [`JsonFileLedger`] so they survive restarts.
//!
//! ```text
//! > join u1 Ann
//! > join u2 Bo
//! > roll u1
//! [prompt #1] 🎲 Ann, double or nothing on 🪙2,300? Flip the coin or walk away.
//!   1) 🪙 Flip
//!   2) 🚶 Walk away
//! > pick u1 1 #1
//! ```

use async_trait::async_trait;
use log::{debug, trace, warn};
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::game::content::format_amount;
use crate::game::{
    ChoicePrompt, EngineHandle, JsonFileLedger, Ledger, MessageRef, OutcomeKind, OutcomeReport,
    PresentError, Presenter, SessionId, SessionInput, TriggerContext,
};
use crate::logutil::escape_log;

#[derive(Debug, Clone)]
struct OpenPrompt {
    number: u64,
    owner: String,
    session: SessionId,
}

/// Prints everything to stdout and remembers every open prompt, numbered as shown.
#[derive(Debug, Default)]
pub struct ConsoleHost {
    open: Mutex<Vec<OpenPrompt>>,
    next_prompt: AtomicU64,
    next_message: AtomicU64,
}

impl ConsoleHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Session behind prompt `number` of `user`, or their newest open prompt.
    pub fn open_session(&self, user: &str, number: Option<u64>) -> Option<SessionId> {
        let open = self.open.lock().ok()?;
        let found = open
            .iter()
            .rev()
            .filter(|p| p.owner == user)
            .find(|p| number.map_or(true, |n| p.number == n))
            .map(|p| p.session);
        found
    }

    /// Numbers of the prompts `user` can still answer, oldest first.
    pub fn open_prompts(&self, user: &str) -> Vec<u64> {
        let Ok(open) = self.open.lock() else {
            return Vec::new();
        };
        let numbers = open
            .iter()
            .filter(|p| p.owner == user)
            .map(|p| p.number)
            .collect();
        numbers
    }
}

#[async_trait]
impl Presenter for ConsoleHost {
    async fn present_choice(&self, prompt: &ChoicePrompt) -> Result<(), PresentError> {
        let mut open = self
            .open
            .lock()
            .map_err(|_| PresentError::Unavailable("console state poisoned".to_string()))?;
        let number = self.next_prompt.fetch_add(1, Ordering::Relaxed) + 1;
        open.push(OpenPrompt {
            number,
            owner: prompt.owner.clone(),
            session: prompt.session,
        });
        println!("[prompt #{}] {}", number, prompt.text);
        for (i, option) in prompt.options.iter().enumerate() {
            println!("  {}) {}", i + 1, option);
        }
        println!("  (expires in {}s)", prompt.timeout.as_secs());
        Ok(())
    }

    async fn close_choice(&self, session: SessionId) -> Result<(), PresentError> {
        let mut open = self
            .open
            .lock()
            .map_err(|_| PresentError::Unavailable("console state poisoned".to_string()))?;
        open.retain(|p| p.session != session);
        Ok(())
    }

    async fn send_result(&self, report: &OutcomeReport) -> Result<(), PresentError> {
        println!("{}", report.text);
        if let Some(link) = &report.attachment {
            println!("  {}", link);
        }
        Ok(())
    }

    async fn send_notice(&self, user: &str, text: &str) -> Result<(), PresentError> {
        println!("(to {}) {}", user, text);
        Ok(())
    }

    async fn send_suspense(&self, _user: &str, text: &str) -> Result<MessageRef, PresentError> {
        let n = self.next_message.fetch_add(1, Ordering::Relaxed);
        println!("{}", text);
        Ok(MessageRef(format!("console-{}", n)))
    }

    async fn retract(&self, message: &MessageRef) -> Result<(), PresentError> {
        trace!("console: retract {}", message.0);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Help,
    Join { user: String, name: String },
    Roll(String),
    Force { user: String, kind: OutcomeKind },
    /// 1-based option number and optional prompt number, as printed.
    Pick {
        user: String,
        option: usize,
        prompt: Option<u64>,
    },
    Balance(String),
    Stats,
    ResetJackpot,
    Quit,
    Unknown,
    Invalid(String),
}

impl ConsoleCommand {
    pub fn parse(raw: &str) -> ConsoleCommand {
        let mut words = raw.split_whitespace();
        let verb = match words.next() {
            Some(v) => v.to_ascii_lowercase(),
            None => return ConsoleCommand::Unknown,
        };
        let args: Vec<&str> = words.collect();
        trace!("console: parsed verb '{}' with {} args", verb, args.len());
        match (verb.as_str(), args.as_slice()) {
            ("help" | "?", _) => ConsoleCommand::Help,
            ("quit" | "exit", _) => ConsoleCommand::Quit,
            ("stats", _) => ConsoleCommand::Stats,
            ("reset-jackpot", _) => ConsoleCommand::ResetJackpot,
            ("join", [user, name @ ..]) if !name.is_empty() => ConsoleCommand::Join {
                user: user.to_string(),
                name: name.join(" "),
            },
            ("join", _) => ConsoleCommand::Invalid("usage: join <user> <display name>".into()),
            ("roll", [user]) => ConsoleCommand::Roll(user.to_string()),
            ("roll", _) => ConsoleCommand::Invalid("usage: roll <user>".into()),
            ("force", [user, kind]) => match OutcomeKind::from_str(kind) {
                Ok(kind) => ConsoleCommand::Force {
                    user: user.to_string(),
                    kind,
                },
                Err(_) => ConsoleCommand::Invalid(format!("unknown outcome '{}'", kind)),
            },
            ("force", _) => ConsoleCommand::Invalid("usage: force <user> <outcome>".into()),
            ("pick", [user, n, rest @ ..]) if rest.len() <= 1 => {
                let option = match n.parse::<usize>() {
                    Ok(option) if option > 0 => option,
                    _ => return ConsoleCommand::Invalid(format!("'{}' is not an option number", n)),
                };
                let prompt = match rest.first() {
                    None => None,
                    Some(p) => match p.trim_start_matches('#').parse::<u64>() {
                        Ok(number) => Some(number),
                        Err(_) => {
                            return ConsoleCommand::Invalid(format!("'{}' is not a prompt number", p))
                        }
                    },
                };
                ConsoleCommand::Pick {
                    user: user.to_string(),
                    option,
                    prompt,
                }
            }
            ("pick", _) => ConsoleCommand::Invalid("usage: pick <user> <n> [#prompt]".into()),
            ("balance", [user]) => ConsoleCommand::Balance(user.to_string()),
            ("balance", _) => ConsoleCommand::Invalid("usage: balance <user>".into()),
            _ => ConsoleCommand::Unknown,
        }
    }
}

const HELP: &str = "commands: join <user> <name> | roll <user> | pick <user> <n> [#prompt] | \
balance <user> | force <user> <outcome> | stats | reset-jackpot | quit";

/// Read commands from stdin until EOF or `quit`.
pub async fn run_console(
    handle: EngineHandle,
    ledger: Arc<JsonFileLedger>,
    host: Arc<ConsoleHost>,
) -> anyhow::Result<()> {
    println!("{}", HELP);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        debug!("console: input '{}'", escape_log(&line));
        match ConsoleCommand::parse(&line) {
            ConsoleCommand::Help => println!("{}", HELP),
            ConsoleCommand::Quit => break,
            ConsoleCommand::Unknown => {
                if !line.trim().is_empty() {
                    println!("unknown command, try 'help'");
                }
            }
            ConsoleCommand::Invalid(message) => println!("{}", message),
            ConsoleCommand::Join { user, name } => match ledger.register(&user, &name) {
                Ok(balance) => println!("{} joined with {}", name, format_amount(balance)),
                Err(e) => println!("join failed: {}", e),
            },
            ConsoleCommand::Roll(user) => {
                let ctx = trigger_for(&ledger, &user);
                if let Some(kind) = handle.roll(ctx).await {
                    debug!("console: {} rolled {}", escape_log(&user), kind);
                }
            }
            ConsoleCommand::Force { user, kind } => {
                handle.run_outcome(trigger_for(&ledger, &user), kind);
            }
            ConsoleCommand::Pick {
                user,
                option,
                prompt,
            } => match host.open_session(&user, prompt) {
                Some(session) => {
                    let input = SessionInput {
                        session,
                        user,
                        choice: option - 1,
                    };
                    // Rejections are answered through the host.
                    let _ = handle.submit(input).await;
                }
                None => match prompt {
                    Some(number) => println!("{} has no open prompt #{}", user, number),
                    None => println!("{} has nothing to pick", user),
                },
            },
            ConsoleCommand::Balance(user) => match ledger.balance(&user).await {
                Ok(balance) => println!("{}: {}", user, format_amount(balance)),
                Err(e) => println!("{}", e),
            },
            ConsoleCommand::Stats => {
                if let Some(stats) = handle.snapshot().await {
                    println!(
                        "triggers={} pending={} expired={} jackpot_claimed={}",
                        stats.triggers,
                        stats.pending_sessions,
                        stats.expired_total,
                        stats.jackpot_claimed
                    );
                }
            }
            ConsoleCommand::ResetJackpot => {
                handle.reset_jackpot();
                println!("jackpot reset");
            }
        }
    }
    Ok(())
}

/// Everyone who has joined is a steal candidate.
fn trigger_for(ledger: &JsonFileLedger, user: &str) -> TriggerContext {
    let candidates = ledger.subjects().unwrap_or_else(|e| {
        warn!("console: cannot list subjects: {}", e);
        Vec::new()
    });
    TriggerContext::new(user).with_candidates(candidates)
}
