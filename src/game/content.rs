//! Content document (`content.json`) and the runtime library built from it.
//!
//! Flavor text is never hard-wired into handlers: each result line is picked from a template
//! set through its own [`ContentPool`], then rendered with a tiny placeholder syntax:
//!
//! | placeholder | value                                  |
//! |-------------|----------------------------------------|
//! | `{user}`    | display name of the caller             |
//! | `{target}`  | display name of the other party        |
//! | `{amount}`  | amount moved, with thousands separators|
//! | `{penalty}` | penalty at stake                       |
//! | `{balance}` | caller balance after the effect        |
//! | `{icon}`    | currency icon from the document        |
//! | `{question}`| trivia question text                   |
//! | `{answer}`  | correct trivia option                  |
//!
//! Placeholders without a value are left as written. Template keys missing from the document
//! fall back to the built-in set so a partial document is still usable.

use std::collections::{BTreeMap, HashMap};

use log::warn;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::rotation::ContentPool;
use crate::config::{ConfigError, RotationConfig};

/// Number of answer options a trivia question must carry.
pub const TRIVIA_OPTIONS: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriviaQuestion {
    pub question: String,
    pub options: Vec<String>,
    /// Index of the correct option.
    pub answer: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TemplateKey {
    JackpotWin,
    JackpotClaimed,
    StripAll,
    StripAllEmpty,
    AddLow,
    AddHigh,
    RemoveLow,
    RemoveHigh,
    RemoveEmpty,
    DoubleOffer,
    DoubleSuspense,
    DoubleWin,
    DoubleLose,
    DoubleWalk,
    DoubleExpired,
    StealOffer,
    StealNoTargets,
    StealSuspense,
    StealSuccess,
    StealFail,
    StealBackOff,
    StealExpired,
    TriviaOffer,
    TriviaCorrect,
    TriviaWrong,
    TriviaWrongPenalty,
    TriviaExpired,
    RoomsOffer,
    RoomsTreasure,
    RoomsMonster,
    RoomsLucky,
    RoomsEscape,
    RoomsExpired,
    JokeIntro,
    MediaIntro,
    LedgerUnavailable,
}

impl TemplateKey {
    pub const ALL: [TemplateKey; 36] = [
        TemplateKey::JackpotWin,
        TemplateKey::JackpotClaimed,
        TemplateKey::StripAll,
        TemplateKey::StripAllEmpty,
        TemplateKey::AddLow,
        TemplateKey::AddHigh,
        TemplateKey::RemoveLow,
        TemplateKey::RemoveHigh,
        TemplateKey::RemoveEmpty,
        TemplateKey::DoubleOffer,
        TemplateKey::DoubleSuspense,
        TemplateKey::DoubleWin,
        TemplateKey::DoubleLose,
        TemplateKey::DoubleWalk,
        TemplateKey::DoubleExpired,
        TemplateKey::StealOffer,
        TemplateKey::StealNoTargets,
        TemplateKey::StealSuspense,
        TemplateKey::StealSuccess,
        TemplateKey::StealFail,
        TemplateKey::StealBackOff,
        TemplateKey::StealExpired,
        TemplateKey::TriviaOffer,
        TemplateKey::TriviaCorrect,
        TemplateKey::TriviaWrong,
        TemplateKey::TriviaWrongPenalty,
        TemplateKey::TriviaExpired,
        TemplateKey::RoomsOffer,
        TemplateKey::RoomsTreasure,
        TemplateKey::RoomsMonster,
        TemplateKey::RoomsLucky,
        TemplateKey::RoomsEscape,
        TemplateKey::RoomsExpired,
        TemplateKey::JokeIntro,
        TemplateKey::MediaIntro,
        TemplateKey::LedgerUnavailable,
    ];

    pub fn key(self) -> &'static str {
        match self {
            TemplateKey::JackpotWin => "jackpot_win",
            TemplateKey::JackpotClaimed => "jackpot_claimed",
            TemplateKey::StripAll => "strip_all",
            TemplateKey::StripAllEmpty => "strip_all_empty",
            TemplateKey::AddLow => "add_low",
            TemplateKey::AddHigh => "add_high",
            TemplateKey::RemoveLow => "remove_low",
            TemplateKey::RemoveHigh => "remove_high",
            TemplateKey::RemoveEmpty => "remove_empty",
            TemplateKey::DoubleOffer => "double_offer",
            TemplateKey::DoubleSuspense => "double_suspense",
            TemplateKey::DoubleWin => "double_win",
            TemplateKey::DoubleLose => "double_lose",
            TemplateKey::DoubleWalk => "double_walk",
            TemplateKey::DoubleExpired => "double_expired",
            TemplateKey::StealOffer => "steal_offer",
            TemplateKey::StealNoTargets => "steal_no_targets",
            TemplateKey::StealSuspense => "steal_suspense",
            TemplateKey::StealSuccess => "steal_success",
            TemplateKey::StealFail => "steal_fail",
            TemplateKey::StealBackOff => "steal_back_off",
            TemplateKey::StealExpired => "steal_expired",
            TemplateKey::TriviaOffer => "trivia_offer",
            TemplateKey::TriviaCorrect => "trivia_correct",
            TemplateKey::TriviaWrong => "trivia_wrong",
            TemplateKey::TriviaWrongPenalty => "trivia_wrong_penalty",
            TemplateKey::TriviaExpired => "trivia_expired",
            TemplateKey::RoomsOffer => "rooms_offer",
            TemplateKey::RoomsTreasure => "rooms_treasure",
            TemplateKey::RoomsMonster => "rooms_monster",
            TemplateKey::RoomsLucky => "rooms_lucky",
            TemplateKey::RoomsEscape => "rooms_escape",
            TemplateKey::RoomsExpired => "rooms_expired",
            TemplateKey::JokeIntro => "joke_intro",
            TemplateKey::MediaIntro => "media_intro",
            TemplateKey::LedgerUnavailable => "ledger_unavailable",
        }
    }

    fn from_key(key: &str) -> Option<Self> {
        TemplateKey::ALL.iter().copied().find(|k| k.key() == key)
    }

    fn builtin(self) -> &'static [&'static str] {
        match self {
            TemplateKey::JackpotWin => &[
                "💎 JACKPOT! {user} hits the one-in-a-thousand and walks off with {icon}{amount}!",
            ],
            TemplateKey::JackpotClaimed => &[
                "💎 {user} found the jackpot vault... already emptied by someone luckier.",
            ],
            TemplateKey::StripAll => &[
                "🕳️ The floor opens up. {user} loses every last coin: {icon}{amount} gone.",
                "🔥 {user}'s wallet spontaneously combusts. {icon}{amount} up in smoke.",
            ],
            TemplateKey::StripAllEmpty => &[
                "🕳️ The floor opens up under {user}, but there was nothing to lose anyway.",
            ],
            TemplateKey::AddLow => &[
                "🪙 {user} finds {icon}{amount} in the couch cushions.",
                "🪙 A stranger tips {user} {icon}{amount} for no reason.",
                "🪙 {user} returns some bottles and gets {icon}{amount}.",
            ],
            TemplateKey::AddHigh => &[
                "💰 {user} wins a small lottery: {icon}{amount}!",
                "💰 An old investment pays off. {user} pockets {icon}{amount}.",
            ],
            TemplateKey::RemoveLow => &[
                "💸 {user} pays a parking fine of {icon}{amount}.",
                "💸 {user} drops {icon}{amount} down a storm drain.",
                "💸 Vending machine ate {icon}{amount} from {user}.",
            ],
            TemplateKey::RemoveHigh => &[
                "📉 {user}'s crypto portfolio tanks. {icon}{amount} lost.",
                "📉 The tax office remembers {user}. {icon}{amount} collected.",
            ],
            TemplateKey::RemoveEmpty => &["💸 Someone tried to fine {user}, but their pockets are empty."],
            TemplateKey::DoubleOffer => &[
                "🎲 {user}, double or nothing on {icon}{amount}? Flip the coin or walk away.",
            ],
            TemplateKey::DoubleSuspense => &["🪙 The coin spins in the air..."],
            TemplateKey::DoubleWin => &["🎉 Heads! {user} wins {icon}{amount}. Balance: {icon}{balance}."],
            TemplateKey::DoubleLose => &["💀 Tails. {user} loses {icon}{amount}. Balance: {icon}{balance}."],
            TemplateKey::DoubleWalk => &["🚶 {user} walks away from the table. Nothing gained, nothing lost."],
            TemplateKey::DoubleExpired => &["⌛ {user} hesitated too long; the coin rolls away."],
            TemplateKey::StealOffer => &[
                "🦹 {user}, pick a mark and try to lift {icon}{amount}. Get caught and you pay {icon}{penalty}.",
            ],
            TemplateKey::StealNoTargets => &["🦹 {user} looks around for a mark, but nobody is here."],
            TemplateKey::StealSuspense => &["🤫 {user} sneaks up on {target}..."],
            TemplateKey::StealSuccess => &[
                "🦹 Clean getaway! {user} lifts {icon}{amount} from {target}.",
                "🦹 {target} never noticed. {user} is {icon}{amount} richer.",
            ],
            TemplateKey::StealFail => &[
                "🚨 Caught! {user} pays {icon}{penalty} for trying to rob {target}.",
                "🚨 {target} grabs {user}'s wrist. Fine: {icon}{penalty}.",
            ],
            TemplateKey::StealBackOff => &["😇 {user} thinks better of it and backs off."],
            TemplateKey::StealExpired => &["⌛ {user} lost their nerve. The moment has passed."],
            TemplateKey::TriviaOffer => &["🧠 {user}, quiz time! {question}"],
            TemplateKey::TriviaCorrect => &["🧠 Correct! {user} earns {icon}{amount}."],
            TemplateKey::TriviaWrong => &[
                "❌ Wrong, {user}. Lucky for you, it's free this time. The answer was: {answer}",
            ],
            TemplateKey::TriviaWrongPenalty => &[
                "❌ Wrong, {user}. That costs you {icon}{amount}. The answer was: {answer}",
            ],
            TemplateKey::TriviaExpired => &[
                "⌛ Time's up, {user}. The quizmaster moves on. The answer was: {answer}",
            ],
            TemplateKey::RoomsOffer => &[
                "🚪 {user} wakes up in the backrooms. Three doors. Pick one.",
            ],
            TemplateKey::RoomsTreasure => &["💰 Behind the door: a forgotten stash. {user} grabs {icon}{amount}."],
            TemplateKey::RoomsMonster => &["👹 A monster! {user} drops {icon}{amount} while fleeing."],
            TemplateKey::RoomsLucky => &[
                "👹 A monster! It sniffs {user}'s empty pockets and loses interest. Lucky escape.",
            ],
            TemplateKey::RoomsEscape => &["🌤️ The door leads outside. {user} escapes, empty-handed but safe."],
            TemplateKey::RoomsExpired => &["⌛ {user} stood frozen until the lights went out."],
            TemplateKey::JokeIntro => &["😂 {user} drew a joke:"],
            TemplateKey::MediaIntro => &["📺 {user} drew a clip:"],
            TemplateKey::LedgerUnavailable => &["⚠️ {user}, the bank is unavailable right now. Nothing happened."],
        }
    }
}

fn default_icon() -> String {
    "🪙".to_string()
}

/// Serialized content document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentDocument {
    #[serde(default = "default_icon")]
    pub icon: String,
    #[serde(default)]
    pub templates: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub jokes: Vec<String>,
    #[serde(default)]
    pub media: Vec<String>,
    #[serde(default)]
    pub trivia: Vec<TriviaQuestion>,
}

impl ContentDocument {
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let doc: ContentDocument = serde_json::from_str(text).map_err(|e| ConfigError::Parse {
            document: "content",
            message: e.to_string(),
        })?;
        doc.validate()?;
        Ok(doc)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (i, q) in self.trivia.iter().enumerate() {
            if q.options.len() != TRIVIA_OPTIONS {
                return Err(ConfigError::InvalidContent(format!(
                    "trivia[{}] has {} options, expected {}",
                    i,
                    q.options.len(),
                    TRIVIA_OPTIONS
                )));
            }
            if q.answer >= TRIVIA_OPTIONS {
                return Err(ConfigError::InvalidContent(format!(
                    "trivia[{}] answer index {} out of range",
                    i, q.answer
                )));
            }
        }
        for (key, variants) in &self.templates {
            if TemplateKey::from_key(key).is_none() {
                warn!("content: ignoring unknown template key '{}'", key);
            } else if variants.is_empty() {
                return Err(ConfigError::InvalidContent(format!(
                    "template '{}' has no variants",
                    key
                )));
            }
        }
        Ok(())
    }
}

impl Default for ContentDocument {
    fn default() -> Self {
        let templates = TemplateKey::ALL
            .iter()
            .map(|k| {
                (
                    k.key().to_string(),
                    k.builtin().iter().map(|s| s.to_string()).collect(),
                )
            })
            .collect();
        let jokes = [
            "Why do programmers prefer dark mode? Because light attracts bugs.",
            "I told my wallet a joke. It didn't laugh; it's been empty inside for years.",
            "Why did the coin refuse to flip? It didn't want to face the consequences.",
            "My bank called about my balance. They said they'd never seen anything so relaxed.",
            "I tried to steal some time, but the clock caught me red-handed.",
            "Why don't skeletons gamble? They don't have the guts.",
        ];
        let media = [
            "https://media.giphy.com/media/l0HlBO7eyXzSZkJri/giphy.gif",
            "https://media.giphy.com/media/3o6Zt481isNVuQI1l6/giphy.gif",
            "https://media.giphy.com/media/26ufdipQqU2lhNA4g/giphy.gif",
            "https://media.giphy.com/media/xT5LMHxhOfscxPfIfm/giphy.gif",
        ];
        let trivia = vec![
            TriviaQuestion {
                question: "Which planet has the most moons?".into(),
                options: vec!["Earth".into(), "Mars".into(), "Saturn".into(), "Venus".into()],
                answer: 2,
            },
            TriviaQuestion {
                question: "How many sides does a hexagon have?".into(),
                options: vec!["5".into(), "6".into(), "7".into(), "8".into()],
                answer: 1,
            },
            TriviaQuestion {
                question: "What is the chemical symbol for gold?".into(),
                options: vec!["Ag".into(), "Go".into(), "Gd".into(), "Au".into()],
                answer: 3,
            },
            TriviaQuestion {
                question: "Which ocean is the largest?".into(),
                options: vec![
                    "Pacific".into(),
                    "Atlantic".into(),
                    "Indian".into(),
                    "Arctic".into(),
                ],
                answer: 0,
            },
        ];
        ContentDocument {
            icon: default_icon(),
            templates,
            jokes: jokes.iter().map(|s| s.to_string()).collect(),
            media: media.iter().map(|s| s.to_string()).collect(),
            trivia,
        }
    }
}

/// Values substituted into a template.
#[derive(Debug, Clone, Default)]
pub struct Vars<'a> {
    pub user: Option<&'a str>,
    pub target: Option<&'a str>,
    pub amount: Option<i64>,
    pub penalty: Option<i64>,
    pub balance: Option<i64>,
    pub question: Option<&'a str>,
    pub answer: Option<&'a str>,
}

impl<'a> Vars<'a> {
    pub fn user(user: &'a str) -> Self {
        Vars {
            user: Some(user),
            ..Default::default()
        }
    }
    pub fn target(mut self, target: &'a str) -> Self {
        self.target = Some(target);
        self
    }
    pub fn amount(mut self, amount: i64) -> Self {
        self.amount = Some(amount);
        self
    }
    pub fn penalty(mut self, penalty: i64) -> Self {
        self.penalty = Some(penalty);
        self
    }
    pub fn balance(mut self, balance: i64) -> Self {
        self.balance = Some(balance);
        self
    }
    pub fn question(mut self, question: &'a str) -> Self {
        self.question = Some(question);
        self
    }
    pub fn answer(mut self, answer: Option<&'a str>) -> Self {
        self.answer = answer;
        self
    }
}

/// `1234567` -> `1,234,567`
pub fn format_amount(amount: i64) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if amount < 0 {
        out.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Substitute known placeholders; anything else between braces is copied through.
pub fn render(template: &str, icon: &str, vars: &Vars<'_>) -> String {
    let mut out = String::with_capacity(template.len() + 16);
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let Some(close) = after.find('}') else {
            out.push_str(&rest[open..]);
            return out;
        };
        let name = &after[..close];
        let value = match name {
            "user" => vars.user.map(str::to_string),
            "target" => vars.target.map(str::to_string),
            "amount" => vars.amount.map(format_amount),
            "penalty" => vars.penalty.map(format_amount),
            "balance" => vars.balance.map(format_amount),
            "question" => vars.question.map(str::to_string),
            "answer" => vars.answer.map(str::to_string),
            "icon" => Some(icon.to_string()),
            _ => None,
        };
        match value {
            Some(v) => out.push_str(&v),
            None => {
                out.push('{');
                out.push_str(name);
                out.push('}');
            }
        }
        rest = &after[close + 1..];
    }
    out.push_str(rest);
    out
}

/// Runtime view of the content document: one rotating pool per template set and list.
#[derive(Debug)]
pub struct ContentLibrary {
    icon: String,
    templates: HashMap<TemplateKey, ContentPool<String>>,
    jokes: ContentPool<String>,
    media: ContentPool<String>,
    trivia: ContentPool<TriviaQuestion>,
}

impl ContentLibrary {
    pub fn new(doc: ContentDocument, rotation: &RotationConfig) -> Self {
        let mut provided = doc.templates;
        let templates = TemplateKey::ALL
            .iter()
            .map(|k| {
                let variants = match provided.remove(k.key()) {
                    Some(v) if !v.is_empty() => v,
                    _ => k.builtin().iter().map(|s| s.to_string()).collect(),
                };
                (*k, ContentPool::new(k.key(), variants, rotation.templates))
            })
            .collect();
        Self {
            icon: doc.icon,
            templates,
            jokes: ContentPool::new("jokes", doc.jokes, rotation.jokes),
            media: ContentPool::new("media", doc.media, rotation.media),
            trivia: ContentPool::new("trivia", doc.trivia, rotation.trivia),
        }
    }

    pub fn icon(&self) -> &str {
        &self.icon
    }

    /// Pick a variant of `key` and render it.
    pub fn line<R: Rng + ?Sized>(&mut self, key: TemplateKey, vars: &Vars<'_>, rng: &mut R) -> String {
        let template = self
            .templates
            .get_mut(&key)
            .and_then(|pool| pool.pick(rng).cloned())
            .unwrap_or_else(|| key.builtin()[0].to_string());
        render(&template, &self.icon, vars)
    }

    pub fn joke<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<String> {
        self.jokes.pick(rng).cloned()
    }

    pub fn media<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<String> {
        self.media.pick(rng).cloned()
    }

    pub fn question<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<TriviaQuestion> {
        self.trivia.pick(rng).cloned()
    }
}
