//! Numeric ranges document (`ranges.toml`).
//!
//! Every reward and penalty the engine can apply is drawn from one of these ranges. The
//! document is parsed once at startup and rejected outright when a value is missing,
//! non-positive or inverted; nothing here falls back to a default silently.
//!
//! ```toml
//! [jackpot]
//! amount = 1000000
//!
//! [add_low]
//! min = 100
//! max = 1000
//!
//! [trivia]
//! correct_min = 500
//! correct_max = 2500
//! penalty_min = 100
//! penalty_max = 1000
//! penalty_chance = 0.5
//! ```

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::ConfigError;

const DOCUMENT: &str = "ranges";

/// Half-open `[min, max)` amount range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmountRange {
    pub min: i64,
    pub max: i64,
}

impl AmountRange {
    pub const fn new(min: i64, max: i64) -> Self {
        Self { min, max }
    }

    /// Uniformly sample an amount in `[min, max)`. Callers only hold validated ranges.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> i64 {
        rng.gen_range(self.min..self.max)
    }

    fn validate(&self, field: &str) -> Result<(), ConfigError> {
        check_bounds(field, self.min, self.max)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JackpotRange {
    pub amount: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TriviaRanges {
    pub correct_min: i64,
    pub correct_max: i64,
    pub penalty_min: i64,
    pub penalty_max: i64,
    /// Probability in `[0, 1]` that a wrong answer costs anything at all.
    pub penalty_chance: f64,
}

impl TriviaRanges {
    pub fn correct(&self) -> AmountRange {
        AmountRange::new(self.correct_min, self.correct_max)
    }

    pub fn penalty(&self) -> AmountRange {
        AmountRange::new(self.penalty_min, self.penalty_max)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackroomsRanges {
    pub treasure_min: i64,
    pub treasure_max: i64,
    pub monster_min: i64,
    pub monster_max: i64,
}

impl BackroomsRanges {
    pub fn treasure(&self) -> AmountRange {
        AmountRange::new(self.treasure_min, self.treasure_max)
    }

    pub fn monster(&self) -> AmountRange {
        AmountRange::new(self.monster_min, self.monster_max)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ranges {
    pub jackpot: JackpotRange,
    pub add_low: AmountRange,
    pub add_high: AmountRange,
    pub remove_low: AmountRange,
    pub remove_high: AmountRange,
    pub double_or_nothing: AmountRange,
    pub steal: AmountRange,
    pub trivia: TriviaRanges,
    pub backrooms: BackroomsRanges,
}

impl Ranges {
    /// Parse and validate a ranges document.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let ranges: Ranges = toml::from_str(text).map_err(|e| ConfigError::Parse {
            document: DOCUMENT,
            message: e.message().to_string(),
        })?;
        ranges.validate()?;
        Ok(ranges)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_positive("jackpot.amount", self.jackpot.amount)?;
        self.add_low.validate("add_low")?;
        self.add_high.validate("add_high")?;
        self.remove_low.validate("remove_low")?;
        self.remove_high.validate("remove_high")?;
        self.double_or_nothing.validate("double_or_nothing")?;
        self.steal.validate("steal")?;
        check_bounds("trivia.correct", self.trivia.correct_min, self.trivia.correct_max)?;
        check_bounds("trivia.penalty", self.trivia.penalty_min, self.trivia.penalty_max)?;
        let chance = self.trivia.penalty_chance;
        if !chance.is_finite() || !(0.0..=1.0).contains(&chance) {
            return Err(ConfigError::OutOfRange {
                field: "trivia.penalty_chance".into(),
                value: chance.to_string(),
                expected: "[0, 1]",
            });
        }
        check_bounds(
            "backrooms.treasure",
            self.backrooms.treasure_min,
            self.backrooms.treasure_max,
        )?;
        check_bounds(
            "backrooms.monster",
            self.backrooms.monster_min,
            self.backrooms.monster_max,
        )?;
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

impl Default for Ranges {
    fn default() -> Self {
        Ranges {
            jackpot: JackpotRange { amount: 1_000_000 },
            add_low: AmountRange::new(100, 1_000),
            add_high: AmountRange::new(1_000, 10_000),
            remove_low: AmountRange::new(100, 1_000),
            remove_high: AmountRange::new(1_000, 10_000),
            double_or_nothing: AmountRange::new(500, 5_000),
            steal: AmountRange::new(1_000, 20_000),
            trivia: TriviaRanges {
                correct_min: 500,
                correct_max: 2_500,
                penalty_min: 100,
                penalty_max: 1_000,
                penalty_chance: 0.5,
            },
            backrooms: BackroomsRanges {
                treasure_min: 1_000,
                treasure_max: 8_000,
                monster_min: 500,
                monster_max: 5_000,
            },
        }
    }
}

fn check_positive(field: &str, value: i64) -> Result<(), ConfigError> {
    if value <= 0 {
        return Err(ConfigError::NotPositive {
            field: field.to_string(),
            value: value.to_string(),
        });
    }
    Ok(())
}

fn check_bounds(field: &str, min: i64, max: i64) -> Result<(), ConfigError> {
    check_positive(&format!("{}.min", field), min)?;
    check_positive(&format!("{}.max", field), max)?;
    if min >= max {
        return Err(ConfigError::InvertedRange {
            field: field.to_string(),
            min,
            max,
        });
    }
    Ok(())
}
