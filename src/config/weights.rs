//! Weights document (`weights.toml`): one integer per outcome kind.
//!
//! ```toml
//! jackpot = 1
//! strip_all_balance = 9
//! add_low = 200
//! # ... every kind, summing to 1000
//! ```
//!
//! Unknown keys are logged and skipped. A missing kind, a non-integer or non-positive
//! weight, or a total other than [`WEIGHT_TOTAL`] fails the load.

use log::{debug, warn};
use std::collections::BTreeMap;

use super::ConfigError;
use crate::game::outcome::{OutcomeKind, OutcomeWeights, WeightTable, WEIGHT_TOTAL};

const DOCUMENT: &str = "weights";

/// Parse and validate a weights document into the outcome table.
pub fn parse_weights(text: &str) -> Result<OutcomeWeights, ConfigError> {
    let table: toml::Table = text.parse().map_err(|e: toml::de::Error| ConfigError::Parse {
        document: DOCUMENT,
        message: e.message().to_string(),
    })?;
    validate_weights(&table)
}

/// Validate an already-parsed table. Split out so generated documents can be checked directly.
pub fn validate_weights(table: &toml::Table) -> Result<OutcomeWeights, ConfigError> {
    for key in unknown_keys(table) {
        warn!("weights: ignoring unknown key '{}'", key);
    }

    let mut entries = Vec::with_capacity(OutcomeKind::ALL.len());
    for kind in OutcomeKind::ALL {
        let value = table.get(kind.key()).ok_or_else(|| ConfigError::MissingKey {
            document: DOCUMENT,
            key: kind.key().to_string(),
        })?;
        let weight = match value {
            toml::Value::Integer(n) => *n,
            other => {
                return Err(ConfigError::NotInteger {
                    field: kind.key().to_string(),
                    value: other.to_string(),
                })
            }
        };
        if weight <= 0 {
            return Err(ConfigError::NotPositive {
                field: kind.key().to_string(),
                value: weight.to_string(),
            });
        }
        let weight = u32::try_from(weight).map_err(|_| ConfigError::OutOfRange {
            field: kind.key().to_string(),
            value: weight.to_string(),
            expected: "(0, 1000]",
        })?;
        entries.push((kind, weight));
    }

    let total: u64 = entries.iter().map(|(_, w)| u64::from(*w)).sum();
    if total != u64::from(WEIGHT_TOTAL) {
        return Err(ConfigError::WeightSum {
            expected: WEIGHT_TOTAL,
            found: total,
        });
    }

    let mut by_weight: BTreeMap<u32, Vec<&str>> = BTreeMap::new();
    for (kind, weight) in &entries {
        by_weight.entry(*weight).or_default().push(kind.key());
    }
    for (weight, kinds) in by_weight.iter().filter(|(_, k)| k.len() > 1) {
        debug!("weights: {} share weight {}", kinds.join(", "), weight);
    }

    // Every weight is positive here, so the index cannot be rejected.
    WeightTable::new(entries).map_err(|e| ConfigError::Parse {
        document: DOCUMENT,
        message: e.to_string(),
    })
}

/// Keys that name no outcome kind. Matching is exact, so `Jackpot` is unknown.
pub fn unknown_keys(table: &toml::Table) -> Vec<&str> {
    table
        .keys()
        .filter(|key| OutcomeKind::from_key(key).is_none())
        .map(String::as_str)
        .collect()
}

/// Serialize a table back into document form (used by `init`).
pub fn weights_to_toml(weights: &OutcomeWeights) -> String {
    let mut out = String::new();
    for (kind, weight) in weights.iter() {
        out.push_str(&format!("{} = {}\n", kind.key(), weight));
    }
    out
}
