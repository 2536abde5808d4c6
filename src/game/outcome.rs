//! Outcome taxonomy and the weighted selector.
//!
//! A trigger draws exactly one [`OutcomeKind`] from a [`WeightTable`]. Kind identity and
//! weight are kept apart: the table maps kinds to weights, so two kinds may share a weight.
//! Draws are memoryless; the table is immutable once built.

use std::fmt;
use std::str::FromStr;

use rand::distributions::{Distribution, WeightedError, WeightedIndex};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Weights of the outcome table must add up to exactly this.
pub const WEIGHT_TOTAL: u32 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    Jackpot,
    StripAllBalance,
    DoubleOrNothing,
    Steal,
    TriviaChallenge,
    ExploreRooms,
    AddLow,
    AddHigh,
    RemoveLow,
    RemoveHigh,
    Joke,
    MediaClip,
}

impl OutcomeKind {
    pub const ALL: [OutcomeKind; 12] = [
        OutcomeKind::Jackpot,
        OutcomeKind::StripAllBalance,
        OutcomeKind::DoubleOrNothing,
        OutcomeKind::Steal,
        OutcomeKind::TriviaChallenge,
        OutcomeKind::ExploreRooms,
        OutcomeKind::AddLow,
        OutcomeKind::AddHigh,
        OutcomeKind::RemoveLow,
        OutcomeKind::RemoveHigh,
        OutcomeKind::Joke,
        OutcomeKind::MediaClip,
    ];

    /// Key used in the weights document and in log lines.
    pub fn key(self) -> &'static str {
        match self {
            OutcomeKind::Jackpot => "jackpot",
            OutcomeKind::StripAllBalance => "strip_all_balance",
            OutcomeKind::DoubleOrNothing => "double_or_nothing",
            OutcomeKind::Steal => "steal",
            OutcomeKind::TriviaChallenge => "trivia_challenge",
            OutcomeKind::ExploreRooms => "explore_rooms",
            OutcomeKind::AddLow => "add_low",
            OutcomeKind::AddHigh => "add_high",
            OutcomeKind::RemoveLow => "remove_low",
            OutcomeKind::RemoveHigh => "remove_high",
            OutcomeKind::Joke => "joke",
            OutcomeKind::MediaClip => "media_clip",
        }
    }

    /// Exact document key lookup. Document keys are case-sensitive.
    pub fn from_key(key: &str) -> Option<Self> {
        OutcomeKind::ALL.iter().copied().find(|k| k.key() == key)
    }

    /// Whether this kind hands off to an interactive session instead of resolving at once.
    pub fn is_interactive(self) -> bool {
        matches!(
            self,
            OutcomeKind::DoubleOrNothing
                | OutcomeKind::Steal
                | OutcomeKind::TriviaChallenge
                | OutcomeKind::ExploreRooms
        )
    }
}

impl fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Lenient parse for typed commands: surrounding whitespace and case are ignored.
impl FromStr for OutcomeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OutcomeKind::ALL
            .iter()
            .copied()
            .find(|k| k.key().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown outcome kind '{}'", s))
    }
}

/// Immutable weighted table over any key type.
#[derive(Debug, Clone)]
pub struct WeightTable<K> {
    entries: Vec<(K, u32)>,
    index: WeightedIndex<u32>,
}

impl<K: Copy + PartialEq> WeightTable<K> {
    /// Build a table. Fails on an empty table or when every weight is zero.
    pub fn new(entries: Vec<(K, u32)>) -> Result<Self, WeightedError> {
        let index = WeightedIndex::new(entries.iter().map(|(_, w)| *w))?;
        Ok(Self { entries, index })
    }

    /// Single weighted draw: `P(k) = weight(k) / total()`.
    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> K {
        self.entries[self.index.sample(rng)].0
    }

    pub fn weight(&self, key: K) -> Option<u32> {
        self.entries.iter().find(|(k, _)| *k == key).map(|(_, w)| *w)
    }

    pub fn total(&self) -> u64 {
        self.entries.iter().map(|(_, w)| u64::from(*w)).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (K, u32)> + '_ {
        self.entries.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub type OutcomeWeights = WeightTable<OutcomeKind>;

impl Default for OutcomeWeights {
    /// Stock distribution, sums to [`WEIGHT_TOTAL`].
    fn default() -> Self {
        let entries = vec![
            (OutcomeKind::Jackpot, 1),
            (OutcomeKind::StripAllBalance, 9),
            (OutcomeKind::DoubleOrNothing, 60),
            (OutcomeKind::Steal, 70),
            (OutcomeKind::TriviaChallenge, 80),
            (OutcomeKind::ExploreRooms, 80),
            (OutcomeKind::AddLow, 200),
            (OutcomeKind::AddHigh, 50),
            (OutcomeKind::RemoveLow, 180),
            (OutcomeKind::RemoveHigh, 40),
            (OutcomeKind::Joke, 130),
            (OutcomeKind::MediaClip, 100),
        ];
        // Non-zero literal weights; construction cannot fail.
        match WeightTable::new(entries) {
            Ok(table) => table,
            Err(e) => unreachable!("stock weights rejected: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::mock::StepRng;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashMap;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum Ab {
        A,
        B,
    }

    #[test]
    fn heavy_branch_wins_every_low_roll() {
        let table = WeightTable::new(vec![(Ab::A, 999), (Ab::B, 1)]).unwrap();
        let mut rng = StepRng::new(0, 0);
        let hits = (0..100).filter(|_| table.draw(&mut rng) == Ab::A).count();
        assert_eq!(hits, 100);
    }

    #[test]
    fn stock_table_sums_to_total_and_covers_every_kind() {
        let table = OutcomeWeights::default();
        assert_eq!(table.total(), u64::from(WEIGHT_TOTAL));
        for kind in OutcomeKind::ALL {
            assert!(table.weight(kind).is_some(), "{} missing", kind);
        }
        assert_eq!(table.len(), OutcomeKind::ALL.len());
    }

    #[test]
    fn equal_weights_are_allowed() {
        let table = WeightTable::new(vec![(Ab::A, 500), (Ab::B, 500)]).unwrap();
        let mut rng = StdRng::seed_from_u64(11);
        let mut seen: HashMap<Ab, u32> = HashMap::new();
        for _ in 0..2000 {
            *seen.entry(table.draw(&mut rng)).or_default() += 1;
        }
        assert!(seen[&Ab::A] > 800 && seen[&Ab::B] > 800, "{:?}", seen);
    }

    #[test]
    fn draw_frequencies_follow_weights() {
        let table = OutcomeWeights::default();
        let mut rng = StdRng::seed_from_u64(42);
        let n = 100_000;
        let mut counts: HashMap<OutcomeKind, u32> = HashMap::new();
        for _ in 0..n {
            *counts.entry(table.draw(&mut rng)).or_default() += 1;
        }
        let add_low = f64::from(counts[&OutcomeKind::AddLow]) / f64::from(n);
        assert!((add_low - 0.2).abs() < 0.01, "add_low freq {}", add_low);
    }

    #[test]
    fn zero_total_rejected() {
        assert!(WeightTable::new(vec![(Ab::A, 0), (Ab::B, 0)]).is_err());
        assert!(WeightTable::<Ab>::new(Vec::new()).is_err());
    }

    #[test]
    fn kind_keys_parse_back() {
        for kind in OutcomeKind::ALL {
            assert_eq!(kind.key().parse::<OutcomeKind>().unwrap(), kind);
        }
        assert!("lottery".parse::<OutcomeKind>().is_err());
    }

    #[test]
    fn document_keys_are_exact_but_commands_are_lenient() {
        assert_eq!(OutcomeKind::from_key("jackpot"), Some(OutcomeKind::Jackpot));
        assert_eq!(OutcomeKind::from_key("Jackpot"), None);
        assert_eq!(" Jackpot ".parse::<OutcomeKind>(), Ok(OutcomeKind::Jackpot));
    }
}
