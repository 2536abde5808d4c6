//! Economic effect calculators.
//!
//! Pure functions only: each takes the numbers it needs and an RNG where chance is involved,
//! and returns the delta or decision. Ledger calls happen in the engine.

use rand::Rng;

use super::outcome::WeightTable;
use crate::config::AmountRange;

/// Delta for removing `requested` from a subject holding `balance`: never exceeds the balance.
pub fn clamp_debit(requested: i64, balance: i64) -> i64 {
    -requested.max(0).min(balance.max(0))
}

/// Flat-range reward or penalty: positive for add kinds, negative for remove kinds.
pub fn flat_delta<R: Rng + ?Sized>(range: &AmountRange, credit: bool, rng: &mut R) -> i64 {
    let amount = range.sample(rng);
    if credit {
        amount
    } else {
        -amount
    }
}

/// Lower tier bounds (inclusive) and success rates for a steal, by target balance.
const STEAL_TIERS: [(i64, f64); 7] = [
    (0, 0.0),
    (25_000, 0.05),
    (50_000, 0.25),
    (100_000, 0.30),
    (250_000, 0.35),
    (500_000, 0.40),
    (2_000_000, 0.45),
];

/// Chance that a steal against a target holding `target_balance` succeeds.
pub fn steal_success_rate(target_balance: i64) -> f64 {
    STEAL_TIERS
        .iter()
        .rev()
        .find(|(floor, _)| target_balance >= *floor)
        .map(|(_, rate)| *rate)
        .unwrap_or(0.0)
}

/// Round up to the next multiple of 100, never below 100.
pub fn round_up_to_hundred(value: i64) -> i64 {
    let rounded = (value.max(0) + 99) / 100 * 100;
    rounded.max(100)
}

/// Penalty for a failed steal: three quarters of the attempt, rounded up to a multiple of 100.
pub fn steal_penalty(amount: i64) -> i64 {
    let three_quarters = amount.max(0).saturating_mul(3).saturating_add(3) / 4;
    round_up_to_hundred(three_quarters)
}

/// Amount a successful steal moves: never more than the target holds.
pub fn steal_take(requested: i64, target_balance: i64) -> i64 {
    requested.max(0).min(target_balance.max(0))
}

pub fn steal_succeeds<R: Rng + ?Sized>(target_balance: i64, rng: &mut R) -> bool {
    let rate = steal_success_rate(target_balance);
    rate > 0.0 && rng.gen_bool(rate)
}

/// 50% toss for double-or-nothing.
pub fn coin_flip<R: Rng + ?Sized>(rng: &mut R) -> bool {
    rng.gen_bool(0.5)
}

/// Signed result of a double-or-nothing flip on `stake`.
pub fn double_or_nothing_delta(stake: i64, won: bool) -> i64 {
    if won {
        stake
    } else {
        -stake
    }
}

/// What waits behind a backrooms door.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Room {
    Treasure,
    Monster,
    Escape,
}

pub const ROOM_WEIGHTS: [(Room, u32); 3] = [(Room::Treasure, 30), (Room::Monster, 40), (Room::Escape, 30)];

/// Number of doors offered per backrooms session.
pub const DOOR_COUNT: usize = 3;

/// Pre-roll every door. Done once at session creation, never at resolution.
pub fn roll_rooms<R: Rng + ?Sized>(rng: &mut R) -> [Room; DOOR_COUNT] {
    match WeightTable::new(ROOM_WEIGHTS.to_vec()) {
        Ok(table) => [table.draw(rng), table.draw(rng), table.draw(rng)],
        // Constant non-zero weights.
        Err(_) => [Room::Escape; DOOR_COUNT],
    }
}

/// Decision for a trivia answer: `Some(delta)` when money moves.
pub fn trivia_delta<R: Rng + ?Sized>(
    correct: bool,
    reward: &AmountRange,
    penalty: &AmountRange,
    penalty_chance: f64,
    rng: &mut R,
) -> Option<i64> {
    if correct {
        return Some(reward.sample(rng));
    }
    if penalty_chance > 0.0 && rng.gen_bool(penalty_chance.min(1.0)) {
        Some(-penalty.sample(rng))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::mock::StepRng;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashMap;

    #[test]
    fn steal_penalty_examples() {
        assert_eq!(steal_penalty(1000), 800);
        assert_eq!(steal_penalty(1500), 1200);
        assert_eq!(steal_penalty(100), 100);
        assert_eq!(steal_penalty(1), 100);
        assert_eq!(steal_penalty(10_000), 7_500);
        assert_eq!(steal_penalty(10_001), 7_600);
    }

    #[test]
    fn success_rate_boundaries() {
        assert_eq!(steal_success_rate(0), 0.0);
        assert_eq!(steal_success_rate(24_999), 0.0);
        assert_eq!(steal_success_rate(25_000), 0.05);
        assert_eq!(steal_success_rate(49_999), 0.05);
        assert_eq!(steal_success_rate(50_000), 0.25);
        assert_eq!(steal_success_rate(100_000), 0.30);
        assert_eq!(steal_success_rate(250_000), 0.35);
        assert_eq!(steal_success_rate(500_000), 0.40);
        assert_eq!(steal_success_rate(1_999_999), 0.40);
        assert_eq!(steal_success_rate(2_000_000), 0.45);
        assert_eq!(steal_success_rate(i64::MAX), 0.45);
    }

    #[test]
    fn success_rate_is_monotonic() {
        let balances = [
            0, 1, 24_999, 25_000, 30_000, 50_000, 99_999, 100_000, 249_999, 250_000, 499_999,
            500_000, 1_999_999, 2_000_000, 9_000_000,
        ];
        for pair in balances.windows(2) {
            assert!(steal_success_rate(pair[0]) <= steal_success_rate(pair[1]));
        }
    }

    #[test]
    fn poor_targets_never_get_robbed() {
        // StepRng(0) makes every positive-probability bool come up true.
        let mut rng = StepRng::new(0, 0);
        assert!(!steal_succeeds(10_000, &mut rng));
        assert!(steal_succeeds(25_000, &mut rng));
    }

    #[test]
    fn clamp_never_exceeds_balance() {
        assert_eq!(clamp_debit(500, 200), -200);
        assert_eq!(clamp_debit(100, 200), -100);
        assert_eq!(clamp_debit(100, 0), 0);
        assert_eq!(clamp_debit(-5, 100), 0);
        assert_eq!(steal_take(5_000, 1_200), 1_200);
    }

    #[test]
    fn flat_delta_sign_follows_kind() {
        let mut rng = StdRng::seed_from_u64(5);
        let range = AmountRange::new(100, 200);
        for _ in 0..50 {
            let add = flat_delta(&range, true, &mut rng);
            let remove = flat_delta(&range, false, &mut rng);
            assert!((100..200).contains(&add));
            assert!((-199..=-100).contains(&remove));
        }
    }

    #[test]
    fn double_or_nothing_is_symmetric() {
        assert_eq!(double_or_nothing_delta(700, true), 700);
        assert_eq!(double_or_nothing_delta(700, false), -700);
        let mut rng = StdRng::seed_from_u64(99);
        let wins = (0..10_000).filter(|_| coin_flip(&mut rng)).count();
        assert!((4_700..5_300).contains(&wins), "wins {}", wins);
    }

    #[test]
    fn room_distribution_roughly_matches_weights() {
        let mut rng = StdRng::seed_from_u64(2024);
        let mut counts: HashMap<Room, u32> = HashMap::new();
        for _ in 0..10_000 {
            for room in roll_rooms(&mut rng) {
                *counts.entry(room).or_default() += 1;
            }
        }
        let monster = f64::from(counts[&Room::Monster]) / 30_000.0;
        assert!((monster - 0.40).abs() < 0.02, "monster share {}", monster);
    }

    #[test]
    fn trivia_outcomes() {
        let reward = AmountRange::new(500, 501);
        let penalty = AmountRange::new(100, 101);
        let mut rng = StepRng::new(0, 0);
        assert_eq!(trivia_delta(true, &reward, &penalty, 0.5, &mut rng), Some(500));
        assert_eq!(trivia_delta(false, &reward, &penalty, 0.5, &mut rng), Some(-100));
        assert_eq!(trivia_delta(false, &reward, &penalty, 0.0, &mut rng), None);
    }
}
