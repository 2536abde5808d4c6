//! Single-claim jackpot gate.
//!
//! The claim is one compare-and-swap on an atomic flag, so two draws can never both pass,
//! even if handlers ever run on several threads or suspend between check and payout.

use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Default)]
pub struct JackpotState {
    claimed: AtomicBool,
}

impl JackpotState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` for exactly one caller until [`JackpotState::reset`].
    pub fn try_claim(&self) -> bool {
        self.claimed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn is_claimed(&self) -> bool {
        self.claimed.load(Ordering::Acquire)
    }

    /// Give a claim back, e.g. when the payout could not be credited.
    pub fn release(&self) {
        self.claimed.store(false, Ordering::Release);
    }

    /// Admin reset: makes the jackpot winnable again.
    pub fn reset(&self) {
        self.release();
        log::info!("jackpot: reset, available again");
    }
}
