//! Content rotation: bounded-recency picks over interchangeable cosmetic items.
//!
//! A [`ContentPool`] never serves an item that is still in its [`RecentWindow`] unless every
//! item is in the window, which can only happen when the window is at least as large as the
//! pool. In that case the window is cleared and the pick is unconstrained.

use std::collections::VecDeque;

use rand::seq::SliceRandom;
use rand::Rng;

/// Fixed-capacity FIFO of recently served indices. Oldest entry is evicted first.
#[derive(Debug, Clone)]
pub struct RecentWindow {
    capacity: usize,
    entries: VecDeque<usize>,
}

impl RecentWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, index: usize) -> bool {
        self.entries.contains(&index)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Record `index`, evicting the oldest entry once the window is full.
    /// A zero-capacity window records nothing.
    pub fn push(&mut self, index: usize) {
        if self.capacity == 0 {
            return;
        }
        while self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(index);
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.entries.iter().copied()
    }
}

/// Pick an index in `0..len` that is not in `history`, then record it.
///
/// When every index is in `history` the history is cleared first. Returns `None` only for
/// an empty pool.
pub fn pick_index<R: Rng + ?Sized>(
    len: usize,
    history: &mut RecentWindow,
    rng: &mut R,
) -> Option<usize> {
    if len == 0 {
        return None;
    }
    let mut eligible: Vec<usize> = (0..len).filter(|i| !history.contains(*i)).collect();
    if eligible.is_empty() {
        history.clear();
        eligible = (0..len).collect();
    }
    let chosen = *eligible.choose(rng)?;
    history.push(chosen);
    Some(chosen)
}

/// Named list of interchangeable items plus its recency window.
#[derive(Debug, Clone)]
pub struct ContentPool<T> {
    name: String,
    items: Vec<T>,
    history: RecentWindow,
}

impl<T> ContentPool<T> {
    pub fn new(name: impl Into<String>, items: Vec<T>, window: usize) -> Self {
        Self {
            name: name.into(),
            items,
            history: RecentWindow::new(window),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn history(&self) -> &RecentWindow {
        &self.history
    }

    pub fn pick<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<&T> {
        let index = pick_index(self.items.len(), &mut self.history, rng)?;
        log::trace!("rotation: pool '{}' served #{}", self.name, index);
        self.items.get(index)
    }
}
