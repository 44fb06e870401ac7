//! Element types that make construction, cloning and destruction observable.

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use thiserror::Error;

/// Counts the [`Tracked`] values it created and how many of them were dropped.
///
/// Clones of a tracked value count as created values as well, so `live() == 0`
/// after everything is dropped means nothing leaked and nothing was dropped twice
/// (a double drop shows up as an underflow panic).
#[derive(Debug, Clone, Default)]
pub struct DropTracker {
    counts: Arc<Counts>,
}

#[derive(Debug, Default)]
struct Counts {
    created: AtomicUsize,
    dropped: AtomicUsize,
}

impl DropTracker {
    pub fn new() -> DropTracker {
        Self::default()
    }

    /// Creates a tracked value.
    pub fn track(&self, value: u64) -> Tracked {
        self.counts.created.fetch_add(1, Ordering::Relaxed);
        Tracked {
            value,
            counts: self.counts.clone(),
        }
    }

    pub fn created(&self) -> usize {
        self.counts.created.load(Ordering::Relaxed)
    }

    pub fn dropped(&self) -> usize {
        self.counts.dropped.load(Ordering::Relaxed)
    }

    /// Values created but not dropped yet.
    pub fn live(&self) -> usize {
        let created = self.created();
        let dropped = self.dropped();
        assert!(dropped <= created, "{dropped} drops for {created} values");
        created - dropped
    }
}

/// A value whose clones and drops are counted by its [`DropTracker`].
#[derive(Debug)]
pub struct Tracked {
    value: u64,
    counts: Arc<Counts>,
}

impl Tracked {
    pub fn value(&self) -> u64 {
        self.value
    }
}

impl Clone for Tracked {
    fn clone(&self) -> Tracked {
        self.counts.created.fetch_add(1, Ordering::Relaxed);
        Tracked {
            value: self.value,
            counts: self.counts.clone(),
        }
    }
}

impl Drop for Tracked {
    fn drop(&mut self) {
        self.counts.dropped.fetch_add(1, Ordering::Relaxed);
    }
}

impl PartialEq for Tracked {
    fn eq(&self, other: &Tracked) -> bool {
        self.value == other.value
    }
}

/// Error returned by [`FailingClone::try_clone`] once its clone budget is spent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("clone budget exhausted")]
pub struct CloneError;

/// A tracked value whose clones start failing after a shared number of successes.
///
/// `Clone::clone` panics when the budget is spent; [`FailingClone::try_clone`]
/// returns [`CloneError`] instead.
#[derive(Debug)]
pub struct FailingClone {
    inner: Tracked,
    budget: Arc<AtomicUsize>,
}

impl FailingClone {
    /// Creates `count` values sharing a budget of `successful_clones` clones.
    pub fn batch(tracker: &DropTracker, count: usize, successful_clones: usize) -> Vec<FailingClone> {
        let budget = Arc::new(AtomicUsize::new(successful_clones));
        (0..count as u64)
            .map(|value| FailingClone {
                inner: tracker.track(value),
                budget: budget.clone(),
            })
            .collect()
    }

    pub fn value(&self) -> u64 {
        self.inner.value()
    }

    /// Replenishes the shared budget.
    pub fn set_budget(&self, successful_clones: usize) {
        self.budget.store(successful_clones, Ordering::Relaxed);
    }

    pub fn try_clone(&self) -> Result<FailingClone, CloneError> {
        self.budget
            .fetch_update(Ordering::AcqRel, Ordering::Relaxed, |n| n.checked_sub(1))
            .map_err(|_| CloneError)?;
        Ok(FailingClone {
            inner: self.inner.clone(),
            budget: self.budget.clone(),
        })
    }
}

impl Clone for FailingClone {
    fn clone(&self) -> FailingClone {
        match self.try_clone() {
            Ok(clone) => clone,
            Err(e) => panic!("cloning value {}: {e}", self.value()),
        }
    }
}

impl PartialEq for FailingClone {
    fn eq(&self, other: &FailingClone) -> bool {
        self.value() == other.value()
    }
}
