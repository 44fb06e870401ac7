use std::sync::atomic::{AtomicUsize, Ordering};

/// A thread-safe counter that enables multiple consumers to withdraw (if possible) and deposit
/// specific amounts, ensuring that the counter value remains non-negative.
///
/// Allocators use it to track remaining bytes: withdrawing before memory is handed out
/// and depositing when it comes back.
#[derive(Debug)]
pub struct Counter(AtomicUsize);

impl Counter {
    /// Creates a new `Counter` with the given initial amount.
    pub fn new(amount: usize) -> Counter {
        Counter(AtomicUsize::new(amount))
    }

    /// Attempts to withdraw the specified `amount` from the counter.
    ///
    /// If the current value of the counter is greater than or equal to the `amount`, the `amount`
    /// is subtracted from the counter, and `true` is returned. Otherwise, the counter remains
    /// unchanged, and `false` is returned.
    pub fn withdraw(&self, amount: usize) -> bool {
        let mut current = self.0.load(Ordering::Relaxed);
        while current >= amount {
            match self.0.compare_exchange_weak(
                current,
                current - amount,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return true,
                Err(updated) => current = updated,
            }
        }
        false
    }

    /// Deposits the specified `amount` into the counter.
    pub fn deposit(&self, amount: usize) {
        self.0.fetch_add(amount, Ordering::Release);
    }

    /// Returns the counter value (most likely stale by the time it is observed by the caller).
    pub fn read(&self) -> usize {
        self.0.load(Ordering::Relaxed)
    }
}
