//! Byte budget layered over another allocator.
//!
//! Fresh allocations and in-place growth are charged against a shared budget before
//! they reach the inner allocator; deallocation and in-place shrinking return bytes
//! to it. A request the budget cannot cover fails like an out-of-memory condition,
//! which makes this wrapper the natural way to exercise allocation-failure paths.

use std::{alloc::Layout, ptr::NonNull};

use crate::{
    allocator::{AllocError, Allocator, ResizeSupport},
    counter::Counter,
};

/// Wraps `A`, limiting the total number of bytes it may hand out.
///
/// In-place resize support is inherited from `A`. Sizes reported by a successful
/// in-place grow are clamped to what was charged, so the budget always matches the
/// sizes owners later pass back.
#[derive(Debug)]
pub struct BudgetedAllocator<A> {
    inner: A,
    limit: usize,
    remaining: Counter,
}

impl<A: Allocator> BudgetedAllocator<A> {
    /// Creates a wrapper allowing at most `budget` bytes to be outstanding.
    pub fn new(inner: A, budget: usize) -> BudgetedAllocator<A> {
        BudgetedAllocator {
            inner,
            limit: budget,
            remaining: Counter::new(budget),
        }
    }

    /// The configured budget.
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Bytes still available.
    ///
    /// **Note**: the value may be outdated when the allocator is shared between threads.
    pub fn remaining(&self) -> usize {
        self.remaining.read()
    }

    /// Bytes currently charged.
    pub fn in_use(&self) -> usize {
        self.limit.saturating_sub(self.remaining())
    }

    pub fn inner(&self) -> &A {
        &self.inner
    }

    /// Charges `target - current` bytes for a grow. Returns `false` if the budget
    /// cannot cover it.
    fn charge_growth(&self, current: usize, target: usize) -> bool {
        self.remaining.withdraw(target.saturating_sub(current))
    }

    /// Settles a finished resize that was charged up to `charged` bytes.
    ///
    /// Returns the size to report to the caller: never more than what was paid for,
    /// even if the inner allocator rounded the block up past it.
    fn settle(&self, current: usize, charged: usize, achieved: usize) -> usize {
        let paid = charged.max(current);
        let reported = achieved.min(paid);
        self.remaining.deposit(paid - reported);
        reported
    }
}

unsafe impl<A: Allocator> Allocator for BudgetedAllocator<A> {
    const RESIZE: ResizeSupport = A::RESIZE;

    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        if !self.remaining.withdraw(layout.size()) {
            log::debug!(
                "budget exhausted: requested {} bytes, {} remaining",
                layout.size(),
                self.remaining()
            );
            return Err(AllocError);
        }
        self.inner.allocate(layout).inspect_err(|_| {
            self.remaining.deposit(layout.size());
        })
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        unsafe { self.inner.deallocate(ptr, layout) };
        self.remaining.deposit(layout.size());
    }

    unsafe fn resize_in_place(&self, ptr: NonNull<u8>, layout: Layout, new_size: usize) -> bool {
        let current = layout.size();
        if !self.charge_growth(current, new_size) {
            return false;
        }
        if unsafe { self.inner.resize_in_place(ptr, layout, new_size) } {
            self.settle(current, new_size, new_size);
            true
        } else {
            self.remaining.deposit(new_size.saturating_sub(current));
            false
        }
    }

    unsafe fn resize_in_place_extended(
        &self,
        ptr: NonNull<u8>,
        layout: Layout,
        new_size: &mut usize,
    ) -> bool {
        let current = layout.size();
        let requested = *new_size;
        if !self.charge_growth(current, requested) {
            return false;
        }
        let mut achieved = requested;
        if unsafe { self.inner.resize_in_place_extended(ptr, layout, &mut achieved) } {
            *new_size = self.settle(current, requested, achieved);
            true
        } else {
            self.remaining.deposit(requested.saturating_sub(current));
            false
        }
    }

    unsafe fn resize_in_place_tiered(
        &self,
        ptr: NonNull<u8>,
        layout: Layout,
        preferred: &mut usize,
        minimum: usize,
    ) -> bool {
        let current = layout.size();
        // Charge for the preference when the budget allows it, else only for the minimum.
        let target = if self.charge_growth(current, *preferred) {
            *preferred
        } else if self.charge_growth(current, minimum) {
            minimum
        } else {
            return false;
        };
        let mut achieved = target;
        if unsafe {
            self.inner
                .resize_in_place_tiered(ptr, layout, &mut achieved, minimum)
        } {
            *preferred = self.settle(current, target, achieved);
            true
        } else {
            self.remaining.deposit(target.saturating_sub(current));
            false
        }
    }
}
