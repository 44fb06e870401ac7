//! Fixed-capacity bump arena.
//!
//! Blocks are carved from one contiguous region by advancing a `top` offset. The
//! block that ends at `top` (the tail) can be grown or shrunk in place and is
//! reclaimed when deallocated; space released anywhere else is only recovered by
//! [`ArenaAllocator::reset`] or when the arena is dropped.
//!
//! All bookkeeping is a single atomic offset, so one arena can be shared by many
//! owners across threads.

use std::{
    alloc::Layout,
    ptr::NonNull,
    sync::atomic::{AtomicUsize, Ordering},
};

use crate::allocator::{AllocError, Allocator, ResizeSupport};

/// A bump arena with in-place resize of its most recent block.
pub struct ArenaAllocator {
    base: NonNull<u8>,
    capacity: usize,
    top: AtomicUsize,
}

impl ArenaAllocator {
    /// Block sizes are rounded up to this many bytes.
    pub const GRANULE: usize = 16;

    /// Alignment of the arena region itself.
    const BASE_ALIGNMENT: usize = 64;

    /// Creates an arena able to hold `capacity` bytes (rounded up to the granule).
    pub fn new(capacity: usize) -> Result<ArenaAllocator, AllocError> {
        let capacity = round_up(capacity.max(1)).ok_or(AllocError)?;
        let layout =
            Layout::from_size_align(capacity, Self::BASE_ALIGNMENT).map_err(|_| AllocError)?;
        let base = NonNull::new(unsafe { std::alloc::alloc(layout) }).ok_or(AllocError)?;
        Ok(ArenaAllocator {
            base,
            capacity,
            top: AtomicUsize::new(0),
        })
    }

    /// Total size of the arena region in bytes.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bytes currently carved out, including padding and unreclaimed holes.
    #[inline]
    pub fn used(&self) -> usize {
        self.top.load(Ordering::Relaxed)
    }

    /// Bytes still available past the tail.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.capacity - self.used()
    }

    /// Forgets every block, making the whole region available again.
    ///
    /// Taking `&mut self` guarantees that no owner still borrows the arena.
    pub fn reset(&mut self) {
        *self.top.get_mut() = 0;
    }

    #[inline]
    fn offset_of(&self, ptr: NonNull<u8>) -> usize {
        let offset = (ptr.as_ptr() as usize).wrapping_sub(self.base.as_ptr() as usize);
        debug_assert!(offset < self.capacity, "block {ptr:p} is outside of the arena");
        offset
    }
}

unsafe impl Allocator for ArenaAllocator {
    const RESIZE: ResizeSupport = ResizeSupport::Extended;

    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        if layout.size() == 0 {
            return Err(AllocError);
        }
        let size = round_up(layout.size()).ok_or(AllocError)?;
        let base = self.base.as_ptr() as usize;

        let mut top = self.top.load(Ordering::Relaxed);
        loop {
            let start = base
                .checked_add(top)
                .and_then(|addr| addr.checked_next_multiple_of(layout.align()))
                .ok_or(AllocError)?
                - base;
            let end = start.checked_add(size).ok_or(AllocError)?;
            if end > self.capacity {
                return Err(AllocError);
            }
            match self
                .top
                .compare_exchange_weak(top, end, Ordering::AcqRel, Ordering::Relaxed)
            {
                Ok(_) => return Ok(unsafe { self.base.add(start) }),
                Err(updated) => top = updated,
            }
        }
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        let start = self.offset_of(ptr);
        let Some(end) = round_up(layout.size()).and_then(|size| start.checked_add(size)) else {
            return;
        };
        // Only the tail is reclaimed; any other block stays carved out until reset.
        let _ = self
            .top
            .compare_exchange(end, start, Ordering::AcqRel, Ordering::Relaxed);
    }

    unsafe fn resize_in_place_extended(
        &self,
        ptr: NonNull<u8>,
        layout: Layout,
        new_size: &mut usize,
    ) -> bool {
        let start = self.offset_of(ptr);
        let (Some(current), Some(requested)) = (round_up(layout.size()), round_up(*new_size))
        else {
            return false;
        };
        let current_end = start + current;
        let Some(new_end) = start.checked_add(requested) else {
            return false;
        };

        if *new_size <= layout.size() {
            if new_end < current_end {
                let _ = self.top.compare_exchange(
                    current_end,
                    new_end,
                    Ordering::AcqRel,
                    Ordering::Relaxed,
                );
            }
            *new_size = requested.min(layout.size());
            return true;
        }

        if new_end <= current_end {
            *new_size = current;
            return true;
        }
        if new_end > self.capacity {
            return false;
        }
        match self
            .top
            .compare_exchange(current_end, new_end, Ordering::AcqRel, Ordering::Relaxed)
        {
            Ok(_) => {
                *new_size = requested;
                true
            }
            Err(_) => false,
        }
    }
}

impl Drop for ArenaAllocator {
    fn drop(&mut self) {
        if let Ok(layout) = Layout::from_size_align(self.capacity, Self::BASE_ALIGNMENT) {
            unsafe { std::alloc::dealloc(self.base.as_ptr(), layout) };
        }
    }
}

impl std::fmt::Debug for ArenaAllocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArenaAllocator")
            .field("base", &self.base)
            .field("capacity", &self.capacity)
            .field("used", &self.used())
            .finish()
    }
}

// SAFETY: the arena owns its region and every mutation of the bookkeeping goes
// through the atomic `top` offset.
unsafe impl Send for ArenaAllocator {}

// SAFETY: see above; handing out disjoint blocks from `&self` is synchronized by
// compare-and-exchange on `top`.
unsafe impl Sync for ArenaAllocator {}

#[inline]
fn round_up(size: usize) -> Option<usize> {
    size.checked_next_multiple_of(ArenaAllocator::GRANULE)
}
