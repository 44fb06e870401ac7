//! Ownership of a region while elements are being transferred into or out of it.
//!
//! A [`TransferGuard`] holds a region together with the number of elements
//! initialized at its front. Unless [`committed`](TransferGuard::commit), dropping
//! the guard (normally, on an early error return, or during unwinding) drops those
//! elements and returns the region to its allocator. Reallocation builds the new
//! region under a guard, so a failure at any point leaves the source buffer
//! untouched and leaks nothing; releasing the old region goes through a guard too.

use std::{alloc::Layout, marker::PhantomData, mem::ManuallyDrop, ptr::NonNull};

use inplace_alloc::{AllocError, Allocator};

pub struct TransferGuard<'a, T, A: Allocator> {
    allocator: &'a A,
    ptr: NonNull<T>,
    layout: Layout,
    initialized: usize,
    _marker: PhantomData<T>,
}

impl<'a, T, A: Allocator> TransferGuard<'a, T, A> {
    /// Allocates a fresh, empty region for `layout`.
    ///
    /// `layout` must be valid for an array of `T` and have a non-zero size.
    pub fn allocate(allocator: &'a A, layout: Layout) -> Result<Self, AllocError> {
        debug_assert!(layout.size() > 0);
        debug_assert!(layout.align() >= std::mem::align_of::<T>());
        let ptr = allocator.allocate(layout)?;
        Ok(TransferGuard {
            allocator,
            ptr: ptr.cast(),
            layout,
            initialized: 0,
            _marker: PhantomData,
        })
    }

    /// Takes over an existing region whose first `initialized` slots hold live
    /// elements.
    ///
    /// # Safety
    ///
    /// The region must be allocated by `allocator`, `layout` must fit it, and the
    /// first `initialized` slots must hold live elements that nothing else will
    /// drop.
    pub unsafe fn adopt(
        allocator: &'a A,
        ptr: NonNull<T>,
        layout: Layout,
        initialized: usize,
    ) -> Self {
        TransferGuard {
            allocator,
            ptr,
            layout,
            initialized,
            _marker: PhantomData,
        }
    }

    /// Number of element slots in the region.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.layout
            .size()
            .checked_div(std::mem::size_of::<T>())
            .unwrap_or(usize::MAX)
    }

    #[inline]
    pub fn initialized(&self) -> usize {
        self.initialized
    }

    #[inline]
    pub fn as_mut_ptr(&mut self) -> *mut T {
        self.ptr.as_ptr()
    }

    /// Writes `value` into the next free slot.
    ///
    /// # Panics
    ///
    /// Panics if the region is full.
    pub fn push(&mut self, value: T) {
        assert!(self.initialized < self.capacity(), "transfer region is full");
        unsafe { self.ptr.as_ptr().add(self.initialized).write(value) };
        self.initialized += 1;
    }

    /// Declares the first `initialized` slots live.
    ///
    /// # Safety
    ///
    /// Those slots must have been written, and `initialized <= capacity()`.
    pub unsafe fn set_initialized(&mut self, initialized: usize) {
        debug_assert!(initialized <= self.capacity());
        self.initialized = initialized;
    }

    /// Hands the region and its elements over to the caller.
    pub fn commit(self) -> (NonNull<T>, Layout) {
        let this = ManuallyDrop::new(self);
        (this.ptr, this.layout)
    }
}

impl<T, A: Allocator> Drop for TransferGuard<'_, T, A> {
    fn drop(&mut self) {
        // Frees the region even if an element destructor panics.
        struct Release<'a, A: Allocator> {
            allocator: &'a A,
            ptr: NonNull<u8>,
            layout: Layout,
        }

        impl<A: Allocator> Drop for Release<'_, A> {
            fn drop(&mut self) {
                unsafe { self.allocator.deallocate(self.ptr, self.layout) };
            }
        }

        let _release = Release {
            allocator: self.allocator,
            ptr: self.ptr.cast(),
            layout: self.layout,
        };
        unsafe {
            std::ptr::drop_in_place(std::ptr::slice_from_raw_parts_mut(
                self.ptr.as_ptr(),
                self.initialized,
            ));
        }
    }
}
