//! `RawBuffer`: a contiguous region plus the elements living at its front.

use std::{alloc::Layout, marker::PhantomData, mem, ptr::NonNull};

use inplace_alloc::{Allocator, Global, ResizeRequest, try_resize};

use crate::{Error, GrowthPolicy, ResizeStats, Result, transfer::TransferGuard};

/// Owns a region obtained from `A` and the `len` elements stored at its front.
///
/// Invariants:
/// - `len <= capacity`
/// - a region is allocated iff `capacity > 0` and `T` is not zero-sized
/// - slots `[0, len)` hold live elements, slots `[len, capacity)` are uninitialized
///
/// Zero-sized element types never allocate; their capacity reads `usize::MAX`.
///
/// Without a region the data pointer is [`NonNull::dangling`], never null: it is
/// well aligned for `T` but must not be dereferenced or passed to the allocator.
///
/// The buffer also remembers the exact byte size last agreed with the allocator,
/// which may exceed `capacity * size_of::<T>()` after an in-place resize reported a
/// rounded-up size. Deallocation and later resize requests pass that exact size.
pub struct RawBuffer<T, A: Allocator = Global> {
    ptr: NonNull<T>,
    capacity: usize,
    len: usize,
    alloc_size: usize,
    allocator: A,
    policy: GrowthPolicy,
    stats: ResizeStats,
    _marker: PhantomData<T>,
}

impl<T> RawBuffer<T> {
    pub fn new() -> RawBuffer<T> {
        Self::new_in(Global)
    }
}

impl<T, A: Allocator> RawBuffer<T, A> {
    const IS_ZST: bool = mem::size_of::<T>() == 0;

    /// Creates an empty buffer without allocating.
    pub fn new_in(allocator: A) -> RawBuffer<T, A> {
        Self::with_policy_in(GrowthPolicy::default(), allocator)
    }

    /// Creates an empty buffer growing according to `policy`.
    pub fn with_policy_in(policy: GrowthPolicy, allocator: A) -> RawBuffer<T, A> {
        RawBuffer {
            ptr: NonNull::dangling(),
            capacity: 0,
            len: 0,
            alloc_size: 0,
            allocator,
            policy,
            stats: ResizeStats::default(),
            _marker: PhantomData,
        }
    }

    /// Creates an empty buffer with room for exactly `capacity` elements.
    pub fn with_capacity_in(capacity: usize, allocator: A) -> Result<RawBuffer<T, A>> {
        let mut buffer = Self::new_in(allocator);
        buffer.reallocate_with_move(capacity)?;
        Ok(buffer)
    }

    /// Number of element slots; `usize::MAX` for zero-sized `T`.
    #[inline]
    pub fn capacity(&self) -> usize {
        if Self::IS_ZST {
            usize::MAX
        } else {
            self.capacity
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Size in bytes of the allocated region, as agreed with the allocator.
    #[inline]
    pub fn allocated_bytes(&self) -> usize {
        self.alloc_size
    }

    #[inline]
    pub fn as_ptr(&self) -> *const T {
        self.ptr.as_ptr()
    }

    #[inline]
    pub fn as_mut_ptr(&mut self) -> *mut T {
        self.ptr.as_ptr()
    }

    #[inline]
    pub fn as_slice(&self) -> &[T] {
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }

    pub fn allocator(&self) -> &A {
        &self.allocator
    }

    pub fn policy(&self) -> &GrowthPolicy {
        &self.policy
    }

    pub fn set_policy(&mut self, policy: GrowthPolicy) {
        self.policy = policy;
    }

    pub fn stats(&self) -> ResizeStats {
        self.stats
    }

    /// Sets the number of live elements.
    ///
    /// # Safety
    ///
    /// `new_len <= capacity()`, and slots `[0, new_len)` must hold live elements.
    /// Elements beyond `new_len` are forgotten, not dropped.
    #[inline]
    pub unsafe fn set_len(&mut self, new_len: usize) {
        debug_assert!(new_len <= self.capacity());
        self.len = new_len;
    }

    /// Ensures room for at least `required_minimum` elements.
    ///
    /// The allocator is first asked to extend the region in place, preferring the
    /// capacity suggested by the growth policy. If it declines, the elements move
    /// to a new region of the preferred capacity. On error the buffer is unchanged.
    pub fn grow(&mut self, required_minimum: usize) -> Result<()> {
        if required_minimum <= self.capacity() {
            return Ok(());
        }
        let preferred = self.preferred_capacity(required_minimum)?;
        if self.try_grow_in_place(required_minimum, preferred) {
            return Ok(());
        }
        self.reallocate_with_move(preferred)
    }

    /// Same as [`RawBuffer::grow`], except that a fallback reallocation constructs
    /// the new elements with `construct` instead of moving them.
    ///
    /// See [`RawBuffer::reallocate_with`] for the failure semantics.
    pub fn grow_with<F, E>(&mut self, required_minimum: usize, construct: F) -> Result<()>
    where
        F: FnMut(usize, &T) -> std::result::Result<T, E>,
        E: std::error::Error + Send + Sync + 'static,
    {
        if required_minimum <= self.capacity() {
            return Ok(());
        }
        let preferred = self.preferred_capacity(required_minimum)?;
        if self.try_grow_in_place(required_minimum, preferred) {
            return Ok(());
        }
        self.reallocate_with(preferred, construct)
    }

    /// Reduces the capacity to the number of live elements.
    ///
    /// The allocator is first asked to shrink the region in place; it may keep a
    /// few more slots than requested. If it declines, the elements move to a new
    /// region of exactly `len` slots. An empty buffer releases its region.
    pub fn shrink_to_fit(&mut self) -> Result<()> {
        if Self::IS_ZST || self.capacity == self.len {
            return Ok(());
        }
        if self.len == 0 {
            log::debug!(
                "releasing empty buffer region of {} elements",
                self.capacity
            );
            self.release();
            return Ok(());
        }

        let elem_size = mem::size_of::<T>();
        let request = ResizeRequest::shrink(self.alloc_size, self.len * elem_size);
        let outcome = unsafe {
            try_resize(
                &self.allocator,
                self.ptr.cast(),
                mem::align_of::<T>(),
                &request,
            )
        };
        if let Some(achieved) = outcome.achieved_size() {
            self.alloc_size = achieved;
            self.capacity = achieved / elem_size;
            self.stats.in_place_shrinks += 1;
            return Ok(());
        }
        self.note_declined_probe(&request);
        self.reallocate_with_move(self.len)
    }

    /// Moves the elements into a fresh region of exactly `new_capacity` slots and
    /// releases the old one.
    ///
    /// Moves are bitwise and cannot fail, so once the new region is allocated the
    /// transfer always completes. If the allocation fails the buffer is unchanged.
    ///
    /// # Panics
    ///
    /// Panics if `new_capacity < len()`.
    pub fn reallocate_with_move(&mut self, new_capacity: usize) -> Result<()> {
        assert!(
            new_capacity >= self.len,
            "reallocation to {new_capacity} slots would drop {} live elements",
            self.len
        );
        if Self::IS_ZST {
            return Ok(());
        }
        if new_capacity == 0 {
            self.release();
            return Ok(());
        }

        let mut guard = self.allocate_region(new_capacity)?;
        unsafe {
            std::ptr::copy_nonoverlapping(self.ptr.as_ptr(), guard.as_mut_ptr(), self.len);
            guard.set_initialized(self.len);
        }
        let (ptr, layout) = guard.commit();

        // The old slots were relocated: free the region without dropping them.
        if let Some(old_layout) = self.current_layout() {
            unsafe { self.allocator.deallocate(self.ptr.cast(), old_layout) };
        }
        self.adopt_region(ptr, layout, new_capacity, self.len);
        Ok(())
    }

    /// Builds a fresh region of exactly `new_capacity` slots by constructing each
    /// element with `construct(index, &original)`, then drops the originals and
    /// releases the old region.
    ///
    /// If `construct` fails (or panics) for element `k`, the `k` elements already
    /// constructed are dropped and the new region is released; the buffer keeps its
    /// region, capacity and elements. The error is reported as
    /// [`ErrorKind::ElementConstruction`](crate::ErrorKind::ElementConstruction).
    ///
    /// # Panics
    ///
    /// Panics if `new_capacity < len()`.
    pub fn reallocate_with<F, E>(&mut self, new_capacity: usize, mut construct: F) -> Result<()>
    where
        F: FnMut(usize, &T) -> std::result::Result<T, E>,
        E: std::error::Error + Send + Sync + 'static,
    {
        assert!(
            new_capacity >= self.len,
            "reallocation to {new_capacity} slots would drop {} live elements",
            self.len
        );
        if Self::IS_ZST {
            return Ok(());
        }
        if new_capacity == 0 {
            self.release();
            return Ok(());
        }

        let mut guard = self.allocate_region(new_capacity)?;
        for (index, original) in self.as_slice().iter().enumerate() {
            match construct(index, original) {
                Ok(value) => guard.push(value),
                Err(e) => {
                    log::warn!(
                        "element {index} of {} failed to construct, rolling back reallocation",
                        self.len
                    );
                    return Err(Error::element_construction(index, e));
                }
            }
        }
        let (ptr, layout) = guard.commit();

        let old = self.current_layout().map(|layout| (self.ptr, layout));
        let len = self.len;
        self.adopt_region(ptr, layout, new_capacity, len);
        if let Some((old_ptr, old_layout)) = old {
            drop(unsafe { TransferGuard::adopt(&self.allocator, old_ptr, old_layout, len) });
        }
        Ok(())
    }

    /// Reallocates to `new_capacity` slots by cloning the elements.
    pub fn reallocate_cloned(&mut self, new_capacity: usize) -> Result<()>
    where
        T: Clone,
    {
        self.reallocate_with(new_capacity, |_, original| {
            Ok::<T, std::convert::Infallible>(original.clone())
        })
    }
}

impl<T, A: Allocator> RawBuffer<T, A> {
    /// Largest element count whose byte size fits a `Layout`.
    fn max_capacity() -> usize {
        if Self::IS_ZST {
            usize::MAX
        } else {
            isize::MAX as usize / mem::size_of::<T>()
        }
    }

    fn preferred_capacity(&self, required_minimum: usize) -> Result<usize> {
        let max = Self::max_capacity();
        if required_minimum > max {
            return Err(Error::capacity_overflow());
        }
        Ok(self
            .policy
            .next_capacity(self.capacity, required_minimum)
            .min(max))
    }

    /// Asks the allocator to extend the current region to `minimum` slots, or
    /// `preferred` if it can. Returns `true` if the region now holds at least
    /// `minimum` slots.
    fn try_grow_in_place(&mut self, minimum: usize, preferred: usize) -> bool {
        if self.capacity == 0 {
            return false;
        }
        let elem_size = mem::size_of::<T>();
        let request =
            ResizeRequest::grow(self.alloc_size, minimum * elem_size, preferred * elem_size);
        let outcome = unsafe {
            try_resize(
                &self.allocator,
                self.ptr.cast(),
                mem::align_of::<T>(),
                &request,
            )
        };
        match outcome.achieved_size() {
            Some(achieved) => {
                self.alloc_size = achieved;
                self.capacity = achieved / elem_size;
                self.stats.in_place_grows += 1;
                true
            }
            None => {
                self.note_declined_probe(&request);
                false
            }
        }
    }

    fn note_declined_probe(&mut self, request: &ResizeRequest) {
        if A::RESIZE.is_supported() {
            self.stats.declined_probes += 1;
            log::debug!(
                "allocator declined in-place resize of {:p} ({} -> {} bytes)",
                self.ptr,
                request.current_size(),
                request.minimum_size()
            );
        }
    }

    fn allocate_region(&self, capacity: usize) -> Result<TransferGuard<'_, T, A>> {
        let layout = Layout::array::<T>(capacity)?;
        TransferGuard::allocate(&self.allocator, layout).map_err(|_| {
            log::debug!(
                "allocation of {} bytes for {capacity} elements failed",
                layout.size()
            );
            Error::allocation_failure(layout)
        })
    }

    /// Installs a freshly populated region. The previous region must already be
    /// released or about to be.
    fn adopt_region(&mut self, ptr: NonNull<T>, layout: Layout, capacity: usize, moved: usize) {
        if self.capacity == 0 {
            self.stats.fresh_allocations += 1;
            log::trace!("allocated buffer region of {capacity} elements");
        } else {
            self.stats.fallback_reallocations += 1;
            self.stats.elements_moved += moved as u64;
            log::debug!(
                "reallocated buffer: {} -> {capacity} elements, {moved} transferred",
                self.capacity
            );
        }
        self.ptr = ptr;
        self.capacity = capacity;
        self.alloc_size = layout.size();
    }

    /// Layout of the current region, `None` if there is none.
    fn current_layout(&self) -> Option<Layout> {
        if Self::IS_ZST || self.capacity == 0 {
            return None;
        }
        Layout::from_size_align(self.alloc_size, mem::align_of::<T>()).ok()
    }

    /// Returns the region of an empty buffer to the allocator.
    fn release(&mut self) {
        debug_assert_eq!(self.len, 0);
        if let Some(layout) = self.current_layout() {
            unsafe { self.allocator.deallocate(self.ptr.cast(), layout) };
        }
        self.ptr = NonNull::dangling();
        self.capacity = 0;
        self.alloc_size = 0;
    }
}

impl<T, A: Allocator> Drop for RawBuffer<T, A> {
    fn drop(&mut self) {
        match self.current_layout() {
            Some(layout) => drop(unsafe {
                TransferGuard::adopt(&self.allocator, self.ptr, layout, self.len)
            }),
            None => unsafe {
                std::ptr::drop_in_place(std::ptr::slice_from_raw_parts_mut(
                    self.ptr.as_ptr(),
                    self.len,
                ));
            },
        }
    }
}

impl<T> Default for RawBuffer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: std::fmt::Debug, A: Allocator> std::fmt::Debug for RawBuffer<T, A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawBuffer")
            .field("values", &self.as_slice())
            .field("len", &self.len)
            .field("cap", &self.capacity())
            .field("alloc_size", &self.alloc_size)
            .field("resize", &A::RESIZE)
            .finish_non_exhaustive()
    }
}

// SAFETY: the buffer exclusively owns its elements and region, like `Vec<T, A>`.
unsafe impl<T: Send, A: Allocator + Send> Send for RawBuffer<T, A> {}

unsafe impl<T: Sync, A: Allocator + Sync> Sync for RawBuffer<T, A> {}
