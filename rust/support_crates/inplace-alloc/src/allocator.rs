//! `Allocator`: raw block allocation with optional in-place resize.

use std::{alloc::Layout, ptr::NonNull};

use thiserror::Error;

/// The in-place resize entry point an allocator type implements.
///
/// The variants are ordered by how much sizing information the allocator accepts:
/// an `Exact` allocator only answers "yes or no" for one size, `Extended` may round
/// the size up and report it, and `Tiered` additionally understands a preferred
/// size on top of the minimum acceptable one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResizeSupport {
    /// The allocator never resizes in place. Probes are answered with a decline
    /// without calling into the allocator at all.
    Unsupported,
    /// Minimal form: [`Allocator::resize_in_place`].
    Exact,
    /// In/out form: [`Allocator::resize_in_place_extended`].
    Extended,
    /// Two-tier form: [`Allocator::resize_in_place_tiered`].
    Tiered,
}

impl ResizeSupport {
    /// Returns `true` if the allocator exposes any in-place resize entry point.
    #[inline]
    pub const fn is_supported(self) -> bool {
        !matches!(self, ResizeSupport::Unsupported)
    }

    /// Short human-readable name, used by diagnostics.
    pub const fn name(self) -> &'static str {
        match self {
            ResizeSupport::Unsupported => "unsupported",
            ResizeSupport::Exact => "exact",
            ResizeSupport::Extended => "extended",
            ResizeSupport::Tiered => "tiered",
        }
    }
}

impl std::fmt::Display for ResizeSupport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// The allocator could not satisfy a request for fresh memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
#[error("memory allocation failed")]
pub struct AllocError;

impl From<AllocError> for std::io::Error {
    fn from(e: AllocError) -> Self {
        std::io::Error::new(std::io::ErrorKind::OutOfMemory, e)
    }
}

/// A source of raw memory blocks.
///
/// # Fitting layouts
///
/// A block *fits* a layout when the layout has the alignment the block was
/// allocated with and a size anywhere between the size originally requested and
/// the largest size reported by a successful in-place resize (or, after a shrink,
/// between the new minimum and the reported size). `deallocate` and the resize
/// entry points accept any fitting layout.
///
/// # Safety
///
/// Implementors must guarantee that:
/// - A block returned by `allocate` is valid for reads and writes of
///   `layout.size()` bytes, aligned to `layout.align()`, and not handed out again
///   until it is deallocated.
/// - A successful in-place resize keeps the block at the same address and
///   preserves its first `min(old, new)` bytes.
/// - A declined in-place resize leaves the block unchanged (address, size and
///   content).
/// - No resize entry point reports an achieved size below the requested minimum.
/// - `RESIZE` names an entry point whose implementation can actually succeed;
///   the default bodies of the other entry points are only fallbacks.
pub unsafe trait Allocator {
    /// Which in-place resize form this allocator type implements.
    ///
    /// This is resolved per type, never per call.
    const RESIZE: ResizeSupport = ResizeSupport::Unsupported;

    /// Allocates a fresh block for `layout`.
    ///
    /// Callers never request zero-sized blocks; implementations may answer such a
    /// request with `AllocError`.
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError>;

    /// Releases a block.
    ///
    /// # Safety
    ///
    /// `ptr` must denote a block currently allocated by this allocator, and
    /// `layout` must fit it.
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout);

    /// Minimal form: resizes the block to exactly `new_size` bytes, or declines.
    ///
    /// # Safety
    ///
    /// `ptr` must denote a block currently allocated by this allocator, and
    /// `layout` (the current size and alignment) must fit it.
    unsafe fn resize_in_place(&self, ptr: NonNull<u8>, layout: Layout, new_size: usize) -> bool {
        let _ = (ptr, layout, new_size);
        false
    }

    /// In/out form: resizes the block to at least `*new_size` bytes.
    ///
    /// On success `*new_size` is overwritten with the size actually achieved,
    /// which may be larger than requested. On failure it is left untouched.
    ///
    /// # Safety
    ///
    /// Same as [`Allocator::resize_in_place`].
    unsafe fn resize_in_place_extended(
        &self,
        ptr: NonNull<u8>,
        layout: Layout,
        new_size: &mut usize,
    ) -> bool {
        unsafe { self.resize_in_place(ptr, layout, *new_size) }
    }

    /// Two-tier form: resizes the block to `*preferred` bytes if possible, else to
    /// at least `minimum` bytes.
    ///
    /// On success `*preferred` is overwritten with the achieved size. Passing
    /// `*preferred == minimum` expresses no preference.
    ///
    /// # Safety
    ///
    /// Same as [`Allocator::resize_in_place`].
    unsafe fn resize_in_place_tiered(
        &self,
        ptr: NonNull<u8>,
        layout: Layout,
        preferred: &mut usize,
        minimum: usize,
    ) -> bool {
        let mut size = minimum;
        if unsafe { self.resize_in_place_extended(ptr, layout, &mut size) } {
            *preferred = size;
            true
        } else {
            false
        }
    }
}

unsafe impl<A> Allocator for &A
where
    A: Allocator,
{
    const RESIZE: ResizeSupport = A::RESIZE;

    #[inline]
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        (**self).allocate(layout)
    }

    #[inline]
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        unsafe { (**self).deallocate(ptr, layout) }
    }

    #[inline]
    unsafe fn resize_in_place(&self, ptr: NonNull<u8>, layout: Layout, new_size: usize) -> bool {
        unsafe { (**self).resize_in_place(ptr, layout, new_size) }
    }

    #[inline]
    unsafe fn resize_in_place_extended(
        &self,
        ptr: NonNull<u8>,
        layout: Layout,
        new_size: &mut usize,
    ) -> bool {
        unsafe { (**self).resize_in_place_extended(ptr, layout, new_size) }
    }

    #[inline]
    unsafe fn resize_in_place_tiered(
        &self,
        ptr: NonNull<u8>,
        layout: Layout,
        preferred: &mut usize,
        minimum: usize,
    ) -> bool {
        unsafe { (**self).resize_in_place_tiered(ptr, layout, preferred, minimum) }
    }
}
