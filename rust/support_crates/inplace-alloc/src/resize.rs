//! The resize negotiation between a block owner and its allocator.
//!
//! A block owner describes the change it wants with a [`ResizeRequest`] and hands it
//! to [`try_resize`], which dispatches to whichever entry point the allocator type
//! implements and reports a [`ResizeOutcome`]. A decline is an ordinary, frequent
//! answer and never an error: the owner is expected to fall back to allocating a new
//! block and moving its contents.

use std::{alloc::Layout, ptr::NonNull};

use crate::allocator::{Allocator, ResizeSupport};

/// A desired change to the size of an existing block, in bytes.
///
/// Growth requests satisfy `preferred_size >= minimum_size >= current_size`.
/// Shrink requests satisfy `minimum_size <= current_size` and carry no preference
/// (`preferred_size == minimum_size`). The constructors assert these invariants:
/// a malformed request is a programming error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResizeRequest {
    current_size: usize,
    minimum_size: usize,
    preferred_size: usize,
    shrink: bool,
}

impl ResizeRequest {
    /// Creates a growth request.
    ///
    /// # Panics
    ///
    /// Panics unless `preferred_size >= minimum_size >= current_size`.
    pub fn grow(current_size: usize, minimum_size: usize, preferred_size: usize) -> ResizeRequest {
        assert!(
            minimum_size >= current_size,
            "grow request below current size: minimum {minimum_size} < current {current_size}"
        );
        assert!(
            preferred_size >= minimum_size,
            "grow request with preferred size {preferred_size} below minimum {minimum_size}"
        );
        ResizeRequest {
            current_size,
            minimum_size,
            preferred_size,
            shrink: false,
        }
    }

    /// Creates a growth request without a preferred size.
    pub fn grow_exact(current_size: usize, new_size: usize) -> ResizeRequest {
        Self::grow(current_size, new_size, new_size)
    }

    /// Creates a shrink request.
    ///
    /// # Panics
    ///
    /// Panics if `minimum_size > current_size`.
    pub fn shrink(current_size: usize, minimum_size: usize) -> ResizeRequest {
        assert!(
            minimum_size <= current_size,
            "shrink request above current size: minimum {minimum_size} > current {current_size}"
        );
        ResizeRequest {
            current_size,
            minimum_size,
            preferred_size: minimum_size,
            shrink: true,
        }
    }

    /// Size of the block as it is now.
    #[inline]
    pub fn current_size(&self) -> usize {
        self.current_size
    }

    /// Smallest size the caller accepts.
    #[inline]
    pub fn minimum_size(&self) -> usize {
        self.minimum_size
    }

    /// Size the caller would like, if the allocator can provide it.
    #[inline]
    pub fn preferred_size(&self) -> usize {
        self.preferred_size
    }

    /// Returns `true` for a request built by [`ResizeRequest::grow`], even when only
    /// the preferred size exceeds the current one.
    #[inline]
    pub fn is_grow(&self) -> bool {
        !self.shrink
    }

    /// Returns `true` if the caller asked for more than the minimum.
    #[inline]
    pub fn has_preference(&self) -> bool {
        self.preferred_size != self.minimum_size
    }
}

/// The answer to a [`ResizeRequest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResizeOutcome {
    succeeded: bool,
    achieved_size: usize,
}

impl ResizeOutcome {
    /// The block now has `achieved_size` bytes at its original address.
    #[inline]
    pub fn succeeded(achieved_size: usize) -> ResizeOutcome {
        ResizeOutcome {
            succeeded: true,
            achieved_size,
        }
    }

    /// The block is unchanged.
    #[inline]
    pub fn declined() -> ResizeOutcome {
        ResizeOutcome {
            succeeded: false,
            achieved_size: 0,
        }
    }

    /// Returns `true` if the block was resized.
    #[inline]
    pub fn is_success(&self) -> bool {
        self.succeeded
    }

    /// The size achieved by a successful resize, `None` after a decline.
    #[inline]
    pub fn achieved_size(&self) -> Option<usize> {
        self.succeeded.then_some(self.achieved_size)
    }
}

/// Returns the in-place resize form implemented by `A`.
pub const fn resize_support<A: Allocator>() -> ResizeSupport {
    A::RESIZE
}

/// Asks `allocator` to resize the block at `ptr` as described by `request`.
///
/// The call is forwarded to the entry point named by `A::RESIZE`:
///
/// - `Unsupported`: declined immediately; the allocator is not called.
/// - `Exact`: the minimum size is requested exactly and the preference ignored.
/// - `Extended`: the minimum size is requested and the allocator may round it up.
/// - `Tiered`: both the preferred and the minimum size are passed through.
///
/// On success the block keeps its address, and bytes up to the smaller of the old
/// and the achieved size are preserved. On decline nothing changed.
///
/// # Safety
///
/// `ptr` must denote a block currently allocated by `allocator` with alignment
/// `align`, and `request.current_size()` must fit it.
///
/// # Panics
///
/// Panics if the allocator reports an achieved size below the requested minimum,
/// or a "shrink" that leaves the block larger than it was.
pub unsafe fn try_resize<A: Allocator>(
    allocator: &A,
    ptr: NonNull<u8>,
    align: usize,
    request: &ResizeRequest,
) -> ResizeOutcome {
    if !A::RESIZE.is_supported() {
        return ResizeOutcome::declined();
    }

    let Ok(layout) = Layout::from_size_align(request.current_size, align) else {
        return ResizeOutcome::declined();
    };

    let achieved = match A::RESIZE {
        ResizeSupport::Unsupported => None,
        ResizeSupport::Exact => unsafe {
            allocator
                .resize_in_place(ptr, layout, request.minimum_size)
                .then_some(request.minimum_size)
        },
        ResizeSupport::Extended => {
            let mut size = request.minimum_size;
            unsafe { allocator.resize_in_place_extended(ptr, layout, &mut size) }.then_some(size)
        }
        ResizeSupport::Tiered => {
            let mut size = request.preferred_size;
            unsafe {
                allocator.resize_in_place_tiered(ptr, layout, &mut size, request.minimum_size)
            }
            .then_some(size)
        }
    };

    match achieved {
        Some(size) => {
            assert!(
                size >= request.minimum_size,
                "allocator achieved {size} bytes, below the requested minimum {}",
                request.minimum_size
            );
            assert!(
                request.is_grow() || size <= request.current_size,
                "allocator grew a block on a shrink request ({size} > {})",
                request.current_size
            );
            log::trace!(
                "resized block {ptr:p} in place: {} -> {size} bytes",
                request.current_size
            );
            ResizeOutcome::succeeded(size)
        }
        None => {
            log::trace!(
                "in-place resize of block {ptr:p} declined ({} -> {}..={} bytes)",
                request.current_size,
                request.minimum_size,
                request.preferred_size
            );
            ResizeOutcome::declined()
        }
    }
}
