//! Page-granular allocator backed by anonymous memory mappings.
//!
//! Every block is its own mapping, rounded up to whole pages and aligned to the
//! page size. On Linux a block can be grown or shrunk without moving it, as long as
//! the address range after it is free; elsewhere blocks are emulated on the heap and
//! never resized.

use std::{alloc::Layout, ptr::NonNull};

use crate::{
    allocator::{AllocError, Allocator, ResizeSupport},
    mmap,
};

/// Allocates each block as a separate page mapping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageAllocator;

impl PageAllocator {
    /// Returns the size of a regular memory page on the current system.
    ///
    /// Every block size is rounded up to a multiple of this value, and blocks are
    /// aligned to it.
    pub fn page_size() -> usize {
        mmap::get_page_size()
    }

    /// Rounds `size` up to whole pages, `None` on overflow.
    pub fn round_to_pages(size: usize) -> Option<usize> {
        mmap::round_to_pages(size).ok()
    }
}

unsafe impl Allocator for PageAllocator {
    const RESIZE: ResizeSupport = mmap::RESIZE_SUPPORT;

    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        if layout.size() == 0 || layout.align() > Self::page_size() {
            return Err(AllocError);
        }
        match mmap::allocate(layout.size()) {
            Ok((ptr, _capacity)) => NonNull::new(ptr.cast()).ok_or(AllocError),
            Err(e) => {
                log::debug!("page allocation of {} bytes failed: {e}", layout.size());
                Err(AllocError)
            }
        }
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        if let Err(e) = unsafe { mmap::free(ptr.as_ptr().cast(), layout.size()) } {
            log::warn!("failed to unmap block {ptr:p} ({} bytes): {e}", layout.size());
        }
    }

    unsafe fn resize_in_place(&self, ptr: NonNull<u8>, layout: Layout, new_size: usize) -> bool {
        unsafe { mmap::resize_in_place(ptr.as_ptr().cast(), layout.size(), new_size) }.is_some()
    }

    unsafe fn resize_in_place_extended(
        &self,
        ptr: NonNull<u8>,
        layout: Layout,
        new_size: &mut usize,
    ) -> bool {
        match unsafe { mmap::resize_in_place(ptr.as_ptr().cast(), layout.size(), *new_size) } {
            Some(achieved) if *new_size <= layout.size() => {
                // The mapping may keep a partial page beyond the old size; a shrink
                // never reports more than the caller had.
                *new_size = achieved.min(layout.size());
                true
            }
            Some(achieved) => {
                *new_size = achieved;
                true
            }
            None => false,
        }
    }

    unsafe fn resize_in_place_tiered(
        &self,
        ptr: NonNull<u8>,
        layout: Layout,
        preferred: &mut usize,
        minimum: usize,
    ) -> bool {
        let mut size = *preferred;
        if unsafe { self.resize_in_place_extended(ptr, layout, &mut size) } {
            *preferred = size;
            return true;
        }
        if minimum == *preferred {
            return false;
        }
        let mut size = minimum;
        if unsafe { self.resize_in_place_extended(ptr, layout, &mut size) } {
            *preferred = size;
            true
        } else {
            false
        }
    }
}
