use std::alloc::{Layout, alloc_zeroed, dealloc};

use crate::allocator::ResizeSupport;

/// Emulated pages come from the process heap, which cannot resize in place.
pub const RESIZE_SUPPORT: ResizeSupport = ResizeSupport::Unsupported;

/// Allocates memory using standard pages (emulated).
pub fn allocate(size: usize) -> std::io::Result<(*mut std::ffi::c_void, usize)> {
    let page_size = get_page_size();
    let capacity = round_to_pages(size.max(1))?;

    // Page-sized alignment keeps the emulation indistinguishable from real mappings.
    let layout = Layout::from_size_align(capacity, page_size)
        .map_err(|_| std::io::Error::new(std::io::ErrorKind::InvalidInput, "Invalid layout"))?;

    let ptr = unsafe { alloc_zeroed(layout) };
    if ptr.is_null() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::OutOfMemory,
            "Failed to allocate memory",
        ));
    }

    Ok((ptr as *mut std::ffi::c_void, capacity))
}

/// Frees memory that was allocated using standard pages.
///
/// # Safety
///
/// `ptr` must come from [`allocate`] and `size` must round up to the same number
/// of pages.
pub unsafe fn free(ptr: *mut std::ffi::c_void, size: usize) -> std::io::Result<()> {
    let page_size = get_page_size();
    let size = round_to_pages(size.max(1))?;

    let layout = Layout::from_size_align(size, page_size)
        .map_err(|_| std::io::Error::new(std::io::ErrorKind::InvalidInput, "Invalid layout"))?;

    unsafe {
        dealloc(ptr as *mut u8, layout);
    }
    Ok(())
}

/// Emulated pages are never resized; only a request that stays within the same
/// number of pages is answered positively.
///
/// # Safety
///
/// `ptr` must come from [`allocate`] with a size that rounds up from `old_size`.
pub unsafe fn resize_in_place(
    ptr: *mut std::ffi::c_void,
    old_size: usize,
    new_size: usize,
) -> Option<usize> {
    let _ = ptr;
    let old_capacity = round_to_pages(old_size.max(1)).ok()?;
    let new_capacity = round_to_pages(new_size.max(1)).ok()?;
    (old_capacity == new_capacity).then_some(new_capacity)
}

/// Rounds `size` up to a whole number of pages.
pub fn round_to_pages(size: usize) -> std::io::Result<usize> {
    size.checked_next_multiple_of(get_page_size())
        .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::InvalidInput, "size overflow"))
}

/// Returns the "standard page" size in bytes.
pub fn get_page_size() -> usize {
    4 * 1024
}
