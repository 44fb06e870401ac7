use std::sync::OnceLock;

use crate::allocator::ResizeSupport;

/// Linux can grow or shrink an anonymous mapping without moving it (`mremap`
/// without `MREMAP_MAYMOVE`), so page blocks accept two-tier resize requests.
pub const RESIZE_SUPPORT: ResizeSupport = ResizeSupport::Tiered;

/// Allocates memory using standard pages via mmap.
///
/// This function allocates `size` bytes of memory using the standard system page size,
/// which is typically 4KB on most systems. The allocation is page-aligned and uses
/// anonymous memory mapping.
///
/// # Arguments
///
/// * `size` - The number of bytes to allocate. The actual allocation will be rounded up
///   to the nearest page boundary.
///
/// # Returns
///
/// Returns a `Result` containing:
/// - `Ok((ptr, capacity))` - A tuple with a pointer to the allocated memory and the actual
///   capacity in bytes (which may be larger than the requested size due to page alignment)
/// - `Err(io::Error)` - An I/O error if the allocation fails
///
/// The returned pointer must be released with [`free`], passing a size that rounds
/// up to the same number of pages.
pub fn allocate(size: usize) -> std::io::Result<(*mut std::ffi::c_void, usize)> {
    let capacity = round_to_pages(size.max(1))?;
    let ptr = unsafe {
        libc::mmap(
            std::ptr::null_mut(),
            capacity,
            libc::PROT_READ | libc::PROT_WRITE,
            libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
            -1,
            0,
        )
    };
    if ptr.is_null() || ptr == libc::MAP_FAILED {
        let err = std::io::Error::last_os_error();
        return Err(err);
    }
    Ok((ptr, capacity))
}

/// Frees memory that was allocated using [`allocate`].
///
/// # Arguments
///
/// * `ptr` - A pointer to the memory region to deallocate
/// * `size` - The size of the mapping; rounded up to whole pages
///
/// # Safety
///
/// - `ptr` was returned by a previous call to [`allocate`]
/// - `size` rounds up to the current length of the mapping
/// - The memory has not already been freed
/// - No other references to the memory exist
pub unsafe fn free(ptr: *mut std::ffi::c_void, size: usize) -> std::io::Result<()> {
    let size = round_to_pages(size.max(1))?;
    let res = unsafe { libc::munmap(ptr, size) };
    if res < 0 {
        return Err(std::io::Error::last_os_error());
    }
    Ok(())
}

/// Changes the length of a mapping without moving it.
///
/// Both sizes are rounded up to whole pages. Shrinking always succeeds; growing
/// succeeds only when the address range right after the mapping is free.
///
/// # Returns
///
/// The new page-rounded length of the mapping, or `None` if the kernel could not
/// resize it in place (the mapping is then unchanged).
///
/// # Safety
///
/// `ptr` must be the start of a live mapping returned by [`allocate`] whose length
/// rounds up from `old_size`.
pub unsafe fn resize_in_place(
    ptr: *mut std::ffi::c_void,
    old_size: usize,
    new_size: usize,
) -> Option<usize> {
    let old_capacity = round_to_pages(old_size.max(1)).ok()?;
    let new_capacity = round_to_pages(new_size.max(1)).ok()?;
    if old_capacity == new_capacity {
        return Some(new_capacity);
    }
    // Without MREMAP_MAYMOVE the kernel either resizes at the same address or fails.
    let res = unsafe { libc::mremap(ptr, old_capacity, new_capacity, 0) };
    if res == libc::MAP_FAILED {
        return None;
    }
    debug_assert_eq!(res, ptr);
    Some(new_capacity)
}

/// Rounds `size` up to a whole number of pages.
pub fn round_to_pages(size: usize) -> std::io::Result<usize> {
    let page_size = get_page_size();
    assert!(page_size.is_power_of_two());
    size.checked_next_multiple_of(page_size)
        .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::InvalidInput, "size overflow"))
}

/// Gets the system's standard page size in bytes.
///
/// The value is cached after the first call. If the system's page size cannot be
/// determined, returns a default value of 4KB (4,096 bytes).
pub fn get_page_size() -> usize {
    static SIZE: OnceLock<usize> = OnceLock::new();
    if let Some(&size) = SIZE.get() {
        size
    } else {
        match read_page_size() {
            Ok(size) => {
                let _ = SIZE.set(size);
                size
            }
            Err(_) => 4 * 1024,
        }
    }
}

/// Reads the standard page size from the system using `sysconf(_SC_PAGESIZE)`.
fn read_page_size() -> std::io::Result<usize> {
    let res = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if res < 0 {
        return Err(std::io::Error::last_os_error());
    }
    assert!(res < i32::MAX as _);
    Ok(res as usize)
}
