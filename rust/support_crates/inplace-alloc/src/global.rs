use std::{alloc::Layout, ptr::NonNull};

use crate::allocator::{AllocError, Allocator};

/// The process heap (`std::alloc`).
///
/// The system allocator offers `realloc`, which may move the block, but no way to
/// ask for a resize that is guaranteed to keep the address, so `Global` reports
/// [`ResizeSupport::Unsupported`](crate::ResizeSupport::Unsupported).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Global;

unsafe impl Allocator for Global {
    #[inline]
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        if layout.size() == 0 {
            return Err(AllocError);
        }
        let ptr = unsafe { std::alloc::alloc(layout) };
        NonNull::new(ptr).ok_or(AllocError)
    }

    #[inline]
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        unsafe { std::alloc::dealloc(ptr.as_ptr(), layout) }
    }
}
