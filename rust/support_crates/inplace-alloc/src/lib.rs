//! Pluggable allocators with an optional in-place resize capability.
//!
//! Every allocator implements [`Allocator`]. Whether it can change the size of an
//! existing block without moving it is a per-type fact, published through the
//! [`Allocator::RESIZE`] associated constant, so callers probing an allocator that
//! lacks the capability pay nothing at run time.
//!
//! # Modules
//!
//! - [`allocator`]: the `Allocator` trait and its resize entry points
//! - [`resize`]: `ResizeRequest`/`ResizeOutcome` and the uniform [`try_resize`] probe
//! - [`global`]: the process heap, without in-place resize
//! - [`page`]: anonymous page mappings, resizable in place where the OS allows it
//! - [`arena`]: a bump arena whose most recent block can grow or shrink in place
//! - [`budgeted`]: a byte budget layered over any other allocator
//! - [`counter`]: the lock-free counter backing budgets

pub mod allocator;
pub mod arena;
pub mod budgeted;
pub mod counter;
pub mod global;
pub mod page;
pub mod resize;

#[cfg_attr(target_os = "linux", path = "mmap_linux.rs")]
#[cfg_attr(not(target_os = "linux"), path = "mmap_fallback.rs")]
pub mod mmap;

pub use allocator::{AllocError, Allocator, ResizeSupport};
pub use arena::ArenaAllocator;
pub use budgeted::BudgetedAllocator;
pub use global::Global;
pub use page::PageAllocator;
pub use resize::{ResizeOutcome, ResizeRequest, resize_support, try_resize};

#[cfg(test)]
mod tests;
