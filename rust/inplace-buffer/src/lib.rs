//! Growable contiguous buffers that try to resize their allocation in place.
//!
//! [`RawBuffer`] owns a region obtained from an [`Allocator`] and the elements
//! living in its prefix. When it needs more (or less) room it first asks the
//! allocator to resize the region where it is, and only when that is declined
//! falls back to allocating a new region and moving the elements over. Both paths
//! leave the buffer in the same observable state; they differ only in cost.
//!
//! [`GrowVec`] is a small vector-like container built on top of `RawBuffer`.
//!
//! [`Allocator`]: inplace_alloc::Allocator

pub mod buffer;
pub mod error;
pub mod growth;
pub mod result;
pub mod stats;
pub mod transfer;
pub mod vec;

pub use buffer::RawBuffer;
pub use error::{Error, ErrorKind};
pub use growth::GrowthPolicy;
pub use result::Result;
pub use stats::ResizeStats;
pub use vec::GrowVec;
