//! `GrowVec`: a vector-like container over [`RawBuffer`].

use std::ops::{Deref, DerefMut};

use inplace_alloc::{Allocator, Global};

use crate::{Error, ErrorKind, GrowthPolicy, RawBuffer, ResizeStats, Result};

/// A growable array whose storage comes from a pluggable allocator and is resized
/// in place whenever the allocator allows it.
///
/// Methods that may allocate come in two flavours: the plain ones panic (or call
/// [`std::alloc::handle_alloc_error`]) when the allocator fails, like `Vec`; the
/// `try_` ones return the error and leave the vector unchanged.
pub struct GrowVec<T, A: Allocator = Global> {
    buf: RawBuffer<T, A>,
}

impl<T> GrowVec<T> {
    pub fn new() -> GrowVec<T> {
        Self::new_in(Global)
    }

    pub fn with_capacity(capacity: usize) -> GrowVec<T> {
        Self::with_capacity_in(capacity, Global)
    }
}

impl<T, A: Allocator> GrowVec<T, A> {
    pub fn new_in(allocator: A) -> GrowVec<T, A> {
        GrowVec {
            buf: RawBuffer::new_in(allocator),
        }
    }

    pub fn with_policy_in(policy: GrowthPolicy, allocator: A) -> GrowVec<T, A> {
        GrowVec {
            buf: RawBuffer::with_policy_in(policy, allocator),
        }
    }

    pub fn with_capacity_in(capacity: usize, allocator: A) -> GrowVec<T, A> {
        Self::try_with_capacity_in(capacity, allocator).unwrap_or_else(|e| fail(e))
    }

    pub fn try_with_capacity_in(capacity: usize, allocator: A) -> Result<GrowVec<T, A>> {
        Ok(GrowVec {
            buf: RawBuffer::with_capacity_in(capacity, allocator)?,
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.buf.capacity()
    }

    #[inline]
    pub fn as_ptr(&self) -> *const T {
        self.buf.as_ptr()
    }

    #[inline]
    pub fn as_mut_ptr(&mut self) -> *mut T {
        self.buf.as_mut_ptr()
    }

    #[inline]
    pub fn as_slice(&self) -> &[T] {
        self.buf.as_slice()
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        self.buf.as_mut_slice()
    }

    pub fn allocator(&self) -> &A {
        self.buf.allocator()
    }

    pub fn policy(&self) -> &GrowthPolicy {
        self.buf.policy()
    }

    pub fn stats(&self) -> ResizeStats {
        self.buf.stats()
    }

    /// The underlying buffer.
    pub fn raw(&self) -> &RawBuffer<T, A> {
        &self.buf
    }

    pub fn raw_mut(&mut self) -> &mut RawBuffer<T, A> {
        &mut self.buf
    }

    /// Reserves room for at least `additional` more elements.
    pub fn reserve(&mut self, additional: usize) {
        self.try_reserve(additional).unwrap_or_else(|e| fail(e))
    }

    pub fn try_reserve(&mut self, additional: usize) -> Result<()> {
        let required = self
            .len()
            .checked_add(additional)
            .ok_or_else(Error::capacity_overflow)?;
        self.buf.grow(required)
    }

    pub fn push(&mut self, value: T) {
        if self.len() == self.capacity() {
            self.reserve(1);
        }
        unsafe { self.push_unchecked(value) };
    }

    /// Appends `value`, or returns the allocation error (dropping `value`).
    pub fn try_push(&mut self, value: T) -> Result<()> {
        if self.len() == self.capacity() {
            self.try_reserve(1)?;
        }
        unsafe { self.push_unchecked(value) };
        Ok(())
    }

    pub fn pop(&mut self) -> Option<T> {
        let len = self.len();
        if len == 0 {
            return None;
        }
        unsafe {
            self.buf.set_len(len - 1);
            Some(self.as_ptr().add(len - 1).read())
        }
    }

    /// Inserts `value` at `index`, shifting the following elements right.
    ///
    /// # Panics
    ///
    /// Panics if `index > len()`.
    pub fn insert(&mut self, index: usize, value: T) {
        let len = self.len();
        assert!(index <= len, "insertion index {index} out of bounds (len {len})");
        if len == self.capacity() {
            self.reserve(1);
        }
        unsafe {
            let p = self.as_mut_ptr().add(index);
            std::ptr::copy(p, p.add(1), len - index);
            p.write(value);
            self.buf.set_len(len + 1);
        }
    }

    /// Removes and returns the element at `index`, shifting the following elements
    /// left.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len()`.
    pub fn remove(&mut self, index: usize) -> T {
        let len = self.len();
        assert!(index < len, "removal index {index} out of bounds (len {len})");
        unsafe {
            let p = self.as_mut_ptr().add(index);
            let value = p.read();
            std::ptr::copy(p.add(1), p, len - index - 1);
            self.buf.set_len(len - 1);
            value
        }
    }

    /// Drops the elements past `len`. Capacity is unchanged.
    pub fn truncate(&mut self, len: usize) {
        let old_len = self.len();
        if len >= old_len {
            return;
        }
        unsafe {
            // Shorten first: a panicking destructor must not cause a double drop.
            self.buf.set_len(len);
            let tail = std::ptr::slice_from_raw_parts_mut(self.as_mut_ptr().add(len), old_len - len);
            std::ptr::drop_in_place(tail);
        }
    }

    pub fn clear(&mut self) {
        self.truncate(0);
    }

    /// Reduces the capacity as much as the allocator allows.
    pub fn shrink_to_fit(&mut self) {
        self.try_shrink_to_fit().unwrap_or_else(|e| fail(e))
    }

    pub fn try_shrink_to_fit(&mut self) -> Result<()> {
        self.buf.shrink_to_fit()
    }

    /// Appends clones of all elements of `values`.
    pub fn extend_from_slice(&mut self, values: &[T])
    where
        T: Clone,
    {
        self.reserve(values.len());
        for value in values {
            unsafe { self.push_unchecked(value.clone()) };
        }
    }

    /// # Safety
    ///
    /// `len() < capacity()`.
    #[inline]
    unsafe fn push_unchecked(&mut self, value: T) {
        let len = self.len();
        unsafe {
            self.as_mut_ptr().add(len).write(value);
            self.buf.set_len(len + 1);
        }
    }
}

impl<A: Allocator> GrowVec<u8, A> {
    /// Appends a value of type `T` to the vector by copying its bytes.
    #[inline]
    pub fn push_typed<T>(&mut self, value: T)
    where
        T: bytemuck::NoUninit,
    {
        self.extend_from_slice(bytemuck::bytes_of(&value));
    }

    /// Appends a slice of values of type `T` to the vector by copying their bytes.
    #[inline]
    pub fn extend_from_typed_slice<T>(&mut self, values: &[T])
    where
        T: bytemuck::NoUninit,
    {
        self.extend_from_slice(bytemuck::cast_slice(values));
    }

    /// Returns the vector's data as a slice of `T` values.
    ///
    /// # Panics
    ///
    /// Panics if the data is not aligned for `T` or its length is not a multiple of
    /// `size_of::<T>()`.
    #[inline]
    pub fn typed_data<T>(&self) -> &[T]
    where
        T: bytemuck::AnyBitPattern,
    {
        bytemuck::cast_slice(self.as_slice())
    }

    /// Reads the `index`-th value of type `T`, regardless of alignment.
    ///
    /// # Panics
    ///
    /// Panics if the value extends past the end of the data.
    pub fn read_typed<T>(&self, index: usize) -> T
    where
        T: bytemuck::AnyBitPattern,
    {
        let size = std::mem::size_of::<T>();
        let start = index * size;
        bytemuck::pod_read_unaligned(&self.as_slice()[start..start + size])
    }
}

/// Reports a failure of an infallible container operation.
#[cold]
fn fail(e: Error) -> ! {
    match e.into_kind() {
        ErrorKind::AllocationFailure { layout } => std::alloc::handle_alloc_error(layout),
        kind => panic!("{kind}"),
    }
}

impl<T, A: Allocator> Deref for GrowVec<T, A> {
    type Target = [T];

    #[inline]
    fn deref(&self) -> &Self::Target {
        self.as_slice()
    }
}

impl<T, A: Allocator> DerefMut for GrowVec<T, A> {
    #[inline]
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.as_mut_slice()
    }
}

impl<T: Clone, A: Allocator + Clone> Clone for GrowVec<T, A> {
    fn clone(&self) -> GrowVec<T, A> {
        let mut v = GrowVec::with_policy_in(*self.policy(), self.allocator().clone());
        if !self.is_empty() {
            v.extend_from_slice(self.as_slice());
        }
        v
    }
}

impl<T: std::fmt::Debug, A: Allocator> std::fmt::Debug for GrowVec<T, A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GrowVec")
            .field("values", &self.as_slice())
            .field("len", &self.len())
            .field("cap", &self.capacity())
            .finish_non_exhaustive()
    }
}

impl<T, A: Allocator + Default> Default for GrowVec<T, A> {
    fn default() -> Self {
        Self::new_in(A::default())
    }
}

impl<T, U, A, B> PartialEq<GrowVec<U, B>> for GrowVec<T, A>
where
    T: PartialEq<U>,
    A: Allocator,
    B: Allocator,
{
    fn eq(&self, other: &GrowVec<U, B>) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl<T: PartialEq<U>, U, A: Allocator> PartialEq<[U]> for GrowVec<T, A> {
    fn eq(&self, other: &[U]) -> bool {
        self.as_slice() == other
    }
}

impl<T: PartialEq<U>, U, A: Allocator> PartialEq<&[U]> for GrowVec<T, A> {
    fn eq(&self, other: &&[U]) -> bool {
        self.as_slice() == *other
    }
}

impl<T: PartialEq<U>, U, A: Allocator, const N: usize> PartialEq<[U; N]> for GrowVec<T, A> {
    fn eq(&self, other: &[U; N]) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl<T: Eq, A: Allocator> Eq for GrowVec<T, A> {}

impl<T, A: Allocator> Extend<T> for GrowVec<T, A> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        let iter = iter.into_iter();
        self.reserve(iter.size_hint().0);
        for value in iter {
            self.push(value);
        }
    }
}

impl<'a, T: Copy + 'a, A: Allocator> Extend<&'a T> for GrowVec<T, A> {
    fn extend<I: IntoIterator<Item = &'a T>>(&mut self, iter: I) {
        self.extend(iter.into_iter().copied());
    }
}

impl<T> FromIterator<T> for GrowVec<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut v = GrowVec::new();
        v.extend(iter);
        v
    }
}

impl<T> From<&[T]> for GrowVec<T>
where
    T: Clone,
{
    fn from(values: &[T]) -> Self {
        let mut v = GrowVec::with_capacity(values.len());
        v.extend_from_slice(values);
        v
    }
}
