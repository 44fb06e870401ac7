//! Instrumented allocators.

use std::{
    alloc::Layout,
    collections::HashMap,
    ptr::NonNull,
    sync::{
        Mutex,
        atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering},
    },
};

use inplace_alloc::{AllocError, Allocator, Global, ResizeSupport};

/// Snapshot of the calls observed by a [`RecordingAllocator`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AllocationCounts {
    pub allocations: usize,
    pub failed_allocations: usize,
    pub deallocations: usize,
    pub resize_attempts: usize,
    pub resize_successes: usize,
    pub live_blocks: usize,
    pub live_bytes: usize,
    pub last_allocation_size: usize,
}

/// Forwards to `A` and counts every call.
///
/// The resize support of `A` is preserved, so wrapping an allocator never changes
/// which path a buffer takes.
#[derive(Debug, Default)]
pub struct RecordingAllocator<A = Global> {
    inner: A,
    allocations: AtomicUsize,
    failed_allocations: AtomicUsize,
    deallocations: AtomicUsize,
    resize_attempts: AtomicUsize,
    resize_successes: AtomicUsize,
    live_blocks: AtomicUsize,
    live_bytes: AtomicUsize,
    last_allocation_size: AtomicUsize,
}

impl<A: Allocator> RecordingAllocator<A> {
    pub fn new(inner: A) -> RecordingAllocator<A> {
        RecordingAllocator {
            inner,
            allocations: AtomicUsize::new(0),
            failed_allocations: AtomicUsize::new(0),
            deallocations: AtomicUsize::new(0),
            resize_attempts: AtomicUsize::new(0),
            resize_successes: AtomicUsize::new(0),
            live_blocks: AtomicUsize::new(0),
            live_bytes: AtomicUsize::new(0),
            last_allocation_size: AtomicUsize::new(0),
        }
    }

    pub fn inner(&self) -> &A {
        &self.inner
    }

    pub fn counts(&self) -> AllocationCounts {
        AllocationCounts {
            allocations: self.allocations.load(Ordering::Relaxed),
            failed_allocations: self.failed_allocations.load(Ordering::Relaxed),
            deallocations: self.deallocations.load(Ordering::Relaxed),
            resize_attempts: self.resize_attempts.load(Ordering::Relaxed),
            resize_successes: self.resize_successes.load(Ordering::Relaxed),
            live_blocks: self.live_blocks.load(Ordering::Relaxed),
            live_bytes: self.live_bytes.load(Ordering::Relaxed),
            last_allocation_size: self.last_allocation_size.load(Ordering::Relaxed),
        }
    }

    fn record_resize(&self, old_size: usize, new_size: Option<usize>) {
        self.resize_attempts.fetch_add(1, Ordering::Relaxed);
        if let Some(new_size) = new_size {
            self.resize_successes.fetch_add(1, Ordering::Relaxed);
            self.live_bytes.fetch_add(new_size, Ordering::Relaxed);
            self.live_bytes.fetch_sub(old_size, Ordering::Relaxed);
        }
    }
}

unsafe impl<A: Allocator> Allocator for RecordingAllocator<A> {
    const RESIZE: ResizeSupport = A::RESIZE;

    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        match self.inner.allocate(layout) {
            Ok(ptr) => {
                self.allocations.fetch_add(1, Ordering::Relaxed);
                self.live_blocks.fetch_add(1, Ordering::Relaxed);
                self.live_bytes.fetch_add(layout.size(), Ordering::Relaxed);
                self.last_allocation_size
                    .store(layout.size(), Ordering::Relaxed);
                Ok(ptr)
            }
            Err(e) => {
                self.failed_allocations.fetch_add(1, Ordering::Relaxed);
                Err(e)
            }
        }
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        unsafe { self.inner.deallocate(ptr, layout) };
        self.deallocations.fetch_add(1, Ordering::Relaxed);
        self.live_blocks.fetch_sub(1, Ordering::Relaxed);
        self.live_bytes.fetch_sub(layout.size(), Ordering::Relaxed);
    }

    unsafe fn resize_in_place(&self, ptr: NonNull<u8>, layout: Layout, new_size: usize) -> bool {
        let ok = unsafe { self.inner.resize_in_place(ptr, layout, new_size) };
        self.record_resize(layout.size(), ok.then_some(new_size));
        ok
    }

    unsafe fn resize_in_place_extended(
        &self,
        ptr: NonNull<u8>,
        layout: Layout,
        new_size: &mut usize,
    ) -> bool {
        let ok = unsafe { self.inner.resize_in_place_extended(ptr, layout, new_size) };
        self.record_resize(layout.size(), ok.then_some(*new_size));
        ok
    }

    unsafe fn resize_in_place_tiered(
        &self,
        ptr: NonNull<u8>,
        layout: Layout,
        preferred: &mut usize,
        minimum: usize,
    ) -> bool {
        let ok = unsafe {
            self.inner
                .resize_in_place_tiered(ptr, layout, preferred, minimum)
        };
        self.record_resize(layout.size(), ok.then_some(*preferred));
        ok
    }
}

/// How a [`ScriptedAllocator`] answers in-place resize requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ResizeBehaviour {
    /// Grant the preferred size when the reservation holds it, else the minimum.
    Accept = 0,
    /// Grant exactly the minimum when the reservation holds it.
    AcceptMinimum = 1,
    /// Decline every request.
    Decline = 2,
}

impl ResizeBehaviour {
    fn from_u8(value: u8) -> ResizeBehaviour {
        match value {
            0 => ResizeBehaviour::Accept,
            1 => ResizeBehaviour::AcceptMinimum,
            _ => ResizeBehaviour::Decline,
        }
    }
}

/// A heap allocator whose in-place resize answers are chosen by the test.
///
/// Every block reserves at least `reservation` bytes up front, so a block can be
/// "resized in place" to anything up to its reservation; larger requests are
/// always declined. Fresh allocations can be made to fail on demand.
#[derive(Debug)]
pub struct ScriptedAllocator {
    reservation: usize,
    behaviour: AtomicU8,
    fail_allocations: AtomicBool,
    blocks: Mutex<HashMap<usize, Layout>>,
}

impl ScriptedAllocator {
    pub fn new(reservation: usize, behaviour: ResizeBehaviour) -> ScriptedAllocator {
        ScriptedAllocator {
            reservation,
            behaviour: AtomicU8::new(behaviour as u8),
            fail_allocations: AtomicBool::new(false),
            blocks: Mutex::new(HashMap::new()),
        }
    }

    pub fn accepting(reservation: usize) -> ScriptedAllocator {
        Self::new(reservation, ResizeBehaviour::Accept)
    }

    pub fn declining() -> ScriptedAllocator {
        Self::new(0, ResizeBehaviour::Decline)
    }

    pub fn behaviour(&self) -> ResizeBehaviour {
        ResizeBehaviour::from_u8(self.behaviour.load(Ordering::Relaxed))
    }

    pub fn set_behaviour(&self, behaviour: ResizeBehaviour) {
        self.behaviour.store(behaviour as u8, Ordering::Relaxed);
    }

    /// Makes subsequent `allocate` calls fail (or succeed again).
    pub fn set_fail_allocations(&self, fail: bool) {
        self.fail_allocations.store(fail, Ordering::Relaxed);
    }

    /// Number of blocks currently allocated.
    pub fn live_blocks(&self) -> usize {
        self.blocks.lock().unwrap().len()
    }

    fn reserved_size(&self, ptr: NonNull<u8>) -> usize {
        self.blocks
            .lock()
            .unwrap()
            .get(&(ptr.as_ptr() as usize))
            .map(|layout| layout.size())
            .expect("block is not owned by this allocator")
    }
}

unsafe impl Allocator for ScriptedAllocator {
    const RESIZE: ResizeSupport = ResizeSupport::Tiered;

    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        if self.fail_allocations.load(Ordering::Relaxed) {
            return Err(AllocError);
        }
        let reserved = Layout::from_size_align(layout.size().max(self.reservation), layout.align())
            .map_err(|_| AllocError)?;
        let ptr = Global.allocate(reserved)?;
        self.blocks
            .lock()
            .unwrap()
            .insert(ptr.as_ptr() as usize, reserved);
        Ok(ptr)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        let reserved = self
            .blocks
            .lock()
            .unwrap()
            .remove(&(ptr.as_ptr() as usize))
            .expect("deallocating a block not owned by this allocator");
        assert!(layout.size() <= reserved.size());
        assert_eq!(layout.align(), reserved.align());
        unsafe { Global.deallocate(ptr, reserved) };
    }

    unsafe fn resize_in_place_tiered(
        &self,
        ptr: NonNull<u8>,
        _layout: Layout,
        preferred: &mut usize,
        minimum: usize,
    ) -> bool {
        let reserved = self.reserved_size(ptr);
        match self.behaviour() {
            ResizeBehaviour::Decline => false,
            ResizeBehaviour::Accept if *preferred <= reserved => true,
            ResizeBehaviour::Accept | ResizeBehaviour::AcceptMinimum if minimum <= reserved => {
                *preferred = minimum;
                true
            }
            _ => false,
        }
    }
}
