use serde::Serialize;

/// Counts how a buffer's resizes were carried out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ResizeStats {
    /// Regions allocated for a buffer that had none.
    pub fresh_allocations: u64,
    /// Grows satisfied by the allocator without moving.
    pub in_place_grows: u64,
    /// Shrinks satisfied by the allocator without moving.
    pub in_place_shrinks: u64,
    /// Resizes carried out by allocating a new region and transferring elements.
    pub fallback_reallocations: u64,
    /// In-place resize requests the allocator answered with a decline.
    pub declined_probes: u64,
    /// Elements relocated or reconstructed by fallback reallocations.
    pub elements_moved: u64,
}

impl ResizeStats {
    /// Resizes that kept the region at its address.
    pub fn in_place_resizes(&self) -> u64 {
        self.in_place_grows + self.in_place_shrinks
    }

    /// Merges the counters of `other` into `self`.
    pub fn accumulate(&mut self, other: &ResizeStats) {
        self.fresh_allocations += other.fresh_allocations;
        self.in_place_grows += other.in_place_grows;
        self.in_place_shrinks += other.in_place_shrinks;
        self.fallback_reallocations += other.fallback_reallocations;
        self.declined_probes += other.declined_probes;
        self.elements_moved += other.elements_moved;
    }
}
