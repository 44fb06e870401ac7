//! Probe command implementation

use anyhow::Result;
use inplace_alloc::{
    Allocator, ArenaAllocator, BudgetedAllocator, Global, PageAllocator, ResizeSupport,
    resize_support,
};
use serde::Serialize;

use crate::config::AllocatorKind;

#[derive(Debug, Serialize)]
pub struct ProbeReport {
    allocator: AllocatorKind,
    resize_support: String,
    budgeted_resize_support: String,
    granularity: usize,
}

pub fn run(allocator: AllocatorKind) -> Result<()> {
    let report = probe(allocator);
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

pub fn probe(allocator: AllocatorKind) -> ProbeReport {
    match allocator {
        AllocatorKind::Global => report::<Global>(allocator, 1),
        AllocatorKind::Page => report::<PageAllocator>(allocator, PageAllocator::page_size()),
        AllocatorKind::Arena => report::<ArenaAllocator>(allocator, ArenaAllocator::GRANULE),
    }
}

fn report<A: Allocator>(allocator: AllocatorKind, granularity: usize) -> ProbeReport {
    let support: ResizeSupport = resize_support::<A>();
    ProbeReport {
        allocator,
        resize_support: support.to_string(),
        budgeted_resize_support: resize_support::<BudgetedAllocator<A>>().to_string(),
        granularity,
    }
}
