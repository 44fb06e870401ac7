//! Simulate command implementation

use std::path::Path;

use anyhow::{Context, Result};
use inplace_alloc::{
    Allocator, ArenaAllocator, BudgetedAllocator, Global, PageAllocator, resize_support,
};
use inplace_buffer::{GrowVec, ResizeStats};
use serde::Serialize;

use crate::config::{AllocatorKind, WorkloadConfig, WorkloadOp};

#[derive(Debug, Serialize)]
pub struct SimulationReport {
    pub allocator: AllocatorKind,
    pub resize_support: String,
    pub budget_bytes: Option<usize>,
    pub vectors: Vec<VectorReport>,
    pub totals: ResizeStats,
}

#[derive(Debug, Serialize)]
pub struct VectorReport {
    pub len: usize,
    pub capacity: usize,
    pub stats: ResizeStats,
}

pub fn run(path: &Path) -> Result<()> {
    let config = WorkloadConfig::load(path)?;
    let report = simulate(&config)?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

pub fn simulate(config: &WorkloadConfig) -> Result<SimulationReport> {
    log::info!(
        "Running {} operations on {} vector(s) with the {:?} allocator",
        config.ops.len(),
        config.vectors,
        config.allocator
    );

    let vectors = match (config.allocator, config.budget_bytes) {
        (AllocatorKind::Global, None) => run_workload(Global, config)?,
        (AllocatorKind::Global, Some(budget)) => {
            run_workload(&BudgetedAllocator::new(Global, budget), config)?
        }
        (AllocatorKind::Page, None) => run_workload(PageAllocator, config)?,
        (AllocatorKind::Page, Some(budget)) => {
            run_workload(&BudgetedAllocator::new(PageAllocator, budget), config)?
        }
        (AllocatorKind::Arena, budget) => {
            let arena = ArenaAllocator::new(config.arena_size).with_context(|| {
                format!("Failed to reserve an arena of {} bytes", config.arena_size)
            })?;
            match budget {
                None => run_workload(&arena, config)?,
                Some(budget) => run_workload(&BudgetedAllocator::new(&arena, budget), config)?,
            }
        }
    };

    let mut totals = ResizeStats::default();
    for vector in &vectors {
        totals.accumulate(&vector.stats);
    }

    Ok(SimulationReport {
        allocator: config.allocator,
        resize_support: support_name(config.allocator),
        budget_bytes: config.budget_bytes,
        vectors,
        totals,
    })
}

fn support_name(kind: AllocatorKind) -> String {
    match kind {
        AllocatorKind::Global => resize_support::<Global>(),
        AllocatorKind::Page => resize_support::<PageAllocator>(),
        AllocatorKind::Arena => resize_support::<ArenaAllocator>(),
    }
    .to_string()
}

fn run_workload<A: Allocator + Clone>(
    allocator: A,
    config: &WorkloadConfig,
) -> Result<Vec<VectorReport>> {
    let mut vectors: Vec<GrowVec<u64, A>> = (0..config.vectors)
        .map(|_| GrowVec::with_policy_in(config.policy, allocator.clone()))
        .collect();

    let mut next_value = 0u64;
    for (i, op) in config.ops.iter().enumerate() {
        for (v, vector) in vectors.iter_mut().enumerate() {
            apply(vector, *op, &mut next_value)
                .with_context(|| format!("Operation #{i} ({op:?}) failed on vector {v}"))?;
        }
    }

    Ok(vectors
        .iter()
        .map(|vector| VectorReport {
            len: vector.len(),
            capacity: vector.capacity(),
            stats: vector.stats(),
        })
        .collect())
}

fn apply<A: Allocator>(
    vector: &mut GrowVec<u64, A>,
    op: WorkloadOp,
    next_value: &mut u64,
) -> inplace_buffer::Result<()> {
    match op {
        WorkloadOp::Push { count } => {
            for _ in 0..count {
                vector.try_push(*next_value)?;
                *next_value += 1;
            }
        }
        WorkloadOp::Pop { count } => {
            for _ in 0..count {
                if vector.pop().is_none() {
                    break;
                }
            }
        }
        WorkloadOp::Reserve { additional } => vector.try_reserve(additional)?,
        WorkloadOp::Truncate { len } => vector.truncate(len),
        WorkloadOp::ShrinkToFit => vector.try_shrink_to_fit()?,
        WorkloadOp::Clear => vector.clear(),
    }
    log::trace!("len {} capacity {} after {op:?}", vector.len(), vector.capacity());
    Ok(())
}
