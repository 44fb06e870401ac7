//! Workload configuration read by the `simulate` command.

use std::path::Path;

use anyhow::{Context, Result};
use inplace_buffer::GrowthPolicy;
use serde::{Deserialize, Serialize};

/// The allocators a workload can run on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum AllocatorKind {
    /// The process heap; never resizes in place.
    #[default]
    Global,
    /// Anonymous page mappings.
    Page,
    /// A fixed-size bump arena.
    Arena,
}

/// A workload: which allocator to use and the operations to run on each vector.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WorkloadConfig {
    #[serde(default)]
    pub allocator: AllocatorKind,

    /// Size of the arena region, for `"arena"` workloads.
    #[serde(default = "default_arena_size")]
    pub arena_size: usize,

    /// When set, allocations are charged against a budget of this many bytes.
    #[serde(default)]
    pub budget_bytes: Option<usize>,

    #[serde(default)]
    pub policy: GrowthPolicy,

    /// Number of vectors sharing the allocator. Every operation is applied to each
    /// vector in turn.
    #[serde(default = "default_vectors")]
    pub vectors: usize,

    pub ops: Vec<WorkloadOp>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum WorkloadOp {
    Push { count: usize },
    Pop { count: usize },
    Reserve { additional: usize },
    Truncate { len: usize },
    ShrinkToFit,
    Clear,
}

fn default_arena_size() -> usize {
    64 * 1024 * 1024
}

fn default_vectors() -> usize {
    1
}

impl WorkloadConfig {
    pub fn load(path: &Path) -> Result<WorkloadConfig> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read workload file {}", path.display()))?;
        Self::parse(&json).with_context(|| format!("Invalid workload file {}", path.display()))
    }

    pub fn parse(json: &str) -> Result<WorkloadConfig> {
        let config: WorkloadConfig = serde_json::from_str(json)?;
        anyhow::ensure!(config.vectors > 0, "workload needs at least one vector");
        Ok(config)
    }
}
