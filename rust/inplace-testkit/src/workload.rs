//! Random operation sequences for exercising growable containers.

/// One container operation.
///
/// Positions are raw random numbers; the consumer reduces them modulo the current
/// length (plus one for insertions).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Push(u64),
    Pop,
    Insert { position: usize, value: u64 },
    Remove { position: usize },
    Reserve(usize),
    Truncate(usize),
    ShrinkToFit,
    Clear,
}

/// Generates `count` operations biased towards growth, so buffers regularly cross
/// their capacity.
pub fn random_ops(rng: &mut fastrand::Rng, count: usize, max_reserve: usize) -> Vec<Op> {
    (0..count)
        .map(|_| match rng.u32(0..100) {
            0..50 => Op::Push(rng.u64(..)),
            50..60 => Op::Pop,
            60..70 => Op::Insert {
                position: rng.usize(..),
                value: rng.u64(..),
            },
            70..78 => Op::Remove {
                position: rng.usize(..),
            },
            78..86 => Op::Reserve(rng.usize(0..=max_reserve)),
            86..92 => Op::Truncate(rng.usize(0..=max_reserve)),
            92..98 => Op::ShrinkToFit,
            _ => Op::Clear,
        })
        .collect()
}

/// Seeds a generator from `INPLACE_TEST_SEED` when set, so failures can be replayed.
pub fn seeded_rng() -> (fastrand::Rng, u64) {
    let seed = std::env::var("INPLACE_TEST_SEED")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(|| fastrand::u64(..));
    (fastrand::Rng::with_seed(seed), seed)
}
