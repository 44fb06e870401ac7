//! Command implementations for inplace-cmd

pub mod probe;
pub mod simulate;
