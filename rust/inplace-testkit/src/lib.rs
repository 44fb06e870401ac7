//! Test utilities for the in-place resize crates.
//!
//! This crate provides:
//! - Instrumented allocators that count calls and let a test script how in-place
//!   resize requests are answered
//! - Element types that track construction and destruction, or fail to clone on
//!   demand
//! - Random workload generation for property-style tests
//!
//! # Usage
//!
//! This crate is intended for use within the workspace's test suites only.

pub mod alloc;
pub mod elements;
pub mod workload;
