//! Consolidated integration tests for docrisk-core.
//!
//! A single test binary keeps link time down and avoids proptest suites
//! from separate binaries competing for the runner.

mod classifier;
mod cli;
mod engine;
