//! # Memprobe Core
//!
//! `memprobe-core` is the test engine of the memprobe memory tester. It exercises a
//! block of addressable memory with deterministic patterns and reports every readback
//! that does not match the expectation.
//!
//! ## Tests
//!
//! - [`test_stuck_address`] - Writes address-derived patterns over 16 iterations to
//!   expose address lines that are frozen high or low. Stops at the first mismatch.
//!
//! - [`test_random_value`] - Fills a [`BufferPair`](memory::BufferPair) with one
//!   pseudo-random stream and compares both halves with [`compare_regions`].
//!
//! - [`compare_regions`] - Word-wise comparison of a buffer pair that reports every
//!   mismatch it finds.
//!
//! ## Collaborators
//!
//! The engine never allocates, locks or translates memory by itself. Callers supply:
//!
//! - buffers implementing [`memory::VolatileMemory`], usually [`memory::WordBuffer`]
//! - an [`memory::AddressingContext`] selecting offset or physical address reporting
//! - a [`diagnostic::DiagnosticSink`] receiving one [`diagnostic::Mismatch`] per failure
//! - a [`progress::Progress`] reporter for liveness feedback on long scans
//!
//! ## Platform Support
//!
//! The tests run on any target. Cache line flushing between the write and verify
//! passes is only performed on x86_64; physical address resolution through
//! [`memory::LinuxPageMap`] requires Linux and usually root privileges.

#![warn(missing_docs)]

mod compare;
pub mod diagnostic;
pub mod memory;
pub mod progress;
mod random_value;
mod stuck_address;
mod suite;
pub mod util;

pub use crate::compare::compare_regions;
pub use crate::random_value::test_random_value;
pub use crate::stuck_address::test_stuck_address;
pub use crate::suite::{TestConfig, TestKind, TestKindParseError, TestResult};
