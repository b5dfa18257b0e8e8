//! # Memprobe
//!
//! Pattern based memory fault detection. This crate re-exports the test engine from
//! [`memprobe_core`]; the `memprobe` command line tool lives in the `memprobe-bin`
//! workspace member.
//!
//! ```
//! use memprobe::memory::{AddressingContext, WordBuffer};
//! use memprobe::progress::NoProgress;
//! use memprobe::diagnostic::Mismatch;
//! use memprobe::{TestResult, test_stuck_address};
//!
//! let mut words = vec![0usize; 256];
//! let mut failures: Vec<Mismatch> = vec![];
//! let result = test_stuck_address(
//!     &mut WordBuffer::new(&mut words),
//!     &AddressingContext::Offset,
//!     &mut failures,
//!     &mut NoProgress,
//! );
//! assert_eq!(result, TestResult::Pass);
//! ```

pub use memprobe_core::*;
