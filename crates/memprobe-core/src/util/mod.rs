//! Utility functions and types used throughout memprobe.
//!
//! This module provides various helper types and traits including:
//! - [`Size`] - Memory size representation and parsing
//! - Constants for memory operations ([`WORD_SIZE`], [`PAGE_SIZE`], etc.)
//! - Progress styling ([`NamedProgress`])
//! - Random number generation ([`Rng`])

mod constants;
mod named_progress;
mod rng;
mod size;

pub use self::constants::*;
pub use self::named_progress::{NamedProgress, SPINNER_SYMBOLS};
pub use self::rng::Rng;
pub use self::size::{Size, SizeParseError};
