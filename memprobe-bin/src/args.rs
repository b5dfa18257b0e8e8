//! Parsers for command line values.

use clap::ValueEnum;
use std::num::ParseIntError;

/// How test progress is displayed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum, serde::Serialize)]
pub enum ProgressMode {
    /// Classic in-place indicator on standard output
    #[default]
    Terminal,
    /// Spinners, interleaved with log output
    Spinner,
    /// No progress output
    None,
}

/// Parses a hexadecimal address with optional `0x` prefix.
///
/// # Errors
///
/// Returns an error if `s` is not a valid hexadecimal number.
pub fn parse_hex(s: &str) -> Result<usize, ParseIntError> {
    let s = s.trim();
    let digits = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    usize::from_str_radix(digits, 16)
}
