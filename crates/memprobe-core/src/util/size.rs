use std::str::FromStr;
use thiserror::Error;

/// Amount of memory to test, as given on the command line.
///
/// Units are binary: `K` is 1024 bytes. [`Display`](std::fmt::Display) writes the
/// same compact `<number><unit>` form that [`FromStr`] accepts.
///
/// ```
/// use memprobe_core::util::Size;
///
/// let size: Size = "8K".parse().unwrap();
/// assert_eq!(size, Size::KB(8));
/// assert_eq!(size.bytes(), 8192);
/// assert_eq!(Size::MB(64).to_string(), "64M");
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Size {
    /// Bytes
    B(usize),
    /// Kibibytes
    KB(usize),
    /// Mebibytes
    MB(usize),
    /// Gibibytes
    GB(usize),
}

impl Size {
    const fn parts(&self) -> (usize, u32, char) {
        match *self {
            Size::B(n) => (n, 0, 'B'),
            Size::KB(n) => (n, 10, 'K'),
            Size::MB(n) => (n, 20, 'M'),
            Size::GB(n) => (n, 30, 'G'),
        }
    }

    /// Number of bytes, or `None` if it does not fit a `usize`.
    pub const fn checked_bytes(&self) -> Option<usize> {
        let (n, shift, _) = self.parts();
        n.checked_mul(1 << shift)
    }

    /// Number of bytes. Saturates at `usize::MAX`.
    pub const fn bytes(&self) -> usize {
        match self.checked_bytes() {
            Some(bytes) => bytes,
            None => usize::MAX,
        }
    }
}

impl std::fmt::Display for Size {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (n, _, unit) = self.parts();
        write!(f, "{}{}", n, unit)
    }
}

/// Errors that can occur while parsing a [`Size`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SizeParseError {
    /// The numeric part is missing or not a number
    #[error("invalid size value '{0}'")]
    InvalidValue(String),
    /// The unit suffix is not one of B, K, M or G
    #[error("invalid size unit '{0}', expected one of B, K, M, G")]
    InvalidUnit(char),
    /// The size does not fit the address space
    #[error("size '{0}' is too large")]
    TooLarge(String),
}

/// Parses `<number>[B|K|M|G]`, case-insensitive. A bare number is megabytes.
impl FromStr for Size {
    type Err = SizeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (value, unit) = match s.chars().last() {
            Some(c) if c.is_ascii_alphabetic() => (&s[..s.len() - 1], Some(c)),
            _ => (s, None),
        };
        let value: usize = value
            .parse()
            .map_err(|_| SizeParseError::InvalidValue(s.to_string()))?;
        let size = match unit.map(|c| c.to_ascii_uppercase()) {
            Some('B') => Size::B(value),
            Some('K') => Size::KB(value),
            None | Some('M') => Size::MB(value),
            Some('G') => Size::GB(value),
            Some(_) => return Err(SizeParseError::InvalidUnit(unit.unwrap_or_default())),
        };
        match size.checked_bytes() {
            Some(_) => Ok(size),
            None => Err(SizeParseError::TooLarge(s.to_string())),
        }
    }
}
