use super::PhysAddr;
use crate::util::WORD_SIZE;
use serde::Serialize;
use std::fmt;

/// Selects how the location of a failing word is reported.
///
/// The engine never resolves physical addresses itself. Callers that know the
/// physical address of the first word pass it in as `base`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub enum AddressingContext {
    /// Report byte offsets relative to the start of the buffer
    #[default]
    Offset,
    /// Report physical addresses relative to `base`
    Physical {
        /// Physical address of word 0
        base: PhysAddr,
    },
}

impl AddressingContext {
    /// Creates a context reporting physical addresses starting at `base`.
    pub fn physical(base: PhysAddr) -> Self {
        AddressingContext::Physical { base }
    }

    /// Returns true if physical addresses are reported.
    pub fn is_physical(&self) -> bool {
        matches!(self, AddressingContext::Physical { .. })
    }

    /// Translates a word index into the location that is reported for it.
    pub fn locate(&self, index: usize) -> Location {
        let offset = index * WORD_SIZE;
        match self {
            AddressingContext::Offset => Location::Offset(offset),
            AddressingContext::Physical { base } => Location::Physical(*base + offset),
        }
    }
}

/// Reported location of a word.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Location {
    /// Byte offset from the start of the buffer
    Offset(usize),
    /// Physical address
    Physical(PhysAddr),
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Offset(offset) => write!(f, "offset 0x{:08x}", offset),
            Location::Physical(addr) => write!(f, "physical address 0x{:08x}", addr.as_usize()),
        }
    }
}
