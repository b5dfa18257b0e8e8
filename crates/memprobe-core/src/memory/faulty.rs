//! Fault injecting memory used by the unit tests.

use super::{VolatileMemory, Word};

/// A simulated hardware fault.
#[derive(Clone, Copy, Debug)]
pub enum Fault {
    /// The word at `index` always reads back `value`
    StuckAt { index: usize, value: Word },
    /// Reads of the word at `index` come back with the bits in `mask` flipped
    FlipOnRead { index: usize, mask: Word },
    /// Writes to `index` land on `alias` instead
    Alias { index: usize, alias: usize },
}

/// Heap backed memory that misbehaves according to a [`Fault`].
pub struct FaultyMemory {
    words: Vec<Word>,
    pub fault: Fault,
}

impl FaultyMemory {
    pub fn new(len: usize, fault: Fault) -> Self {
        FaultyMemory {
            words: vec![0; len],
            fault,
        }
    }

    pub fn words(&self) -> &[Word] {
        &self.words
    }
}

impl VolatileMemory for FaultyMemory {
    fn len(&self) -> usize {
        self.words.len()
    }

    fn addr(&self, index: usize) -> *const Word {
        &self.words[index]
    }

    fn read(&self, index: usize) -> Word {
        match self.fault {
            Fault::StuckAt { index: i, value } if i == index => value,
            Fault::FlipOnRead { index: i, mask } if i == index => self.words[index] ^ mask,
            _ => self.words[index],
        }
    }

    fn write(&mut self, index: usize, value: Word) {
        match self.fault {
            Fault::Alias { index: i, alias } if i == index => self.words[alias] = value,
            _ => self.words[index] = value,
        }
    }
}
