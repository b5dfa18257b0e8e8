//! The `memory` module provides the hardware access abstractions the tests run on.
//!
//! The `memory` module provides the following abstractions:
//! - `Word`: The native machine word, unit of every read, write and comparison.
//! - `VolatileMemory`: A trait for indexed, volatile word access to a bounded region.
//! - `WordBuffer`: A `VolatileMemory` over a borrowed slice of words.
//! - `BufferPair`: Two regions of identical length used by comparing tests.
//! - `AddressingContext`: Selects offset or physical address reporting.
//! - `LinuxPageMap`: A struct that provides a mapping from virtual to physical addresses.
//! - `VirtToPhysResolver`: A trait for resolving the physical address of a provided virtual address.
mod addressing;
#[cfg(test)]
pub(crate) mod faulty;
mod virt_to_phys;

pub use self::addressing::{AddressingContext, Location};
pub use self::virt_to_phys::{LinuxPageMap, LinuxPageMapError, PhysAddr, VirtToPhysResolver};

use crate::util::CL_SIZE;
use std::fmt::Debug;
use std::sync::atomic::{Ordering, fence};
use thiserror::Error;

/// Native machine word.
///
/// `usize` is pointer sized on every Rust target, so the address of a cell always
/// fits a `Word` without truncation.
pub type Word = usize;

/// Errors raised when validating buffers handed to the tests.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BufferError {
    /// The two buffers of a pair have different lengths
    #[error("buffer length mismatch: a has {a} words, b has {b} words")]
    LengthMismatch {
        /// Length of buffer `a` in words
        a: usize,
        /// Length of buffer `b` in words
        b: usize,
    },
    /// The buffer holds no words
    #[error("buffer is empty")]
    Empty,
}

/// Trait for indexed word access to a memory region.
///
/// Implementations must not cache or elide accesses: every [`read`](VolatileMemory::read)
/// observes the current state of the storage and every [`write`](VolatileMemory::write)
/// reaches it. Indices `0..len()` must address valid storage.
#[allow(clippy::len_without_is_empty)]
pub trait VolatileMemory {
    /// Returns the number of words in the region.
    fn len(&self) -> usize;

    /// Returns a pointer to the word at `index`.
    fn addr(&self, index: usize) -> *const Word;

    /// Reads the word at `index` from storage.
    fn read(&self, index: usize) -> Word;

    /// Writes `value` to the word at `index`.
    fn write(&mut self, index: usize, value: Word);

    /// Makes all previous writes visible to subsequent reads from storage.
    fn sync(&self) {
        fence(Ordering::SeqCst);
    }

    /// Returns the numeric address of the word at `index` as a [`Word`].
    fn address_of(&self, index: usize) -> Word {
        self.addr(index).addr()
    }
}

impl<M: VolatileMemory + ?Sized> VolatileMemory for &mut M {
    fn len(&self) -> usize {
        (**self).len()
    }
    fn addr(&self, index: usize) -> *const Word {
        (**self).addr(index)
    }
    fn read(&self, index: usize) -> Word {
        (**self).read(index)
    }
    fn write(&mut self, index: usize, value: Word) {
        (**self).write(index, value)
    }
    fn sync(&self) {
        (**self).sync()
    }
    fn address_of(&self, index: usize) -> Word {
        (**self).address_of(index)
    }
}

/// Volatile view on a borrowed slice of words.
///
/// The exclusive borrow guarantees nothing else touches the words while a test runs.
pub struct WordBuffer<'a> {
    words: &'a mut [Word],
}

impl<'a> WordBuffer<'a> {
    /// Creates a new buffer view over `words`.
    pub fn new(words: &'a mut [Word]) -> Self {
        WordBuffer { words }
    }

    /// Splits the buffer into two halves of equal length.
    ///
    /// A trailing word of an odd-length buffer belongs to neither half.
    ///
    /// # Errors
    ///
    /// Returns [`BufferError::Empty`] if the halves would hold no words.
    pub fn split_halves(self) -> Result<BufferPair<WordBuffer<'a>, WordBuffer<'a>>, BufferError> {
        let words = self.words;
        let half = words.len() / 2;
        let (a, rest) = words.split_at_mut(half);
        let (b, _) = rest.split_at_mut(half);
        BufferPair::new(WordBuffer::new(a), WordBuffer::new(b))
    }

    /// Returns the underlying words.
    pub fn as_slice(&self) -> &[Word] {
        self.words
    }
}

impl Debug for WordBuffer<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WordBuffer")
            .field("ptr", &self.words.as_ptr())
            .field("len", &self.words.len())
            .finish()
    }
}

impl VolatileMemory for WordBuffer<'_> {
    fn len(&self) -> usize {
        self.words.len()
    }

    fn addr(&self, index: usize) -> *const Word {
        &self.words[index]
    }

    fn read(&self, index: usize) -> Word {
        let cell: *const Word = &self.words[index];
        unsafe { std::ptr::read_volatile(cell) }
    }

    fn write(&mut self, index: usize, value: Word) {
        let cell: *mut Word = &mut self.words[index];
        unsafe { std::ptr::write_volatile(cell, value) }
    }

    #[cfg(target_arch = "x86_64")]
    fn sync(&self) {
        use std::arch::x86_64::{_mm_clflush, _mm_mfence};

        let base = self.words.as_ptr() as *const u8;
        let len = std::mem::size_of_val(self.words);
        unsafe {
            _mm_mfence();
            for line in cache_lines(base.addr(), len) {
                _mm_clflush(base.with_addr(line));
            }
            _mm_mfence();
        }
    }
}

/// Start addresses of all cache lines overlapping `base..base + len`.
#[cfg_attr(not(target_arch = "x86_64"), allow(dead_code))]
fn cache_lines(base: usize, len: usize) -> impl Iterator<Item = usize> {
    let end = base + len;
    (base & !(CL_SIZE - 1)..end).step_by(CL_SIZE)
}

/// Two regions of identical length.
///
/// Used by tests that write the same data to two places and compare them afterwards.
#[derive(Debug)]
pub struct BufferPair<A, B> {
    a: A,
    b: B,
}

impl<A: VolatileMemory, B: VolatileMemory> BufferPair<A, B> {
    /// Creates a new buffer pair.
    ///
    /// # Errors
    ///
    /// Returns an error if the lengths of `a` and `b` differ or the buffers are empty.
    pub fn new(a: A, b: B) -> Result<Self, BufferError> {
        if a.len() != b.len() {
            return Err(BufferError::LengthMismatch {
                a: a.len(),
                b: b.len(),
            });
        }
        if a.len() == 0 {
            return Err(BufferError::Empty);
        }
        Ok(BufferPair { a, b })
    }

    /// Returns the number of words in each buffer.
    pub fn count(&self) -> usize {
        self.a.len()
    }

    /// Returns the first buffer.
    pub fn a(&self) -> &A {
        &self.a
    }

    /// Returns the second buffer.
    pub fn b(&self) -> &B {
        &self.b
    }

    /// Returns both buffers for writing.
    pub fn parts_mut(&mut self) -> (&mut A, &mut B) {
        (&mut self.a, &mut self.b)
    }

    /// Consumes the pair and returns both buffers.
    pub fn into_parts(self) -> (A, B) {
        (self.a, self.b)
    }
}
