//! Diagnostic records and the sinks they are streamed to.
//!
//! Every failing word produces one [`Mismatch`]. Its [`Display`](std::fmt::Display)
//! implementation renders the classic memtester failure line, e.g.
//!
//! ```text
//! FAILURE: 0x00000000deadbeef != 0x00000000deadbeee at offset 0x00000050.
//! FAILURE: possible bad address line at physical address 0x1a2b3c40.
//! ```
//!
//! Log consumers match these lines literally, so the format is fixed.

use crate::memory::{AddressingContext, Location, Word};
use crate::util::WORD_SIZE;
use log::warn;
use serde::Serialize;
use std::fmt;
use std::io::{Stderr, Write};

/// Kind of a detected mismatch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum MismatchKind {
    /// Two words that were written with the same value differ
    Value,
    /// An address-derived pattern did not read back, pointing at a faulty address line
    BadAddressLine,
}

/// A single word that did not read back as expected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Mismatch {
    /// What kind of fault this mismatch indicates
    pub kind: MismatchKind,
    /// Word index in the tested buffer
    pub index: usize,
    /// The value that should have been read
    pub expected: Word,
    /// The value that was read
    pub observed: Word,
    /// The reported location of the word
    pub location: Location,
}

impl Mismatch {
    /// Creates a value mismatch between two buffers at `index`.
    pub fn value(index: usize, expected: Word, observed: Word, ctx: &AddressingContext) -> Self {
        Mismatch {
            kind: MismatchKind::Value,
            index,
            expected,
            observed,
            location: ctx.locate(index),
        }
    }

    /// Creates an address line mismatch at `index`.
    pub fn bad_address_line(
        index: usize,
        expected: Word,
        observed: Word,
        ctx: &AddressingContext,
    ) -> Self {
        Mismatch {
            kind: MismatchKind::BadAddressLine,
            index,
            expected,
            observed,
            location: ctx.locate(index),
        }
    }

    /// Byte offset of the word from the start of the buffer.
    pub fn offset(&self) -> usize {
        self.index * WORD_SIZE
    }

    /// Bits that differ between the expected and the observed value.
    pub fn bitmask(&self) -> Word {
        self.expected ^ self.observed
    }
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            MismatchKind::Value => write!(
                f,
                "FAILURE: 0x{:08x} != 0x{:08x} at {}.",
                self.expected, self.observed, self.location
            ),
            MismatchKind::BadAddressLine => {
                write!(f, "FAILURE: possible bad address line at {}.", self.location)
            }
        }
    }
}

/// Receiver of the mismatches found by a test.
///
/// Mismatches are streamed while a test runs, in ascending index order.
pub trait DiagnosticSink {
    /// Records one mismatch.
    fn report(&mut self, mismatch: &Mismatch);
}

impl DiagnosticSink for Vec<Mismatch> {
    fn report(&mut self, mismatch: &Mismatch) {
        self.push(*mismatch);
    }
}

impl<S: DiagnosticSink + ?Sized> DiagnosticSink for &mut S {
    fn report(&mut self, mismatch: &Mismatch) {
        (**self).report(mismatch);
    }
}

/// Forwards every mismatch to both sinks.
impl<A: DiagnosticSink, B: DiagnosticSink> DiagnosticSink for (A, B) {
    fn report(&mut self, mismatch: &Mismatch) {
        self.0.report(mismatch);
        self.1.report(mismatch);
    }
}

/// Writes one failure line per mismatch to a writer.
///
/// A write error is logged once; later lines are dropped.
pub struct WriteSink<W: Write> {
    writer: W,
    broken: bool,
}

/// Writes failure lines to standard error.
pub type StderrSink = WriteSink<Stderr>;

impl<W: Write> WriteSink<W> {
    /// Creates a new sink writing to `writer`.
    pub fn new(writer: W) -> Self {
        WriteSink {
            writer,
            broken: false,
        }
    }

    /// Consumes the sink and returns the writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl Default for WriteSink<Stderr> {
    fn default() -> Self {
        WriteSink::new(std::io::stderr())
    }
}

impl<W: Write> DiagnosticSink for WriteSink<W> {
    fn report(&mut self, mismatch: &Mismatch) {
        if self.broken {
            return;
        }
        let res = writeln!(self.writer, "{}", mismatch).and_then(|_| self.writer.flush());
        if let Err(e) = res {
            warn!("Failed to write diagnostic line, dropping further output: {}", e);
            self.broken = true;
        }
    }
}
