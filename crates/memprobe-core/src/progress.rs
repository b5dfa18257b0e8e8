//! Liveness feedback for long running tests.
//!
//! Tests report their progress through the [`Progress`] trait. Reporting is purely
//! cosmetic and never influences a test result. Three reporters are provided:
//!
//! - [`NoProgress`] - Discards everything, for non-interactive callers.
//! - [`TerminalProgress`] - Overwrites a short indicator in place using backspaces,
//!   exactly as the classic memtester output looks.
//! - [`SpinnerProgress`] - Renders an [`indicatif`] spinner, suitable for use together
//!   with a [`MultiProgress`] log bridge.

use crate::TestKind;
use crate::util::{NamedProgress, SPINNER_SYMBOLS};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use log::warn;
use std::fmt;
use std::io::{Stdout, Write};

/// Pass of a stuck address iteration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// Patterns are written
    Setting,
    /// Patterns are read back and verified
    Testing,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Setting => write!(f, "setting"),
            Phase::Testing => write!(f, "testing"),
        }
    }
}

/// Receiver of progress events.
///
/// A test calls [`start`](Progress::start) once, then any number of
/// [`phase`](Progress::phase) or [`tick`](Progress::tick) events, and ends with either
/// [`finish`](Progress::finish) or [`abort`](Progress::abort).
pub trait Progress {
    /// A test starts.
    fn start(&mut self, _test: TestKind) {}

    /// An iteration enters a new phase.
    fn phase(&mut self, _phase: Phase, _iteration: usize) {}

    /// Some work was done.
    fn tick(&mut self) {}

    /// The test completed its scan.
    fn finish(&mut self) {}

    /// The test stopped early.
    fn abort(&mut self) {}
}

impl<P: Progress + ?Sized> Progress for &mut P {
    fn start(&mut self, test: TestKind) {
        (**self).start(test)
    }
    fn phase(&mut self, phase: Phase, iteration: usize) {
        (**self).phase(phase, iteration)
    }
    fn tick(&mut self) {
        (**self).tick()
    }
    fn finish(&mut self) {
        (**self).finish()
    }
    fn abort(&mut self) {
        (**self).abort()
    }
}

/// Discards all progress events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoProgress;

impl Progress for NoProgress {}

const INDICATOR_WIDTH: usize = 11;
const BACKSPACES: &str = "\x08\x08\x08\x08\x08\x08\x08\x08\x08\x08\x08";
const BLANKS: &str = "           ";

/// Draws the progress indicator in place on a terminal.
///
/// The stuck address test shows `setting NNN` / `testing NNN`, the random value test a
/// rotating `-\|/` symbol. The indicator is erased when the test finishes. A write
/// error is logged once and disables further output.
pub struct TerminalProgress<W: Write> {
    writer: W,
    test: Option<TestKind>,
    spin: usize,
    broken: bool,
}

impl<W: Write> TerminalProgress<W> {
    /// Creates a new reporter drawing to `writer`.
    pub fn new(writer: W) -> Self {
        TerminalProgress {
            writer,
            test: None,
            spin: 0,
            broken: false,
        }
    }

    /// Consumes the reporter and returns the writer.
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn emit(&mut self, s: &str) {
        if self.broken {
            return;
        }
        let res = self
            .writer
            .write_all(s.as_bytes())
            .and_then(|_| self.writer.flush());
        if let Err(e) = res {
            warn!("Failed to write progress, disabling indicator: {}", e);
            self.broken = true;
        }
    }
}

impl Default for TerminalProgress<Stdout> {
    fn default() -> Self {
        TerminalProgress::new(std::io::stdout())
    }
}

impl<W: Write> Progress for TerminalProgress<W> {
    fn start(&mut self, test: TestKind) {
        self.test = Some(test);
        self.spin = 0;
        match test {
            TestKind::StuckAddress => self.emit(BLANKS),
            TestKind::RandomValue => self.emit(" "),
        }
    }

    fn phase(&mut self, phase: Phase, iteration: usize) {
        let indicator = format!("{}{} {:3}", BACKSPACES, phase, iteration);
        debug_assert_eq!(indicator.len(), 2 * INDICATOR_WIDTH);
        self.emit(&indicator);
    }

    fn tick(&mut self) {
        self.spin += 1;
        let symbol = SPINNER_SYMBOLS[self.spin % 4];
        self.emit(&format!("\x08{}", symbol));
    }

    fn finish(&mut self) {
        match self.test.take() {
            Some(TestKind::StuckAddress) => {
                self.emit(&format!("{}{}{}", BACKSPACES, BLANKS, BACKSPACES))
            }
            Some(TestKind::RandomValue) => self.emit("\x08 \x08"),
            None => {}
        }
    }

    fn abort(&mut self) {
        self.test = None;
        self.emit("Skipping to next test...\n");
    }
}

/// Renders progress as an [`indicatif`] spinner.
///
/// Each test gets a fresh spinner labelled with the test name. If a [`MultiProgress`]
/// is given, spinners are attached to it so log output does not tear them.
pub struct SpinnerProgress {
    multi: Option<MultiProgress>,
    bar: Option<ProgressBar>,
}

impl SpinnerProgress {
    /// Creates a new spinner reporter.
    pub fn new(multi: Option<MultiProgress>) -> Self {
        SpinnerProgress { multi, bar: None }
    }
}

impl Progress for SpinnerProgress {
    fn start(&mut self, test: TestKind) {
        let bar = ProgressBar::new_spinner().with_style(ProgressStyle::named_spinner(test.name()));
        let bar = match &self.multi {
            Some(multi) => multi.add(bar),
            None => bar,
        };
        self.bar = Some(bar);
    }

    fn phase(&mut self, phase: Phase, iteration: usize) {
        if let Some(bar) = &self.bar {
            bar.set_message(format!("{} {:3}", phase, iteration));
        }
    }

    fn tick(&mut self) {
        if let Some(bar) = &self.bar {
            bar.tick();
        }
    }

    fn finish(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
    }

    fn abort(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.abandon_with_message("Skipping to next test...");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rendered(progress: TerminalProgress<Vec<u8>>) -> String {
        String::from_utf8(progress.into_inner()).unwrap()
    }

    #[test]
    fn test_random_value_indicator() {
        let mut progress = TerminalProgress::new(Vec::new());
        progress.start(TestKind::RandomValue);
        progress.tick();
        progress.tick();
        progress.finish();
        assert_eq!(rendered(progress), " \x08\\\x08|\x08 \x08");
    }

    #[test]
    fn test_spinner_wraps_around() {
        let mut progress = TerminalProgress::new(Vec::new());
        progress.start(TestKind::RandomValue);
        for _ in 0..4 {
            progress.tick();
        }
        let out = rendered(progress);
        assert_eq!(out, " \x08\\\x08|\x08/\x08-");
    }

    #[test]
    fn test_stuck_address_indicator() {
        let mut progress = TerminalProgress::new(Vec::new());
        progress.start(TestKind::StuckAddress);
        progress.phase(Phase::Setting, 0);
        progress.phase(Phase::Testing, 0);
        progress.finish();
        let expected = format!(
            "{BLANKS}{BACKSPACES}setting   0{BACKSPACES}testing   0{BACKSPACES}{BLANKS}{BACKSPACES}"
        );
        assert_eq!(rendered(progress), expected);
    }

    #[test]
    fn test_abort_message() {
        let mut progress = TerminalProgress::new(Vec::new());
        progress.start(TestKind::StuckAddress);
        progress.abort();
        progress.finish();
        assert!(rendered(progress).ends_with("Skipping to next test...\n"));
    }

    #[test]
    fn test_spinner_without_terminal() {
        let mut progress = SpinnerProgress::new(None);
        progress.start(TestKind::StuckAddress);
        progress.phase(Phase::Setting, 15);
        progress.tick();
        progress.finish();
        progress.abort();
    }
}
