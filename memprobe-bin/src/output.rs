//! Terminal output shared with the progress spinners.

use indicatif::MultiProgress;
use memprobe_core::diagnostic::{DiagnosticSink, Mismatch};

/// Hides the spinners of a [`MultiProgress`] while a failure line is written.
///
/// Lines reach `inner` unchanged, so they keep their literal `FAILURE: ...` form.
pub struct SuspendingSink<S> {
    multi: MultiProgress,
    inner: S,
}

impl<S: DiagnosticSink> SuspendingSink<S> {
    /// Wraps `inner`, suspending `multi` around every line.
    pub fn new(multi: MultiProgress, inner: S) -> Self {
        SuspendingSink { multi, inner }
    }

    /// Consumes the wrapper and returns the inner sink.
    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: DiagnosticSink> DiagnosticSink for SuspendingSink<S> {
    fn report(&mut self, mismatch: &Mismatch) {
        let inner = &mut self.inner;
        self.multi.suspend(|| inner.report(mismatch));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indicatif::{ProgressBar, ProgressDrawTarget};
    use memprobe_core::diagnostic::WriteSink;
    use memprobe_core::memory::AddressingContext;

    #[test]
    fn test_failure_lines_stay_literal() {
        let multi = MultiProgress::with_draw_target(ProgressDrawTarget::hidden());
        let spinner = multi.add(ProgressBar::new_spinner());
        let mut sink = SuspendingSink::new(multi, WriteSink::new(Vec::new()));
        sink.report(&Mismatch::value(2, 0x10, 0x11, &AddressingContext::Offset));
        sink.report(&Mismatch::bad_address_line(0, 0, 1, &AddressingContext::Offset));
        spinner.finish_and_clear();

        let out = String::from_utf8(sink.into_inner().into_inner()).unwrap();
        let value_line = format!(
            "FAILURE: 0x00000010 != 0x00000011 at offset 0x{:08x}.",
            2 * std::mem::size_of::<usize>()
        );
        let expected = format!(
            "{}\nFAILURE: possible bad address line at offset 0x00000000.\n",
            value_line
        );
        assert_eq!(out, expected);
    }
}
