use crate::TestResult;
use crate::diagnostic::{DiagnosticSink, Mismatch};
use crate::memory::{AddressingContext, BufferPair, VolatileMemory};
use log::debug;

/// Compares both buffers of `pair` word by word.
///
/// Every differing word is reported to `sink` as it is found, in ascending index order.
/// The scan always covers the whole pair, also after the first mismatch. Neither buffer
/// is modified.
///
/// Returns [`TestResult::Fail`] if at least one word differs.
pub fn compare_regions<A, B, S>(
    pair: &BufferPair<A, B>,
    ctx: &AddressingContext,
    sink: &mut S,
) -> TestResult
where
    A: VolatileMemory,
    B: VolatileMemory,
    S: DiagnosticSink + ?Sized,
{
    let (a, b) = (pair.a(), pair.b());
    let mut failures = 0usize;
    for i in 0..pair.count() {
        let (expected, observed) = (a.read(i), b.read(i));
        if expected != observed {
            sink.report(&Mismatch::value(i, expected, observed, ctx));
            failures += 1;
        }
    }
    if failures == 0 {
        return TestResult::Pass;
    }
    debug!("{} of {} words differ", failures, pair.count());
    TestResult::Fail
}
