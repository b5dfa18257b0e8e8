use crate::TestKind;
use crate::TestResult;
use crate::diagnostic::{DiagnosticSink, Mismatch};
use crate::memory::{AddressingContext, VolatileMemory, Word};
use crate::progress::{Phase, Progress};
use crate::util::STUCK_ADDRESS_ITERATIONS;
use log::{debug, trace};

/// Expected content of a cell: its own address, complemented on every other cell and
/// iteration.
fn address_pattern(addr: Word, index: usize, iteration: usize) -> Word {
    if (iteration + index) % 2 == 0 {
        addr
    } else {
        !addr
    }
}

/// Tests `buffer` for stuck address lines.
///
/// Each of the 16 iterations writes every word with its own address (or the complement
/// of it, alternating by index and iteration) and reads everything back. A cell that
/// is reached through a faulty address line aliases another cell and therefore holds a
/// value derived from the wrong address.
///
/// The test stops at the first mismatch: after an address line fault all following
/// comparisons are corrupted and carry no further information. The single mismatch is
/// reported as "possible bad address line" and [`TestResult::Fail`] is returned.
///
/// # Arguments
///
/// * `buffer` - The region to test, overwritten by the test
/// * `ctx` - Selects offset or physical address reporting
/// * `sink` - Receives the mismatch, if any
/// * `progress` - Receives `setting`/`testing` phase events per iteration
pub fn test_stuck_address<M, S, P>(
    buffer: &mut M,
    ctx: &AddressingContext,
    sink: &mut S,
    progress: &mut P,
) -> TestResult
where
    M: VolatileMemory + ?Sized,
    S: DiagnosticSink + ?Sized,
    P: Progress + ?Sized,
{
    let count = buffer.len();
    progress.start(TestKind::StuckAddress);
    for j in 0..STUCK_ADDRESS_ITERATIONS {
        debug!("stuck address iteration {}/{}", j + 1, STUCK_ADDRESS_ITERATIONS);
        progress.phase(Phase::Setting, j);
        for i in 0..count {
            let pattern = address_pattern(buffer.address_of(i), i, j);
            buffer.write(i, pattern);
        }
        buffer.sync();

        progress.phase(Phase::Testing, j);
        for i in 0..count {
            let expected = address_pattern(buffer.address_of(i), i, j);
            let observed = buffer.read(i);
            if observed != expected {
                trace!(
                    "word {} expected 0x{:x}, observed 0x{:x}",
                    i, expected, observed
                );
                sink.report(&Mismatch::bad_address_line(i, expected, observed, ctx));
                progress.abort();
                return TestResult::Fail;
            }
        }
    }
    progress.finish();
    TestResult::Pass
}
