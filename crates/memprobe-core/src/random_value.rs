use crate::diagnostic::DiagnosticSink;
use crate::memory::{AddressingContext, BufferPair, VolatileMemory, Word};
use crate::progress::Progress;
use crate::{TestConfig, TestKind, TestResult, compare_regions};
use log::debug;
use rand::Rng;

/// Fills both buffers of `pair` with the same random stream and compares them.
///
/// Word `i` of both buffers receives the same value drawn from `rng`, so the buffers
/// are identical right after the fill. Any mismatch found by the following
/// [`compare_regions`] therefore means the storage changed between write and read.
///
/// `progress` ticks every `config.progress_often` words, starting with word 0.
pub fn test_random_value<A, B, R, S, P>(
    pair: &mut BufferPair<A, B>,
    ctx: &AddressingContext,
    rng: &mut R,
    sink: &mut S,
    progress: &mut P,
    config: &TestConfig,
) -> TestResult
where
    A: VolatileMemory,
    B: VolatileMemory,
    R: Rng + ?Sized,
    S: DiagnosticSink + ?Sized,
    P: Progress + ?Sized,
{
    let count = pair.count();
    progress.start(TestKind::RandomValue);
    let (a, b) = pair.parts_mut();
    for i in 0..count {
        let value = Word::from_ne_bytes(rng.random());
        a.write(i, value);
        b.write(i, value);
        if i.is_multiple_of(config.progress_often) {
            progress.tick();
        }
    }
    a.sync();
    b.sync();
    progress.finish();
    debug!("random fill of {} words done, comparing", count);

    compare_regions(pair, ctx, sink)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostic::{Mismatch, MismatchKind};
    use crate::memory::WordBuffer;
    use crate::memory::faulty::{Fault, FaultyMemory};
    use crate::progress::NoProgress;
    use crate::util::Rng as SeededRng;

    #[derive(Default)]
    struct CountTicks {
        ticks: usize,
        finished: bool,
    }

    impl Progress for CountTicks {
        fn tick(&mut self) {
            self.ticks += 1;
        }
        fn finish(&mut self) {
            self.finished = true;
        }
    }

    #[test]
    fn test_consistent_memory_passes() {
        let mut words = vec![0 as Word; 2048];
        let mut pair = WordBuffer::new(&mut words).split_halves().unwrap();
        let mut sink: Vec<Mismatch> = vec![];
        let result = test_random_value(
            &mut pair,
            &AddressingContext::Offset,
            &mut SeededRng::from_seed(1),
            &mut sink,
            &mut NoProgress,
            &TestConfig::default(),
        );
        assert_eq!(result, TestResult::Pass);
        assert!(sink.is_empty());
        assert_eq!(pair.a().as_slice(), pair.b().as_slice());
    }

    #[test]
    fn test_fill_is_reproducible() {
        let mut first = vec![0 as Word; 64];
        let mut second = vec![0 as Word; 64];
        for words in [&mut first, &mut second] {
            let mut pair = WordBuffer::new(words).split_halves().unwrap();
            test_random_value(
                &mut pair,
                &AddressingContext::Offset,
                &mut SeededRng::from_seed(0x1234),
                &mut Vec::<Mismatch>::new(),
                &mut NoProgress,
                &TestConfig::default(),
            );
        }
        assert_eq!(first, second);
        assert!(first.iter().any(|&w| w != 0));
    }

    #[test]
    fn test_fill_draws_one_native_word_per_index() {
        let mut words = vec![0 as Word; 8];
        let mut pair = WordBuffer::new(&mut words).split_halves().unwrap();
        test_random_value(
            &mut pair,
            &AddressingContext::Offset,
            &mut SeededRng::from_seed(5),
            &mut Vec::<Mismatch>::new(),
            &mut NoProgress,
            &TestConfig::default(),
        );
        let mut rng = SeededRng::from_seed(5);
        let expected: Vec<Word> = (0..4)
            .map(|_| Word::from_ne_bytes(rng.random()))
            .collect();
        assert_eq!(pair.a().as_slice(), expected.as_slice());
        assert_eq!(pair.b().as_slice(), expected.as_slice());
    }

    #[test]
    fn test_progress_ticks() {
        let mut a = vec![0 as Word; 5001];
        let mut b = vec![0 as Word; 5001];
        let mut pair = BufferPair::new(WordBuffer::new(&mut a), WordBuffer::new(&mut b)).unwrap();
        let mut progress = CountTicks::default();
        test_random_value(
            &mut pair,
            &AddressingContext::Offset,
            &mut SeededRng::from_seed(3),
            &mut Vec::<Mismatch>::new(),
            &mut progress,
            &TestConfig::default(),
        );
        assert_eq!(progress.ticks, 3);
        assert!(progress.finished);
    }

    #[test]
    fn test_corrupted_read_fails() {
        let mut words = vec![0 as Word; 32];
        let a = WordBuffer::new(&mut words);
        let b = FaultyMemory::new(32, Fault::FlipOnRead { index: 7, mask: 0x10 });
        let mut pair = BufferPair::new(a, b).unwrap();
        let mut sink: Vec<Mismatch> = vec![];
        let result = test_random_value(
            &mut pair,
            &AddressingContext::Offset,
            &mut SeededRng::from_seed(9),
            &mut sink,
            &mut NoProgress,
            &TestConfig::default(),
        );
        assert_eq!(result, TestResult::Fail);
        assert_eq!(sink.len(), 1);
        assert_eq!(sink[0].kind, MismatchKind::Value);
        assert_eq!(sink[0].index, 7);
        assert_eq!(sink[0].expected, pair.a().as_slice()[7]);
        assert_eq!(sink[0].bitmask(), 0x10);
    }
}
