use crate::diagnostic::DiagnosticSink;
use crate::memory::{AddressingContext, BufferError, Word, WordBuffer};
use crate::progress::Progress;
use crate::util::PROGRESS_OFTEN;
use crate::{test_random_value, test_stuck_address};
use log::info;
use rand::Rng;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Outcome of a single test run.
///
/// `Fail` implies that at least one mismatch was reported to the diagnostic sink.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum TestResult {
    /// Every word read back as expected
    Pass,
    /// At least one word did not read back as expected
    Fail,
}

impl TestResult {
    /// Returns true for [`TestResult::Pass`].
    pub fn is_pass(&self) -> bool {
        matches!(self, TestResult::Pass)
    }

    /// Returns true for [`TestResult::Fail`].
    pub fn is_fail(&self) -> bool {
        !self.is_pass()
    }
}

impl fmt::Display for TestResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TestResult::Pass => write!(f, "ok"),
            TestResult::Fail => write!(f, "FAILURE"),
        }
    }
}

/// Tunables shared by all tests.
#[derive(Clone, Debug, Serialize)]
pub struct TestConfig {
    /// Number of words written between two progress ticks of the random value test
    pub progress_often: usize,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            progress_often: PROGRESS_OFTEN,
        }
    }
}

/// The available memory tests.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TestKind {
    /// Address-derived patterns, see [`test_stuck_address`]
    StuckAddress,
    /// Identical random streams in two halves, see [`test_random_value`]
    RandomValue,
}

/// Error returned when parsing an unknown test identifier.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown test '{0}', expected one of: stuck-address, random-value")]
pub struct TestKindParseError(String);

impl TestKind {
    /// All tests in the order they are run.
    pub const ALL: [TestKind; 2] = [TestKind::StuckAddress, TestKind::RandomValue];

    /// Human readable test name.
    pub fn name(&self) -> &'static str {
        match self {
            TestKind::StuckAddress => "Stuck Address",
            TestKind::RandomValue => "Random Value",
        }
    }

    /// Identifier used on the command line and in reports.
    pub fn id(&self) -> &'static str {
        match self {
            TestKind::StuckAddress => "stuck-address",
            TestKind::RandomValue => "random-value",
        }
    }

    /// Runs this test over a whole word region.
    ///
    /// The stuck address test covers all of `words`. The random value test splits
    /// `words` into two equal halves and compares them.
    ///
    /// # Errors
    ///
    /// Returns [`BufferError::Empty`] if the region is too small for the test.
    pub fn run<R, S, P>(
        &self,
        words: &mut [Word],
        ctx: &AddressingContext,
        rng: &mut R,
        sink: &mut S,
        progress: &mut P,
        config: &TestConfig,
    ) -> Result<TestResult, BufferError>
    where
        R: Rng + ?Sized,
        S: DiagnosticSink + ?Sized,
        P: Progress + ?Sized,
    {
        info!("Running {} test over {} words", self.name(), words.len());
        let result = match self {
            TestKind::StuckAddress => {
                if words.is_empty() {
                    return Err(BufferError::Empty);
                }
                test_stuck_address(&mut WordBuffer::new(words), ctx, sink, progress)
            }
            TestKind::RandomValue => {
                let mut pair = WordBuffer::new(words).split_halves()?;
                test_random_value(&mut pair, ctx, rng, sink, progress, config)
            }
        };
        info!("{} test finished: {}", self.name(), result);
        Ok(result)
    }
}

impl fmt::Display for TestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TestKind {
    type Err = TestKindParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TestKind::ALL
            .into_iter()
            .find(|kind| kind.id().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| TestKindParseError(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostic::Mismatch;
    use crate::progress::NoProgress;
    use crate::util::Rng;

    #[test]
    fn test_kind_parse() {
        assert_eq!("stuck-address".parse(), Ok(TestKind::StuckAddress));
        assert_eq!("Random-Value".parse(), Ok(TestKind::RandomValue));
        assert!("walking-ones".parse::<TestKind>().is_err());
    }

    #[test]
    fn test_kind_names() {
        for kind in TestKind::ALL {
            assert_eq!(kind.id().parse(), Ok(kind));
            assert_eq!(kind.to_string(), kind.name());
        }
    }

    #[test]
    fn test_result_display() {
        assert_eq!(TestResult::Pass.to_string(), "ok");
        assert_eq!(TestResult::Fail.to_string(), "FAILURE");
        assert!(TestResult::Fail.is_fail());
    }

    #[test]
    fn test_run_all_on_consistent_memory() {
        let mut words = vec![0 as Word; 1024];
        let mut rng = Rng::from_seed(7);
        let mut sink: Vec<Mismatch> = vec![];
        for kind in TestKind::ALL {
            let result = kind
                .run(
                    &mut words,
                    &AddressingContext::Offset,
                    &mut rng,
                    &mut sink,
                    &mut NoProgress,
                    &TestConfig::default(),
                )
                .unwrap();
            assert_eq!(result, TestResult::Pass);
        }
        assert!(sink.is_empty());
    }

    #[test]
    fn test_run_rejects_empty() {
        let mut words: Vec<Word> = vec![];
        let mut rng = Rng::from_seed(7);
        for kind in TestKind::ALL {
            let err = kind
                .run(
                    &mut words,
                    &AddressingContext::Offset,
                    &mut rng,
                    &mut PanicSink,
                    &mut NoProgress,
                    &TestConfig::default(),
                )
                .unwrap_err();
            assert_eq!(err, BufferError::Empty);
        }
    }

    struct PanicSink;

    impl DiagnosticSink for PanicSink {
        fn report(&mut self, mismatch: &Mismatch) {
            panic!("unexpected mismatch {}", mismatch);
        }
    }
}
