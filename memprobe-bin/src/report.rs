//! Result collection and the JSON report.

use anyhow::Result;
use log::info;
use memprobe_core::diagnostic::{DiagnosticSink, Mismatch};
use memprobe_core::memory::AddressingContext;
use memprobe_core::{TestKind, TestResult};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};

/// Counts every mismatch and keeps the first `limit` of them.
#[derive(Debug, Serialize)]
pub struct MismatchRecorder {
    limit: usize,
    total: usize,
    records: Vec<Mismatch>,
}

impl MismatchRecorder {
    /// Creates a new recorder keeping at most `limit` mismatches.
    pub fn new(limit: usize) -> Self {
        MismatchRecorder {
            limit,
            total: 0,
            records: vec![],
        }
    }

    /// Number of mismatches seen, including dropped ones.
    pub fn total(&self) -> usize {
        self.total
    }

    /// The recorded mismatches.
    pub fn records(&self) -> &[Mismatch] {
        &self.records
    }
}

impl DiagnosticSink for MismatchRecorder {
    fn report(&mut self, mismatch: &Mismatch) {
        self.total += 1;
        if self.records.len() < self.limit {
            self.records.push(*mismatch);
        }
    }
}

/// Outcome of one test in one loop.
#[derive(Debug, Serialize)]
pub struct RunRecord {
    /// Loop number, starting at 1
    pub loop_number: u64,
    /// The test that ran
    pub test: TestKind,
    /// Its result
    pub result: TestResult,
    /// Number of mismatches reported
    pub mismatches: usize,
    /// Wall clock duration of the test
    pub duration_ms: u64,
}

/// Totals of one test over all loops.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct TestSummary {
    /// The test
    pub test: TestKind,
    /// Number of times it ran
    pub runs: u64,
    /// Number of failed runs
    pub failures: u64,
    /// Mismatches reported over all runs
    pub mismatches: usize,
}

/// Number of [`RunRecord`]s kept in a report. Later runs only update the summary.
pub const RUN_RECORD_LIMIT: usize = 10_000;

/// Complete results of a memprobe invocation.
#[derive(Debug, Serialize)]
pub struct Report<A: Serialize> {
    /// ISO 8601 timestamp of when the run started
    date: String,
    /// Command line arguments
    args: A,
    /// Seed of the random value stream
    seed: u64,
    /// Bytes under test
    size: usize,
    /// Whether the buffer was locked into RAM
    locked: bool,
    /// How failing words were located
    addressing: AddressingContext,
    /// Totals per test over all loops
    summary: Vec<TestSummary>,
    /// One entry per test and loop, up to the run limit
    runs: Vec<RunRecord>,
    /// Runs not kept in `runs`
    runs_dropped: u64,
    #[serde(skip)]
    run_limit: usize,
    /// Recorded mismatches over all runs
    mismatches: MismatchRecorder,
}

impl<A: Serialize> Report<A> {
    /// Creates an empty report.
    pub fn new(
        args: A,
        seed: u64,
        size: usize,
        locked: bool,
        addressing: AddressingContext,
        max_records: usize,
    ) -> Self {
        Self {
            date: chrono::Local::now().to_rfc3339(),
            args,
            seed,
            size,
            locked,
            addressing,
            summary: vec![],
            runs: vec![],
            runs_dropped: 0,
            run_limit: RUN_RECORD_LIMIT,
            mismatches: MismatchRecorder::new(max_records),
        }
    }

    /// Sink recording the mismatches of the running test.
    pub fn recorder(&mut self) -> &mut MismatchRecorder {
        &mut self.mismatches
    }

    /// Keeps at most `limit` run records.
    pub fn with_run_limit(mut self, limit: usize) -> Self {
        self.run_limit = limit;
        self
    }

    /// Adds the outcome of a test.
    ///
    /// The summary always counts the run. The record itself is dropped once the
    /// run limit is reached, so endless loops keep the report bounded.
    pub fn add_run(&mut self, run: RunRecord) {
        let idx = match self.summary.iter().position(|s| s.test == run.test) {
            Some(idx) => idx,
            None => {
                self.summary.push(TestSummary {
                    test: run.test,
                    runs: 0,
                    failures: 0,
                    mismatches: 0,
                });
                self.summary.len() - 1
            }
        };
        let summary = &mut self.summary[idx];
        summary.runs += 1;
        summary.failures += run.result.is_fail() as u64;
        summary.mismatches += run.mismatches;

        if self.runs.len() < self.run_limit {
            self.runs.push(run);
        } else {
            self.runs_dropped += 1;
        }
    }

    /// The kept run records.
    pub fn runs(&self) -> &[RunRecord] {
        &self.runs
    }

    /// Totals per test, in the order the tests first ran.
    pub fn summary(&self) -> &[TestSummary] {
        &self.summary
    }

    /// Exit status bits of all failed tests.
    ///
    /// `0x02` for a failed stuck address test, `0x04` for any other failed test.
    pub fn exit_code(&self) -> u8 {
        self.summary
            .iter()
            .filter(|s| s.failures > 0)
            .fold(0, |code, s| {
                code | match s.test {
                    TestKind::StuckAddress => 0x02,
                    TestKind::RandomValue => 0x04,
                }
            })
    }

    /// Writes the report as pretty printed JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if file creation or serialization fails.
    pub fn save_to_file(&self, filename: &str) -> Result<()> {
        let file = File::create(filename)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush()?;
        info!("Results saved to {}", filename);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(test: TestKind, result: TestResult) -> RunRecord {
        RunRecord {
            loop_number: 1,
            test,
            result,
            mismatches: 0,
            duration_ms: 0,
        }
    }

    #[test]
    fn test_recorder_limit() {
        let mut recorder = MismatchRecorder::new(2);
        for i in 0..5 {
            recorder.report(&Mismatch::value(i, 0, 1, &AddressingContext::Offset));
        }
        assert_eq!(recorder.total(), 5);
        assert_eq!(recorder.records().len(), 2);
        assert_eq!(recorder.records()[1].index, 1);
    }

    #[test]
    fn test_exit_code() {
        let mut report = Report::new((), 0, 0, false, AddressingContext::Offset, 10);
        report.add_run(run(TestKind::StuckAddress, TestResult::Pass));
        report.add_run(run(TestKind::RandomValue, TestResult::Pass));
        assert_eq!(report.exit_code(), 0);
        report.add_run(run(TestKind::RandomValue, TestResult::Fail));
        assert_eq!(report.exit_code(), 0x04);
        report.add_run(run(TestKind::StuckAddress, TestResult::Fail));
        assert_eq!(report.exit_code(), 0x06);
    }

    #[test]
    fn test_endless_loops_keep_report_bounded() {
        let mut report =
            Report::new((), 0, 0, false, AddressingContext::Offset, 10).with_run_limit(3);
        for loop_number in 1..=100 {
            let result = if loop_number == 50 {
                TestResult::Fail
            } else {
                TestResult::Pass
            };
            report.add_run(RunRecord {
                loop_number,
                mismatches: result.is_fail() as usize,
                ..run(TestKind::StuckAddress, result)
            });
        }
        assert_eq!(report.runs().len(), 3);
        assert_eq!(report.runs_dropped, 97);
        assert_eq!(
            report.summary(),
            [TestSummary {
                test: TestKind::StuckAddress,
                runs: 100,
                failures: 1,
                mismatches: 1,
            }]
        );
        assert_eq!(report.exit_code(), 0x02);
    }

    #[test]
    fn test_report_serializes() -> anyhow::Result<()> {
        let mut report = Report::new("args", 42, 4096, true, AddressingContext::Offset, 10);
        report
            .recorder()
            .report(&Mismatch::value(3, 1, 2, &AddressingContext::Offset));
        report.add_run(run(TestKind::RandomValue, TestResult::Fail));
        let json = serde_json::to_value(&report)?;
        assert_eq!(json["seed"], 42);
        assert_eq!(json["runs"][0]["test"], "random-value");
        assert_eq!(json["runs"][0]["result"], "Fail");
        assert_eq!(json["mismatches"]["total"], 1);
        assert_eq!(json["summary"][0]["failures"], 1);
        assert_eq!(json["runs_dropped"], 0);
        assert!(json.get("run_limit").is_none());
        Ok(())
    }
}
