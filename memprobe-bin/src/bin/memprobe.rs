use std::io::Write;
use std::process::ExitCode;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};
use memprobe_bin::allocator::Memory;
use memprobe_bin::args::{ProgressMode, parse_hex};
use memprobe_bin::init_logging_with_progress;
use memprobe_bin::output::SuspendingSink;
use memprobe_bin::report::{Report, RunRecord};
use memprobe_core::diagnostic::{DiagnosticSink, StderrSink};
use memprobe_core::memory::{AddressingContext, LinuxPageMap, PhysAddr, VirtToPhysResolver};
use memprobe_core::progress::{NoProgress, Progress, SpinnerProgress, TerminalProgress};
use memprobe_core::util::{Rng, Size};
use memprobe_core::{TestConfig, TestKind};
use serde::Serialize;

/// CLI arguments for the `memprobe` binary.
#[derive(Debug, Parser, Serialize, Clone)]
#[clap(version, about = "Pattern based memory fault detection")]
struct CliArgs {
    /// Amount of memory to test, `<number>[B|K|M|G]`, megabytes by default.
    #[clap(long = "size", default_value = "64M")]
    #[serde(serialize_with = "serialize_size")]
    size: Size,
    /// Number of loops to run, 0 runs forever.
    #[clap(long = "loops", default_value = "1")]
    loops: u64,
    /// Test to run, may be repeated. Runs all tests if omitted.
    #[clap(long = "test", value_parser = clap::value_parser!(TestKind))]
    tests: Vec<TestKind>,
    /// Seed for the random value test. Random if omitted.
    #[clap(long = "seed")]
    seed: Option<u64>,
    /// Physical address of the first tested word, in hex. Enables physical address reports.
    #[clap(long = "phys-base", value_parser = parse_hex, conflicts_with = "resolve_phys")]
    phys_base: Option<usize>,
    /// Resolve the physical address of the buffer through /proc/self/pagemap.
    #[clap(long = "resolve-phys")]
    resolve_phys: bool,
    /// Progress display.
    #[clap(long = "progress", value_enum, default_value_t = ProgressMode::Terminal)]
    progress: ProgressMode,
    /// Words written between two ticks of the random value indicator.
    #[clap(long = "progress-often", default_value_t = TestConfig::default().progress_often)]
    progress_often: usize,
    /// Output file for results (JSON format).
    #[clap(long = "output")]
    output: Option<String>,
    /// Maximum number of mismatches kept in the JSON report.
    #[clap(long = "max-records", default_value = "1000")]
    max_records: usize,
}

fn serialize_size<S: serde::Serializer>(size: &Size, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&size.to_string())
}

fn addressing_context(args: &CliArgs, memory: &Memory) -> AddressingContext {
    if let Some(base) = args.phys_base {
        return AddressingContext::physical(PhysAddr::new(base));
    }
    if !args.resolve_phys {
        return AddressingContext::Offset;
    }
    let virt = memory.ptr().addr();
    let phys = LinuxPageMap::new().and_then(|mut pagemap| {
        let base = pagemap.get_phys(virt)?;
        let contiguous = pagemap.contiguous_len(virt, memory.len())?;
        Ok((base, contiguous))
    });
    match phys {
        Ok((base, contiguous)) => {
            info!("Buffer starts at physical address {:?}", base);
            if contiguous < memory.len() {
                warn!(
                    "Only the first {} of {} bytes are physically contiguous, later physical addresses are estimates",
                    contiguous,
                    memory.len()
                );
            }
            AddressingContext::physical(base)
        }
        Err(e) => {
            warn!("Failed to resolve physical address, reporting offsets: {}", e);
            AddressingContext::Offset
        }
    }
}

fn main() -> Result<ExitCode> {
    let multi = init_logging_with_progress()?;

    let args = CliArgs::parse();
    info!("CLI args: {:?}", args);

    let mut memory = Memory::mmap(args.size.bytes())
        .with_context(|| format!("Failed to allocate {}", args.size))?;
    if let Err(e) = memory.lock() {
        warn!("Failed to lock {} bytes, testing unlocked memory: {}", memory.len(), e);
    }
    let ctx = addressing_context(&args, &memory);

    let mut rng = args.seed.map_or_else(Rng::from_os, Rng::from_seed);
    let seed = rng.seed();
    info!("Random value seed: {}", seed);

    let tests = if args.tests.is_empty() {
        TestKind::ALL.to_vec()
    } else {
        args.tests.clone()
    };
    let config = TestConfig {
        progress_often: args.progress_often,
    };
    let mut progress: Box<dyn Progress> = match args.progress {
        ProgressMode::Terminal => Box::new(TerminalProgress::default()),
        ProgressMode::Spinner => Box::new(SpinnerProgress::new(Some(multi.clone()))),
        ProgressMode::None => Box::new(NoProgress),
    };
    let mut lines: Box<dyn DiagnosticSink> = match args.progress {
        ProgressMode::Spinner => Box::new(SuspendingSink::new(multi.clone(), StderrSink::default())),
        _ => Box::new(StderrSink::default()),
    };

    let mut report = Report::new(
        args.clone(),
        seed,
        memory.len(),
        memory.is_locked(),
        ctx,
        args.max_records,
    );
    let mut stdout = std::io::stdout();

    for loop_number in (1..).take_while(|l| args.loops == 0 || *l <= args.loops) {
        if args.loops == 0 {
            writeln!(stdout, "Loop {}:", loop_number)?;
        } else {
            writeln!(stdout, "Loop {}/{}:", loop_number, args.loops)?;
        }
        for kind in &tests {
            if args.progress == ProgressMode::Terminal {
                write!(stdout, "  {:<20}: ", kind.name())?;
                stdout.flush()?;
            }
            let before = report.recorder().total();
            let start = Instant::now();
            let result = {
                let mut sink = (&mut *lines, report.recorder());
                kind.run(
                    memory.words_mut(),
                    &ctx,
                    &mut rng,
                    &mut sink,
                    progress.as_mut(),
                    &config,
                )?
            };
            let duration = start.elapsed();
            match args.progress {
                ProgressMode::Terminal => writeln!(stdout, "{}", result)?,
                _ => info!("{}: {}", kind.name(), result),
            }
            let mismatches = report.recorder().total() - before;
            report.add_run(RunRecord {
                loop_number,
                test: *kind,
                result,
                mismatches,
                duration_ms: duration.as_millis() as u64,
            });
        }
        writeln!(stdout)?;

        if let Some(output_file) = &args.output {
            report.save_to_file(output_file)?;
        }
    }

    for summary in report.summary() {
        info!(
            "{}: {} of {} runs failed, {} mismatches",
            summary.test, summary.failures, summary.runs, summary.mismatches
        );
    }
    Ok(ExitCode::from(report.exit_code()))
}
