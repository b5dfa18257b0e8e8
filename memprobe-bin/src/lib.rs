//! # Memprobe
//!
//! Memprobe is a user-space memory tester. It allocates and locks a buffer, then runs
//! pattern based tests from [`memprobe_core`] over it to reveal faulty memory cells and
//! address lines.
//!
//! ## Quickstart guide
//!
//! ```sh
//! cargo build --release
//! # test 256 MB, three loops, physical addresses from /proc/self/pagemap
//! sudo target/release/memprobe --size 256M --loops 3 --resolve-phys
//!```
//!
//! Failure lines are written to standard error in the classic memtester format. The
//! exit status is a bit mask: `0x01` setup failure, `0x02` stuck address failure and
//! `0x04` failure of any other test.
//!
//! ## Modules
//!
//! - `allocator`: Allocates and locks the buffer under test.
//! - `args`: Parsers for command line values.
//! - `output`: Failure lines that coexist with progress spinners.
//! - `report`: Collects test results and writes the JSON report.
pub mod allocator;
pub mod args;
pub mod output;
pub mod report;

use indicatif::MultiProgress;
use indicatif_log_bridge::LogWrapper;

/// Initializes `env_logger` behind a [`MultiProgress`] so log lines do not tear spinners.
pub fn init_logging_with_progress() -> anyhow::Result<MultiProgress> {
    let logger =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).build();
    let progress = MultiProgress::new();
    LogWrapper::new(progress.clone(), logger).try_init()?;
    Ok(progress)
}
