//! dtbmods CLI - static device-tree module and firmware inventory.
//!
//! Reads one or more compiled device-tree blobs, resolves their hardware
//! against a kernel module directory, and prints the modules and firmware
//! files an initramfs should bundle as two shell arrays on stdout.
//! Diagnostics go to stderr only; stdout carries nothing but the report.

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use dtbmods::firmware::expand_firmware;
use dtbmods::report::write_report;
use dtbmods::{scan_dtb, KmodIndex, OrderedSet};

/// List the kernel modules and firmware files a set of device trees will
/// need at boot.
#[derive(Debug, Parser)]
#[command(name = "dtbmods", version, about)]
struct Cli {
    /// Kernel module directory, e.g. /lib/modules/$(uname -r)
    module_dir: PathBuf,

    /// Compiled device-tree blobs, processed left to right
    #[arg(required = true)]
    dtb_files: Vec<PathBuf>,
}

fn main() -> ExitCode {
    init_tracing();

    // Shell callers only distinguish success from failure, so usage
    // errors exit 1 rather than clap's default 2. --help and --version
    // still exit 0.
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    let index = match KmodIndex::open(&cli.module_dir) {
        Ok(index) => index,
        Err(e) => {
            error!("cannot open module index: {e}");
            return ExitCode::FAILURE;
        }
    };

    let mut modules = OrderedSet::new();
    let mut firmware = OrderedSet::new();

    // A bad blob is logged and skipped; the rest of the batch still runs
    // and the report reflects whatever was accumulated.
    for dtb in &cli.dtb_files {
        if let Err(e) = scan_dtb(dtb, &index, &mut modules, &mut firmware) {
            error!("{e}");
        }
    }

    expand_firmware(&modules, &index, &mut firmware);

    let stdout = io::stdout();
    if let Err(e) = write_report(&mut stdout.lock(), &modules, &firmware) {
        error!("cannot write report: {e}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

/// Route tracing output to stderr so stdout stays machine-readable.
///
/// `RUST_LOG` overrides the default `warn` level.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .without_time()
        .init();
}
