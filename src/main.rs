//! confprobe CLI entry point.

use std::fs::File;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Mutex;

use confprobe::cli::{execute, probe_names, Cli};
use confprobe::ui::{should_use_colors, ProbeTheme};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize the tracing subscriber for logging.
///
/// Log level is controlled by:
/// 1. `--debug` sets level to DEBUG
/// 2. `-v` raises it (DEBUG, then TRACE)
/// 3. `RUST_LOG` environment variable (if set)
/// 4. Default is INFO
///
/// Everything is also written, without colors, to the log file.
fn init_tracing(debug: bool, verbosity: u8, log_file: &Path) {
    let filter = if debug || verbosity == 1 {
        EnvFilter::new("confprobe=debug")
    } else if verbosity > 1 {
        EnvFilter::new("confprobe=trace")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("confprobe=info"))
    };

    let file_layer = match File::create(log_file) {
        Ok(file) => Some(
            fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        ),
        Err(e) => {
            eprintln!("Cannot create log file {}: {e}", log_file.display());
            None
        }
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(file_layer)
        .with(filter)
        .init();
}

fn main() -> ExitCode {
    let argv: Vec<String> = std::env::args().collect();
    let probes = probe_names();
    let (cli, overrides) = match Cli::try_parse_with_probes(&argv, &probes) {
        Ok(parsed) => parsed,
        Err(e) => e.exit(),
    };

    init_tracing(cli.debug, cli.verbose, &cli.file_log);
    tracing::debug!("confprobe starting with args: {:?}", cli);

    let theme = if !cli.no_color && should_use_colors() {
        ProbeTheme::new()
    } else {
        ProbeTheme::plain()
    };

    let command_line = argv.iter().skip(1).cloned().collect();
    let options = match cli.into_options(overrides, command_line) {
        Ok(options) => options,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::from(2);
        }
    };

    match execute(options, &theme) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::from(1)
        }
    }
}
