//! igcacmi CLI - convert and combine IGC flight logs into ACMI recordings.

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use igcacmi::crashdump::CrashArchive;
use igcacmi::paths::resolve_dir;
use igcacmi::{Console, ConvertOptions, IgcAcmiCore, Mode, RunSummary, TracingConsole};
use std::path::{Path, PathBuf};
use std::process;

#[derive(Parser)]
#[command(name = "igcacmi")]
#[command(about = "IGC to ACMI flight log conversion tool", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a single .igc file into .acmi
    Convert {
        /// Path to the .igc file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        #[command(flatten)]
        common: CommonArgs,
    },

    /// Convert every .igc file in a directory into its own .acmi
    ConvertAll {
        /// Input directory for .igc files
        #[arg(short, long, value_name = "DIR")]
        input: Option<PathBuf>,

        #[command(flatten)]
        common: CommonArgs,
    },

    /// Combine .igc files recorded on the same day into one .acmi per day
    Combine {
        /// Input directory for .igc files
        #[arg(short, long, value_name = "DIR")]
        input: Option<PathBuf>,

        /// Desired name for the first combined file (ignored when taken)
        #[arg(short, long)]
        name: Option<String>,

        #[command(flatten)]
        common: CommonArgs,
    },
}

#[derive(Args, Clone)]
struct CommonArgs {
    /// Remove .igc files after converting them
    #[arg(short, long)]
    remove: bool,

    /// Write plain .txt.acmi instead of compressed .zip.acmi
    #[arg(short = 'z', long)]
    nozip: bool,

    /// Print errors in full instead of saving crash dumps
    #[arg(short, long)]
    debug: bool,

    /// Output directory for .acmi file(s)
    #[arg(short, long, value_name = "DIR")]
    output: Option<PathBuf>,

    /// Meters added to every altitude
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    alt_delta: i32,

    /// Run summary format
    #[arg(short, long, value_enum, default_value = "human")]
    format: OutputFormat,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON summary for scripts
    Json,
}

impl CommonArgs {
    fn options(&self, requested_name: Option<String>) -> ConvertOptions {
        ConvertOptions {
            remove_sources: self.remove,
            compress: !self.nozip,
            debug: self.debug,
            altitude_offset: self.alt_delta,
            requested_name,
            ..ConvertOptions::default()
        }
    }
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
    let console = TracingConsole;

    let exit_code = match cli.command {
        Commands::Convert { file, common } => handle_convert(&file, &common, &console),
        Commands::ConvertAll { input, common } => {
            handle_directory(Mode::ConvertAll, input.as_deref(), None, &common, &console)
        }
        Commands::Combine {
            input,
            name,
            common,
        } => handle_directory(Mode::Combine, input.as_deref(), name, &common, &console),
    };

    process::exit(exit_code);
}

fn handle_convert(file: &Path, common: &CommonArgs, console: &dyn Console) -> i32 {
    if !file.is_file() {
        console.error("Input .igc file path is not valid");
        return 1;
    }
    let options = common.options(None);
    let out_dir = resolve_dir(common.output.as_deref(), "Output", console);

    let summary = IgcAcmiCore::run_single(file, &out_dir, &options, console);
    finish(&summary, &common.format, console)
}

fn handle_directory(
    mode: Mode,
    input: Option<&Path>,
    name: Option<String>,
    common: &CommonArgs,
    console: &dyn Console,
) -> i32 {
    let options = common.options(name);
    let in_dir = resolve_dir(input, "Input", console);
    let out_dir = resolve_dir(common.output.as_deref(), "Output", console);

    let result = match mode {
        Mode::Combine => IgcAcmiCore::run_combine(&in_dir, &out_dir, &options, console),
        _ => IgcAcmiCore::run_convert_all(&in_dir, &out_dir, &options, console),
    }
    .with_context(|| format!("Failed to process \"{}\"", in_dir.display()));

    match result {
        Ok(summary) => finish(&summary, &common.format, console),
        Err(e) => {
            report_run_failure(mode, &options, &e, console);
            1
        }
    }
}

/// Whole-run failure: full report in debug mode, crash dump otherwise.
fn report_run_failure(
    mode: Mode,
    options: &ConvertOptions,
    error: &anyhow::Error,
    console: &dyn Console,
) {
    if options.debug {
        console.error(&format!("{:?}", error));
        return;
    }
    let archive = CrashArchive::new(&options.crash_dir, mode.program_name());
    let cause: &(dyn std::error::Error + 'static) = error.as_ref();
    match archive.program_dump(options, cause) {
        Ok(name) => console.error(&format!(
            "An error occurred in this program's execution, a crash report has been saved to \"{}\"",
            name
        )),
        Err(dump_error) => console.error(&format!(
            "An error occurred in this program's execution ({}), and the crash report could not be written: {}",
            error, dump_error
        )),
    }
}

fn finish(summary: &RunSummary, format: &OutputFormat, console: &dyn Console) -> i32 {
    match format {
        OutputFormat::Human => {
            console.info(&format!(
                "Done: {} written, {} failed, {} skipped without a date",
                summary.converted.len(),
                summary.failed.len(),
                summary.corrupt.len()
            ));
        }
        OutputFormat::Json => match serde_json::to_string_pretty(summary) {
            Ok(json) => println!("{}", json),
            Err(e) => console.error(&format!("Could not serialize summary: {}", e)),
        },
    }

    if summary.is_success() {
        0
    } else {
        1
    }
}
