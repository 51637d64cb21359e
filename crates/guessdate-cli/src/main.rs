use std::path::PathBuf;

use clap::Parser;
use guessdate_core::{CancellationToken, ClassifyMode, ProcessControl, ProcessOptions};

#[derive(Parser)]
#[command(name = "guessdate", version, about = "Backfill missing EXIF capture dates from filesystem timestamps")]
struct Cli {
    /// Directory to scan (default: current directory)
    root: Option<PathBuf>,

    /// Output directory (default: ../adjusted_<dir-name>); must not exist
    #[arg(short, long, conflicts_with = "in_place")]
    output: Option<PathBuf>,

    /// Write adjusted_<name> next to each source file
    #[arg(long)]
    in_place: bool,

    /// How to decide a file's format
    #[arg(long, value_enum, default_value_t = ClassifyMode::Content)]
    classify: ClassifyMode,

    /// Number of files processed at once
    #[arg(short, long, default_value_t = 1)]
    jobs: usize,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Print the summary as JSON on stdout
    #[arg(long)]
    json: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    env_logger::Builder::new()
        .filter_level(cli.log_level.parse().unwrap_or(log::LevelFilter::Info))
        .init();

    let t_total = std::time::Instant::now();

    let root = match cli.root {
        Some(root) => root,
        None => std::env::current_dir()?,
    };
    let options = ProcessOptions {
        root,
        output: cli.output,
        in_place: cli.in_place,
        classify: cli.classify,
        jobs: cli.jobs.max(1),
    };

    let token = CancellationToken::new();
    let handler_token = token.clone();
    ctrlc::set_handler(move || {
        log::warn!("Interrupted, stopping after the current file");
        handler_token.cancel();
    })?;
    let control = ProcessControl::new().with_cancel_token(token);

    let result = guessdate_core::process_with_control(&options, &control)?;

    if cli.json {
        println!("{}", serde_json::to_string(&result)?);
    }
    eprintln!(
        "Wrote {} files, Skipped {} files ({} unsupported, {} already dated), Failed {} files ({:.2}s)",
        result.files_written,
        result.files_skipped(),
        result.skipped_unsupported,
        result.skipped_already_dated,
        result.files_failed,
        t_total.elapsed().as_secs_f64()
    );

    Ok(())
}
