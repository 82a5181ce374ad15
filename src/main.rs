//! CLI entry point for the CGPA rater.
//!
//! Provides subcommands for computing a CGPA from a course file, writing the
//! example template, and running an interactive editing session.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use cgpa_rater::calculator::session::Session;
use cgpa_rater::config::Settings;
use cgpa_rater::loader::load_text;
use cgpa_rater::output::{
    TEMPLATE_FILE_NAME, append_courses, print_pretty, render_courses, render_summary,
    report_json, write_template,
};
use cgpa_rater::repl::run_session;
use cgpa_rater::{CgpaResult, calculate};
use clap::{Parser, Subcommand, ValueEnum};
use tokio::io::BufReader;
use tracing::{debug, info};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "cgpa_rater")]
#[command(about = "Compute a cumulative GPA from a course spreadsheet", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Table,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute the CGPA of a CSV or workbook file
    Calculate {
        /// CSV, XLSX, XLS or ODS file with course, grade and credit columns
        #[arg(value_name = "FILE")]
        source: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = Format::Table)]
        format: Format,

        /// CSV file to append the resolved courses to
        #[arg(short, long)]
        export: Option<PathBuf>,
    },
    /// Write an example course file
    Template {
        #[arg(short, long, default_value = TEMPLATE_FILE_NAME)]
        output: PathBuf,
    },
    /// Edit courses interactively and recalculate
    Session {
        /// Course file to start from; omit for manual entry
        #[arg(value_name = "FILE")]
        source: Option<PathBuf>,

        /// Delay before a requested recalculation runs (overrides CGPA_RECALC_DELAY_MS)
        #[arg(long)]
        delay_ms: Option<u64>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    let settings = Settings::from_env();

    // Logging setup: colored stderr + JSON rolling log file
    let log_path = Path::new(&settings.log_file_path);
    let log_dir = log_path.parent().unwrap_or(Path::new("logs"));
    let log_file_name = log_path
        .file_name()
        .unwrap_or(OsStr::new("cgpa_rater.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    debug!(?settings, "Settings loaded");

    let cli = Cli::parse();

    match cli.command {
        Commands::Calculate {
            source,
            format,
            export,
        } => {
            let result = load_result(&source).await?;
            print_pretty(&result);

            match format {
                Format::Table => {
                    println!(
                        "{}",
                        render_summary(result.cgpa, result.total_credits, result.courses.len())
                    );
                    print!("{}", render_courses(&result.courses));
                }
                Format::Json => {
                    println!("{}", report_json(&source.display().to_string(), &result)?);
                }
            }

            if let Some(path) = export {
                append_courses(&path, &result)?;
            }
        }
        Commands::Template { output } => {
            write_template(&output)?;
            println!("Template written to {}", output.display());
        }
        Commands::Session { source, delay_ms } => {
            let mut session = match &source {
                Some(path) => Session::new(load_result(path).await?),
                None => {
                    info!("Starting manual entry");
                    Session::manual()
                }
            };
            let delay = delay_ms
                .map(Duration::from_millis)
                .unwrap_or(settings.recalc_delay);
            let stdin = BufReader::new(tokio::io::stdin());
            run_session(&mut session, stdin, &mut std::io::stdout(), delay).await?;
        }
    }

    Ok(())
}

/// Reads a course file and computes its result.
#[tracing::instrument(fields(source = %path.display()))]
async fn load_result(path: &Path) -> Result<CgpaResult> {
    let text = load_text(path).await?;
    let result = calculate(&text)?;
    info!(
        cgpa = result.cgpa,
        total_credits = result.total_credits,
        courses = result.courses.len(),
        "Processed file"
    );
    Ok(result)
}
