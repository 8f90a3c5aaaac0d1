//! Classpulse CLI - Command-line interface for Classpulse
//!
//! Commands:
//! - report: Compute the participation report of a session log
//! - validate: Run a session log through the pipeline and list data warnings
//! - config: Print the effective engine configuration

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use classpulse::types::ChannelEvents;
use classpulse::{
    parse_session_log, ChatThreshold, EngineConfig, EngineError, ParticipationEngine,
    ParticipationReport, QualityWarning, CLASSPULSE_VERSION,
};

/// Classpulse - Participation reports for recorded class sessions
#[derive(Parser)]
#[command(name = "classpulse")]
#[command(version = CLASSPULSE_VERSION)]
#[command(about = "Turn class session event logs into participation reports", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute the participation report of a session log
    Report {
        /// Session log file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Output format
        #[arg(long, default_value = "csv")]
        format: OutputFormat,

        #[command(flatten)]
        engine: EngineArgs,
    },

    /// Run a session log through the pipeline and list data warnings
    Validate {
        /// Session log file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,

        /// Fail when any data warning was raised
        #[arg(long)]
        strict: bool,

        #[command(flatten)]
        engine: EngineArgs,
    },

    /// Print the effective engine configuration as JSON
    Config {
        #[command(flatten)]
        engine: EngineArgs,
    },
}

#[derive(clap::Args)]
struct EngineArgs {
    /// Engine configuration file (JSON); missing fields take their defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// Which point in time chat messages must follow to be counted
    #[arg(long)]
    chat_threshold: Option<ThresholdArg>,

    /// Keep re-logins with matching names as separate participants
    #[arg(long)]
    no_merge_relogins: bool,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Comma-separated values with a header row
    Csv,
    /// Report as JSON, including data warnings
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

#[derive(Clone, ValueEnum)]
enum ThresholdArg {
    /// Midnight of the recording day
    SessionDay,
    /// The recorded session start itself
    RecordingStart,
}

impl From<ThresholdArg> for ChatThreshold {
    fn from(arg: ThresholdArg) -> Self {
        match arg {
            ThresholdArg::SessionDay => ChatThreshold::SessionDay,
            ThresholdArg::RecordingStart => ChatThreshold::RecordingStart,
        }
    }
}

fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<(), CliFailure> {
    match cli.command {
        Commands::Report {
            input,
            output,
            format,
            engine,
        } => cmd_report(&input, &output, format, engine),

        Commands::Validate {
            input,
            json,
            strict,
            engine,
        } => cmd_validate(&input, json, strict, engine),

        Commands::Config { engine } => cmd_config(engine),
    }
}

fn cmd_report(
    input: &Path,
    output: &Path,
    format: OutputFormat,
    args: EngineArgs,
) -> Result<(), CliFailure> {
    let engine = ParticipationEngine::with_config(load_config(&args)?)?;
    let report = engine.process_json(&read_input(input)?)?;

    let output_data = match format {
        OutputFormat::Csv => format_csv(&report)?,
        OutputFormat::Json => serde_json::to_vec(&report)?,
        OutputFormat::JsonPretty => serde_json::to_vec_pretty(&report)?,
    };

    if output.to_string_lossy() == "-" {
        let mut stdout = io::stdout();
        stdout.write_all(&output_data)?;
        stdout.flush()?;
    } else {
        fs::write(output, output_data)?;
    }

    Ok(())
}

fn cmd_validate(
    input: &Path,
    json: bool,
    strict: bool,
    args: EngineArgs,
) -> Result<(), CliFailure> {
    let engine = ParticipationEngine::with_config(load_config(&args)?)?;
    let log = parse_session_log(&read_input(input)?)?;
    let report = engine.process(&log)?;

    let summary = ValidationReport {
        participants: report.rows.len(),
        events: event_count(&log.events),
        warnings: report.warnings,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Participants: {}", summary.participants);
        println!("Events:       {}", summary.events);
        println!("Warnings:     {}", summary.warnings.len());

        if !summary.warnings.is_empty() {
            println!("\nWarnings:");
            for warning in &summary.warnings {
                println!("  - {}", warning);
            }
        }
    }

    if strict && !summary.warnings.is_empty() {
        Err(CliFailure::WarningsRaised(summary.warnings.len()))
    } else {
        Ok(())
    }
}

fn cmd_config(args: EngineArgs) -> Result<(), CliFailure> {
    let config = load_config(&args)?;
    config.validate()?;
    println!("{}", config.to_json_pretty()?);
    Ok(())
}

// Helper functions

fn load_config(args: &EngineArgs) -> Result<EngineConfig, CliFailure> {
    let mut config = match &args.config {
        Some(path) => EngineConfig::from_json(&fs::read_to_string(path)?)?,
        None => EngineConfig::default(),
    };

    if let Some(threshold) = &args.chat_threshold {
        config.chat_threshold = threshold.clone().into();
    }
    if args.no_merge_relogins {
        config.merge_relogins = false;
    }

    Ok(config)
}

fn read_input(input: &Path) -> Result<String, CliFailure> {
    if input.to_string_lossy() == "-" {
        if atty::is(atty::Stream::Stdin) {
            return Err(CliFailure::InteractiveStdin);
        }
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

fn format_csv(report: &ParticipationReport) -> Result<Vec<u8>, CliFailure> {
    let mut wtr = csv::Writer::from_writer(Vec::new());

    for row in report.to_table() {
        wtr.write_record(&row)?;
    }

    wtr.into_inner().map_err(|e| CliFailure::Io(e.into_error()))
}

fn event_count(events: &ChannelEvents) -> usize {
    events.camera.len() + events.microphone.len() + events.chat.len()
}

// Error types

#[derive(Debug)]
enum CliFailure {
    Io(io::Error),
    Engine(EngineError),
    Json(serde_json::Error),
    Csv(csv::Error),
    InteractiveStdin,
    WarningsRaised(usize),
}

impl From<io::Error> for CliFailure {
    fn from(e: io::Error) -> Self {
        CliFailure::Io(e)
    }
}

impl From<EngineError> for CliFailure {
    fn from(e: EngineError) -> Self {
        CliFailure::Engine(e)
    }
}

impl From<serde_json::Error> for CliFailure {
    fn from(e: serde_json::Error) -> Self {
        CliFailure::Json(e)
    }
}

impl From<csv::Error> for CliFailure {
    fn from(e: csv::Error) -> Self {
        CliFailure::Csv(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<CliFailure> for CliError {
    fn from(e: CliFailure) -> Self {
        match e {
            CliFailure::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            CliFailure::Engine(e) => {
                let (code, hint) = match &e {
                    EngineError::IdentityResolution(_) => (
                        "IDENTITY_ERROR",
                        "Every event must reference a listed participant id or alt_id",
                    ),
                    EngineError::ParseError(_) | EngineError::JsonError(_) => {
                        ("PARSE_ERROR", "Ensure input is a session log JSON document")
                    }
                    EngineError::DateParseError(_) => (
                        "DATE_ERROR",
                        "session_start must be RFC 3339 or like 'Tue Jul 16 11:14:13 2019'",
                    ),
                    EngineError::InvalidConfig(_) => {
                        ("CONFIG_ERROR", "Run 'classpulse config' to see valid defaults")
                    }
                };
                CliError {
                    code: code.to_string(),
                    message: e.to_string(),
                    hint: Some(hint.to_string()),
                }
            }
            CliFailure::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            CliFailure::Csv(e) => CliError {
                code: "CSV_ERROR".to_string(),
                message: e.to_string(),
                hint: None,
            },
            CliFailure::InteractiveStdin => CliError {
                code: "NO_INPUT".to_string(),
                message: "stdin is a terminal".to_string(),
                hint: Some("Pipe a session log into stdin or pass --input <file>".to_string()),
            },
            CliFailure::WarningsRaised(count) => CliError {
                code: "WARNINGS_RAISED".to_string(),
                message: format!("{} data warnings raised", count),
                hint: Some("Run without --strict to accept corrected data".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct ValidationReport {
    participants: usize,
    events: usize,
    warnings: Vec<QualityWarning>,
}
