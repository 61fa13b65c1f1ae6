//! Keyflux CLI - Command-line interface for Keystroke Flux
//!
//! Commands:
//! - aggregate: Build the cohort model document from a keystroke table
//! - simulate: Synthesize keystroke sequences from a model document
//! - validate: Validate keystroke table rows
//! - compare: Compare PD and control cohorts on one metric

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use tracing::{info, Level};

use keystroke_flux::compare::{compare_cohorts, CohortComparison, CompareMetric};
use keystroke_flux::pipeline::{simulation_to_json, TableFormat, TypingSimulator, DEFAULT_PROMPTS};
use keystroke_flux::schema::ObservationTable;
use keystroke_flux::summary::SequenceSummary;
use keystroke_flux::types::{Cohort, SimulationSet};
use keystroke_flux::{aggregate_to_json, SimError, SynthesisConfig, FLUX_VERSION, PRODUCER_NAME};

/// Keyflux - Cohort keystroke timing models and synthetic typing
#[derive(Parser)]
#[command(name = "keyflux")]
#[command(version = FLUX_VERSION)]
#[command(about = "Aggregate keystroke timings and synthesize typing sequences", long_about = None)]
struct Cli {
    /// Log verbosity (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn")]
    log_level: Level,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the cohort model document from a keystroke table
    Aggregate {
        /// Keystroke table path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Model document path (use - for stdout)
        #[arg(short, long)]
        output: PathBuf,

        /// Input format
        #[arg(long, default_value = "ndjson")]
        input_format: InputFormat,

        /// Pretty-print the model document
        #[arg(long)]
        pretty: bool,
    },

    /// Synthesize keystroke sequences from a model document
    Simulate {
        /// Model document path (use - for stdin)
        #[arg(short, long)]
        model: PathBuf,

        /// Output path (use - for stdout)
        #[arg(short, long)]
        output: PathBuf,

        /// Prompt to type; repeat for several. Defaults to the built-in prompt list
        #[arg(long = "prompt")]
        prompts: Vec<String>,

        /// Cohort(s) to synthesize
        #[arg(long, default_value = "both")]
        cohort: CohortChoice,

        /// Master seed; a random one is drawn and logged when omitted
        #[arg(long)]
        seed: Option<u64>,

        /// Synthesis calibration file (JSON)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output format
        #[arg(long, default_value = "json")]
        output_format: OutputFormat,
    },

    /// Validate keystroke table rows
    Validate {
        /// Keystroke table path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Input format
        #[arg(long, default_value = "ndjson")]
        input_format: InputFormat,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Compare PD and control cohorts with Welch's t-test
    Compare {
        /// Keystroke table path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Input format
        #[arg(long, default_value = "ndjson")]
        input_format: InputFormat,

        /// Metric to compare
        #[arg(long, default_value = "delay")]
        metric: MetricChoice,

        /// Output comparison as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum InputFormat {
    /// Newline-delimited JSON (one observation per line)
    Ndjson,
    /// JSON array of observations
    Json,
}

impl From<InputFormat> for TableFormat {
    fn from(format: InputFormat) -> Self {
        match format {
            InputFormat::Ndjson => TableFormat::Ndjson,
            InputFormat::Json => TableFormat::Json,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Compact JSON
    Json,
    /// Pretty-printed JSON
    JsonPretty,
    /// One summary line per prompt and cohort
    Summary,
}

#[derive(Clone, Copy, ValueEnum)]
enum CohortChoice {
    Pd,
    Control,
    Both,
}

impl CohortChoice {
    fn cohorts(self) -> Vec<Cohort> {
        match self {
            CohortChoice::Pd => vec![Cohort::Pd],
            CohortChoice::Control => vec![Cohort::Control],
            CohortChoice::Both => Cohort::ALL.to_vec(),
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum MetricChoice {
    /// Inter-key delay, ms
    Delay,
    /// Hold duration, ms
    Duration,
    /// Per-subject typing speed
    TypingSpeed,
}

impl From<MetricChoice> for CompareMetric {
    fn from(metric: MetricChoice) -> Self {
        match metric {
            MetricChoice::Delay => CompareMetric::Delay,
            MetricChoice::Duration => CompareMetric::Duration,
            MetricChoice::TypingSpeed => CompareMetric::TypingSpeed,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(cli.log_level)
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", serde_json::to_string(&CliError::from(e)).unwrap_or_else(|_| "Unknown error".to_string()));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), KeyfluxCliError> {
    info!(producer = PRODUCER_NAME, version = FLUX_VERSION, "starting");

    match cli.command {
        Commands::Aggregate {
            input,
            output,
            input_format,
            pretty,
        } => cmd_aggregate(&input, &output, input_format, pretty),

        Commands::Simulate {
            model,
            output,
            prompts,
            cohort,
            seed,
            config,
            output_format,
        } => cmd_simulate(
            &model,
            &output,
            &prompts,
            cohort,
            seed,
            config.as_deref(),
            output_format,
        ),

        Commands::Validate {
            input,
            input_format,
            json,
        } => cmd_validate(&input, input_format, json),

        Commands::Compare {
            input,
            input_format,
            metric,
            json,
        } => cmd_compare(&input, input_format, metric, json),
    }
}

fn cmd_aggregate(
    input: &Path,
    output: &Path,
    input_format: InputFormat,
    pretty: bool,
) -> Result<(), KeyfluxCliError> {
    let table = read_input(input)?;
    let model_json = aggregate_to_json(&table, input_format.into(), pretty)?;
    write_output(output, &model_json)
}

fn cmd_simulate(
    model: &Path,
    output: &Path,
    prompts: &[String],
    cohort: CohortChoice,
    seed: Option<u64>,
    config: Option<&Path>,
    output_format: OutputFormat,
) -> Result<(), KeyfluxCliError> {
    let mut simulator = TypingSimulator::from_model_json(&read_input(model)?)?;

    if let Some(config_path) = config {
        let config = SynthesisConfig::from_json(&fs::read_to_string(config_path)?)?;
        simulator.set_config(config)?;
    }

    let prompts: Vec<&str> = if prompts.is_empty() {
        DEFAULT_PROMPTS.to_vec()
    } else {
        prompts.iter().map(String::as_str).collect()
    };

    let seed = seed.unwrap_or_else(rand::random);
    info!(seed, prompts = prompts.len(), "simulating");

    let set = simulator.simulate_prompts(&prompts, &cohort.cohorts(), seed)?;

    let output_data = match output_format {
        OutputFormat::Json => simulation_to_json(&set, false)?,
        OutputFormat::JsonPretty => simulation_to_json(&set, true)?,
        OutputFormat::Summary => format_summary(&set),
    };
    write_output(output, &output_data)
}

fn cmd_validate(input: &Path, input_format: InputFormat, json: bool) -> Result<(), KeyfluxCliError> {
    let rows = parse_table(&read_input(input)?, input_format)?;
    let issues = ObservationTable::validate_rows(&rows);

    let mut invalid: Vec<usize> = issues.iter().map(|i| i.index).collect();
    invalid.dedup();

    let report = ValidationReport {
        total_rows: rows.len(),
        valid_rows: rows.len() - invalid.len(),
        invalid_rows: invalid.len(),
        errors: issues
            .iter()
            .map(|i| ValidationErrorDetail {
                index: i.index,
                subject_id: i.subject_id.clone(),
                error: i.issue.to_string(),
            })
            .collect(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Total rows:   {}", report.total_rows);
        println!("Valid rows:   {}", report.valid_rows);
        println!("Invalid rows: {}", report.invalid_rows);

        if !report.errors.is_empty() {
            println!("\nErrors:");
            for err in &report.errors {
                println!("  - Subject {} (row {}): {}", err.subject_id, err.index, err.error);
            }
        }
    }

    if report.invalid_rows > 0 {
        Err(KeyfluxCliError::ValidationFailed(report.invalid_rows))
    } else {
        Ok(())
    }
}

fn cmd_compare(
    input: &Path,
    input_format: InputFormat,
    metric: MetricChoice,
    json: bool,
) -> Result<(), KeyfluxCliError> {
    let rows = parse_table(&read_input(input)?, input_format)?;
    if rows.is_empty() {
        return Err(KeyfluxCliError::NoObservations);
    }

    let comparison = compare_cohorts(&rows, metric.into())?;

    if json {
        println!("{}", serde_json::to_string_pretty(&comparison)?);
    } else {
        print_comparison(&comparison);
    }
    Ok(())
}

// Helper functions

fn read_input(path: &Path) -> Result<String, KeyfluxCliError> {
    if path.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(path)?)
    }
}

fn write_output(path: &Path, data: &str) -> Result<(), KeyfluxCliError> {
    if path.to_string_lossy() == "-" {
        println!("{}", data);
    } else {
        fs::write(path, data)?;
    }
    Ok(())
}

fn parse_table(
    data: &str,
    format: InputFormat,
) -> Result<Vec<keystroke_flux::KeystrokeObservation>, KeyfluxCliError> {
    let rows = match format {
        InputFormat::Ndjson => ObservationTable::parse_ndjson(data)?,
        InputFormat::Json => ObservationTable::parse_array(data)?,
    };
    Ok(rows)
}

fn format_summary(set: &SimulationSet) -> String {
    let mut lines = Vec::new();
    for (prompt, sequences) in set {
        for cohort in Cohort::ALL {
            let Some(summary) = sequences.get(cohort).and_then(SequenceSummary::from_events) else {
                continue;
            };
            lines.push(format!(
                "{:<8} {:>4} keys {:>9.1} ms {:>7.1} cpm  delay {:>6.1} ms  hold {:>6.1} ms  {}",
                cohort.as_str(),
                summary.events,
                summary.total_ms,
                summary.chars_per_minute,
                summary.mean_delay_ms,
                summary.mean_duration_ms,
                prompt
            ));
        }
    }
    lines.join("\n")
}

fn print_comparison(c: &CohortComparison) {
    println!("Cohort Comparison ({:?})", c.metric);
    println!("=================");
    println!("PD:      n={:<6} mean={:>9.2} std={:>9.2}", c.pd.n, c.pd.mean, c.pd.std);
    println!("Control: n={:<6} mean={:>9.2} std={:>9.2}", c.control.n, c.control.mean, c.control.std);
    println!("\nWelch t = {:.3}, df = {:.1}, p = {:.4}", c.test.t, c.test.df, c.test.p_value);
    println!(
        "Difference is {}significant at 0.05",
        if c.significant { "" } else { "not " }
    );
}

// Error types

#[derive(Debug)]
enum KeyfluxCliError {
    Io(io::Error),
    Sim(SimError),
    Json(serde_json::Error),
    NoObservations,
    ValidationFailed(usize),
}

impl From<io::Error> for KeyfluxCliError {
    fn from(e: io::Error) -> Self {
        KeyfluxCliError::Io(e)
    }
}

impl From<SimError> for KeyfluxCliError {
    fn from(e: SimError) -> Self {
        KeyfluxCliError::Sim(e)
    }
}

impl From<serde_json::Error> for KeyfluxCliError {
    fn from(e: serde_json::Error) -> Self {
        KeyfluxCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<KeyfluxCliError> for CliError {
    fn from(e: KeyfluxCliError) -> Self {
        match e {
            KeyfluxCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            KeyfluxCliError::Sim(e) => sim_error(e),
            KeyfluxCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: None,
            },
            KeyfluxCliError::NoObservations => CliError {
                code: "NO_OBSERVATIONS".to_string(),
                message: "No keystroke observations found in input".to_string(),
                hint: Some("Ensure input file is not empty".to_string()),
            },
            KeyfluxCliError::ValidationFailed(count) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{} rows failed validation", count),
                hint: Some("Fix validation errors and retry".to_string()),
            },
        }
    }
}

fn sim_error(e: SimError) -> CliError {
    let (code, hint) = match &e {
        SimError::ParseError(_) => ("PARSE_ERROR", Some("Check --input-format and row fields")),
        SimError::JsonError(_) => ("JSON_ERROR", Some("Check JSON syntax")),
        SimError::SchemaViolation(_) => (
            "SCHEMA_VIOLATION",
            Some("Regenerate the model with 'keyflux aggregate'"),
        ),
        SimError::NoCohortData(_) => (
            "NO_COHORT_DATA",
            Some("Restrict --cohort to a cohort present in the table"),
        ),
        SimError::NoStatistics { .. } => ("NO_STATISTICS", None),
        SimError::InvalidDistribution(_) => ("INVALID_DISTRIBUTION", Some("Check the model's std values")),
        SimError::InvalidConfig(_) => ("INVALID_CONFIG", Some("Multipliers must be positive numbers")),
    };
    CliError {
        code: code.to_string(),
        message: e.to_string(),
        hint: hint.map(str::to_string),
    }
}

// Report types

#[derive(serde::Serialize)]
struct ValidationReport {
    total_rows: usize,
    valid_rows: usize,
    invalid_rows: usize,
    errors: Vec<ValidationErrorDetail>,
}

#[derive(serde::Serialize)]
struct ValidationErrorDetail {
    index: usize,
    subject_id: String,
    error: String,
}
