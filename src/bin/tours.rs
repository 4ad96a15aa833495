//! Tours CLI - Command-line interface for Tour Points
//!
//! Commands:
//! - score: Segment and score a trip export (batch mode)
//! - validate: Validate trip records
//! - doctor: Diagnose configuration and input files
//! - schema: Print input/output schema or the default configuration

use clap::{Parser, Subcommand, ValueEnum};
use std::collections::HashMap;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use tour_points::adapters::{
    self, CsvTripAdapter, JsonTripAdapter, NdjsonTripAdapter, TripRecordAdapter,
};
use tour_points::encoder::ReportEncoder;
use tour_points::types::{TourReport, UserProfile};
use tour_points::{TourConfig, TourPipeline, PRODUCER_NAME, TOURS_VERSION};

/// Tours - commute tour segmentation and sustainability scoring
#[derive(Parser)]
#[command(name = "tours")]
#[command(version = TOURS_VERSION)]
#[command(about = "Segment travel legs into tours and score sustainable commutes", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Segment and score a trip export
    Score {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Profiles JSON file (user_id -> home/work coordinates)
        #[arg(short, long)]
        profiles: PathBuf,

        /// Configuration JSON file (defaults apply to missing fields)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Input format
        #[arg(long, default_value = "csv")]
        input_format: InputFormat,

        /// Output format
        #[arg(long, default_value = "json-pretty")]
        output_format: OutputFormat,

        /// Fail if any user is rejected or any record is skipped
        #[arg(long)]
        strict: bool,
    },

    /// Validate trip records
    Validate {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Input format
        #[arg(long, default_value = "csv")]
        input_format: InputFormat,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Diagnose configuration and input files
    Doctor {
        /// Check configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Check profiles file
        #[arg(long)]
        profiles: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print schema information
    Schema {
        /// Schema to print
        #[arg(value_enum)]
        schema_type: SchemaType,
    },
}

#[derive(Clone, ValueEnum)]
enum InputFormat {
    /// Comma-separated trip export with a header row
    Csv,
    /// JSON array of trip records
    Json,
    /// Newline-delimited JSON (one trip record per line)
    Ndjson,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Compact JSON report
    Json,
    /// Pretty-printed JSON report
    JsonPretty,
    /// Newline-delimited JSON (one tour per line)
    Ndjson,
}

#[derive(Clone, ValueEnum)]
enum SchemaType {
    /// Trip record input
    Input,
    /// Tour report output
    Output,
    /// Default configuration
    Config,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

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

fn run(cli: Cli) -> Result<(), ToursCliError> {
    match cli.command {
        Commands::Score {
            input,
            profiles,
            config,
            output,
            input_format,
            output_format,
            strict,
        } => cmd_score(
            &input,
            &profiles,
            config.as_deref(),
            &output,
            input_format,
            output_format,
            strict,
        ),

        Commands::Validate {
            input,
            input_format,
            json,
        } => cmd_validate(&input, input_format, json),

        Commands::Doctor {
            config,
            profiles,
            json,
        } => cmd_doctor(config.as_deref(), profiles.as_deref(), json),

        Commands::Schema { schema_type } => cmd_schema(schema_type),
    }
}

fn cmd_score(
    input: &Path,
    profiles: &Path,
    config: Option<&Path>,
    output: &Path,
    input_format: InputFormat,
    output_format: OutputFormat,
    strict: bool,
) -> Result<(), ToursCliError> {
    let config = match config {
        Some(path) => TourConfig::from_json(&fs::read_to_string(path)?)?,
        None => TourConfig::default(),
    };
    let pipeline = TourPipeline::with_config(config)?;

    let profiles: HashMap<String, UserProfile> =
        adapters::parse_profiles(&fs::read_to_string(profiles)?)?;

    let input_data = read_input(input)?;
    let adapter = adapter_for(&input_format);
    let outcome = pipeline.process_trips(adapter.as_ref(), &input_data, &profiles)?;

    if outcome.users == 0 {
        return Err(ToursCliError::NoTrips);
    }

    let bonus_points = pipeline.bonus_points(&outcome.tours);
    let report = ReportEncoder::new().encode(&outcome, bonus_points);

    let output_data = format_output(&report, &output_format)?;
    if output.to_string_lossy() == "-" {
        print!("{}", output_data);
    } else {
        fs::write(output, output_data)?;
    }

    if strict && !report.rejected.is_empty() {
        return Err(ToursCliError::UsersRejected(report.rejected.len()));
    }
    if strict && !report.invalid_records.is_empty() {
        return Err(ToursCliError::RecordsSkipped(report.invalid_records.len()));
    }

    Ok(())
}

fn cmd_validate(input: &Path, input_format: InputFormat, json: bool) -> Result<(), ToursCliError> {
    let input_data = read_input(input)?;
    let trips = adapter_for(&input_format).parse(&input_data)?;

    let results = adapters::validate_records(&trips);

    let report = ValidationReport {
        total_records: trips.len(),
        valid_records: trips.len() - results.len(),
        invalid_records: results.len(),
        errors: results
            .iter()
            .map(|r| ValidationErrorDetail {
                index: r.index,
                user_id: r.user_id.clone(),
                error: r.result.as_ref().map(|e| e.to_string()).unwrap_or_default(),
            })
            .collect(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Total records:   {}", report.total_records);
        println!("Valid records:   {}", report.valid_records);
        println!("Invalid records: {}", report.invalid_records);

        if !report.errors.is_empty() {
            println!("\nErrors:");
            for err in &report.errors {
                println!(
                    "  - Record {} (user {}): {}",
                    err.index,
                    err.user_id.as_deref().unwrap_or("unknown"),
                    err.error
                );
            }
        }
    }

    if report.invalid_records > 0 {
        Err(ToursCliError::ValidationFailed(report.invalid_records))
    } else {
        Ok(())
    }
}

fn cmd_doctor(
    config: Option<&Path>,
    profiles: Option<&Path>,
    json: bool,
) -> Result<(), ToursCliError> {
    let mut checks: Vec<DoctorCheck> = vec![DoctorCheck {
        name: "version".to_string(),
        status: CheckStatus::Ok,
        message: format!("Tour Points version {}", TOURS_VERSION),
    }];

    if let Some(config_path) = config {
        checks.push(check_file(config_path, "config", |content| {
            TourConfig::from_json(content)
                .map(|c| {
                    format!(
                        "Config valid ({} sustainable modes, {} km / {} km thresholds)",
                        c.sustainable_modes.modes().count(),
                        c.home_threshold_km,
                        c.work_threshold_km
                    )
                })
                .map_err(|e| e.to_string())
        }));
    }

    if let Some(profiles_path) = profiles {
        checks.push(check_file(profiles_path, "profiles", |content| {
            adapters::parse_profiles(content)
                .map(|p| format!("Profiles valid ({} users)", p.len()))
                .map_err(|e| e.to_string())
        }));
    }

    // Check stdin is available (for `-i -`)
    let stdin_check = if atty::is(atty::Stream::Stdin) {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a TTY (interactive mode)".to_string(),
        }
    } else {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a pipe (ready for --input -)".to_string(),
        }
    };
    checks.push(stdin_check);

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: TOURS_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Tours Doctor Report");
        println!("===================");
        println!("Producer: {}", report.producer);
        println!("Version:  {}", report.version);
        println!("\nChecks:");

        for check in &report.checks {
            let status_icon = match check.status {
                CheckStatus::Ok => "[OK]",
                CheckStatus::Warning => "[WARN]",
                CheckStatus::Error => "[ERR]",
            };
            println!("  {} {}: {}", status_icon, check.name, check.message);
        }
    }

    let has_errors = report
        .checks
        .iter()
        .any(|c| matches!(c.status, CheckStatus::Error));
    if has_errors {
        Err(ToursCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

fn check_file(
    path: &Path,
    name: &str,
    parse: impl Fn(&str) -> Result<String, String>,
) -> DoctorCheck {
    if !path.exists() {
        return DoctorCheck {
            name: name.to_string(),
            status: CheckStatus::Warning,
            message: format!("{} does not exist", path.display()),
        };
    }

    match fs::read_to_string(path) {
        Ok(content) => match parse(&content) {
            Ok(message) => DoctorCheck {
                name: name.to_string(),
                status: CheckStatus::Ok,
                message,
            },
            Err(e) => DoctorCheck {
                name: name.to_string(),
                status: CheckStatus::Error,
                message: format!("Invalid {}: {}", name, e),
            },
        },
        Err(e) => DoctorCheck {
            name: name.to_string(),
            status: CheckStatus::Error,
            message: format!("Cannot read {} file: {}", name, e),
        },
    }
}

fn cmd_schema(schema_type: SchemaType) -> Result<(), ToursCliError> {
    match schema_type {
        SchemaType::Input => {
            println!("Input: trip records (CSV columns or JSON fields)");
            println!();
            println!("- userId:      user identifier (required)");
            println!("- start_coord: \"(lat, lon)\" in decimal degrees");
            println!("- last_coord:  \"(lat, lon)\" in decimal degrees");
            println!("- mode:        label -> probability, e.g. {{'walking': 0.8, 'in_vehicle': 0.2}}");
            println!("- startTime:   RFC 3339 or YYYY-MM-DD HH:MM:SS (UTC)");
            println!("- endTime:     RFC 3339 or YYYY-MM-DD HH:MM:SS (UTC)");
            println!();
            println!("Profiles: {{ \"<userId>\": {{ home_lat, home_lon, work_lat, work_lon }} }}");
        }
        SchemaType::Output => {
            println!("Output: tour report");
            println!();
            println!("- report_version, computed_at_utc");
            println!("- producer: {{ name, version, instance_id }}");
            println!(
                "- summary: {{ users, tours, work_tours, total_points, rejected_users, invalid_records }}"
            );
            println!("- tours: Array of tours containing:");
            println!("  - user_id, tour_id, tour_type (Home-Work | Work-Home | Other)");
            println!("  - total_distance_km, modes_used, stop_types, leg_count");
            println!("  - started_at, ended_at, is_work_tour, points");
            println!("- bonus_points: {{ user_id, year, week, commuting_days, bonus_points }}");
            println!("- rejected: {{ user_id, error }}");
            println!("- invalid_records: {{ index, error }} for records without a userId");
        }
        SchemaType::Config => {
            println!("{}", TourConfig::default().to_json()?);
        }
    }

    Ok(())
}

// Helper functions

fn read_input(input: &Path) -> Result<String, ToursCliError> {
    if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

fn adapter_for(format: &InputFormat) -> Box<dyn TripRecordAdapter> {
    match format {
        InputFormat::Csv => Box::new(CsvTripAdapter),
        InputFormat::Json => Box::new(JsonTripAdapter),
        InputFormat::Ndjson => Box::new(NdjsonTripAdapter),
    }
}

fn format_output(report: &TourReport, format: &OutputFormat) -> Result<String, ToursCliError> {
    match format {
        OutputFormat::Ndjson => {
            let mut lines: Vec<String> = Vec::new();
            for tour in &report.tours {
                lines.push(serde_json::to_string(tour)?);
            }
            Ok(lines.join("\n") + "\n")
        }
        OutputFormat::Json => Ok(serde_json::to_string(report)?),
        OutputFormat::JsonPretty => Ok(serde_json::to_string_pretty(report)?),
    }
}

// Error types

#[derive(Debug)]
enum ToursCliError {
    Io(io::Error),
    Tour(tour_points::TourError),
    Json(serde_json::Error),
    NoTrips,
    UsersRejected(usize),
    RecordsSkipped(usize),
    ValidationFailed(usize),
    DoctorFailed,
}

impl From<io::Error> for ToursCliError {
    fn from(e: io::Error) -> Self {
        ToursCliError::Io(e)
    }
}

impl From<tour_points::TourError> for ToursCliError {
    fn from(e: tour_points::TourError) -> Self {
        ToursCliError::Tour(e)
    }
}

impl From<serde_json::Error> for ToursCliError {
    fn from(e: serde_json::Error) -> Self {
        ToursCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<ToursCliError> for CliError {
    fn from(e: ToursCliError) -> Self {
        match e {
            ToursCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            ToursCliError::Tour(e) => CliError {
                code: "TOUR_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Run 'tours validate' on the input for details".to_string()),
            },
            ToursCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            ToursCliError::NoTrips => CliError {
                code: "NO_TRIPS".to_string(),
                message: "No trip records found in input".to_string(),
                hint: Some("Ensure input file is not empty".to_string()),
            },
            ToursCliError::UsersRejected(count) => CliError {
                code: "USERS_REJECTED".to_string(),
                message: format!("{} users were rejected", count),
                hint: Some("See the 'rejected' section of the report".to_string()),
            },
            ToursCliError::RecordsSkipped(count) => CliError {
                code: "RECORDS_SKIPPED".to_string(),
                message: format!("{} records without a user id were skipped", count),
                hint: Some("See the 'invalid_records' section of the report".to_string()),
            },
            ToursCliError::ValidationFailed(count) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{} records failed validation", count),
                hint: Some("Fix validation errors and retry".to_string()),
            },
            ToursCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct ValidationReport {
    total_records: usize,
    valid_records: usize,
    invalid_records: usize,
    errors: Vec<ValidationErrorDetail>,
}

#[derive(serde::Serialize)]
struct ValidationErrorDetail {
    index: usize,
    user_id: Option<String>,
    error: String,
}

#[derive(serde::Serialize)]
struct DoctorReport {
    producer: String,
    version: String,
    checks: Vec<DoctorCheck>,
}

#[derive(serde::Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

#[derive(serde::Serialize)]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}
