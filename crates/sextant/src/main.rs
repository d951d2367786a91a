//! Sextant command line.
//!
//! Extracts the endpoint model from annotated handler units, reports
//! findings, exports the model as JSON and answers route lookups.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};

use sextant_compiler::{
    extract, ExtractOptions, Extraction, ParseOptions, ValidationContext,
};
use sextant_lib::input::{load_units, Inputs};
use sextant_lib::report::{LookupReport, ValidationReport};
use sextant_router::RouteMatch;
use sextant_telemetry::{
    log_export_written, log_extraction_completed, log_extraction_started, log_startup,
    log_unit_excluded, LogFormat, Telemetry, TelemetryConfig,
};

#[derive(Parser, Debug)]
#[command(
    name = "sextant",
    about = "Endpoint model extraction for annotated HTTP handlers",
    version
)]
struct Cli {
    /// Log level filter (RUST_LOG takes precedence).
    #[arg(long, global = true, default_value = "warn", env = "SEXTANT_LOG_LEVEL")]
    log_level: String,

    /// Log output format (pretty or json).
    #[arg(long, global = true, default_value = "pretty", value_parser = str::parse::<LogFormat>)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Extract and validate the endpoint model.
    ///
    /// Reports fatal unit errors (E2001-E2026) and findings (E2101-E2106).
    /// Exits with 1 when a unit is excluded or an error finding exists.
    Validate {
        #[command(flatten)]
        input: InputArgs,

        #[command(flatten)]
        extraction: ExtractionArgs,

        /// Output format (text or json).
        #[arg(long, default_value = "text")]
        format: String,

        /// Treat warning findings as errors.
        #[arg(long)]
        warnings_as_errors: bool,
    },

    /// Export the endpoint model, findings and errors as JSON.
    Export {
        #[command(flatten)]
        input: InputArgs,

        #[command(flatten)]
        extraction: ExtractionArgs,

        /// Output file (stdout when omitted).
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write compact JSON instead of pretty-printed.
        #[arg(long)]
        compact: bool,
    },

    /// Find the operation serving a route, or an operation by name.
    Lookup {
        #[command(flatten)]
        input: InputArgs,

        #[command(flatten)]
        extraction: ExtractionArgs,

        /// Route as "VERB PATH"; the path may be a template or a request path.
        #[arg(long, conflicts_with = "name", required_unless_present = "name")]
        route: Option<String>,

        /// Operation name.
        #[arg(long)]
        name: Option<String>,

        /// Output format (text or json).
        #[arg(long, default_value = "text")]
        format: String,
    },
}

#[derive(Args, Debug)]
#[group(required = true, multiple = true)]
struct InputArgs {
    /// Handler unit file(s) (YAML or JSON).
    #[arg(short, long, num_args = 1..)]
    units: Vec<PathBuf>,

    /// Source file(s) or directories to scan for annotated handlers.
    #[arg(short, long, num_args = 1..)]
    source: Vec<PathBuf>,
}

#[derive(Args, Debug)]
struct ExtractionArgs {
    /// Reject unknown annotations (E2009).
    #[arg(long)]
    strict: bool,

    /// Worker threads (default: available parallelism).
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Status code secured operations must declare.
    #[arg(long, default_value = "401")]
    unauthorized_status: u16,
}

impl InputArgs {
    fn inputs(&self) -> Inputs {
        Inputs {
            unit_files: self.units.clone(),
            sources: self.source.clone(),
        }
    }
}

impl ExtractionArgs {
    fn options(&self) -> ExtractOptions {
        let mut options = ExtractOptions::new()
            .with_parse(ParseOptions::new().with_strict(self.strict))
            .with_validation(
                ValidationContext::new().with_unauthorized_status(self.unauthorized_status),
            );
        if let Some(jobs) = self.jobs {
            options = options.with_parallelism(jobs);
        }
        options
    }
}

/// Load inputs and run one extraction. Returns the unit count too.
fn run_extraction(input: &InputArgs, args: &ExtractionArgs) -> Result<(Extraction, usize), ExitCode> {
    let units = match load_units(&input.inputs()) {
        Ok(units) => units,
        Err(e) => {
            eprintln!("error: {}", e);
            return Err(ExitCode::from(1));
        }
    };

    let options = args.options();
    log_extraction_started!(units = units.len(), parallelism = options.parallelism);

    let extraction = extract(&units, &options);

    for err in &extraction.errors {
        log_unit_excluded!(unit = %err.unit(), code = err.code(), error = %err);
    }
    log_extraction_completed!(
        operations = extraction.model.len(),
        findings = extraction.findings.len(),
        errors = extraction.errors.len()
    );

    Ok((extraction, units.len()))
}

/// Run the validate command.
fn run_validate(
    input: &InputArgs,
    args: &ExtractionArgs,
    output_format: &str,
    warnings_as_errors: bool,
) -> ExitCode {
    let (extraction, units) = match run_extraction(input, args) {
        Ok(result) => result,
        Err(code) => return code,
    };

    let report = ValidationReport::new(&extraction, units, warnings_as_errors);

    if output_format == "json" {
        match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("error: failed to render report: {}", e);
                return ExitCode::from(1);
            }
        }
    } else {
        eprint!("{}", report.to_text());
    }

    if report.valid {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    }
}

/// Run the export command.
fn run_export(
    input: &InputArgs,
    args: &ExtractionArgs,
    output: Option<&Path>,
    compact: bool,
) -> ExitCode {
    let (extraction, _) = match run_extraction(input, args) {
        Ok(result) => result,
        Err(code) => return code,
    };

    let rendered = if compact {
        extraction.to_json()
    } else {
        extraction.to_json_pretty()
    };
    let json = match rendered {
        Ok(json) => json,
        Err(e) => {
            eprintln!("error: failed to render export: {}", e);
            return ExitCode::from(1);
        }
    };

    match output {
        Some(path) => {
            if let Err(e) = std::fs::write(path, json + "\n") {
                eprintln!("error: failed to write {}: {}", path.display(), e);
                return ExitCode::from(1);
            }
            log_export_written!(path = %path.display(), operations = extraction.model.len());
            eprintln!(
                "exported {} operation(s) to {} ({} finding(s), {} excluded)",
                extraction.model.len(),
                path.display(),
                extraction.findings.len(),
                extraction.errors.len()
            );
        }
        None => println!("{}", json),
    }

    ExitCode::SUCCESS
}

/// Run the lookup command.
fn run_lookup(
    input: &InputArgs,
    args: &ExtractionArgs,
    route: Option<&str>,
    name: Option<&str>,
    output_format: &str,
) -> ExitCode {
    let (extraction, _) = match run_extraction(input, args) {
        Ok(result) => result,
        Err(code) => return code,
    };
    let model = &extraction.model;

    let report = match (route, name) {
        (Some(route), _) => {
            let Some((verb, path)) = route.trim().split_once(char::is_whitespace) else {
                eprintln!("error: route must be \"VERB PATH\", got '{}'", route);
                return ExitCode::from(2);
            };
            let path = path.trim();
            match model.lookup(verb, path) {
                RouteMatch::Found { entry, params } => match model.all().get(entry.operation_index) {
                    Some(operation) => LookupReport { operation, params },
                    None => {
                        eprintln!("error: route index is out of sync with the model");
                        return ExitCode::from(1);
                    }
                },
                RouteMatch::MethodNotAllowed { allowed } => {
                    eprintln!(
                        "no {} operation for {} (allowed: {})",
                        verb.to_uppercase(),
                        path,
                        allowed.join(", ")
                    );
                    return ExitCode::from(1);
                }
                RouteMatch::NotFound => {
                    eprintln!("no operation serves {} {}", verb.to_uppercase(), path);
                    return ExitCode::from(1);
                }
            }
        }
        (None, Some(name)) => match model.find_by_name(name) {
            Some(operation) => LookupReport {
                operation,
                params: Vec::new(),
            },
            None => {
                eprintln!("no operation named '{}'", name);
                return ExitCode::from(1);
            }
        },
        (None, None) => {
            eprintln!("error: one of --route or --name is required");
            return ExitCode::from(2);
        }
    };

    if output_format == "json" {
        match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("error: failed to render lookup: {}", e);
                return ExitCode::from(1);
            }
        }
    } else {
        print!("{}", report.to_text());
    }

    ExitCode::SUCCESS
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = TelemetryConfig::new()
        .with_log_level(&cli.log_level)
        .with_log_format(cli.log_format);
    let telemetry = match Telemetry::init(config) {
        Ok(telemetry) => telemetry,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::from(2);
        }
    };
    log_startup!(
        service = %telemetry.config().service_name,
        version = env!("CARGO_PKG_VERSION")
    );

    match cli.command {
        Commands::Validate {
            input,
            extraction,
            format,
            warnings_as_errors,
        } => run_validate(&input, &extraction, &format, warnings_as_errors),
        Commands::Export {
            input,
            extraction,
            output,
            compact,
        } => run_export(&input, &extraction, output.as_deref(), compact),
        Commands::Lookup {
            input,
            extraction,
            route,
            name,
            format,
        } => run_lookup(
            &input,
            &extraction,
            route.as_deref(),
            name.as_deref(),
            &format,
        ),
    }
}
