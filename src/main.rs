//! jobdesc CLI Entry Point
//!
//! Turns a YAML/JSON job definition into an XML job descriptor.
//!
//! # Usage
//!
//! ```bash
//! # Print the descriptor
//! jobdesc job.yaml
//!
//! # Write it to a file
//! jobdesc job.yaml --output job.xml
//!
//! # Target an older schema
//! jobdesc job.yaml --schema 3.8
//!
//! # Only validate the definition
//! jobdesc job.yaml --check
//! ```

use std::env;
use std::io;
use std::process::ExitCode;

use colored::Colorize;
use log::{error, info};

use jobdesc::descriptor::SCHEMA_LATEST;
use jobdesc::{load_job, Job2XmlTransformer, Schema, APP_NAME, VERSION};

/// Command-line configuration parsed from arguments.
#[derive(Debug)]
struct Config {
    definition_path: Option<String>,
    output_path: Option<String>,
    schema_version: String,
    check_only: bool,
    verbose: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            definition_path: None,
            output_path: None,
            schema_version: SCHEMA_LATEST.to_string(),
            check_only: false,
            verbose: false,
        }
    }
}

/// Configures the logging system with appropriate formatting.
///
/// Logs go to stderr so the descriptor can be piped from stdout.
fn setup_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format(|buf, record| {
            use std::io::Write;

            match record.level() {
                log::Level::Warn | log::Level::Error => {
                    writeln!(buf, "[{}] {}", record.level(), record.args())
                }
                _ => writeln!(buf, "{}", record.args()),
            }
        })
        .target(env_logger::Target::Stderr)
        .init();
}

/// Prints the application banner with version information.
fn print_banner() {
    eprintln!();
    eprintln!("{} v{}", APP_NAME.bold(), VERSION);
    eprintln!("Task Flow Job Descriptor Generator");
    eprintln!();
}

/// Prints usage information.
fn print_usage() {
    println!("Usage: jobdesc [OPTIONS] <DEFINITION_FILE>");
    println!();
    println!("Arguments:");
    println!("  <DEFINITION_FILE>   Job definition (.yaml, .yml or .json)");
    println!();
    println!("Options:");
    println!("  --output PATH       Write the descriptor to PATH instead of stdout");
    println!("  --schema VERSION    Descriptor schema version (default: {})", SCHEMA_LATEST);
    println!("  --check             Validate the definition without writing a descriptor");
    println!("  --verbose           Enable debug logging");
    println!("  --help              Show this help message");
    println!("  --version           Show version information");
    println!();
    println!("Examples:");
    println!("  jobdesc job.yaml");
    println!("  jobdesc job.yaml --output job.xml");
    println!("  jobdesc job.json --schema 3.8 --check");
}

/// Parses command-line arguments into a Config struct.
fn parse_arguments(args: &[String]) -> Result<Config, String> {
    let mut config = Config::default();
    let mut i = 1; // Skip program name

    while i < args.len() {
        let arg = &args[i];

        match arg.as_str() {
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            "--version" | "-V" => {
                println!("{} {}", APP_NAME, VERSION);
                std::process::exit(0);
            }
            "--check" => {
                config.check_only = true;
            }
            "--verbose" | "-v" => {
                config.verbose = true;
            }
            "--output" | "-o" => {
                i += 1;
                if i >= args.len() {
                    return Err("--output requires a path argument".to_string());
                }
                config.output_path = Some(args[i].clone());
            }
            "--schema" => {
                i += 1;
                if i >= args.len() {
                    return Err("--schema requires a version argument".to_string());
                }
                config.schema_version = args[i].clone();
            }
            arg if arg.starts_with('-') => {
                return Err(format!("Unknown option: {}", arg));
            }
            _ => {
                if config.definition_path.is_some() {
                    return Err(format!("Unexpected argument: {}", arg));
                }
                config.definition_path = Some(arg.clone());
            }
        }
        i += 1;
    }

    if config.definition_path.is_none() {
        return Err("Missing job definition file".to_string());
    }

    Ok(config)
}

/// Main application entry point.
fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    // Parse arguments
    let config = parse_arguments(&args).map_err(|e| {
        print_usage();
        e
    })?;

    setup_logging(config.verbose);
    print_banner();

    let schema = Schema::from_version(&config.schema_version).ok_or_else(|| {
        let known: Vec<&str> = Schema::all().iter().map(Schema::version).collect();
        format!(
            "Unknown schema version '{}' (known: {})",
            config.schema_version,
            known.join(", ")
        )
    })?;
    info!("Target schema: {}", schema.namespace());

    // Checked in parse_arguments
    let definition_path = config.definition_path.unwrap_or_default();
    let job = load_job(&definition_path).map_err(|e| {
        error!("Failed to load job definition: {}", e);
        e
    })?;

    if config.check_only {
        eprintln!(
            "{} job '{}' is valid ({} tasks)",
            "OK".green().bold(),
            job.name(),
            job.len()
        );
        return Ok(());
    }

    let transformer = Job2XmlTransformer::with_schema(schema);
    match config.output_path {
        Some(path) => {
            transformer.write_to_file(&job, &path)?;
            eprintln!(
                "{} descriptor for job '{}' written to {}",
                "OK".green().bold(),
                job.name(),
                path
            );
        }
        None => {
            let stdout = io::stdout();
            transformer.write_to(&job, stdout.lock())?;
        }
    }

    Ok(())
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!();
            eprintln!("{} {}", "Error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}
