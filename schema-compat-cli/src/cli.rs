use anyhow::Result;
use clap::{Parser, Subcommand};
use schema_compat::{SchemaChecker, SubsetResult, format_result};
use std::io::Write;

use crate::loader::{load_config, load_document};

#[derive(Parser)]
#[command(name = "schema-compat")]
#[command(about = "JSON Schema (Draft-07) compatibility checks", long_about = None)]
pub struct Cli {
    /// Increase verbosity (can be used multiple times)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Path to optional checker config (JSON or YAML) to override defaults
    #[arg(long)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Check that every value accepted by `sub` is accepted by `sup`
    Check {
        #[arg(long)]
        sub: String,
        #[arg(long)]
        sup: String,
        /// Print a readable summary instead of JSON
        #[arg(long)]
        text: bool,
    },
    /// Check that a producer's output schema fits a consumer's input schema
    Connect {
        #[arg(long)]
        source: String,
        #[arg(long)]
        target: String,
        #[arg(long)]
        text: bool,
    },
    /// Compare two schemas for structural equality
    Equal {
        #[arg(long)]
        a: String,
        #[arg(long)]
        b: String,
    },
    /// Print the intersection of two schemas (null when empty)
    Intersect {
        #[arg(long)]
        a: String,
        #[arg(long)]
        b: String,
    },
    /// Print the canonical form of a schema
    Normalize {
        #[arg(long)]
        schema: String,
    },
    /// Resolve `if`/`then`/`else` against instance data
    Resolve {
        #[arg(long)]
        schema: String,
        #[arg(long)]
        data: String,
    },
    /// Resolve conditionals on both sides, then check `sub` against `sup`
    CheckResolved {
        #[arg(long)]
        sub: String,
        #[arg(long)]
        sup: String,
        #[arg(long)]
        sub_data: String,
        /// Data for `sup`; defaults to the `sub` data
        #[arg(long)]
        sup_data: Option<String>,
        #[arg(long)]
        text: bool,
    },
}

/// Run the CLI application
///
/// # Errors
///
/// Returns an error if command execution fails
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    run_with_cli(cli)
}

/// Execute CLI commands with a parsed Cli struct
/// This function is separated from `run()` to allow for testing
///
/// # Errors
///
/// Returns an error if:
/// - An input file cannot be read or parsed
/// - Writing the result to stdout fails
pub fn run_with_cli(cli: Cli) -> Result<()> {
    // WARNING (no -v), INFO (-v), DEBUG (-vv)
    let log_level = match cli.verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        _ => tracing::Level::DEBUG,
    };

    // Only initialize logging if not already initialized (for testing)
    let _ = tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();

    let config = load_config(cli.config.as_deref());
    tracing::info!("pattern samples per check: {}", config.pattern_sample_count);
    let checker = SchemaChecker::with_config(config);
    run_command(&checker, cli.command)
}

fn run_command(checker: &SchemaChecker, command: Commands) -> Result<()> {
    match command {
        Commands::Check { sub, sup, text } => {
            let result = checker.check(&load_document(&sub)?, &load_document(&sup)?);
            if text {
                print_text(&format_result(&format!("{sub} \u{2286} {sup}"), &result))?;
            } else {
                print_result(&result)?;
            }
        }
        Commands::Connect {
            source,
            target,
            text,
        } => {
            let result = checker.can_connect(&load_document(&source)?, &load_document(&target)?);
            if text {
                let label = format!("{source} \u{2192} {target}");
                print_text(&format_result(&label, &result.result))?;
            } else {
                print_result(&result)?;
            }
        }
        Commands::Equal { a, b } => {
            let equal = checker.is_equal(&load_document(&a)?, &load_document(&b)?);
            print_result(&serde_json::json!({ "equal": equal }))?;
        }
        Commands::Intersect { a, b } => {
            let merged = checker.intersect(&load_document(&a)?, &load_document(&b)?);
            print_result(&merged)?;
        }
        Commands::Normalize { schema } => {
            print_result(&checker.normalize(&load_document(&schema)?))?;
        }
        Commands::Resolve { schema, data } => {
            let result =
                checker.resolve_conditions(&load_document(&schema)?, &load_document(&data)?);
            print_result(&result)?;
        }
        Commands::CheckResolved {
            sub,
            sup,
            sub_data,
            sup_data,
            text,
        } => {
            let sup_data = sup_data.as_deref().map(load_document).transpose()?;
            let result = checker.check_resolved(
                &load_document(&sub)?,
                &load_document(&sup)?,
                &load_document(&sub_data)?,
                sup_data.as_ref(),
            );
            if text {
                print_text(&summary_label(&sub, &sup, &result.result))?;
            } else {
                print_result(&result)?;
            }
        }
    }

    Ok(())
}

fn summary_label(sub: &str, sup: &str, result: &SubsetResult) -> String {
    format_result(&format!("{sub} \u{2286} {sup} (resolved)"), result)
}

fn print_text(text: &str) -> Result<()> {
    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    writeln!(handle, "{text}")?;
    Ok(())
}

fn print_result<T: serde::Serialize>(value: &T) -> Result<()> {
    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    serde_json::to_writer_pretty(&mut handle, value)?;
    writeln!(handle)?;
    Ok(())
}
