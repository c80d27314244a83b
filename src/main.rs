mod debug_report;

use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use huntcfg::{
    Catalog, ConfigError, Context, EvalError, Options, PuzzleStatus, parse_config, process_config_rules_verbose,
};
use std::io::{self, IsTerminal, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use thiserror::Error;

#[derive(Debug, Parser)]
#[command(name = "huntcfg", version)]
#[command(about = "Validate puzzle-hunt unlock configs and preview what a team would unlock")]
#[command(after_help = "Exit codes:\n  0  Success.\n  1  Internal error.\n  2  Invalid arguments, input or config.")]
struct Cli {
    /// Force ANSI color output
    #[arg(long, global = true, conflicts_with = "no_color")]
    color: bool,

    /// Disable ANSI color output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Parse and validate a config
    Check {
        #[command(flatten)]
        config: ConfigArgs,

        /// Print the resolved rules
        #[arg(long)]
        print: bool,
    },
    /// Evaluate a config against a team's puzzle statuses
    Eval {
        #[command(flatten)]
        config: ConfigArgs,

        /// JSON array of puzzle statuses (`puzzle_id`, `unlock_time`, `solve_time`)
        #[arg(long)]
        statuses: Option<PathBuf>,

        /// Hunt start time (RFC 3339)
        #[arg(long, value_parser = parse_time)]
        start: DateTime<Utc>,

        /// Playtest start time; replaces the hunt start when given
        #[arg(long, value_parser = parse_time)]
        playtest_start: Option<DateTime<Utc>>,

        /// Evaluation time (RFC 3339), defaults to the current time
        #[arg(long, value_parser = parse_time)]
        now: Option<DateTime<Utc>>,

        /// Apply rules even when `now` is before the start time
        #[arg(long)]
        include_before_start: bool,

        /// Print the outcome as JSON instead of a report
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Args)]
struct ConfigArgs {
    /// Config file, or `-` for stdin
    config: PathBuf,

    /// Known puzzle IDs, comma separated; without it any ID is accepted
    #[arg(long, value_delimiter = ',')]
    puzzles: Option<Vec<String>>,

    /// Display-order numbers, as `1=A1,2=B2`
    #[arg(long, value_delimiter = ',', value_parser = parse_order)]
    order: Vec<(u32, String)>,
}

impl ConfigArgs {
    fn catalog(&self) -> Catalog {
        let catalog = match &self.puzzles {
            Some(ids) => Catalog::new(ids.iter().map(|id| id.trim())),
            None => Catalog::any(),
        };
        catalog.with_order_numbers(self.order.iter().map(|(n, id)| (*n, id.as_str())))
    }
}

#[derive(Debug, Error)]
enum CliError {
    #[error("error: failed to read {path}: {source}")]
    Read { path: String, source: io::Error },
    #[error("error: invalid statuses file: {0}")]
    Statuses(#[source] serde_json::Error),
    #[error("internal error: failed to encode the outcome: {0}")]
    Output(#[source] serde_json::Error),
    #[error("error: {0}")]
    Config(#[from] ConfigError),
    #[error("internal error: {0}")]
    Eval(#[from] EvalError),
}

impl CliError {
    fn exit_code(&self) -> ExitCode {
        match self {
            CliError::Eval(_) | CliError::Output(_) => ExitCode::from(1),
            _ => ExitCode::from(2),
        }
    }
}

fn parse_time(value: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|_| format!("invalid time '{value}' (expected RFC 3339, e.g. 2025-01-10T17:00:00Z)"))
}

fn parse_order(value: &str) -> Result<(u32, String), String> {
    let (number, id) = value.split_once('=').ok_or_else(|| format!("invalid order entry '{value}' (expected N=ID)"))?;
    let number = number.trim().parse::<u32>().map_err(|_| format!("invalid order number in '{value}'"))?;
    Ok((number, id.trim().to_string()))
}

fn read_input(path: &Path) -> Result<String, CliError> {
    let read_error = |source| CliError::Read { path: path.display().to_string(), source };
    if path == Path::new("-") {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer).map_err(read_error)?;
        Ok(buffer)
    } else {
        std::fs::read_to_string(path).map_err(read_error)
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let color = if cli.color {
        true
    } else if cli.no_color {
        false
    } else {
        io::stdout().is_terminal()
    };

    match cli.command {
        Command::Check { config, print } => {
            let text = read_input(&config.config)?;
            let parsed = parse_config(&text, &config.catalog())?;
            debug_report::print_check(&config.config.display().to_string(), &parsed, print, color);
        }
        Command::Eval { config, statuses, start, playtest_start, now, include_before_start, json } => {
            let text = read_input(&config.config)?;
            let parsed = parse_config(&text, &config.catalog())?;
            let statuses: Vec<PuzzleStatus> = match &statuses {
                Some(path) => serde_json::from_str(&read_input(path)?).map_err(CliError::Statuses)?,
                None => Vec::new(),
            };

            let context = Context::for_team(start, playtest_start, now.unwrap_or_else(Utc::now));
            let options = Options { skip_before_start: !include_before_start };
            let report = process_config_rules_verbose(&parsed, &statuses, &context, &options)?;

            if json {
                let encoded = serde_json::to_string_pretty(&report.outcome).map_err(CliError::Output)?;
                println!("{encoded}");
            } else {
                debug_report::print_eval(&context, &report, color);
            }
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            err.exit_code()
        }
    }
}
