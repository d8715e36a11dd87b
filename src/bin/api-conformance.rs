//! API Conformance CLI
//!
//! Command-line interface for checking captured exchanges against a
//! contract and for linting contracts.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use api_conformance::{
    lint_file, load_contract_auto, load_exchanges, CheckError, CheckerConfig, ContractChecker,
    Exchange, HttpRequest, HttpResponse, Report, Severity, SharedUsage,
};
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::json;
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "api-conformance")]
#[command(about = "Check HTTP traffic against an API contract")]
#[command(version)]
struct Cli {
    /// Log resolution decisions to stderr
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check captured exchanges against a contract
    Check {
        /// Contract source: file path or URL (http:// or https://)
        contract: String,

        /// Exchange files (JSON or YAML), each holding one exchange or a list
        #[arg(required = true)]
        exchanges: Vec<PathBuf>,

        /// Checker configuration file (JSON or YAML)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Base URI to use instead of the contract's
        #[arg(long)]
        base_uri: Option<String>,

        /// Stop each check at its first violation
        #[arg(long)]
        fail_fast: bool,

        /// Do not report undeclared x-* headers
        #[arg(long)]
        ignore_x_headers: bool,

        /// Output results as JSON (for automation)
        #[arg(long)]
        json: bool,

        /// Report contract elements no exchange used
        #[arg(long)]
        usage: bool,
    },

    /// Lint a contract for errors (templates, media types, schemas, security)
    Lint {
        /// Contract file to lint
        contract: PathBuf,

        /// Output format
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,

        /// Treat warnings as errors
        #[arg(long)]
        strict: bool,
    },
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Check {
            contract,
            exchanges,
            config,
            base_uri,
            fail_fast,
            ignore_x_headers,
            json,
            usage,
        } => run_check(CheckArgs {
            contract,
            exchanges,
            config,
            base_uri,
            fail_fast,
            ignore_x_headers,
            json_output: json,
            usage,
        }),
        Commands::Lint {
            contract,
            format,
            strict,
        } => run_lint(&contract, format, strict),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => ExitCode::from(code),
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

struct CheckArgs {
    contract: String,
    exchanges: Vec<PathBuf>,
    config: Option<PathBuf>,
    base_uri: Option<String>,
    fail_fast: bool,
    ignore_x_headers: bool,
    json_output: bool,
    usage: bool,
}

/// How a single check ended.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Completed,
    Aborted,
    Panicked,
}

/// Result of checking one exchange.
struct Checked {
    file: PathBuf,
    index: usize,
    method: String,
    url: String,
    report: Report,
    outcome: Outcome,
}

impl Checked {
    fn failed(&self) -> bool {
        self.outcome == Outcome::Panicked || !self.report.is_empty()
    }
}

fn check_exchange(checker: &ContractChecker, usage: &SharedUsage, exchange: &Exchange) -> (Report, Outcome) {
    let response = exchange.response.as_ref().map(|r| r as &dyn HttpResponse);
    let (report, outcome) = match checker.check(&exchange.request, response) {
        Ok(report) => (report, Outcome::Completed),
        Err(e @ CheckError::FailFast { .. }) => (e.into_report(), Outcome::Aborted),
    };
    usage.merge(&report.usage);
    (report, outcome)
}

fn run_check(args: CheckArgs) -> Result<(), u8> {
    let mut config = match &args.config {
        Some(path) => CheckerConfig::from_file(path).map_err(|e| {
            eprintln!("Error: loading config: {}", e);
            e.exit_code() as u8
        })?,
        None => CheckerConfig::default(),
    };
    if let Some(base_uri) = args.base_uri {
        config = config.base_uri(base_uri);
    }
    if args.fail_fast {
        config = config.fail_fast(true);
    }
    if args.ignore_x_headers {
        config = config.ignore_x_headers(true);
    }

    let api = load_contract_auto(&args.contract).map_err(|e| {
        eprintln!("Error: loading contract: {}", e);
        e.exit_code() as u8
    })?;
    let checker = ContractChecker::with_config(api, config);

    let mut loaded: Vec<(PathBuf, Vec<Exchange>)> = Vec::new();
    for path in &args.exchanges {
        let exchanges = load_exchanges(path).map_err(|e| {
            eprintln!("Error: loading {}: {}", path.display(), e);
            e.exit_code() as u8
        })?;
        debug!(file = %path.display(), count = exchanges.len(), "exchanges loaded");
        loaded.push((path.clone(), exchanges));
    }

    let usage = SharedUsage::new(checker.empty_usage());
    let jobs: Vec<(&PathBuf, usize, &Exchange)> = loaded
        .iter()
        .flat_map(|(file, exchanges)| {
            exchanges.iter().enumerate().map(move |(index, exchange)| (file, index, exchange))
        })
        .collect();
    let workers = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4);

    let mut results: Vec<Checked> = Vec::with_capacity(jobs.len());
    for batch in jobs.chunks(workers) {
        std::thread::scope(|s| {
            let handles: Vec<_> = batch
                .iter()
                .map(|&(file, index, exchange)| {
                    let (checker, usage) = (&checker, &usage);
                    let handle = s.spawn(move || check_exchange(checker, usage, exchange));
                    (file, index, exchange, handle)
                })
                .collect();
            for (file, index, exchange, handle) in handles {
                let (report, outcome) = match handle.join() {
                    Ok(checked) => checked,
                    Err(_) => {
                        error!(file = %file.display(), index, "check panicked");
                        (Report::default(), Outcome::Panicked)
                    }
                };
                results.push(Checked {
                    file: file.clone(),
                    index,
                    method: exchange.request.method().to_string(),
                    url: exchange.request.request_url().to_string(),
                    report,
                    outcome,
                });
            }
        });
    }

    let failed = results.iter().filter(|c| c.failed()).count();
    let coverage = usage.snapshot().coverage();

    if args.json_output {
        let exchanges: Vec<_> = results
            .iter()
            .map(|c| {
                json!({
                    "file": c.file,
                    "index": c.index,
                    "method": c.method,
                    "url": c.url,
                    "conforms": !c.failed(),
                    "aborted": c.outcome == Outcome::Aborted,
                    "panicked": c.outcome == Outcome::Panicked,
                    "request": c.report.request,
                    "response": c.report.response,
                })
            })
            .collect();
        let mut output = json!({
            "conforms": failed == 0,
            "validation": checker.contract_violations(),
            "exchanges": exchanges,
        });
        if args.usage {
            output["coverage"] = json!(coverage);
            output["unusedRatio"] = json!(coverage.unused_ratio());
        }
        println!("{}", output);
    } else {
        if !checker.contract_violations().is_empty() {
            println!("Contract validation:");
            for v in checker.contract_violations() {
                println!("  [{}] {}", v.key, v.message);
            }
            println!();
        }
        for c in &results {
            let status = match c.outcome {
                Outcome::Panicked => "FAIL (check panicked)",
                _ if c.failed() => "FAIL",
                _ => "ok",
            };
            println!("{} {} ({}#{}): {}", c.method, c.url, c.file.display(), c.index, status);
            for v in &c.report.request {
                println!("  request  [{}] {}", v.key, v.message);
            }
            for v in &c.report.response {
                println!("  response [{}] {}", v.key, v.message);
            }
        }
        if args.usage {
            println!();
            println!(
                "Unused: {} of {} contract elements ({:.0}%)",
                coverage.unused(),
                coverage.total,
                coverage.unused_ratio() * 100.0
            );
            let sections = [
                ("resources", &coverage.unused_resources),
                ("actions", &coverage.unused_actions),
                ("query parameters", &coverage.unused_query_parameters),
                ("request headers", &coverage.unused_request_headers),
                ("form parameters", &coverage.unused_form_parameters),
                ("response codes", &coverage.unused_response_codes),
                ("response headers", &coverage.unused_response_headers),
            ];
            for (label, unused) in sections {
                for entry in unused {
                    println!("  unused {}: {}", label, entry);
                }
            }
        }
        println!();
        println!("{} exchanges checked, {} failed", results.len(), failed);
    }

    if failed == 0 {
        Ok(())
    } else {
        Err(1)
    }
}

fn run_lint(path: &Path, format: Format, strict: bool) -> Result<(), u8> {
    let result = lint_file(path).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;

    match format {
        Format::Json => match serde_json::to_string_pretty(&result) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                eprintln!("Error serializing output: {}", e);
                return Err(2);
            }
        },
        Format::Text => {
            println!("Linting {} ...\n", path.display());
            for diag in &result.diagnostics {
                let (color, label) = match diag.severity {
                    Severity::Error => ("\x1b[31m", "error"),
                    Severity::Warning => ("\x1b[33m", "warning"),
                };
                println!("  {}{}[{}]\x1b[0m: {}", color, label, diag.code, diag.message);
            }
            println!();
            if result.is_ok(strict) {
                println!("\x1b[32m✓ contract passed\x1b[0m");
            } else {
                println!(
                    "\x1b[31m✗ contract failed ({} errors, {} warnings)\x1b[0m",
                    result.errors, result.warnings
                );
            }
        }
    }

    if result.is_ok(strict) {
        Ok(())
    } else {
        Err(1)
    }
}
