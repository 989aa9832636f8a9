use anyhow::Context;
use clap::{Arg, ArgAction, ArgMatches, Command};
use colored::*;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use pingsweep::{
    build_prober,
    config::SweepConfig,
    network::ProbeMethod,
    output::FileSink,
    scanner::{ScanOrchestrator, ScanSummary, WorkerExit},
    utils::{init_logging, LineIndex},
};

const VERSION: &str = env!("CARGO_PKG_VERSION");
const TARGET: &str = env!("PINGSWEEP_TARGET");

fn build_cli() -> Command {
    Command::new("pingsweep")
        .version(VERSION)
        .about("Concurrent ICMP reachability sweep over large address lists")
        .arg(
            Arg::new("input")
                .short('i')
                .long("input")
                .value_name("FILE")
                .help("File with IP addresses in consecutive lines [default: ips.txt]")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("FILE")
                .help("File receiving responsive IP addresses, one per line [default: good.txt]")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("threads")
                .short('t')
                .long("threads")
                .value_name("COUNT")
                .help("Number of concurrent workers [default: number of CPU cores]")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            Arg::new("errors")
                .short('e')
                .long("errors")
                .value_name("BUDGET")
                .help("Operational errors tolerated before workers abort (negative = unlimited) [default: -1]")
                .allow_negative_numbers(true)
                .value_parser(clap::value_parser!(i64)),
        )
        .arg(
            Arg::new("timeout")
                .long("timeout")
                .value_name("MS")
                .help("Probe timeout in milliseconds [default: 2000]")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new("method")
                .short('m')
                .long("method")
                .value_name("METHOD")
                .help("Probe implementation: system ping or native ICMP (needs root) [default: system]")
                .value_parser(["system", "icmp"]),
        )
        .arg(
            Arg::new("count")
                .short('n')
                .long("count")
                .value_name("LINES")
                .help("Only scan the first LINES addresses of the input")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("TOML configuration file [default: ~/.pingsweep.toml when present]")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("append")
                .short('a')
                .long("append")
                .help("Append to the output file instead of truncating it")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("silent")
                .short('s')
                .long("silent")
                .help("No log or summary output")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Verbose output")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("no-banner")
                .long("no-banner")
                .help("Hide the banner")
                .action(ArgAction::SetTrue),
        )
}

/// Config file first, then command line flags on top
fn resolve_config(matches: &ArgMatches) -> anyhow::Result<SweepConfig> {
    let mut config = match matches.get_one::<PathBuf>("config") {
        Some(path) => SweepConfig::from_toml_file(path)?,
        None => SweepConfig::load_default_config(),
    };

    if let Some(input) = matches.get_one::<PathBuf>("input") {
        config.input = input.clone();
    }
    if let Some(output) = matches.get_one::<PathBuf>("output") {
        config.output = output.clone();
    }
    if let Some(&threads) = matches.get_one::<usize>("threads") {
        config.threads = threads;
    }
    if let Some(&budget) = matches.get_one::<i64>("errors") {
        config.error_budget = budget;
    }
    if let Some(&timeout) = matches.get_one::<u64>("timeout") {
        config.timeout_ms = timeout;
    }
    if let Some(method) = matches.get_one::<String>("method") {
        config.method = method
            .parse::<ProbeMethod>()
            .map_err(anyhow::Error::msg)?;
    }
    if let Some(&count) = matches.get_one::<u64>("count") {
        config.count = Some(count);
    }
    if matches.get_flag("append") {
        config.append = true;
    }
    if matches.get_flag("silent") {
        config.silent = true;
    }

    config.validate()?;
    Ok(config)
}

fn print_banner() {
    println!(
        "{} {}",
        "Ping Scanner".bright_cyan().bold(),
        format!("v{} ({})", VERSION, TARGET).bright_blue()
    );
    println!();
}

fn print_summary(summary: &ScanSummary, config: &SweepConfig) {
    println!();
    println!("{}", "------------------------------------------------------".bright_blue());
    println!(
        "{} {}",
        "Responsive:".bright_green().bold(),
        summary.successful().to_string().bright_green()
    );
    println!(
        "{} {}",
        "Failed:    ".bright_red().bold(),
        summary.failed().to_string().bright_red()
    );
    if summary.unaccounted() > 0 {
        println!(
            "{} {}",
            "Skipped:   ".bright_yellow().bold(),
            summary.unaccounted().to_string().bright_yellow()
        );
    }
    println!(
        "{} {} ({} errors)",
        "Written:   ".bright_white().bold(),
        summary.written,
        summary.write_errors
    );

    for worker in &summary.workers {
        match worker.exit {
            WorkerExit::Completed => {}
            WorkerExit::BudgetExhausted { line } => println!(
                "{} thread {} {} stopped at line {} (error budget exhausted)",
                "[!]".bright_yellow(),
                worker.id,
                worker.range,
                line
            ),
            WorkerExit::SourceUnavailable => println!(
                "{} thread {} {} could not open the input",
                "[!]".bright_red(),
                worker.id,
                worker.range
            ),
        }
    }

    println!(
        "{} {:.2}s ({:.1} addresses/s), output: {}",
        "Duration:  ".bright_white().bold(),
        summary.duration.as_secs_f64(),
        summary.scan_rate(),
        config.output.display()
    );
    println!("{}", "------------------------------------------------------".bright_blue());
}

async fn run(config: SweepConfig) -> anyhow::Result<ScanSummary> {
    let index = LineIndex::build(&config.input)?;
    let count = index.resolve_count(config.count)?;
    let prober = build_prober(config.method)?;

    log::info!(
        "Read {} IP addresses from {}",
        count,
        config.input.display()
    );

    let sink = if config.append {
        FileSink::appending(&config.output)
    } else {
        FileSink::new(&config.output)
    };

    let orchestrator = ScanOrchestrator::new(config, Arc::new(index), prober)?;
    let summary = orchestrator
        .process_addresses(count, sink)
        .await
        .context("scan aborted")?;

    Ok(summary)
}

fn main() {
    let matches = build_cli().get_matches();

    let config = match resolve_config(&matches) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{} {}", "[!]".bright_red(), e);
            process::exit(1);
        }
    };

    init_logging(config.silent, matches.get_flag("verbose"));

    if !config.silent && !matches.get_flag("no-banner") {
        print_banner();
    }

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .max_blocking_threads(config.threads + 1)
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("{} failed to start runtime: {}", "[!]".bright_red(), e);
            process::exit(1);
        }
    };

    match runtime.block_on(run(config.clone())) {
        Ok(summary) => {
            if !config.silent {
                print_summary(&summary, &config);
            }
        }
        Err(e) => {
            if !config.silent {
                eprintln!("{} {:#}", "[!]".bright_red(), e);
            }
            process::exit(1);
        }
    }
}
