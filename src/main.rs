use anyhow::{Context, Result};
use clap::Parser;
use procstate_ledger::cli::{Cli, Command, OutputFormat};
use procstate_ledger::config::LedgerConfig;
use procstate_ledger::reader::UidTimeInStateReader;
use procstate_ledger::report::LedgerSnapshot;
use procstate_ledger::scenario::Scenario;
use std::path::Path;
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber for debug output
fn init_tracing(debug: bool) {
    if debug {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into()),
            )
            .with_writer(std::io::stderr)
            .init();
    }
}

fn print_snapshot(snapshot: &LedgerSnapshot, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => print!("{}", snapshot),
        OutputFormat::Json => println!(
            "{}",
            snapshot.to_json().context("Failed to serialize snapshot")?
        ),
    }
    Ok(())
}

fn run_replay(
    scenario: &Path,
    config: Option<&Path>,
    format: OutputFormat,
    strict: bool,
) -> Result<()> {
    let config = match config {
        Some(path) => LedgerConfig::from_toml(path)?,
        None => LedgerConfig::default(),
    };
    let outcome = Scenario::from_file(scenario)?.replay(config)?;

    for (i, tick) in outcome.ticks.iter().enumerate() {
        for failure in &tick.failures {
            eprintln!("tick {}: {}", i + 1, failure);
        }
    }

    print_snapshot(&outcome.ledger.snapshot(), format)?;

    let failures = outcome.failure_count();
    if strict && failures > 0 {
        anyhow::bail!("{} entity update(s) abandoned during replay", failures);
    }
    Ok(())
}

fn run_parse(file: &Path, format: OutputFormat) -> Result<()> {
    let parsed = UidTimeInStateReader::new(file)
        .load()
        .with_context(|| format!("Failed to load {}", file.display()))?;

    match format {
        OutputFormat::Text => {
            let freqs: Vec<String> = parsed.freqs.iter().map(ToString::to_string).collect();
            println!("frequencies: {}", freqs.join(" "));
            for (uid, times) in &parsed.times {
                let times: Vec<String> = times.iter().map(ToString::to_string).collect();
                println!("{:>8}: {}", uid, times.join(" "));
            }
        }
        OutputFormat::Json => {
            let value = serde_json::json!({
                "freqs": parsed.freqs,
                "times": parsed.times,
            });
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Cli::parse();

    // Initialize tracing if --debug flag is set
    init_tracing(args.debug);

    match args.command {
        Command::Replay {
            scenario,
            config,
            format,
            strict,
        } => run_replay(&scenario, config.as_deref(), format, strict),
        Command::Parse { file, format } => run_parse(&file, format),
    }
}
