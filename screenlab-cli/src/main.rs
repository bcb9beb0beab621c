//! screenlab CLI — operate the scan engine from a terminal.
//!
//! Commands:
//! - `strategies` — list registered strategies
//! - `schema` — print a strategy's parameter fields, bounds, and defaults
//! - `scan` — load bars from CSV, run a scan, emit signals as JSON

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

use screenlab_core::domain::{Bar, SignalKind};
use screenlab_core::engine::{ScanEngine, ScanRequest};
use screenlab_core::strategy::params::ParamMap;
use screenlab_core::strategy::StrategyRegistry;

#[derive(Parser)]
#[command(name = "screenlab", about = "screenlab CLI — daily OHLCV signal scanner")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List registered strategies.
    Strategies,
    /// Print a strategy's parameter schema.
    Schema {
        /// Strategy name (see `strategies`).
        name: String,
    },
    /// Scan a CSV bar file and print detected signals as JSON.
    Scan {
        /// CSV file with columns: symbol,date,open,high,low,close,volume.
        #[arg(long)]
        data: PathBuf,

        /// Strategy to run.
        #[arg(long, default_value = "trend_pulse")]
        strategy: String,

        /// TOML file with flat numeric parameter overrides.
        #[arg(long)]
        params: Option<PathBuf>,

        /// Restrict the scan to these symbols.
        #[arg(long, num_args = 1..)]
        symbols: Option<Vec<String>>,

        /// Keep only these signal kinds (e.g. golden_breakout).
        #[arg(long, num_args = 1..)]
        kinds: Option<Vec<String>>,

        /// Pretty-print the JSON output.
        #[arg(long, default_value_t = false)]
        pretty: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let registry = StrategyRegistry::with_builtins()?;

    match cli.command {
        Commands::Strategies => run_strategies(&registry),
        Commands::Schema { name } => run_schema(&registry, &name),
        Commands::Scan {
            data,
            strategy,
            params,
            symbols,
            kinds,
            pretty,
        } => run_scan(&registry, &data, strategy, params, symbols, kinds, pretty),
    }
}

fn run_strategies(registry: &StrategyRegistry) -> Result<()> {
    println!("{:<16} {:<16} Description", "Name", "Display");
    println!("{}", "-".repeat(72));
    for info in registry.list() {
        let first_line = info.description.lines().next().unwrap_or_default();
        println!("{:<16} {:<16} {}", info.name, info.display_name, first_line);
    }
    Ok(())
}

fn run_schema(registry: &StrategyRegistry, name: &str) -> Result<()> {
    let Some(strategy) = registry.get(name) else {
        bail!(
            "strategy '{name}' not found. Available: {}",
            registry.names().join(", ")
        );
    };

    println!("{} — {}", strategy.name(), strategy.display_name());
    println!();
    println!(
        "{:<16} {:>10} {:>10} {:>10}  Description",
        "Field", "Default", "Min", "Max"
    );
    println!("{}", "-".repeat(78));
    for field in strategy.schema().fields() {
        println!(
            "{:<16} {:>10} {:>10} {:>10}  {}",
            field.name, field.default, field.min, field.max, field.description
        );
    }
    Ok(())
}

fn run_scan(
    registry: &StrategyRegistry,
    data: &Path,
    strategy: String,
    params: Option<PathBuf>,
    symbols: Option<Vec<String>>,
    kinds: Option<Vec<String>>,
    pretty: bool,
) -> Result<()> {
    let bars = load_bars(data)?;
    if bars.is_empty() {
        bail!("no bars found in {}", data.display());
    }

    let kinds = kinds
        .map(|names| {
            names
                .iter()
                .map(|s| s.parse::<SignalKind>())
                .collect::<Result<Vec<_>, _>>()
        })
        .transpose()?;

    let request = ScanRequest {
        strategy,
        overrides: params.as_deref().map(load_overrides).transpose()?.unwrap_or_default(),
        symbols,
        kinds,
    };

    let signals = ScanEngine::new(registry).run(&request, &bars)?;

    let json = if pretty {
        serde_json::to_string_pretty(&signals)?
    } else {
        serde_json::to_string(&signals)?
    };
    println!("{json}");

    Ok(())
}

/// CSV row shape; dates are ISO `YYYY-MM-DD`.
#[derive(Debug, Deserialize)]
struct CsvBar {
    symbol: String,
    date: NaiveDate,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: u64,
}

fn load_bars(path: &Path) -> Result<Vec<Bar>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("cannot open {}", path.display()))?;

    let mut bars = Vec::new();
    for (line, record) in reader.deserialize::<CsvBar>().enumerate() {
        let row = record.with_context(|| format!("bad bar record at line {}", line + 2))?;
        bars.push(Bar {
            symbol: row.symbol,
            date: row.date,
            open: row.open,
            high: row.high,
            low: row.low,
            close: row.close,
            volume: row.volume,
        });
    }
    Ok(bars)
}

/// Flat TOML table of numeric overrides, e.g. `fib_len = 89`.
fn load_overrides(path: &Path) -> Result<ParamMap> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read {}", path.display()))?;
    let table: BTreeMap<String, toml::Value> =
        toml::from_str(&content).context("overrides must be a flat TOML table")?;

    let mut overrides = ParamMap::new();
    for (key, value) in table {
        let number = match value {
            toml::Value::Integer(n) => n as f64,
            toml::Value::Float(n) => n,
            other => bail!("override '{key}' must be numeric, got {other}"),
        };
        overrides.insert(key, number);
    }
    Ok(overrides)
}
