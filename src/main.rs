mod aggregate;
mod commands;
mod config;
mod extract;
mod load;
mod loss;
mod plot;
mod record;
mod report;

use clap::{Parser, Subcommand};
use commands::{RunContext, RunError};
use config::AnalyzerConfig;
use extract::Layout;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG: &str = "simlog.toml";

/// Summarise network simulator logs: packet delays, arrival patterns,
/// per-source inter-arrival times and loss counters, with PNG charts.
#[derive(Parser, Debug)]
#[command(name = "simlog-stats", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Config file path (default: simlog.toml, used only if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Line layout of the log files (overrides config)
    #[arg(long, value_enum, global = true)]
    layout: Option<Layout>,

    /// Keep inter-arrival times strictly below this many milliseconds (overrides config)
    #[arg(long, global = true)]
    threshold: Option<f64>,

    /// Directory for charts (overrides config)
    #[arg(short, long, global = true)]
    output_dir: Option<PathBuf>,

    /// Also write the summary as JSON to this path
    #[arg(long, value_name = "PATH", global = true)]
    json: Option<PathBuf>,

    /// Skip chart rendering
    #[arg(long, global = true)]
    no_charts: bool,

    /// Validate config and print resolved settings, don't run
    #[arg(long, global = true)]
    dry_run: bool,

    /// Debug logging (per-file line accounting)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// End-to-end delay log: counts, mean delay and delay-vs-time per distribution type
    Delay {
        /// Log file (default: from config)
        path: Option<PathBuf>,
    },
    /// Arrival log: inter-arrival histograms per distribution type and queue length
    Arrivals { path: Option<PathBuf> },
    /// Arrival log: inter-arrival histograms per source address
    Sources { path: Option<PathBuf> },
    /// MAC delay log: mean access delay per distribution type and queue length
    MacDelay { path: Option<PathBuf> },
    /// Loss log: total sent, received and lost packets
    Loss { path: Option<PathBuf> },
}

impl Command {
    /// The explicit path, or the configured default for this log kind.
    fn input<'a>(&'a self, config: &'a AnalyzerConfig) -> &'a Path {
        let (path, default) = match self {
            Command::Delay { path } => (path, &config.inputs.delay_log),
            Command::Arrivals { path } | Command::Sources { path } => (path, &config.inputs.arrival_log),
            Command::MacDelay { path } => (path, &config.inputs.mac_delay_log),
            Command::Loss { path } => (path, &config.inputs.loss_log),
        };
        path.as_deref().unwrap_or(default.as_path())
    }
}

fn init_tracing(cli: &Cli) {
    let fallback = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "warn"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Load the config file and apply command-line overrides.
fn resolve_config(cli: &Cli) -> Result<AnalyzerConfig, RunError> {
    let (path, required) = match &cli.config {
        Some(path) => (path.as_path(), true),
        None => (Path::new(DEFAULT_CONFIG), false),
    };
    let mut config = AnalyzerConfig::load_or_default(path, required)?;

    if let Some(layout) = cli.layout {
        config.inputs.layout = layout;
    }
    if let Some(threshold) = cli.threshold {
        config.analysis.inter_arrival_threshold_ms = threshold;
    }
    if let Some(dir) = &cli.output_dir {
        config.outputs.dir = dir.clone();
    }
    config.validate()?;
    Ok(config)
}

fn print_settings(cli: &Cli, config: &AnalyzerConfig) {
    println!("simlog-stats v{}", env!("CARGO_PKG_VERSION"));
    println!("Input: {}", cli.command.input(config).display());
    println!("Layout: {:?}", config.inputs.layout);
    println!("Delimiter: {:?}", config.inputs.delimiter);
    println!("Threshold: {} ms", config.analysis.inter_arrival_threshold_ms);
    println!("Histogram bins: {}", config.analysis.histogram_bins);
    println!(
        "Charts: {}",
        if cli.no_charts {
            "disabled".to_string()
        } else {
            format!(
                "{} ({}x{} per panel)",
                config.outputs.dir.display(),
                config.chart.width,
                config.chart.panel_height
            )
        }
    );
    if let Some(json) = &cli.json {
        println!("Summary: {}", json.display());
    }
    println!("Dry run: config validated, not running.");
}

fn run(cli: &Cli) -> Result<(), RunError> {
    let config = resolve_config(cli)?;
    tracing::debug!(?config, "resolved configuration");

    if cli.dry_run {
        print_settings(cli, &config);
        return Ok(());
    }

    let ctx = RunContext {
        config: &config,
        charts: !cli.no_charts,
    };
    let input = cli.command.input(&config);
    let summary = match &cli.command {
        Command::Delay { .. } => commands::run_delay(&ctx, input)?,
        Command::Arrivals { .. } => commands::run_arrivals(&ctx, input)?,
        Command::Sources { .. } => commands::run_sources(&ctx, input)?,
        Command::MacDelay { .. } => commands::run_mac_delay(&ctx, input)?,
        Command::Loss { .. } => commands::run_loss(&ctx, input)?,
    };
    tracing::info!(
        kind = %summary.log_kind,
        records = summary.records,
        skipped = summary.lines_skipped,
        "analysis complete"
    );

    if let Some(json) = &cli.json {
        report::write_json(json, &summary)?;
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli);
    tracing::debug!(?cli, "parsed CLI arguments");

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("simlog-stats: {e}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn cli_overrides_apply_after_config_file() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("simlog.toml");
        std::fs::write(
            &config_path,
            "[analysis]\ninter_arrival_threshold_ms = 50.0\n\n[inputs]\nlayout = \"delimited\"\n",
        )
        .unwrap();
        let out = dir.path().join("out");
        let cli = Cli::parse_from([
            "simlog-stats",
            "arrivals",
            "--config",
            config_path.to_str().unwrap(),
            "--threshold",
            "25",
            "-o",
            out.to_str().unwrap(),
        ]);
        let config = resolve_config(&cli).unwrap();
        assert_eq!(config.analysis.inter_arrival_threshold_ms, 25.0);
        assert_eq!(config.inputs.layout, Layout::Delimited);
        assert_eq!(config.outputs.dir, out);
        assert_eq!(cli.command.input(&config), Path::new("incomingLog.txt"));
    }

    #[test]
    fn explicit_missing_config_is_an_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope.toml");
        let cli = Cli::parse_from(["simlog-stats", "delay", "-c", missing.to_str().unwrap()]);
        assert!(matches!(resolve_config(&cli), Err(RunError::Config(_))));
    }

    #[test]
    fn invalid_threshold_override_is_rejected() {
        let cli = Cli::parse_from(["simlog-stats", "loss", "--threshold=-1"]);
        let err = resolve_config(&cli).unwrap_err();
        assert!(err.to_string().contains("inter_arrival_threshold_ms"));
    }

    #[test]
    fn positional_path_overrides_configured_input() {
        let cli = Cli::parse_from(["simlog-stats", "mac-delay", "run1/MacDelayLog.txt"]);
        let config = AnalyzerConfig::default();
        assert_eq!(cli.command.input(&config), Path::new("run1/MacDelayLog.txt"));
        let cli = Cli::parse_from(["simlog-stats", "sources"]);
        assert_eq!(cli.command.input(&config), Path::new("incomingLog.txt"));
    }

    #[test]
    fn verbose_and_quiet_conflict() {
        assert!(Cli::try_parse_from(["simlog-stats", "delay", "-v", "-q"]).is_err());
    }
}
