//! Subcommand pipelines: load a log, aggregate it, print the report, draw charts.
//!
//! Each pipeline returns the machine-readable summary; the caller decides
//! whether to write it out.

use crate::aggregate::{
    counts_by_group, delay_series_by_group, filter_series_below, inter_arrival_series,
    mean_by_group, queue_length_series, Partition, PartitionKey,
};
use crate::config::{AnalyzerConfig, ConfigError};
use crate::extract::{extractor_for, LogFormat, LogKind};
use crate::load::{load_lines, load_log, LoadError, ParsedLog};
use crate::loss::LossSummary;
use crate::plot::{self, AxisRange, Panel, PlotError};
use crate::record::LogRecord;
use crate::report::{self, ReportError, Summary};
use std::collections::BTreeMap;
use std::path::Path;

/// Errors that abort a run.
#[derive(Debug)]
pub enum RunError {
    Config(ConfigError),
    Load(LoadError),
    Plot(PlotError),
    Report(ReportError),
}

impl std::fmt::Display for RunError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunError::Config(e) => write!(f, "{e}"),
            RunError::Load(e) => write!(f, "{e}"),
            RunError::Plot(e) => write!(f, "{e}"),
            RunError::Report(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for RunError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RunError::Config(e) => Some(e),
            RunError::Load(e) => Some(e),
            RunError::Plot(e) => Some(e),
            RunError::Report(e) => Some(e),
        }
    }
}

impl From<ConfigError> for RunError {
    fn from(e: ConfigError) -> Self {
        RunError::Config(e)
    }
}

impl From<LoadError> for RunError {
    fn from(e: LoadError) -> Self {
        RunError::Load(e)
    }
}

impl From<PlotError> for RunError {
    fn from(e: PlotError) -> Self {
        RunError::Plot(e)
    }
}

impl From<ReportError> for RunError {
    fn from(e: ReportError) -> Self {
        RunError::Report(e)
    }
}

/// Settings shared by every pipeline.
pub struct RunContext<'a> {
    pub config: &'a AnalyzerConfig,
    pub charts: bool,
}

impl RunContext<'_> {
    fn load(&self, path: &Path, kind: LogKind) -> Result<ParsedLog, LoadError> {
        let inputs = &self.config.inputs;
        let extractor = extractor_for(LogFormat::new(kind, inputs.layout), inputs.delimiter);
        load_log(path, extractor.as_ref())
    }

    fn threshold(&self) -> f64 {
        self.config.analysis.inter_arrival_threshold_ms
    }

    fn summary(&self, kind: LogKind, path: &Path, parsed: &ParsedLog) -> Summary {
        let mut summary = Summary::new(kind.as_str(), path, self.threshold());
        summary.lines_read = parsed.lines_read;
        summary.lines_skipped = parsed.lines_skipped;
        summary.records = parsed.records.len();
        summary
    }

    /// Write a chart and log which group each panel shows, top to bottom.
    fn draw(&self, name: &Path, panels: Vec<(String, Panel)>) -> Result<(), PlotError> {
        if !self.charts {
            return Ok(());
        }
        let path = self.config.outputs.chart_path(name);
        let (labels, panels): (Vec<String>, Vec<Panel>) = panels.into_iter().unzip();
        for (index, label) in labels.iter().enumerate() {
            tracing::info!(chart = %path.display(), panel = index, group = %label, "chart panel");
        }
        plot::save(&path, &panels, &self.config.chart)
    }
}

/// One scatter panel per distribution type, all sharing the time axis.
fn delay_panels(records: &[LogRecord]) -> Vec<(String, Panel)> {
    let series = delay_series_by_group(records);
    let x_range = AxisRange::covering(series.values().flatten().map(|p| p.0));
    series
        .into_iter()
        .map(|(dist, points)| {
            let panel = Panel::Scatter {
                points,
                x_range: Some(x_range),
            };
            (PartitionKey::Distribution(dist).to_string(), panel)
        })
        .collect()
}

fn histogram_panels(filtered: BTreeMap<PartitionKey, Vec<f64>>, bins: usize) -> Vec<(String, Panel)> {
    filtered
        .into_iter()
        .map(|(key, values)| (key.to_string(), Panel::Histogram { values, bins }))
        .collect()
}

fn queue_panel(records: &[LogRecord]) -> (String, Panel) {
    let points = queue_length_series(records)
        .into_iter()
        .map(|(t, q)| (t, q as f64))
        .collect();
    ("queue length".to_string(), Panel::Line { points })
}

/// Delay log: counts and mean delay per type, delay-vs-time chart.
pub fn run_delay(ctx: &RunContext<'_>, path: &Path) -> Result<Summary, RunError> {
    let parsed = ctx.load(path, LogKind::Delay)?;
    let records = &parsed.records;

    let counts = counts_by_group(records);
    let means = mean_by_group(records);
    print!("{}", report::format_group_stats(&counts, &means));

    let raw = inter_arrival_series(records, Partition::Global);
    let filtered = filter_series_below(&raw, ctx.threshold());

    ctx.draw(&ctx.config.outputs.delay_chart, delay_panels(records))?;

    Ok(ctx
        .summary(LogKind::Delay, path, &parsed)
        .with_groups(&counts, &means)
        .with_series(&raw, &filtered))
}

/// Arrival log: inter-arrival histograms per type and queue length over time.
pub fn run_arrivals(ctx: &RunContext<'_>, path: &Path) -> Result<Summary, RunError> {
    let parsed = ctx.load(path, LogKind::Arrival)?;
    let records = &parsed.records;

    let counts = counts_by_group(records);
    print!("{}", report::format_arrival_counts(&counts));

    let raw = inter_arrival_series(records, Partition::DistributionType);
    let filtered = filter_series_below(&raw, ctx.threshold());
    let summary = ctx
        .summary(LogKind::Arrival, path, &parsed)
        .with_groups(&counts, &mean_by_group(records))
        .with_series(&raw, &filtered);
    print!("\n{}", report::format_series(&summary.series, ctx.threshold()));

    let mut panels = histogram_panels(filtered, ctx.config.analysis.histogram_bins);
    panels.push(queue_panel(records));
    ctx.draw(&ctx.config.outputs.arrival_chart, panels)?;

    Ok(summary)
}

/// Arrival log partitioned by source address.
pub fn run_sources(ctx: &RunContext<'_>, path: &Path) -> Result<Summary, RunError> {
    let parsed = ctx.load(path, LogKind::Arrival)?;
    let records = &parsed.records;

    let raw = inter_arrival_series(records, Partition::Source);
    let filtered = filter_series_below(&raw, ctx.threshold());
    let summary = ctx
        .summary(LogKind::Arrival, path, &parsed)
        .with_groups(&counts_by_group(records), &mean_by_group(records))
        .with_series(&raw, &filtered);
    print!("{}", report::format_series(&summary.series, ctx.threshold()));

    let panels = histogram_panels(filtered, ctx.config.analysis.histogram_bins);
    ctx.draw(&ctx.config.outputs.source_chart, panels)?;

    Ok(summary)
}

/// MAC delay log: mean MAC access delay per type, delay and queue charts.
pub fn run_mac_delay(ctx: &RunContext<'_>, path: &Path) -> Result<Summary, RunError> {
    let parsed = ctx.load(path, LogKind::MacDelay)?;
    let records = &parsed.records;

    let counts = counts_by_group(records);
    let means = mean_by_group(records);
    print!("{}", report::format_group_stats(&counts, &means));

    let raw = inter_arrival_series(records, Partition::DistributionType);
    let filtered = filter_series_below(&raw, ctx.threshold());

    let mut panels = delay_panels(records);
    panels.push(queue_panel(records));
    ctx.draw(&ctx.config.outputs.mac_delay_chart, panels)?;

    Ok(ctx
        .summary(LogKind::MacDelay, path, &parsed)
        .with_groups(&counts, &means)
        .with_series(&raw, &filtered))
}

/// Loss log: summed sent/received counters.
pub fn run_loss(ctx: &RunContext<'_>, path: &Path) -> Result<Summary, RunError> {
    let lines = load_lines(path)?;
    let loss = LossSummary::from_lines(lines.iter().map(String::as_str));
    print!("{}", report::format_loss(&loss));

    let mut summary = Summary::new("loss", path, ctx.threshold());
    summary.lines_read = lines.len();
    summary.records = lines.iter().filter(|l| LossSummary::parse(l).is_some()).count();
    summary.lines_skipped = summary.lines_read - summary.records;
    summary.loss = Some(loss);
    Ok(summary)
}
