//! Report output: the stdout text summary and the optional JSON export.

use crate::aggregate::{CountsByGroup, InterArrivalSeries, MeanByGroup, PartitionKey};
use crate::loss::LossSummary;
use crate::record::DistributionType;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

/// Per distribution type line of the summary.
#[derive(Debug, Clone, Serialize)]
pub struct GroupSummary {
    pub distribution_type: DistributionType,
    pub name: Option<&'static str>,
    pub count: usize,
    /// Absent when no record in the group carries a delay.
    pub mean_delay_s: Option<f64>,
}

/// Per partition line of the summary.
#[derive(Debug, Clone, Serialize)]
pub struct SeriesSummary {
    pub partition: String,
    pub len: usize,
    pub filtered_len: usize,
    /// Time from the first to the last arrival.
    pub span_ms: f64,
    /// Mean gap between consecutive arrivals, absent with fewer than two arrivals.
    pub mean_inter_arrival_ms: Option<f64>,
}

/// Machine-readable result of one run.
#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub log_kind: String,
    pub input: PathBuf,
    pub generated_at: DateTime<Utc>,
    pub lines_read: usize,
    pub lines_skipped: usize,
    pub records: usize,
    pub threshold_ms: f64,
    pub groups: Vec<GroupSummary>,
    pub series: Vec<SeriesSummary>,
    pub loss: Option<LossSummary>,
}

impl Summary {
    pub fn new(log_kind: &str, input: &Path, threshold_ms: f64) -> Self {
        Self {
            log_kind: log_kind.to_string(),
            input: input.to_path_buf(),
            generated_at: Utc::now(),
            lines_read: 0,
            lines_skipped: 0,
            records: 0,
            threshold_ms,
            groups: Vec::new(),
            series: Vec::new(),
            loss: None,
        }
    }

    /// Fill `groups` from the grouped counts and means.
    pub fn with_groups(mut self, counts: &CountsByGroup, means: &MeanByGroup) -> Self {
        self.groups = counts
            .iter()
            .map(|(&dist, &count)| GroupSummary {
                distribution_type: dist,
                name: dist.name(),
                count,
                mean_delay_s: means.get(&dist).copied().flatten(),
            })
            .collect();
        self
    }

    /// Fill `series` from raw series and their filtered counterparts.
    pub fn with_series(
        mut self,
        raw: &BTreeMap<PartitionKey, InterArrivalSeries>,
        filtered: &BTreeMap<PartitionKey, Vec<f64>>,
    ) -> Self {
        self.series = raw
            .iter()
            .map(|(key, series)| SeriesSummary {
                partition: key.to_string(),
                len: series.len(),
                filtered_len: filtered.get(key).map_or(0, Vec::len),
                span_ms: series.span_ms(),
                mean_inter_arrival_ms: mean_gap(series),
            })
            .collect();
        self
    }
}

/// Mean of the gaps after the first arrival.
fn mean_gap(series: &InterArrivalSeries) -> Option<f64> {
    let gaps = series.points.get(1..)?;
    if gaps.is_empty() {
        return None;
    }
    Some(gaps.iter().map(|p| p.inter_arrival_ms).sum::<f64>() / gaps.len() as f64)
}

/// Errors produced while writing the JSON summary.
#[derive(Debug)]
pub enum ReportError {
    Write { path: PathBuf, source: std::io::Error },
    Serialize { source: serde_json::Error },
}

impl std::fmt::Display for ReportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReportError::Write { path, source } => {
                write!(f, "failed to write summary file {}: {source}", path.display())
            }
            ReportError::Serialize { source } => write!(f, "failed to serialize summary: {source}"),
        }
    }
}

impl std::error::Error for ReportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ReportError::Write { source, .. } => Some(source),
            ReportError::Serialize { source } => Some(source),
        }
    }
}

/// Write the summary as pretty-printed JSON.
pub fn write_json(path: &Path, summary: &Summary) -> Result<(), ReportError> {
    let json = serde_json::to_vec_pretty(summary).map_err(|e| ReportError::Serialize { source: e })?;
    std::fs::write(path, json).map_err(|e| ReportError::Write {
        path: path.to_path_buf(),
        source: e,
    })?;
    tracing::info!(path = %path.display(), "wrote summary");
    Ok(())
}

/// Counts and mean delays per distribution type, one block each.
pub fn format_group_stats(counts: &CountsByGroup, means: &MeanByGroup) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Packet counts by DistributionType:");
    for (dist, count) in counts {
        let _ = writeln!(out, "{dist:<8}{count}");
    }
    let _ = writeln!(out, "\nAverage Delay by DistributionType:");
    for (dist, mean) in means {
        match mean {
            Some(mean) => {
                let _ = writeln!(out, "{dist:<8}{mean}");
            }
            None => {
                let _ = writeln!(out, "{dist:<8}NaN");
            }
        }
    }
    out
}

/// One line per distribution type with its arrival count.
pub fn format_arrival_counts(counts: &CountsByGroup) -> String {
    let mut out = String::new();
    for (dist, count) in counts {
        let _ = match dist.name() {
            Some(name) => writeln!(
                out,
                "Packets arrived with {name} Distribution (Type {dist}): {count}"
            ),
            None => writeln!(out, "Packets arrived with Distribution Type {dist}: {count}"),
        };
    }
    out
}

/// One line per partition: arrivals, arrivals kept after filtering, mean gap.
pub fn format_series(summaries: &[SeriesSummary], threshold_ms: f64) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Inter-arrival times (kept below {threshold_ms} ms):");
    for s in summaries {
        let mean = match s.mean_inter_arrival_ms {
            Some(mean) => format!("{mean:.3} ms"),
            None => "NaN".to_string(),
        };
        let _ = writeln!(
            out,
            "{:<24}{:>8} arrivals{:>8} kept   mean gap {mean}",
            s.partition, s.len, s.filtered_len
        );
    }
    out
}

/// Sent/received/lost counters and the delivery ratio.
pub fn format_loss(summary: &LossSummary) -> String {
    let ratio = match summary.delivery_ratio() {
        Some(r) => format!("{:.2}%", r * 100.0),
        None => "NaN".to_string(),
    };
    format!(
        "Sent: {}\nReceived: {}\nLost: {}\nDelivery ratio: {ratio}\n",
        summary.sent,
        summary.received,
        summary.lost()
    )
}
