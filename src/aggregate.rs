//! Grouped statistics and inter-arrival series over extracted records.
//!
//! Everything here is a pure function of the record slice: no I/O, no state.
//! Empty input produces empty maps and series.

use crate::record::{DistributionType, LogRecord};
use std::collections::BTreeMap;

/// Nanoseconds per millisecond.
const NS_PER_MS: f64 = 1_000_000.0;

/// Number of records per distribution type.
pub type CountsByGroup = BTreeMap<DistributionType, usize>;

/// Mean delay per distribution type; `None` when no record in the group has a delay.
pub type MeanByGroup = BTreeMap<DistributionType, Option<f64>>;

/// How records are split before computing inter-arrival times.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Partition {
    /// All records in one series.
    Global,
    /// One series per distribution type.
    DistributionType,
    /// One series per source address.
    Source,
}

/// Key of one partition.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PartitionKey {
    All,
    Distribution(DistributionType),
    Source(String),
}

impl std::fmt::Display for PartitionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PartitionKey::All => write!(f, "all"),
            PartitionKey::Distribution(dist) => match dist.name() {
                Some(name) => write!(f, "{name} (type {dist})"),
                None => write!(f, "type {dist}"),
            },
            PartitionKey::Source(source) => write!(f, "{source}"),
        }
    }
}

/// One arrival in a time-ordered series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArrivalPoint {
    pub timestamp_ns: f64,
    /// Gap to the previous arrival in the same series, in milliseconds.
    pub inter_arrival_ms: f64,
}

/// Time-ordered arrivals of one partition.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InterArrivalSeries {
    pub points: Vec<ArrivalPoint>,
}

impl InterArrivalSeries {
    /// Build a series from unsorted timestamps.
    fn from_arrivals(mut arrivals: Vec<f64>) -> Self {
        arrivals.sort_by(|a, b| a.total_cmp(b));

        let mut points = Vec::with_capacity(arrivals.len());
        let mut previous: Option<f64> = None;
        for timestamp_ns in arrivals {
            let inter_arrival_ms = match previous {
                Some(prev) => (timestamp_ns - prev) / NS_PER_MS,
                None => 0.0,
            };
            points.push(ArrivalPoint {
                timestamp_ns,
                inter_arrival_ms,
            });
            previous = Some(timestamp_ns);
        }
        Self { points }
    }

    /// Inter-arrival values in milliseconds, first one zero.
    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.inter_arrival_ms).collect()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Time between the first and last arrival in milliseconds, zero for fewer than two.
    pub fn span_ms(&self) -> f64 {
        match (self.points.first(), self.points.last()) {
            (Some(first), Some(last)) => (last.timestamp_ns - first.timestamp_ns) / NS_PER_MS,
            _ => 0.0,
        }
    }
}

/// Count records per distribution type. Records without a type are not counted.
pub fn counts_by_group(records: &[LogRecord]) -> CountsByGroup {
    let mut counts = CountsByGroup::new();
    for dist in records.iter().filter_map(|r| r.distribution_type) {
        *counts.entry(dist).or_insert(0) += 1;
    }
    counts
}

/// Arithmetic mean of `delay` per distribution type.
///
/// Every group that has at least one record appears in the result; groups
/// whose records carry no delay map to `None` rather than zero.
pub fn mean_by_group(records: &[LogRecord]) -> MeanByGroup {
    let mut sums: BTreeMap<DistributionType, (f64, usize)> = BTreeMap::new();
    for record in records {
        let Some(dist) = record.distribution_type else {
            continue;
        };
        let entry = sums.entry(dist).or_insert((0.0, 0));
        if let Some(delay) = record.delay {
            entry.0 += delay;
            entry.1 += 1;
        }
    }

    sums.into_iter()
        .map(|(dist, (sum, n))| (dist, (n > 0).then(|| sum / n as f64)))
        .collect()
}

fn partition_key(record: &LogRecord, partition: Partition) -> Option<PartitionKey> {
    match partition {
        Partition::Global => Some(PartitionKey::All),
        Partition::DistributionType => record.distribution_type.map(PartitionKey::Distribution),
        Partition::Source => record.source_id.clone().map(PartitionKey::Source),
    }
}

/// Per-partition inter-arrival series.
///
/// Each partition is sorted by timestamp on its own, independent of file
/// order. Records without a timestamp, or without the partition's key, are
/// left out.
pub fn inter_arrival_series(
    records: &[LogRecord],
    partition: Partition,
) -> BTreeMap<PartitionKey, InterArrivalSeries> {
    let mut groups: BTreeMap<PartitionKey, Vec<f64>> = BTreeMap::new();
    for record in records {
        let Some(timestamp) = record.timestamp else {
            continue;
        };
        if let Some(key) = partition_key(record, partition) {
            groups
                .entry(key)
                .or_default()
                .push(timestamp);
        }
    }

    groups
        .into_iter()
        .map(|(key, arrivals)| (key, InterArrivalSeries::from_arrivals(arrivals)))
        .collect()
}

/// Values strictly below `threshold_ms`, in their original order.
pub fn filter_below(values: &[f64], threshold_ms: f64) -> Vec<f64> {
    values.iter().copied().filter(|v| *v < threshold_ms).collect()
}

/// Apply [`filter_below`] to every series, leaving the raw series untouched.
pub fn filter_series_below(
    series: &BTreeMap<PartitionKey, InterArrivalSeries>,
    threshold_ms: f64,
) -> BTreeMap<PartitionKey, Vec<f64>> {
    series
        .iter()
        .map(|(key, s)| (key.clone(), filter_below(&s.values(), threshold_ms)))
        .collect()
}

/// (timestamp ns, queue length) for every record that has both, sorted by time.
pub fn queue_length_series(records: &[LogRecord]) -> Vec<(f64, u32)> {
    let mut series: Vec<(f64, u32)> = records
        .iter()
        .filter_map(|r| Some((r.timestamp?, r.queue_length?)))
        .collect();
    series.sort_by(|a, b| a.0.total_cmp(&b.0));
    series
}

/// (timestamp ns, delay s) per distribution type, in file order.
pub fn delay_series_by_group(records: &[LogRecord]) -> BTreeMap<DistributionType, Vec<(f64, f64)>> {
    let mut series: BTreeMap<DistributionType, Vec<(f64, f64)>> = BTreeMap::new();
    for record in records {
        if let (Some(dist), Some(time), Some(delay)) =
            (record.distribution_type, record.timestamp, record.delay)
        {
            series.entry(dist).or_default().push((time, delay));
        }
    }
    series
}
