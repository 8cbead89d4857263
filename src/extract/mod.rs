pub mod delimited;
pub mod pattern;

use crate::record::{DistributionType, LogRecord};
use serde::Deserialize;

pub use delimited::DelimitedExtractor;
pub use pattern::PatternExtractor;

/// Which simulator log a line comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogKind {
    /// `delayLog.txt`: per received packet, end-to-end delay.
    Delay,
    /// `incomingLog.txt`: per enqueued packet, source and queue length.
    Arrival,
    /// `MacDelayLog.txt`: per transmitted packet, MAC access delay.
    MacDelay,
}

impl LogKind {
    pub fn as_str(self) -> &'static str {
        match self {
            LogKind::Delay => "delay",
            LogKind::Arrival => "arrival",
            LogKind::MacDelay => "mac-delay",
        }
    }

    /// Field keys as they appear in the log text, in the simulator's column order.
    pub(crate) fn keys(self) -> &'static [(&'static str, Slot)] {
        match self {
            LogKind::Delay => &[
                ("Delay", Slot::Delay),
                ("PacketSize", Slot::PacketSize),
                ("DistributionType", Slot::DistributionType),
                ("Time", Slot::Time),
            ],
            LogKind::Arrival => &[
                ("Src", Slot::Source),
                ("DistributionType", Slot::DistributionType),
                ("Time", Slot::Time),
                ("queue-length", Slot::QueueLength),
            ],
            LogKind::MacDelay => &[
                ("Time", Slot::Time),
                ("MacDelay", Slot::Delay),
                ("queue-length", Slot::QueueLength),
                ("DistType", Slot::DistributionType),
            ],
        }
    }

    /// Convert captured text into a record, requiring every field this kind writes.
    pub(crate) fn build(self, raw: &RawFields<'_>) -> Result<LogRecord, UnparseableLine> {
        let mut record = LogRecord::default();
        for &(key, slot) in self.keys() {
            let text = raw.get(slot).ok_or(UnparseableLine::MissingField(key))?;
            match slot {
                Slot::Delay => record.delay = Some(parse_float(text).ok_or(UnparseableLine::InvalidValue(key))?),
                Slot::PacketSize => {
                    record.packet_size = Some(parse_uint(text).ok_or(UnparseableLine::InvalidValue(key))?)
                }
                Slot::DistributionType => {
                    let value = parse_uint(text).ok_or(UnparseableLine::InvalidValue(key))?;
                    record.distribution_type = Some(DistributionType(value));
                }
                Slot::Time => record.timestamp = Some(parse_time_ns(text).ok_or(UnparseableLine::InvalidValue(key))?),
                Slot::QueueLength => {
                    record.queue_length = Some(parse_packets(text).ok_or(UnparseableLine::InvalidValue(key))?)
                }
                Slot::Source => {
                    if !is_hex_colon_token(text) {
                        return Err(UnparseableLine::InvalidValue(key));
                    }
                    record.source_id = Some(text.to_string());
                }
            }
        }
        Ok(record)
    }
}

impl std::fmt::Display for LogKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Punctuation convention of a log file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Layout {
    /// Whitespace-separated `Key: value` tokens matched by a regex.
    #[default]
    Pattern,
    /// Delimiter-separated `Key: value` columns looked up by key.
    Delimited,
}

/// Format tag selecting an extraction strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogFormat {
    pub kind: LogKind,
    pub layout: Layout,
}

impl LogFormat {
    pub fn new(kind: LogKind, layout: Layout) -> Self {
        Self { kind, layout }
    }
}

/// The single recoverable failure of line extraction. Never leaves the extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnparseableLine {
    /// The line does not have the expected shape.
    NoMatch,
    /// A field this log kind requires is not present.
    MissingField(&'static str),
    /// A field is present but its value does not convert.
    InvalidValue(&'static str),
}

impl std::fmt::Display for UnparseableLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnparseableLine::NoMatch => write!(f, "line does not match the expected shape"),
            UnparseableLine::MissingField(key) => write!(f, "missing field {key}"),
            UnparseableLine::InvalidValue(key) => write!(f, "invalid value for {key}"),
        }
    }
}

impl std::error::Error for UnparseableLine {}

/// Turns raw log lines into typed records.
pub trait Extractor: Send + Sync {
    /// Strategy name (e.g., "pattern", "delimited").
    fn name(&self) -> &str;

    /// The log kind this extractor reads.
    fn kind(&self) -> LogKind;

    /// Parse one line, reporting why it was rejected.
    fn parse(&self, line: &str) -> Result<LogRecord, UnparseableLine>;

    /// Parse one line, dropping it silently when it does not fit.
    fn extract(&self, line: &str) -> Option<LogRecord> {
        match self.parse(line) {
            Ok(record) => Some(record),
            Err(reason) => {
                tracing::trace!(%reason, line, "skipping unparseable line");
                None
            }
        }
    }
}

/// Build the extractor for a format tag.
pub fn extractor_for(format: LogFormat, delimiter: char) -> Box<dyn Extractor> {
    match format.layout {
        Layout::Pattern => Box::new(PatternExtractor::new(format.kind)),
        Layout::Delimited => Box::new(DelimitedExtractor::with_delimiter(format.kind, delimiter)),
    }
}

/// Destination of a captured field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Slot {
    Delay,
    PacketSize,
    DistributionType,
    Time,
    QueueLength,
    Source,
}

/// Captured field text, before conversion.
#[derive(Debug, Default)]
pub(crate) struct RawFields<'a> {
    delay: Option<&'a str>,
    packet_size: Option<&'a str>,
    distribution_type: Option<&'a str>,
    time: Option<&'a str>,
    queue_length: Option<&'a str>,
    source: Option<&'a str>,
}

impl<'a> RawFields<'a> {
    /// Record a value; the first occurrence of a field wins.
    pub(crate) fn set(&mut self, slot: Slot, value: &'a str) {
        let target = match slot {
            Slot::Delay => &mut self.delay,
            Slot::PacketSize => &mut self.packet_size,
            Slot::DistributionType => &mut self.distribution_type,
            Slot::Time => &mut self.time,
            Slot::QueueLength => &mut self.queue_length,
            Slot::Source => &mut self.source,
        };
        target.get_or_insert(value);
    }

    fn get(&self, slot: Slot) -> Option<&'a str> {
        match slot {
            Slot::Delay => self.delay,
            Slot::PacketSize => self.packet_size,
            Slot::DistributionType => self.distribution_type,
            Slot::Time => self.time,
            Slot::QueueLength => self.queue_length,
            Slot::Source => self.source,
        }
    }
}

fn parse_float(text: &str) -> Option<f64> {
    text.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn parse_uint(text: &str) -> Option<u32> {
    if !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

/// `+1.5e+06ns` -> 1_500_000.0. The `ns` unit is mandatory, the sign is not.
fn parse_time_ns(text: &str) -> Option<f64> {
    let number = text.strip_suffix("ns")?;
    let number = number.strip_prefix('+').unwrap_or(number);
    if number.starts_with(['+', '-']) {
        return None;
    }
    parse_float(number)
}

/// `12p` -> 12. The `p` (packets) unit is mandatory.
fn parse_packets(text: &str) -> Option<u32> {
    parse_uint(text.strip_suffix('p')?)
}

/// Colon-separated hex octets, e.g. a MAC-48 address.
fn is_hex_colon_token(text: &str) -> bool {
    let mut octets = 0;
    for octet in text.split(':') {
        if octet.is_empty() || octet.len() > 2 || !octet.bytes().all(|b| b.is_ascii_hexdigit()) {
            return false;
        }
        octets += 1;
    }
    octets >= 2
}
