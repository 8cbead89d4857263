use super::{Extractor, LogKind, RawFields, Slot, UnparseableLine};
use crate::record::LogRecord;
use regex::{Captures, Regex};
use std::sync::LazyLock;

/// Compiled line patterns, one per log kind.
///
/// Whitespace after a key's colon is optional; fields are separated by at
/// least one whitespace character.
///
/// Floats may use scientific notation. Times carry the `ns` unit and
/// queue lengths the `p` unit; the unit is part of the capture so both
/// strategies share the same conversion.
static DELAY_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"Delay:\s*(?P<delay>[-+]?(?:\d+\.?\d*|\.\d+)(?:[eE][-+]?\d+)?)\s+",
        r"PacketSize:\s*(?P<packet_size>\d+)\s+",
        r"DistributionType:\s*(?P<distribution_type>\d+)\s+",
        r"Time:\s*(?P<time>\+?(?:\d+\.?\d*|\.\d+)(?:[eE][-+]?\d+)?ns)\b",
    ))
    .unwrap()
});

static ARRIVAL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"Src:\s*(?P<source>[0-9A-Fa-f]{1,2}(?::[0-9A-Fa-f]{1,2})+)\s+",
        r"DistributionType:\s*(?P<distribution_type>\d+)\s+",
        r"Time:\s*(?P<time>\+?(?:\d+\.?\d*|\.\d+)(?:[eE][-+]?\d+)?ns)\s+",
        r"queue-length:\s*(?P<queue_length>\d+p)\b",
    ))
    .unwrap()
});

static MAC_DELAY_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"Time:\s*(?P<time>\+?(?:\d+\.?\d*|\.\d+)(?:[eE][-+]?\d+)?ns)\s+",
        r"MacDelay:\s*(?P<delay>[-+]?(?:\d+\.?\d*|\.\d+)(?:[eE][-+]?\d+)?)\s+",
        r"queue-length:\s*(?P<queue_length>\d+p)\s+",
        r"DistType:\s*(?P<distribution_type>\d+)\b",
    ))
    .unwrap()
});

/// Capture group name for each slot.
const GROUPS: &[(&str, Slot)] = &[
    ("delay", Slot::Delay),
    ("packet_size", Slot::PacketSize),
    ("distribution_type", Slot::DistributionType),
    ("time", Slot::Time),
    ("queue_length", Slot::QueueLength),
    ("source", Slot::Source),
];

/// Regex strategy: the line must contain the kind's fields in order,
/// separated by any whitespace.
pub struct PatternExtractor {
    kind: LogKind,
    regex: &'static Regex,
}

impl PatternExtractor {
    pub fn new(kind: LogKind) -> Self {
        let regex: &'static Regex = match kind {
            LogKind::Delay => &DELAY_PATTERN,
            LogKind::Arrival => &ARRIVAL_PATTERN,
            LogKind::MacDelay => &MAC_DELAY_PATTERN,
        };
        Self { kind, regex }
    }
}

fn raw_fields<'a>(captures: &Captures<'a>) -> RawFields<'a> {
    let mut raw = RawFields::default();
    for &(group, slot) in GROUPS {
        if let Some(m) = captures.name(group) {
            raw.set(slot, m.as_str());
        }
    }
    raw
}

impl Extractor for PatternExtractor {
    fn name(&self) -> &str {
        "pattern"
    }

    fn kind(&self) -> LogKind {
        self.kind
    }

    fn parse(&self, line: &str) -> Result<LogRecord, UnparseableLine> {
        let captures = self.regex.captures(line).ok_or(UnparseableLine::NoMatch)?;
        self.kind.build(&raw_fields(&captures))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::DistributionType;

    #[test]
    fn extracts_delay_line() {
        let extractor = PatternExtractor::new(LogKind::Delay);
        let record = extractor
            .extract("Delay: 0.0023 PacketSize: 1400 DistributionType: 0 Time: +1000000ns")
            .unwrap();
        assert_eq!(record.delay, Some(0.0023));
        assert_eq!(record.packet_size, Some(1400));
        assert_eq!(record.distribution_type, Some(DistributionType(0)));
        assert_eq!(record.timestamp, Some(1_000_000.0));
        assert_eq!(record.queue_length, None);
        assert_eq!(record.source_id, None);
    }

    #[test]
    fn extracts_simulator_delay_line_with_prefix_columns() {
        let line = "42\tSrc: 00:00:00:00:00:01\tDst: 00:00:00:00:00:03\tDelay: 4.1e-05\tPacketSize: 1000\tDistributionType: 3\tTime: +2.5e+09ns";
        let record = PatternExtractor::new(LogKind::Delay).extract(line).unwrap();
        assert_eq!(record.delay, Some(4.1e-05));
        assert_eq!(record.packet_size, Some(1000));
        assert_eq!(record.distribution_type, Some(DistributionType::CONSTANT));
        assert_eq!(record.timestamp, Some(2.5e9));
    }

    #[test]
    fn delay_round_trips_through_text() {
        let extractor = PatternExtractor::new(LogKind::Delay);
        let cases = [
            (0.0023, 1400u32, 0u32, 1_000_000.0),
            (1.25e-7, 64, 3, 9.87654321e12),
            (0.0, 0, 12, 0.5),
        ];
        for (delay, size, dist, time) in cases {
            let line =
                format!("Delay: {delay:e} PacketSize: {size} DistributionType: {dist} Time: +{time:e}ns");
            let record = extractor.extract(&line).unwrap();
            assert_eq!(record.delay, Some(delay));
            assert_eq!(record.packet_size, Some(size));
            assert_eq!(record.distribution_type, Some(DistributionType(dist)));
            assert_eq!(record.timestamp, Some(time));
        }
    }

    #[test]
    fn extracts_arrival_line() {
        let line = "Src: 00:00:00:00:00:02\tDistributionType: 3\tTime: +1.5e+06ns\tqueue-length: 4p";
        let record = PatternExtractor::new(LogKind::Arrival).extract(line).unwrap();
        assert_eq!(record.source_id.as_deref(), Some("00:00:00:00:00:02"));
        assert_eq!(record.distribution_type, Some(DistributionType(3)));
        assert_eq!(record.timestamp, Some(1_500_000.0));
        assert_eq!(record.queue_length, Some(4));
        assert_eq!(record.delay, None);
    }

    #[test]
    fn extracts_mac_delay_line() {
        let line = "Time: +3000000ns\tMacDelay: 0.0005\tqueue-length: 0p\tDistType: 0";
        let record = PatternExtractor::new(LogKind::MacDelay).extract(line).unwrap();
        assert_eq!(record.timestamp, Some(3_000_000.0));
        assert_eq!(record.delay, Some(0.0005));
        assert_eq!(record.queue_length, Some(0));
        assert_eq!(record.distribution_type, Some(DistributionType(0)));
    }

    #[test]
    fn rejects_malformed_lines() {
        let extractor = PatternExtractor::new(LogKind::Delay);
        let bad = [
            "",
            "Delay: 0.0023 DistributionType: 0 Time: +1000000ns",
            "Delay: 0.0023 PacketSize: 1400 DistributionType: 0 Time: +1000000ms",
            "Delay: 0.0023 PacketSize: 1400 DistributionType: 0 Time: +1000000",
            "Delay: abc PacketSize: 1400 DistributionType: 0 Time: +1000000ns",
            "Delay: 0.0023 PacketSize: -4 DistributionType: 0 Time: +1000000ns",
        ];
        for line in bad {
            assert_eq!(extractor.parse(line), Err(UnparseableLine::NoMatch), "{line}");
        }
    }

    #[test]
    fn rejects_arrival_queue_without_unit() {
        let line = "Src: 00:00:00:00:00:02 DistributionType: 3 Time: +1ns queue-length: 4";
        assert!(PatternExtractor::new(LogKind::Arrival).extract(line).is_none());
    }

    #[test]
    fn mac_delay_line_is_not_a_delay_line() {
        let line = "Time: +3000000ns\tMacDelay: 0.0005\tqueue-length: 0p\tDistType: 0";
        assert!(PatternExtractor::new(LogKind::Delay).extract(line).is_none());
    }
}
