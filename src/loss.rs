//! Loss log summary: `Sent: <n> Received: <m>` lines written by each device
//! at the end of a simulation run.

use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

static LOSS_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Sent:\s+(?P<sent>\d+)\s+Received:\s+(?P<received>\d+)\b").unwrap());

/// Packet counters, summed over every device that reported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LossSummary {
    pub sent: u64,
    pub received: u64,
}

impl LossSummary {
    /// Parse one loss line; `None` when it does not have the expected shape.
    pub fn parse(line: &str) -> Option<Self> {
        let captures = LOSS_PATTERN.captures(line)?;
        Some(Self {
            sent: captures["sent"].parse().ok()?,
            received: captures["received"].parse().ok()?,
        })
    }

    /// Sum the counters of every parseable line.
    pub fn from_lines<'a>(lines: impl IntoIterator<Item = &'a str>) -> Self {
        lines
            .into_iter()
            .filter_map(Self::parse)
            .fold(Self::default(), |acc, s| Self {
                sent: acc.sent.saturating_add(s.sent),
                received: acc.received.saturating_add(s.received),
            })
    }

    /// Packets sent but never received.
    pub fn lost(&self) -> u64 {
        self.sent.saturating_sub(self.received)
    }

    /// Fraction of sent packets that were received; `None` when nothing was sent.
    pub fn delivery_ratio(&self) -> Option<f64> {
        (self.sent > 0).then(|| self.received as f64 / self.sent as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_loss_line() {
        let summary = LossSummary::parse("Sent: 120 Received: 90").unwrap();
        assert_eq!(summary.sent, 120);
        assert_eq!(summary.received, 90);
        assert_eq!(summary.lost(), 30);
        assert_eq!(summary.delivery_ratio(), Some(0.75));
    }

    #[test]
    fn rejects_other_lines() {
        assert!(LossSummary::parse("Sent: 12").is_none());
        assert!(LossSummary::parse("Sent: x Received: 1").is_none());
        assert!(LossSummary::parse("").is_none());
    }

    #[test]
    fn sums_devices() {
        let summary = LossSummary::from_lines(["Sent: 10 Received: 0", "noise", "Sent: 0 Received: 8"]);
        assert_eq!(summary, LossSummary { sent: 10, received: 8 });
    }

    #[test]
    fn huge_counters_saturate_instead_of_overflowing() {
        let summary = LossSummary::from_lines(["Sent: 18446744073709551615 Received: 0"; 2]);
        assert_eq!(summary.sent, u64::MAX);
        assert_eq!(summary.received, 0);
        assert_eq!(summary.lost(), u64::MAX);
    }

    #[test]
    fn nothing_sent_has_no_ratio() {
        let summary = LossSummary::default();
        assert_eq!(summary.delivery_ratio(), None);
        assert_eq!(summary.lost(), 0);

        // received can exceed sent when devices only listen
        let listener = LossSummary { sent: 0, received: 3 };
        assert_eq!(listener.lost(), 0);
    }
}
