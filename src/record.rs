//! Typed records extracted from simulator log lines.
//!
//! Every field is optional: a log kind only populates the fields it writes,
//! and a real zero (empty queue, zero delay) must stay distinguishable from
//! "this log does not carry that field".

use serde::Serialize;

/// Traffic generator distribution attached to each packet by the simulator.
///
/// Only a few values have names; any other integer is still a valid group key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct DistributionType(pub u32);

impl DistributionType {
    pub const EXPONENTIAL: DistributionType = DistributionType(0);
    pub const UNIFORM: DistributionType = DistributionType(1);
    pub const NORMAL: DistributionType = DistributionType(2);
    pub const CONSTANT: DistributionType = DistributionType(3);

    /// Human-readable name, if the simulator assigns one.
    pub fn name(self) -> Option<&'static str> {
        match self {
            Self::EXPONENTIAL => Some("Exponential"),
            Self::UNIFORM => Some("Uniform"),
            Self::NORMAL => Some("Normal"),
            Self::CONSTANT => Some("Constant"),
            _ => None,
        }
    }
}

impl std::fmt::Display for DistributionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.0, f)
    }
}

/// One parsed log line.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogRecord {
    /// End-to-end or MAC access delay in seconds.
    pub delay: Option<f64>,
    /// Packet size in bytes.
    pub packet_size: Option<u32>,
    pub distribution_type: Option<DistributionType>,
    /// Simulation time in nanoseconds.
    pub timestamp: Option<f64>,
    /// Device queue length in packets.
    pub queue_length: Option<u32>,
    /// Source MAC address, e.g. `00:00:00:00:00:01`.
    pub source_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_distribution_names() {
        assert_eq!(DistributionType::EXPONENTIAL.name(), Some("Exponential"));
        assert_eq!(DistributionType::CONSTANT.name(), Some("Constant"));
        assert_eq!(DistributionType(7).name(), None);
    }

    #[test]
    fn default_record_has_every_field_absent() {
        let record = LogRecord::default();
        assert!(record.delay.is_none());
        assert!(record.packet_size.is_none());
        assert!(record.distribution_type.is_none());
        assert!(record.timestamp.is_none());
        assert!(record.queue_length.is_none());
        assert!(record.source_id.is_none());
    }

    #[test]
    fn distribution_type_serializes_as_integer() {
        let json = serde_json::to_string(&DistributionType(3)).unwrap();
        assert_eq!(json, "3");
    }
}
