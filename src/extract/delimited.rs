use super::{Extractor, LogKind, RawFields, UnparseableLine};
use crate::record::LogRecord;

/// Column separator the simulator writes between fields.
pub const DEFAULT_DELIMITER: char = '\t';

/// Delimiter strategy: split the line into columns, read each column as
/// `Key: value`, and look the kind's fields up by key.
///
/// Columns without a key (the delay log's leading packet counter) and keys
/// the kind does not use (`Dst`) are ignored. Each column is split on its
/// first colon only, so MAC addresses survive intact.
pub struct DelimitedExtractor {
    kind: LogKind,
    delimiter: char,
}

impl DelimitedExtractor {
    #[cfg(test)]
    pub fn new(kind: LogKind) -> Self {
        Self::with_delimiter(kind, DEFAULT_DELIMITER)
    }

    pub fn with_delimiter(kind: LogKind, delimiter: char) -> Self {
        Self { kind, delimiter }
    }
}

impl Extractor for DelimitedExtractor {
    fn name(&self) -> &str {
        "delimited"
    }

    fn kind(&self) -> LogKind {
        self.kind
    }

    fn parse(&self, line: &str) -> Result<LogRecord, UnparseableLine> {
        let keys = self.kind.keys();
        let mut raw = RawFields::default();
        let mut matched = false;

        for column in line.split(self.delimiter) {
            let Some((key, value)) = column.split_once(':') else {
                continue;
            };
            let key = key.trim_start();
            if let Some(&(_, slot)) = keys.iter().find(|(name, _)| *name == key) {
                raw.set(slot, value.trim());
                matched = true;
            }
        }

        if !matched {
            return Err(UnparseableLine::NoMatch);
        }
        self.kind.build(&raw)
    }
}
