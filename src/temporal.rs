//! Timestamp parsing for the vessel table.
//!
//! Bad values never fail the load: they come back as `None` and the caller
//! counts them.

use chrono::{NaiveDate, NaiveDateTime};

use crate::sheet::Cell;

/// Day-first format used by the terminal's operations export.
pub const DEFAULT_FORMAT: &str = "%d/%m/%Y %H:%M";

const LENIENT_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
];

const LENIENT_DATE_FORMATS: &[&str] = &["%d/%m/%Y", "%Y-%m-%d"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimestampPolicy {
    /// Text cells must match this exact format.
    Strict(String),
    /// Any of the known formats is accepted.
    Lenient,
}

impl Default for TimestampPolicy {
    fn default() -> Self {
        TimestampPolicy::Strict(DEFAULT_FORMAT.to_string())
    }
}

impl TimestampPolicy {
    pub fn parse_str(&self, raw: &str) -> Option<NaiveDateTime> {
        let s = raw.trim();
        if s.is_empty() {
            return None;
        }
        match self {
            TimestampPolicy::Strict(fmt) => NaiveDateTime::parse_from_str(s, fmt).ok(),
            TimestampPolicy::Lenient => LENIENT_DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
                .or_else(|| {
                    LENIENT_DATE_FORMATS.iter().find_map(|fmt| {
                        NaiveDate::parse_from_str(s, fmt)
                            .ok()
                            .and_then(|d| d.and_hms_opt(0, 0, 0))
                    })
                }),
        }
    }

    /// Native spreadsheet date cells are taken as-is under either policy.
    pub fn parse_cell(&self, cell: &Cell) -> CellTimestamp {
        match cell {
            Cell::Empty => CellTimestamp::Blank,
            Cell::DateTime(ts) => CellTimestamp::Parsed(*ts),
            Cell::Text(s) if s.trim().is_empty() => CellTimestamp::Blank,
            Cell::Text(s) => match self.parse_str(s) {
                Some(ts) => CellTimestamp::Parsed(ts),
                None => CellTimestamp::Unparsable,
            },
            Cell::Number(_) => CellTimestamp::Unparsable,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellTimestamp {
    Blank,
    Parsed(NaiveDateTime),
    Unparsable,
}

impl CellTimestamp {
    pub fn value(self) -> Option<NaiveDateTime> {
        match self {
            CellTimestamp::Parsed(ts) => Some(ts),
            _ => None,
        }
    }
}
