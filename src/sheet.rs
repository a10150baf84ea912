//! Raw tabular sources: spreadsheets through `calamine`, delimited text
//! through `csv`. Both land in the same untyped [`RawTable`].

use calamine::{open_workbook_auto, Data, DataType, Reader};
use chrono::NaiveDateTime;
use csv::ReaderBuilder;
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    DateTime(NaiveDateTime),
}

impl Cell {
    /// Text view of the cell, numbers rendered without a trailing `.0`.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Cell::Empty => None,
            Cell::Text(s) => {
                let t = s.trim();
                (!t.is_empty()).then(|| t.to_string())
            }
            Cell::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => Some(format!("{}", *n as i64)),
            Cell::Number(n) => Some(n.to_string()),
            Cell::DateTime(ts) => Some(ts.to_string()),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Number(n) => Some(*n),
            Cell::Text(s) => crate::util::parse_f64_safe(Some(s)),
            _ => None,
        }
    }
}

impl From<&Data> for Cell {
    fn from(value: &Data) -> Self {
        match value {
            Data::Empty | Data::Error(_) => Cell::Empty,
            Data::String(s) => Cell::Text(s.clone()),
            Data::Int(i) => Cell::Number(*i as f64),
            Data::Float(f) => Cell::Number(*f),
            Data::Bool(b) => Cell::Text(b.to_string()),
            Data::DateTime(_) | Data::DateTimeIso(_) => match value.as_datetime() {
                Some(ts) => Cell::DateTime(ts),
                None => Cell::Text(value.to_string()),
            },
            Data::DurationIso(s) => Cell::Text(s.clone()),
        }
    }
}

/// Header row plus data rows, exactly as read from the source.
#[derive(Debug, Clone, Default)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

static EMPTY: Cell = Cell::Empty;

impl RawTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        Self {
            headers: dedupe_headers(headers),
            rows,
        }
    }

    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// First of `names` present in the header row.
    pub fn find_column(&self, names: &[&str]) -> Option<usize> {
        names.iter().find_map(|n| self.column(n))
    }

    pub fn cell(&self, row: usize, col: usize) -> &Cell {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&EMPTY)
    }

    /// Trim, lowercase and replace spaces with `_` in every header.
    pub fn normalize_headers(&mut self) {
        for h in &mut self.headers {
            *h = normalize_header(h);
        }
    }
}

pub fn normalize_header(h: &str) -> String {
    h.trim().to_lowercase().replace(' ', "_")
}

/// Repeated headers get `.1`, `.2` ... in order of appearance.
fn dedupe_headers(headers: Vec<String>) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    headers
        .into_iter()
        .map(|h| {
            let n = seen.entry(h.clone()).or_insert(0);
            let out = if *n == 0 { h } else { format!("{}.{}", h, n) };
            *n += 1;
            out
        })
        .collect()
}

/// Read the first sheet of a workbook or a whole CSV file.
pub fn read_table(path: &Path) -> Result<RawTable> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("csv") => read_csv(path),
        Some("xlsx" | "xlsm" | "xls" | "xlsb" | "ods") => read_spreadsheet(path),
        _ => Err(Error::UnsupportedFormat(path.to_path_buf())),
    }
}

fn read_csv(path: &Path) -> Result<RawTable> {
    let mut rdr = ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(|e| Error::csv(path, e))?;
    let headers: Vec<String> = rdr
        .headers()
        .map_err(|e| Error::csv(path, e))?
        .iter()
        .map(|h| h.to_string())
        .collect();
    if headers.iter().all(|h| h.trim().is_empty()) {
        return Err(Error::EmptySource {
            path: path.to_path_buf(),
        });
    }

    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record.map_err(|e| Error::csv(path, e))?;
        rows.push(
            record
                .iter()
                .map(|v| {
                    if v.trim().is_empty() {
                        Cell::Empty
                    } else {
                        Cell::Text(v.to_string())
                    }
                })
                .collect(),
        );
    }
    debug!("read {} rows from {}", rows.len(), path.display());
    Ok(RawTable::new(headers, rows))
}

fn read_spreadsheet(path: &Path) -> Result<RawTable> {
    let mut workbook = open_workbook_auto(path).map_err(|e| Error::spreadsheet(path, e))?;
    let sheet_names = workbook.sheet_names().to_vec();
    let Some(sheet_name) = sheet_names.first() else {
        return Err(Error::EmptySource {
            path: path.to_path_buf(),
        });
    };
    let range = workbook
        .worksheet_range(sheet_name)
        .map_err(|e| Error::spreadsheet(path, e))?;

    let mut iter = range.rows();
    let Some(header_row) = iter.next() else {
        return Err(Error::EmptySource {
            path: path.to_path_buf(),
        });
    };
    let headers: Vec<String> = header_row
        .iter()
        .map(|cell| match cell {
            Data::String(s) => s.clone(),
            Data::Empty => String::new(),
            other => other.to_string(),
        })
        .collect();
    let rows: Vec<Vec<Cell>> = iter.map(|r| r.iter().map(Cell::from).collect()).collect();
    debug!(
        "read {} rows from sheet '{}' of {}",
        rows.len(),
        sheet_name,
        path.display()
    );
    Ok(RawTable::new(headers, rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn repeated_headers_get_pandas_style_suffix() {
        let t = RawTable::new(
            vec!["Navio / Viagem".into(), "Berço".into(), "Navio / Viagem".into()],
            vec![],
        );
        assert_eq!(t.headers[2], "Navio / Viagem.1");

        let mut t = t;
        t.normalize_headers();
        assert_eq!(t.headers, vec!["navio_/_viagem", "berço", "navio_/_viagem.1"]);
        assert_eq!(t.find_column(&["navio_/_viagem.1", "navio_/_viagem"]), Some(2));
    }

    #[test]
    fn reads_csv_with_empty_cells() {
        let mut f = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(f, "a,b").unwrap();
        writeln!(f, "1,").unwrap();
        let t = read_table(f.path()).unwrap();
        assert_eq!(t.cell(0, 0), &Cell::Text("1".into()));
        assert_eq!(t.cell(0, 1), &Cell::Empty);
        assert_eq!(t.cell(5, 5), &Cell::Empty);
    }

    #[test]
    fn rejects_unknown_extension() {
        let err = read_table(Path::new("data.parquet")).unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat(_)));
    }

    #[test]
    fn workbook_cells_map_to_typed_cells() {
        use calamine::{CellErrorType, ExcelDateTime, ExcelDateTimeType};

        let noon = NaiveDateTime::parse_from_str("2024-01-01 12:00:00", "%Y-%m-%d %H:%M:%S").unwrap();
        let serial = Data::DateTime(ExcelDateTime::new(45292.5, ExcelDateTimeType::DateTime, false));
        assert_eq!(Cell::from(&serial), Cell::DateTime(noon));
        assert_eq!(
            Cell::from(&Data::DateTimeIso("2024-01-01T12:00:00".into())),
            Cell::DateTime(noon)
        );
        assert_eq!(Cell::from(&Data::Int(37)), Cell::Number(37.0));
        assert_eq!(Cell::from(&Data::Float(2.5)), Cell::Number(2.5));
        assert_eq!(Cell::from(&Data::Error(CellErrorType::NA)), Cell::Empty);
        assert_eq!(Cell::from(&Data::String("B1".into())), Cell::Text("B1".into()));
        assert_eq!(Cell::from(&Data::Empty), Cell::Empty);
    }

    #[test]
    fn missing_workbook_is_a_spreadsheet_error() {
        let err = read_table(Path::new("no_such_calls.xlsx")).unwrap_err();
        assert!(matches!(err, Error::Spreadsheet { .. }));
    }

    #[test]
    fn cell_views() {
        assert_eq!(Cell::Number(12.0).as_text().as_deref(), Some("12"));
        assert_eq!(Cell::Text(" 3,5 ".into()).as_f64(), Some(35.0));
        assert_eq!(Cell::Text("  ".into()).as_text(), None);
    }
}
