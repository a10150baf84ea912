use serde::Serialize;
use std::path::{Path, PathBuf};
use tabled::{settings::Style, Table, Tabled};
use tracing::{info, warn};

use crate::dataset::SectionOutcome;
use crate::error::{Error, Result};
use crate::reports::DelayTables;

/// Write rows as CSV. An empty table still gets its header row.
pub fn write_csv<T: Serialize + Tabled>(path: &Path, rows: &[T]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path).map_err(|e| Error::csv(path, e))?;
    if rows.is_empty() {
        wtr.write_record(T::headers().iter().map(|h| h.to_string()))
            .map_err(|e| Error::csv(path, e))?;
    }
    for r in rows {
        wtr.serialize(r).map_err(|e| Error::csv(path, e))?;
    }
    wtr.flush().map_err(|e| Error::io(path, e))?;
    Ok(())
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let s = serde_json::to_string_pretty(value)?;
    std::fs::write(path, s).map_err(|e| Error::io(path, e))?;
    Ok(())
}

fn write_section<T: Serialize + Tabled>(dir: &Path, file: &str, section: &SectionOutcome<Vec<T>>) -> Result<Option<PathBuf>> {
    match section {
        SectionOutcome::Ready(rows) => {
            let path = dir.join(file);
            write_csv(&path, rows)?;
            info!("wrote {} rows to {}", rows.len(), path.display());
            Ok(Some(path))
        }
        SectionOutcome::Unavailable(reason) => {
            warn!("skipping {}: {}", file, reason);
            Ok(None)
        }
    }
}

/// Write every available delay table into `dir`; returns the written paths.
pub fn write_delay_tables(dir: &Path, tables: &DelayTables) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir).map_err(|e| Error::io(dir, e))?;
    let written = [
        write_section(dir, "anchorage_wait_outliers.csv", &tables.anchorage_wait)?,
        write_section(dir, "etb_delay.csv", &tables.etb_delay)?,
        write_section(dir, "above_mean_dwell.csv", &tables.above_mean_dwell)?,
        write_section(dir, "waiting_census.csv", &tables.waiting_census)?,
        write_section(dir, "customs_release_delay.csv", &tables.customs_delay)?,
    ];
    Ok(written.into_iter().flatten().collect())
}

pub fn preview_table_rows<T>(rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    let slice: Vec<T> = rows.iter().take(max_rows).cloned().collect();
    if slice.is_empty() {
        println!("(no rows)\n");
        return;
    }
    let table_str = Table::new(slice).with(Style::markdown()).to_string();
    println!("{}", table_str);
    if rows.len() > max_rows {
        println!("... {} more rows", rows.len() - max_rows);
    }
    println!();
}

/// Print a titled section preview, or why the section is unavailable.
pub fn preview_section<T>(title: &str, section: &SectionOutcome<Vec<T>>, max_rows: usize)
where
    T: Tabled + Clone,
{
    println!("{}\n", title);
    match section {
        SectionOutcome::Ready(rows) => preview_table_rows(rows, max_rows),
        SectionOutcome::Unavailable(reason) => println!("(unavailable: {})\n", reason),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::WaitingCensusRow;

    #[test]
    fn empty_table_keeps_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("census.csv");
        write_csv::<WaitingCensusRow>(&path, &[]).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "date,vessels_waiting\n");
    }

    #[test]
    fn unavailable_sections_are_not_written() {
        let dir = tempfile::tempdir().unwrap();
        let section: SectionOutcome<Vec<WaitingCensusRow>> = SectionOutcome::Unavailable("missing column(s): berthing".into());
        assert_eq!(write_section(dir.path(), "x.csv", &section).unwrap(), None);
        assert!(!dir.path().join("x.csv").exists());
    }
}
