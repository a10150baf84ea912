use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use tracing::{info, warn};

use crate::derive::per_kg_value;
use crate::error::{Error, Result};
use crate::sheet::{read_table, RawTable};
use crate::temporal::{CellTimestamp, TimestampPolicy};
use crate::types::{MonthKey, TradeRecord, TradeTable, VesselCall, VesselColumn, VesselTable};

static MONTH_DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d{2})").expect("valid regex"));

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub total_rows: usize,
    pub kept_rows: usize,
    pub dropped_zero_movements: usize,
    pub unparsable_timestamps: usize,
}

#[derive(Debug, Clone, Default)]
pub struct VesselLoadOptions {
    pub timestamps: TimestampPolicy,
    /// Discard calls that handled no cargo (`movs == 0`).
    pub drop_zero_movements: bool,
}

pub fn load_vessel_calls(path: &Path, opts: &VesselLoadOptions) -> Result<(VesselTable, LoadReport)> {
    info!("loading vessel calls from {}", path.display());
    let mut raw = read_table(path)?;
    raw.normalize_headers();
    vessel_table_from_raw(&raw, opts)
}

pub fn vessel_table_from_raw(raw: &RawTable, opts: &VesselLoadOptions) -> Result<(VesselTable, LoadReport)> {
    let mut index: BTreeMap<VesselColumn, usize> = BTreeMap::new();
    for column in VesselColumn::ALL {
        if let Some(idx) = raw.find_column(column.aliases()) {
            index.insert(column, idx);
        }
    }

    let missing: Vec<String> = VesselColumn::ALL
        .iter()
        .filter(|c| c.is_required() && !index.contains_key(c))
        .map(|c| format!("{} ({})", c.label(), c.aliases().join(" | ")))
        .collect();
    if !missing.is_empty() {
        return Err(Error::MissingColumns {
            table: "vessel",
            missing,
        });
    }
    for column in VesselColumn::ALL {
        if !column.is_required() && !index.contains_key(&column) {
            warn!("optional column '{}' not found; dependent sections will be skipped", column.label());
        }
    }

    let mut report = LoadReport::default();
    let mut calls = Vec::with_capacity(raw.rows.len());

    for (row_idx, row) in raw.rows.iter().enumerate() {
        if row.iter().all(|c| c.as_text().is_none()) {
            continue;
        }
        report.total_rows += 1;

        let text = |col: VesselColumn| index.get(&col).and_then(|&i| raw.cell(row_idx, i).as_text());
        let mut timestamp = |col: VesselColumn| {
            let &i = index.get(&col)?;
            match opts.timestamps.parse_cell(raw.cell(row_idx, i)) {
                CellTimestamp::Unparsable => {
                    report.unparsable_timestamps += 1;
                    None
                }
                parsed => parsed.value(),
            }
        };

        let arrival_at_anchorage = timestamp(VesselColumn::ArrivalAtAnchorage);
        let berthing = timestamp(VesselColumn::Berthing);
        let estimated_berthing = timestamp(VesselColumn::EstimatedBerthing);
        let operation_start = timestamp(VesselColumn::OperationStart);
        let operation_end = timestamp(VesselColumn::OperationEnd);
        let unberthing = timestamp(VesselColumn::Unberthing);
        let customs_release = timestamp(VesselColumn::CustomsRelease);
        let movements = index
            .get(&VesselColumn::Movements)
            .and_then(|&i| raw.cell(row_idx, i).as_f64());

        if opts.drop_zero_movements && movements == Some(0.0) {
            report.dropped_zero_movements += 1;
            continue;
        }

        calls.push(VesselCall {
            vessel_voyage: text(VesselColumn::VesselVoyage).unwrap_or_default(),
            berth: text(VesselColumn::Berth),
            service: text(VesselColumn::Service),
            arrival_at_anchorage,
            berthing,
            estimated_berthing,
            operation_start,
            operation_end,
            unberthing,
            customs_release,
            movements,
            berthing_month: berthing.as_ref().map(MonthKey::from_datetime),
        });
    }

    report.kept_rows = calls.len();
    if report.unparsable_timestamps > 0 {
        warn!(
            "{} timestamp cells could not be parsed and were treated as missing",
            report.unparsable_timestamps
        );
    }
    info!(
        "vessel calls: {} rows read, {} kept, {} dropped with zero movements",
        report.total_rows, report.kept_rows, report.dropped_zero_movements
    );

    let columns: BTreeSet<VesselColumn> = index.keys().copied().collect();
    Ok((VesselTable { calls, columns }, report))
}

/// Exact header names of the trade export for one reporting year.
#[derive(Debug, Clone)]
pub struct TradeColumns {
    pub month: String,
    pub municipality: String,
    pub country: String,
    pub section: String,
    pub export_value: String,
    pub export_kg: String,
    pub import_kg: String,
}

impl TradeColumns {
    pub fn for_year(year: i32) -> Self {
        Self {
            month: "Mês".to_string(),
            municipality: "Município".to_string(),
            country: "País".to_string(),
            section: "Descrição Seção".to_string(),
            export_value: format!("Exportação - {} - Valor US$ FOB", year),
            export_kg: format!("Exportação - {} - Quilograma Líquido", year),
            import_kg: format!("Importação - {} - Quilograma Líquido", year),
        }
    }

    fn all(&self) -> [&str; 7] {
        [
            &self.month,
            &self.municipality,
            &self.country,
            &self.section,
            &self.export_value,
            &self.export_kg,
            &self.import_kg,
        ]
    }
}

/// First two-digit run of a free-text month label (`"01. Janeiro"` -> 1).
pub fn parse_month_label(label: &str) -> Option<u32> {
    MONTH_DIGITS
        .captures(label)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

pub fn load_trade(path: &Path, year: i32) -> Result<(TradeTable, LoadReport)> {
    info!("loading trade records from {}", path.display());
    let raw = read_table(path)?;
    trade_table_from_raw(&raw, &TradeColumns::for_year(year))
}

pub fn trade_table_from_raw(raw: &RawTable, columns: &TradeColumns) -> Result<(TradeTable, LoadReport)> {
    let missing: Vec<String> = columns
        .all()
        .iter()
        .filter(|name| raw.column(name).is_none())
        .map(|name| name.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(Error::MissingColumns {
            table: "trade",
            missing,
        });
    }
    // All present, checked above.
    let col = |name: &str| raw.column(name).unwrap_or_default();
    let (month, municipality, country, section) = (
        col(&columns.month),
        col(&columns.municipality),
        col(&columns.country),
        col(&columns.section),
    );
    let (export_value, export_kg, import_kg) = (
        col(&columns.export_value),
        col(&columns.export_kg),
        col(&columns.import_kg),
    );

    let mut report = LoadReport::default();
    let mut records = Vec::with_capacity(raw.rows.len());
    for (r, row) in raw.rows.iter().enumerate() {
        if row.iter().all(|c| c.as_text().is_none()) {
            continue;
        }
        report.total_rows += 1;

        let export_value_v = raw.cell(r, export_value).as_f64();
        let export_kg_v = raw.cell(r, export_kg).as_f64();
        let import_kg_v = raw.cell(r, import_kg).as_f64();
        records.push(TradeRecord {
            month: raw.cell(r, month).as_text().as_deref().and_then(parse_month_label),
            municipality: raw.cell(r, municipality).as_text(),
            country: raw.cell(r, country).as_text(),
            section: raw.cell(r, section).as_text(),
            export_value: export_value_v,
            export_kg: export_kg_v,
            import_kg: import_kg_v,
            total_kg: export_kg_v.zip(import_kg_v).map(|(e, i)| e + i),
            value_per_kg: per_kg_value(export_value_v, export_kg_v),
        });
    }
    report.kept_rows = records.len();
    info!("trade records: {} rows kept", report.kept_rows);
    Ok((TradeTable { records }, report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sheet::Cell;

    fn text(s: &str) -> Cell {
        Cell::Text(s.to_string())
    }

    fn vessel_raw(rows: Vec<Vec<Cell>>) -> RawTable {
        let mut raw = RawTable::new(
            vec![
                "Navio / Viagem".into(),
                "Atracação".into(),
                "Início Operação".into(),
                "Fim Operação".into(),
                "Desatracação".into(),
                " Movs ".into(),
            ],
            rows,
        );
        raw.normalize_headers();
        raw
    }

    #[test]
    fn missing_required_column_is_fatal() {
        let mut raw = RawTable::new(vec!["Navio".into(), "Atracação".into()], vec![]);
        raw.normalize_headers();
        let err = vessel_table_from_raw(&raw, &VesselLoadOptions::default()).unwrap_err();
        match err {
            Error::MissingColumns { table, missing } => {
                assert_eq!(table, "vessel");
                assert_eq!(missing.len(), 4);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn drops_zero_movements_and_counts_bad_timestamps() {
        let raw = vessel_raw(vec![
            vec![
                text("A/1"),
                text("01/03/2024 10:00"),
                text("01/03/2024 11:00"),
                text("01/03/2024 15:00"),
                text("01/03/2024 18:00"),
                text("120"),
            ],
            vec![
                text("B/2"),
                text("garbage"),
                Cell::Empty,
                Cell::Empty,
                Cell::Empty,
                text("0"),
            ],
            vec![Cell::Empty; 6],
        ]);
        let opts = VesselLoadOptions {
            drop_zero_movements: true,
            ..Default::default()
        };
        let (table, report) = vessel_table_from_raw(&raw, &opts).unwrap();
        assert_eq!(report.total_rows, 2);
        assert_eq!(report.dropped_zero_movements, 1);
        assert_eq!(report.unparsable_timestamps, 1);
        assert_eq!(table.calls.len(), 1);
        assert_eq!(table.calls[0].berthing_month.unwrap().to_string(), "03/2024");
        assert!(!table.columns.contains(&VesselColumn::CustomsRelease));
    }

    #[test]
    fn month_label_extraction() {
        assert_eq!(parse_month_label("01. Janeiro"), Some(1));
        assert_eq!(parse_month_label("Mês 11"), Some(11));
        assert_eq!(parse_month_label("maio"), None);
    }

    #[test]
    fn trade_derives_weight_and_value_per_kg() {
        let cols = TradeColumns::for_year(2024);
        let raw = RawTable::new(
            cols.all().iter().map(|s| s.to_string()).collect(),
            vec![
                vec![
                    text("02. Fevereiro"),
                    text("Camaçari"),
                    text("China"),
                    text("Produtos químicos"),
                    Cell::Number(500.0),
                    Cell::Number(0.0),
                    Cell::Number(20.0),
                ],
                vec![
                    text("03. Março"),
                    text("Salvador"),
                    text("Argentina"),
                    text("Metais"),
                    Cell::Number(1000.0),
                    Cell::Number(10.0),
                    Cell::Number(5.0),
                ],
            ],
        );
        let (table, _) = trade_table_from_raw(&raw, &cols).unwrap();
        assert_eq!(table.records[0].month, Some(2));
        assert_eq!(table.records[0].total_kg, Some(20.0));
        assert_eq!(table.records[0].value_per_kg, None);
        assert_eq!(table.records[1].value_per_kg, Some(100.0));
    }

    #[test]
    fn blank_trade_keys_load_as_missing() {
        let cols = TradeColumns::for_year(2024);
        let raw = RawTable::new(
            cols.all().iter().map(|s| s.to_string()).collect(),
            vec![vec![
                text("01. Janeiro"),
                Cell::Empty,
                text("  "),
                text("Metais"),
                Cell::Number(50.0),
                Cell::Number(1.0),
                Cell::Number(0.0),
            ]],
        );
        let (table, _) = trade_table_from_raw(&raw, &cols).unwrap();
        assert_eq!(table.records[0].municipality, None);
        assert_eq!(table.records[0].country, None);
        assert_eq!(table.records[0].section.as_deref(), Some("Metais"));
    }

    #[test]
    fn trade_requires_exact_headers() {
        let raw = RawTable::new(vec!["mês".into()], vec![]);
        let err = trade_table_from_raw(&raw, &TradeColumns::for_year(2024)).unwrap_err();
        assert!(matches!(err, Error::MissingColumns { table: "trade", .. }));
    }
}
