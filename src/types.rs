use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::{Serialize, Serializer};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use tabled::Tabled;

use crate::util::format_number;

/// Calendar month used as an aggregation key. Orders chronologically and
/// renders as `MM/YYYY`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthKey {
    pub year: i32,
    pub month: u32,
}

impl MonthKey {
    pub fn from_datetime(ts: &NaiveDateTime) -> Self {
        Self {
            year: ts.year(),
            month: ts.month(),
        }
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}/{:04}", self.month, self.year)
    }
}

impl FromStr for MonthKey {
    type Err = chrono::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let date = NaiveDate::parse_from_str(&format!("01/{}", s.trim()), "%d/%m/%Y")?;
        Ok(Self {
            year: date.year(),
            month: date.month(),
        })
    }
}

impl Serialize for MonthKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Columns of the vessel-operations table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum VesselColumn {
    VesselVoyage,
    Berth,
    Service,
    ArrivalAtAnchorage,
    Berthing,
    EstimatedBerthing,
    OperationStart,
    OperationEnd,
    Unberthing,
    CustomsRelease,
    Movements,
}

impl VesselColumn {
    pub const ALL: [VesselColumn; 11] = [
        VesselColumn::VesselVoyage,
        VesselColumn::Berth,
        VesselColumn::Service,
        VesselColumn::ArrivalAtAnchorage,
        VesselColumn::Berthing,
        VesselColumn::EstimatedBerthing,
        VesselColumn::OperationStart,
        VesselColumn::OperationEnd,
        VesselColumn::Unberthing,
        VesselColumn::CustomsRelease,
        VesselColumn::Movements,
    ];

    /// Normalized header names accepted for this column, in order of preference.
    /// The `.1` suffix marks the second occurrence of a repeated header.
    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            VesselColumn::VesselVoyage => &["navio_/_viagem.1", "navio_/_viagem", "navio"],
            VesselColumn::Berth => &["berço"],
            VesselColumn::Service => &["serviço"],
            VesselColumn::ArrivalAtAnchorage => &["chegada_na_barra"],
            VesselColumn::Berthing => &["atracação"],
            VesselColumn::EstimatedBerthing => &["estimativa_atracação_etb", "etb"],
            VesselColumn::OperationStart => &["início_operação"],
            VesselColumn::OperationEnd => &["fim_operação"],
            VesselColumn::Unberthing => &["desatracação"],
            VesselColumn::CustomsRelease => &["liberação_rfb"],
            VesselColumn::Movements => &["movs"],
        }
    }

    pub fn is_required(self) -> bool {
        matches!(
            self,
            VesselColumn::VesselVoyage
                | VesselColumn::Berthing
                | VesselColumn::OperationStart
                | VesselColumn::OperationEnd
                | VesselColumn::Unberthing
                | VesselColumn::Movements
        )
    }

    pub fn label(self) -> &'static str {
        match self {
            VesselColumn::VesselVoyage => "vessel/voyage",
            VesselColumn::Berth => "berth",
            VesselColumn::Service => "service",
            VesselColumn::ArrivalAtAnchorage => "arrival at anchorage",
            VesselColumn::Berthing => "berthing",
            VesselColumn::EstimatedBerthing => "estimated berthing",
            VesselColumn::OperationStart => "operation start",
            VesselColumn::OperationEnd => "operation end",
            VesselColumn::Unberthing => "unberthing",
            VesselColumn::CustomsRelease => "customs release",
            VesselColumn::Movements => "movements",
        }
    }
}

/// One port call, typed once at load time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VesselCall {
    pub vessel_voyage: String,
    pub berth: Option<String>,
    pub service: Option<String>,
    pub arrival_at_anchorage: Option<NaiveDateTime>,
    pub berthing: Option<NaiveDateTime>,
    pub estimated_berthing: Option<NaiveDateTime>,
    pub operation_start: Option<NaiveDateTime>,
    pub operation_end: Option<NaiveDateTime>,
    pub unberthing: Option<NaiveDateTime>,
    pub customs_release: Option<NaiveDateTime>,
    pub movements: Option<f64>,
    pub berthing_month: Option<MonthKey>,
}

#[derive(Debug, Clone, Default)]
pub struct VesselTable {
    pub calls: Vec<VesselCall>,
    pub columns: BTreeSet<VesselColumn>,
}

/// One export/import line item.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TradeRecord {
    pub month: Option<u32>,
    pub municipality: Option<String>,
    pub country: Option<String>,
    pub section: Option<String>,
    pub export_value: Option<f64>,
    pub export_kg: Option<f64>,
    pub import_kg: Option<f64>,
    pub total_kg: Option<f64>,
    pub value_per_kg: Option<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct TradeTable {
    pub records: Vec<TradeRecord>,
}

fn two_dp(v: &f64) -> String {
    format_number(*v, 2)
}

fn maybe_two_dp(v: &Option<f64>) -> String {
    v.map(|h| format_number(h, 2)).unwrap_or_else(|| "-".to_string())
}

#[derive(Debug, Serialize, Tabled, Clone, PartialEq)]
pub struct AnchorageWaitRow {
    pub vessel_voyage: String,
    pub arrival_at_anchorage: String,
    pub berthing: String,
    #[tabled(display_with = "two_dp")]
    pub anchorage_wait_hours: f64,
}

#[derive(Debug, Serialize, Tabled, Clone, PartialEq)]
pub struct EtbDelayRow {
    pub vessel_voyage: String,
    pub berth: String,
    pub estimated_berthing: String,
    pub berthing: String,
    #[tabled(display_with = "two_dp")]
    pub etb_delay_hours: f64,
}

#[derive(Debug, Serialize, Tabled, Clone, PartialEq)]
pub struct DwellRow {
    pub vessel_voyage: String,
    pub operation_start: String,
    pub operation_end: String,
    #[tabled(display_with = "two_dp")]
    pub dwell_hours: f64,
}

#[derive(Debug, Serialize, Tabled, Clone, PartialEq)]
pub struct WaitingCensusRow {
    pub date: String,
    pub vessels_waiting: usize,
}

#[derive(Debug, Serialize, Tabled, Clone, PartialEq)]
pub struct CustomsDelayRow {
    pub vessel_voyage: String,
    pub operation_end: String,
    pub customs_release: String,
    #[tabled(display_with = "two_dp")]
    pub customs_delay_hours: f64,
}

#[derive(Debug, Serialize, Tabled, Clone, PartialEq)]
pub struct MonthlyStayRow {
    #[serde(rename = "Month")]
    #[tabled(rename = "Month")]
    pub month: MonthKey,
    #[serde(rename = "AvgPortStayH")]
    #[tabled(rename = "AvgPortStayH", display_with = "maybe_two_dp")]
    pub avg_port_stay_hours: Option<f64>,
    #[serde(rename = "AvgOperationH")]
    #[tabled(rename = "AvgOperationH", display_with = "maybe_two_dp")]
    pub avg_operation_hours: Option<f64>,
}

#[derive(Debug, Serialize, Tabled, Clone, PartialEq)]
pub struct MonthlySplitRow {
    #[serde(rename = "Month")]
    #[tabled(rename = "Month")]
    pub month: MonthKey,
    #[serde(rename = "AvgOperationH")]
    #[tabled(rename = "AvgOperationH", display_with = "maybe_two_dp")]
    pub avg_operation_hours: Option<f64>,
    #[serde(rename = "AvgNonOperationalH")]
    #[tabled(rename = "AvgNonOperationalH", display_with = "maybe_two_dp")]
    pub avg_non_operational_hours: Option<f64>,
}

#[derive(Debug, Serialize, Tabled, Clone, PartialEq)]
pub struct MonthlyMovementsRow {
    #[serde(rename = "Month")]
    #[tabled(rename = "Month")]
    pub month: MonthKey,
    #[serde(rename = "TotalMovs")]
    #[tabled(rename = "TotalMovs")]
    pub total_movements: f64,
}

#[derive(Debug, Serialize, Tabled, Clone, PartialEq)]
pub struct MonthlyMovementsHoursRow {
    #[serde(rename = "Month")]
    #[tabled(rename = "Month")]
    pub month: MonthKey,
    #[serde(rename = "TotalMovs")]
    #[tabled(rename = "TotalMovs")]
    pub total_movements: f64,
    #[serde(rename = "TotalOperationH")]
    #[tabled(rename = "TotalOperationH", display_with = "two_dp")]
    pub total_operation_hours: f64,
}

#[derive(Debug, Serialize, Tabled, Clone, PartialEq)]
pub struct MonthlyMovementsStayRow {
    #[serde(rename = "Month")]
    #[tabled(rename = "Month")]
    pub month: MonthKey,
    #[serde(rename = "TotalMovs")]
    #[tabled(rename = "TotalMovs")]
    pub total_movements: f64,
    #[serde(rename = "TotalPortStayH")]
    #[tabled(rename = "TotalPortStayH", display_with = "two_dp")]
    pub total_port_stay_hours: f64,
}

#[derive(Debug, Serialize, Tabled, Clone, PartialEq)]
pub struct MonthlyGapRow {
    #[serde(rename = "Month")]
    #[tabled(rename = "Month")]
    pub month: MonthKey,
    #[serde(rename = "AvgNonOperationalH")]
    #[tabled(rename = "AvgNonOperationalH", display_with = "maybe_two_dp")]
    pub avg_non_operational_hours: Option<f64>,
}

#[derive(Debug, Serialize, Tabled, Clone, PartialEq)]
pub struct TradeMonthRow {
    #[serde(rename = "Month")]
    #[tabled(rename = "Month")]
    pub month: u32,
    #[serde(rename = "TotalKg")]
    #[tabled(rename = "TotalKg", display_with = "two_dp")]
    pub total_kg: f64,
}

#[derive(Debug, Serialize, Tabled, Clone, PartialEq)]
pub struct ServiceEfficiencyRow {
    #[serde(rename = "Service")]
    #[tabled(rename = "Service")]
    pub service: String,
    #[serde(rename = "AvgMovsPerHour")]
    #[tabled(rename = "AvgMovsPerHour", display_with = "two_dp")]
    pub avg_movements_per_hour: f64,
}

#[derive(Debug, Serialize, Tabled, Clone, PartialEq)]
pub struct MunicipalityExportRow {
    #[serde(rename = "MunicipalityProduct")]
    #[tabled(rename = "MunicipalityProduct")]
    pub label: String,
    #[tabled(skip)]
    pub municipality: String,
    #[tabled(skip)]
    pub section: String,
    #[serde(rename = "ExportValueFOB")]
    #[tabled(rename = "ExportValueFOB", display_with = "two_dp")]
    pub export_value: f64,
}

#[derive(Debug, Serialize, Tabled, Clone, PartialEq)]
pub struct CountryShareRow {
    #[serde(rename = "Country")]
    #[tabled(rename = "Country")]
    pub country: String,
    #[serde(rename = "ExportValueFOB")]
    #[tabled(rename = "ExportValueFOB", display_with = "two_dp")]
    pub export_value: f64,
    #[serde(rename = "SharePct")]
    #[tabled(rename = "SharePct", display_with = "two_dp")]
    pub share_pct: f64,
}

#[derive(Debug, Serialize, Tabled, Clone, PartialEq)]
pub struct SectionValueRow {
    #[serde(rename = "Section")]
    #[tabled(rename = "Section")]
    pub section: String,
    #[serde(rename = "AvgFOBPerKg")]
    #[tabled(rename = "AvgFOBPerKg", display_with = "two_dp")]
    pub avg_value_per_kg: f64,
}

/// Export-destination concentration: the per-country shares plus the
/// combined share of the three largest destinations.
#[derive(Debug, Clone, PartialEq)]
pub struct CountryConcentration {
    pub top: Vec<CountryShareRow>,
    pub top3_share_pct: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportSummary {
    pub total_vessel_calls: usize,
    pub first_month: Option<MonthKey>,
    pub last_month: Option<MonthKey>,
    pub trade_records: Option<usize>,
    pub top3_country_share_pct: Option<f64>,
    pub avg_operation_hours: Option<f64>,
}
