//! Load-once session and the two report runs built on it.

use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use crate::cache::SourceCache;
use crate::config::ReportConfig;
use crate::dataset::{Dataset, SectionOutcome};
use crate::error::{Error, Result};
use crate::loader::{load_trade, load_vessel_calls, LoadReport, VesselLoadOptions};
use crate::output::write_delay_tables;
use crate::reports::{
    country_concentration, high_value_sections, municipality_exports, summary, trade_seasonality, VesselAnalysis,
};
use crate::temporal::TimestampPolicy;
use crate::types::{
    CountryConcentration, MonthlyGapRow, MonthlyMovementsHoursRow, MonthlyMovementsRow, MonthlyMovementsStayRow,
    MonthlySplitRow, MonthlyStayRow, MunicipalityExportRow, ReportSummary, SectionValueRow, ServiceEfficiencyRow,
    TradeMonthRow, TradeTable, VesselTable,
};

/// Tables loaded during this process, one cache per load mode.
#[derive(Debug, Default)]
pub struct Session {
    dashboard_vessels: SourceCache<VesselTable>,
    delay_vessels: SourceCache<VesselTable>,
    trade: SourceCache<TradeTable>,
}

fn log_load(what: &str, report: &LoadReport) {
    info!(
        "{}: {} rows, {} kept, {} unparsable timestamps",
        what, report.total_rows, report.kept_rows, report.unparsable_timestamps
    );
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Vessel table for the dashboard views: configured timestamp format,
    /// calls without movements dropped.
    pub fn dashboard_vessels(&mut self, config: &ReportConfig) -> Result<Arc<VesselTable>> {
        let opts = VesselLoadOptions {
            timestamps: config.timestamps.clone(),
            drop_zero_movements: true,
        };
        self.dashboard_vessels.get_or_load(&config.vessel_path, |p| {
            let (table, report) = load_vessel_calls(p, &opts)?;
            log_load("dashboard vessel calls", &report);
            Ok::<_, Error>(table)
        })
    }

    /// Vessel table for the delay tables: lenient timestamps, every call kept.
    pub fn delay_vessels(&mut self, config: &ReportConfig) -> Result<Arc<VesselTable>> {
        let opts = VesselLoadOptions {
            timestamps: TimestampPolicy::Lenient,
            drop_zero_movements: false,
        };
        self.delay_vessels.get_or_load(&config.vessel_path, |p| {
            let (table, report) = load_vessel_calls(p, &opts)?;
            log_load("delay vessel calls", &report);
            Ok::<_, Error>(table)
        })
    }

    /// The trade table is optional: a failed load becomes
    /// [`Dataset::Unavailable`].
    pub fn trade(&mut self, config: &ReportConfig) -> Dataset<TradeTable> {
        let year = config.report_year;
        let result = self.trade.get_or_load(&config.trade_path, |p| {
            let (table, report) = load_trade(p, year)?;
            log_load("trade records", &report);
            Ok::<_, Error>(table)
        });
        if let Err(e) = &result {
            warn!("trade dataset unavailable: {}", e);
        }
        Dataset::from_result(result)
    }
}

/// Load the vessel table and write the five delay tables.
pub fn run_delays(session: &mut Session, config: &ReportConfig) -> Result<Vec<PathBuf>> {
    let table = session.delay_vessels(config)?;
    let analysis = VesselAnalysis::new(&table);
    let tables = analysis.delay_tables(&config.thresholds);
    write_delay_tables(&config.output_dir, &tables)
}

/// Every dashboard section, computed once.
#[derive(Debug, Clone)]
pub struct Report {
    pub stay_vs_operation: SectionOutcome<Vec<MonthlyStayRow>>,
    pub stay_vs_operation_filtered: SectionOutcome<Vec<MonthlyStayRow>>,
    pub operational_split: SectionOutcome<Vec<MonthlySplitRow>>,
    pub operational_split_filtered: SectionOutcome<Vec<MonthlySplitRow>>,
    pub movements: SectionOutcome<Vec<MonthlyMovementsRow>>,
    pub movements_vs_operation: SectionOutcome<Vec<MonthlyMovementsHoursRow>>,
    pub movements_vs_stay: SectionOutcome<Vec<MonthlyMovementsStayRow>>,
    pub stay_operation_gap: SectionOutcome<Vec<MonthlyGapRow>>,
    pub movement_seasonality: SectionOutcome<Vec<MonthlyMovementsRow>>,
    pub trade_seasonality: SectionOutcome<Vec<TradeMonthRow>>,
    pub service_efficiency: SectionOutcome<Vec<ServiceEfficiencyRow>>,
    pub municipality_exports: SectionOutcome<Vec<MunicipalityExportRow>>,
    pub country_concentration: SectionOutcome<CountryConcentration>,
    pub high_value_sections: SectionOutcome<Vec<SectionValueRow>>,
    pub summary: ReportSummary,
}

pub fn build_report(session: &mut Session, config: &ReportConfig) -> Result<Report> {
    let table = session.dashboard_vessels(config)?;
    let vessels = VesselAnalysis::new(&table);
    let trade = session.trade(config);
    let n = config.top_n;

    Ok(Report {
        stay_vs_operation: vessels.monthly_stay_vs_operation(),
        stay_vs_operation_filtered: vessels.monthly_stay_vs_operation_filtered(),
        operational_split: vessels.monthly_operational_split(),
        operational_split_filtered: vessels.monthly_operational_split_filtered(),
        movements: vessels.monthly_movements(),
        movements_vs_operation: vessels.monthly_movements_vs_operation(),
        movements_vs_stay: vessels.monthly_movements_vs_stay(),
        stay_operation_gap: vessels.monthly_stay_operation_gap(),
        movement_seasonality: vessels.movement_seasonality(config.report_year),
        trade_seasonality: trade.section(trade_seasonality),
        service_efficiency: vessels.service_efficiency(n),
        municipality_exports: trade.section(|t| municipality_exports(t, n)),
        country_concentration: trade.section(|t| country_concentration(t, n)),
        high_value_sections: trade.section(|t| high_value_sections(t, config.thresholds.high_value_per_kg, n)),
        summary: summary(&vessels, &trade, n),
    })
}
