use chrono::{Datelike, NaiveDateTime};
use std::collections::BTreeSet;
use tracing::{debug, warn};

use crate::aggregate::{chronological, group_by, reduce, top_n, Reduction};
use crate::census::waiting_census;
use crate::config::Thresholds;
use crate::dataset::{Dataset, SectionOutcome};
use crate::derive::{enrich, EnrichedCall};
use crate::filter::{remove_outliers_iqr, select_above, ThresholdPolicy};
use crate::types::{
    AnchorageWaitRow, CountryConcentration, CountryShareRow, CustomsDelayRow, DwellRow, EtbDelayRow, MonthKey,
    MonthlyGapRow, MonthlyMovementsHoursRow, MonthlyMovementsRow, MonthlyMovementsStayRow, MonthlySplitRow,
    MonthlyStayRow, MunicipalityExportRow, ReportSummary, SectionValueRow, ServiceEfficiencyRow, TradeMonthRow,
    TradeTable, VesselColumn, VesselTable, WaitingCensusRow,
};
use crate::util::{format_timestamp, mean, round_to};

type Section<T> = SectionOutcome<Vec<T>>;

fn ts(v: Option<NaiveDateTime>) -> String {
    v.as_ref().map(format_timestamp).unwrap_or_default()
}

/// Vessel calls with their derived metrics, plus which source columns were
/// present so sections can report themselves unavailable.
#[derive(Debug, Clone)]
pub struct VesselAnalysis {
    columns: BTreeSet<VesselColumn>,
    calls: Vec<EnrichedCall>,
}

impl VesselAnalysis {
    pub fn new(table: &VesselTable) -> Self {
        Self {
            columns: table.columns.clone(),
            calls: enrich(&table.calls),
        }
    }

    pub fn calls(&self) -> &[EnrichedCall] {
        &self.calls
    }

    fn require(&self, needed: &[VesselColumn]) -> Result<(), String> {
        let absent: Vec<&str> = needed
            .iter()
            .filter(|c| !self.columns.contains(c))
            .map(|c| c.label())
            .collect();
        if absent.is_empty() {
            Ok(())
        } else {
            Err(format!("missing column(s): {}", absent.join(", ")))
        }
    }

    fn section<T>(&self, needed: &[VesselColumn], build: impl FnOnce() -> Vec<T>) -> Section<T> {
        match self.require(needed) {
            Ok(()) => SectionOutcome::Ready(build()),
            Err(reason) => {
                debug!("section skipped: {}", reason);
                SectionOutcome::Unavailable(reason)
            }
        }
    }

    fn above<'a>(&'a self, policy: ThresholdPolicy, metric: fn(&EnrichedCall) -> Option<f64>) -> Vec<&'a EnrichedCall> {
        let selection = select_above(self.calls.as_slice(), policy, metric);
        debug!(
            "threshold {:?} -> cutoff {:?}, {} of {} calls selected",
            policy,
            selection.cutoff,
            selection.rows.len(),
            self.calls.len()
        );
        selection.rows
    }

    // ---- delay tables ----

    /// Calls whose anchorage wait exceeds the policy cutoff.
    pub fn anchorage_wait_outliers(&self, policy: ThresholdPolicy) -> Section<AnchorageWaitRow> {
        self.section(&[VesselColumn::ArrivalAtAnchorage, VesselColumn::Berthing], || {
            self.above(policy, |c| c.metrics.anchorage_wait_hours)
                .into_iter()
                .filter_map(|c| {
                    Some(AnchorageWaitRow {
                        vessel_voyage: c.call.vessel_voyage.clone(),
                        arrival_at_anchorage: ts(c.call.arrival_at_anchorage),
                        berthing: ts(c.call.berthing),
                        anchorage_wait_hours: c.metrics.anchorage_wait_hours?,
                    })
                })
                .collect()
        })
    }

    /// Calls that berthed later than their ETB by more than the cutoff.
    pub fn etb_delay(&self, policy: ThresholdPolicy) -> Section<EtbDelayRow> {
        self.section(&[VesselColumn::EstimatedBerthing, VesselColumn::Berthing], || {
            self.above(policy, |c| c.metrics.etb_delay_hours)
                .into_iter()
                .filter_map(|c| {
                    Some(EtbDelayRow {
                        vessel_voyage: c.call.vessel_voyage.clone(),
                        berth: c.call.berth.clone().unwrap_or_default(),
                        estimated_berthing: ts(c.call.estimated_berthing),
                        berthing: ts(c.call.berthing),
                        etb_delay_hours: c.metrics.etb_delay_hours?,
                    })
                })
                .collect()
        })
    }

    /// Calls whose operation time exceeds the cutoff.
    pub fn above_mean_dwell(&self, policy: ThresholdPolicy) -> Section<DwellRow> {
        self.section(&[VesselColumn::OperationStart, VesselColumn::OperationEnd], || {
            self.above(policy, |c| c.metrics.operation_hours)
                .into_iter()
                .filter_map(|c| {
                    Some(DwellRow {
                        vessel_voyage: c.call.vessel_voyage.clone(),
                        operation_start: ts(c.call.operation_start),
                        operation_end: ts(c.call.operation_end),
                        dwell_hours: c.metrics.operation_hours?,
                    })
                })
                .collect()
        })
    }

    pub fn waiting_census(&self) -> Section<WaitingCensusRow> {
        self.section(&[VesselColumn::ArrivalAtAnchorage, VesselColumn::Berthing], || {
            waiting_census(
                self.calls
                    .iter()
                    .map(|c| (c.call.arrival_at_anchorage, c.call.berthing)),
            )
            .into_iter()
            .map(|d| WaitingCensusRow {
                date: format_timestamp(&d.day),
                vessels_waiting: d.waiting,
            })
            .collect()
        })
    }

    /// Calls released by customs more than the cutoff after operations ended.
    pub fn customs_release_delay(&self, policy: ThresholdPolicy) -> Section<CustomsDelayRow> {
        self.section(&[VesselColumn::CustomsRelease, VesselColumn::OperationEnd], || {
            self.above(policy, |c| c.metrics.customs_delay_hours)
                .into_iter()
                .filter_map(|c| {
                    Some(CustomsDelayRow {
                        vessel_voyage: c.call.vessel_voyage.clone(),
                        operation_end: ts(c.call.operation_end),
                        customs_release: ts(c.call.customs_release),
                        customs_delay_hours: c.metrics.customs_delay_hours?,
                    })
                })
                .collect()
        })
    }

    pub fn delay_tables(&self, thresholds: &Thresholds) -> DelayTables {
        DelayTables {
            anchorage_wait: self.anchorage_wait_outliers(thresholds.anchorage_wait),
            etb_delay: self.etb_delay(thresholds.etb_delay),
            above_mean_dwell: self.above_mean_dwell(thresholds.dwell),
            waiting_census: self.waiting_census(),
            customs_delay: self.customs_release_delay(thresholds.customs_delay),
        }
    }

    // ---- monthly dashboard views ----

    pub fn monthly_stay_vs_operation(&self) -> Section<MonthlyStayRow> {
        self.section(&[VesselColumn::ArrivalAtAnchorage], || stay_vs_operation(self.calls.iter()))
    }

    /// Same as [`Self::monthly_stay_vs_operation`] after IQR filtering on
    /// port stay, then on operation time.
    pub fn monthly_stay_vs_operation_filtered(&self) -> Section<MonthlyStayRow> {
        self.section(&[VesselColumn::ArrivalAtAnchorage], || {
            let kept = remove_outliers_iqr(self.calls.iter().collect(), |c: &&EnrichedCall| {
                c.metrics.port_stay_hours
            });
            let kept = remove_outliers_iqr(kept, |c: &&EnrichedCall| c.metrics.operation_hours);
            stay_vs_operation(kept)
        })
    }

    pub fn monthly_operational_split(&self) -> Section<MonthlySplitRow> {
        self.section(&[VesselColumn::ArrivalAtAnchorage], || operational_split(self.calls.iter()))
    }

    /// Same as [`Self::monthly_operational_split`] after IQR filtering on
    /// operation time, then on non-operational time.
    pub fn monthly_operational_split_filtered(&self) -> Section<MonthlySplitRow> {
        self.section(&[VesselColumn::ArrivalAtAnchorage], || {
            let kept = remove_outliers_iqr(self.calls.iter().collect(), |c: &&EnrichedCall| {
                c.metrics.operation_hours
            });
            let kept = remove_outliers_iqr(kept, |c: &&EnrichedCall| c.metrics.non_operational_hours);
            operational_split(kept)
        })
    }

    pub fn monthly_movements(&self) -> Section<MonthlyMovementsRow> {
        self.section(&[], || {
            by_month(self.calls.iter(), |month, g| MonthlyMovementsRow {
                month,
                total_movements: sum(g, |c| c.call.movements),
            })
        })
    }

    pub fn monthly_movements_vs_operation(&self) -> Section<MonthlyMovementsHoursRow> {
        self.section(&[], || {
            by_month(self.calls.iter(), |month, g| MonthlyMovementsHoursRow {
                month,
                total_movements: sum(g, |c| c.call.movements),
                total_operation_hours: sum(g, |c| c.metrics.operation_hours),
            })
        })
    }

    pub fn monthly_movements_vs_stay(&self) -> Section<MonthlyMovementsStayRow> {
        self.section(&[VesselColumn::ArrivalAtAnchorage], || {
            by_month(self.calls.iter(), |month, g| MonthlyMovementsStayRow {
                month,
                total_movements: sum(g, |c| c.call.movements),
                total_port_stay_hours: sum(g, |c| c.metrics.port_stay_hours),
            })
        })
    }

    /// Mean time per call spent in port but not operating.
    pub fn monthly_stay_operation_gap(&self) -> Section<MonthlyGapRow> {
        self.section(&[VesselColumn::ArrivalAtAnchorage], || {
            by_month(self.calls.iter(), |month, g| MonthlyGapRow {
                month,
                avg_non_operational_hours: reduce(g, Reduction::Mean, |c| c.metrics.non_operational_hours),
            })
        })
    }

    /// Monthly movements restricted to calls berthed in `year`.
    pub fn movement_seasonality(&self, year: i32) -> Section<MonthlyMovementsRow> {
        self.section(&[], || {
            let in_year = self
                .calls
                .iter()
                .filter(|c| c.call.berthing.is_some_and(|b| b.year() == year));
            by_month(in_year, |month, g| MonthlyMovementsRow {
                month,
                total_movements: sum(g, |c| c.call.movements),
            })
        })
    }

    /// Services ranked by mean movements per operating hour.
    pub fn service_efficiency(&self, n: usize) -> Section<ServiceEfficiencyRow> {
        self.section(&[VesselColumn::Service], || {
            let rows: Vec<ServiceEfficiencyRow> = group_by(&self.calls, |c| c.call.service.clone())
                .into_iter()
                .filter_map(|(service, g)| {
                    Some(ServiceEfficiencyRow {
                        service,
                        avg_movements_per_hour: reduce(g.as_slice(), Reduction::Mean, |c| c.metrics.movements_per_hour)?,
                    })
                })
                .collect();
            top_n(rows, n, |r| r.avg_movements_per_hour)
        })
    }

    pub fn avg_operation_hours(&self) -> Option<f64> {
        let hours: Vec<f64> = self.calls.iter().filter_map(|c| c.metrics.operation_hours).collect();
        mean(&hours)
    }

    pub fn month_span(&self) -> (Option<MonthKey>, Option<MonthKey>) {
        let months = self.calls.iter().filter_map(|c| c.call.berthing_month);
        (months.clone().min(), months.max())
    }
}

fn sum(rows: &[&EnrichedCall], metric: impl Fn(&EnrichedCall) -> Option<f64>) -> f64 {
    reduce(rows, Reduction::Sum, metric).unwrap_or(0.0)
}

fn by_month<'a, R>(
    calls: impl IntoIterator<Item = &'a EnrichedCall>,
    build: impl Fn(MonthKey, &[&EnrichedCall]) -> R,
) -> Vec<R> {
    chronological(group_by(calls, |c| c.call.berthing_month))
        .into_iter()
        .map(|(month, g)| build(month, &g))
        .collect()
}

fn stay_vs_operation<'a>(calls: impl IntoIterator<Item = &'a EnrichedCall>) -> Vec<MonthlyStayRow> {
    by_month(calls, |month, g| MonthlyStayRow {
        month,
        avg_port_stay_hours: reduce(g, Reduction::Mean, |c| c.metrics.port_stay_hours),
        avg_operation_hours: reduce(g, Reduction::Mean, |c| c.metrics.operation_hours),
    })
}

fn operational_split<'a>(calls: impl IntoIterator<Item = &'a EnrichedCall>) -> Vec<MonthlySplitRow> {
    by_month(calls, |month, g| MonthlySplitRow {
        month,
        avg_operation_hours: reduce(g, Reduction::Mean, |c| c.metrics.operation_hours),
        avg_non_operational_hours: reduce(g, Reduction::Mean, |c| c.metrics.non_operational_hours),
    })
}

/// The five delay tables written by the `delays` command.
#[derive(Debug, Clone)]
pub struct DelayTables {
    pub anchorage_wait: Section<AnchorageWaitRow>,
    pub etb_delay: Section<EtbDelayRow>,
    pub above_mean_dwell: Section<DwellRow>,
    pub waiting_census: Section<WaitingCensusRow>,
    pub customs_delay: Section<CustomsDelayRow>,
}

// ---- trade views ----

/// Total exported plus imported weight per month number.
pub fn trade_seasonality(trade: &TradeTable) -> Section<TradeMonthRow> {
    let mut rows: Vec<TradeMonthRow> = group_by(&trade.records, |r| r.month)
        .into_iter()
        .map(|(month, g)| TradeMonthRow {
            month,
            total_kg: reduce(g.as_slice(), Reduction::Sum, |r| r.total_kg).unwrap_or(0.0),
        })
        .collect();
    rows.sort_by_key(|r| r.month);
    SectionOutcome::Ready(rows)
}

/// Largest (municipality, product section) pairs by export value. Records
/// missing either key are left out.
pub fn municipality_exports(trade: &TradeTable, n: usize) -> Section<MunicipalityExportRow> {
    let rows: Vec<MunicipalityExportRow> = group_by(&trade.records, |r| r.municipality.clone().zip(r.section.clone()))
        .into_iter()
        .map(|((municipality, section), g)| MunicipalityExportRow {
            label: format!("{} - {}", municipality, section),
            export_value: reduce(g.as_slice(), Reduction::Sum, |r| r.export_value).unwrap_or(0.0),
            municipality,
            section,
        })
        .collect();
    SectionOutcome::Ready(top_n(rows, n, |r| r.export_value))
}

/// Share of total export value per destination country. Records without a
/// country count toward no share and not toward the total.
pub fn country_concentration(trade: &TradeTable, n: usize) -> SectionOutcome<CountryConcentration> {
    let totals: Vec<(String, f64)> = group_by(&trade.records, |r| r.country.clone())
        .into_iter()
        .map(|(country, g)| {
            let v = reduce(g.as_slice(), Reduction::Sum, |r| r.export_value).unwrap_or(0.0);
            (country, v)
        })
        .collect();
    let grand_total: f64 = totals.iter().map(|(_, v)| v).sum();
    if grand_total == 0.0 {
        warn!("total export value is zero; country shares are undefined");
        return SectionOutcome::Unavailable("no export value recorded".to_string());
    }

    let ranked = top_n(totals, usize::MAX, |(_, v)| *v);
    let shares: Vec<CountryShareRow> = ranked
        .into_iter()
        .map(|(country, export_value)| CountryShareRow {
            country,
            export_value,
            share_pct: round_to(export_value / grand_total * 100.0, 2),
        })
        .collect();
    let top3_share_pct: f64 = shares.iter().take(3).map(|r| r.share_pct).sum();
    SectionOutcome::Ready(CountryConcentration {
        top: shares.into_iter().take(n).collect(),
        top3_share_pct,
    })
}

/// Product sections with the highest mean FOB value per kg, among line
/// items above `min_value_per_kg`.
pub fn high_value_sections(trade: &TradeTable, min_value_per_kg: f64, n: usize) -> Section<SectionValueRow> {
    let valuable = trade
        .records
        .iter()
        .filter(|r| r.value_per_kg.is_some_and(|v| v > min_value_per_kg));
    let rows: Vec<SectionValueRow> = group_by(valuable, |r| r.section.clone())
        .into_iter()
        .filter_map(|(section, g)| {
            Some(SectionValueRow {
                section,
                avg_value_per_kg: reduce(g.as_slice(), Reduction::Mean, |r| r.value_per_kg)?,
            })
        })
        .collect();
    SectionOutcome::Ready(top_n(rows, n, |r| r.avg_value_per_kg))
}

pub fn summary(vessels: &VesselAnalysis, trade: &Dataset<TradeTable>, n: usize) -> ReportSummary {
    let (first_month, last_month) = vessels.month_span();
    let trade_table = trade.get();
    ReportSummary {
        total_vessel_calls: vessels.calls().len(),
        first_month,
        last_month,
        trade_records: trade_table.map(|t| t.records.len()),
        top3_country_share_pct: trade_table
            .and_then(|t| country_concentration(t, n).ready().map(|c| c.top3_share_pct)),
        avg_operation_hours: vessels.avg_operation_hours(),
    }
}
