//! Per-record derived quantities. Every formula propagates `None`.

use chrono::NaiveDateTime;

use crate::types::VesselCall;

/// `end - start` in fractional hours, negative when the lifecycle order is
/// violated.
pub fn elapsed_hours(end: Option<NaiveDateTime>, start: Option<NaiveDateTime>) -> Option<f64> {
    let (end, start) = (end?, start?);
    Some((end - start).num_seconds() as f64 / 3600.0)
}

/// `count / hours`; `None` on a zero divisor.
pub fn rate(count: Option<f64>, hours: Option<f64>) -> Option<f64> {
    ratio(count?, hours?)
}

/// `value / weight`; `None` on a zero weight.
pub fn per_kg_value(value: Option<f64>, weight: Option<f64>) -> Option<f64> {
    ratio(value?, weight?)
}

fn ratio(num: f64, den: f64) -> Option<f64> {
    if den == 0.0 {
        return None;
    }
    let r = num / den;
    r.is_finite().then_some(r)
}

/// Derived durations of one port call.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CallMetrics {
    /// Arrival at anchorage to berthing.
    pub anchorage_wait_hours: Option<f64>,
    /// Estimated berthing (ETB) to actual berthing.
    pub etb_delay_hours: Option<f64>,
    pub operation_hours: Option<f64>,
    /// Arrival at anchorage to unberthing.
    pub port_stay_hours: Option<f64>,
    /// Port stay not spent operating.
    pub non_operational_hours: Option<f64>,
    /// Operation end to customs release.
    pub customs_delay_hours: Option<f64>,
    pub movements_per_hour: Option<f64>,
}

impl CallMetrics {
    pub fn of(call: &VesselCall) -> Self {
        let operation_hours = elapsed_hours(call.operation_end, call.operation_start);
        let port_stay_hours = elapsed_hours(call.unberthing, call.arrival_at_anchorage);
        Self {
            anchorage_wait_hours: elapsed_hours(call.berthing, call.arrival_at_anchorage),
            etb_delay_hours: elapsed_hours(call.berthing, call.estimated_berthing),
            operation_hours,
            port_stay_hours,
            non_operational_hours: port_stay_hours.zip(operation_hours).map(|(s, o)| s - o),
            customs_delay_hours: elapsed_hours(call.customs_release, call.operation_end),
            movements_per_hour: rate(call.movements, operation_hours),
        }
    }
}

/// A call together with its derived metrics.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedCall {
    pub call: VesselCall,
    pub metrics: CallMetrics,
}

pub fn enrich(calls: &[VesselCall]) -> Vec<EnrichedCall> {
    calls
        .iter()
        .map(|call| EnrichedCall {
            call: call.clone(),
            metrics: CallMetrics::of(call),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> Option<NaiveDateTime> {
        Some(NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap())
    }

    #[test]
    fn elapsed_hours_matches_direct_subtraction() {
        let end = ts("2024-01-02 06:30:15");
        let start = ts("2024-01-01 00:00:00");
        let expected = (end.unwrap() - start.unwrap()).num_seconds() as f64 / 3600.0;
        assert_eq!(elapsed_hours(end, start), Some(expected));
        assert_eq!(elapsed_hours(start, end), Some(-expected));
        assert_eq!(elapsed_hours(None, None), None);
        assert_eq!(elapsed_hours(end, None), None);
    }

    #[test]
    fn zero_divisors_are_missing_not_infinite() {
        assert_eq!(per_kg_value(Some(100.0), Some(0.0)), None);
        assert_eq!(per_kg_value(Some(100.0), Some(4.0)), Some(25.0));
        assert_eq!(rate(Some(10.0), Some(0.0)), None);
        assert_eq!(rate(None, Some(2.0)), None);
    }

    #[test]
    fn call_metrics() {
        let call = VesselCall {
            arrival_at_anchorage: ts("2024-01-01 00:00:00"),
            berthing: ts("2024-01-01 10:00:00"),
            operation_start: ts("2024-01-01 11:00:00"),
            operation_end: ts("2024-01-01 15:00:00"),
            unberthing: ts("2024-01-01 16:00:00"),
            movements: Some(200.0),
            ..Default::default()
        };
        let m = CallMetrics::of(&call);
        assert_eq!(m.anchorage_wait_hours, Some(10.0));
        assert_eq!(m.operation_hours, Some(4.0));
        assert_eq!(m.port_stay_hours, Some(16.0));
        assert_eq!(m.non_operational_hours, Some(12.0));
        assert_eq!(m.movements_per_hour, Some(50.0));
        assert_eq!(m.etb_delay_hours, None);
        assert_eq!(m.customs_delay_hours, None);
    }
}
