//! Daily count of vessels waiting at anchorage.

use chrono::{Duration, NaiveDateTime};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyCount {
    pub day: NaiveDateTime,
    pub waiting: usize,
}

/// For each day from the earliest arrival to the latest berthing, count the
/// `[arrival, berthing)` intervals that contain it.
///
/// Intervals missing an endpoint are dropped before the grid is built. An
/// inverted interval (berthing before arrival) still stretches the grid but
/// never counts.
pub fn waiting_census<I>(intervals: I) -> Vec<DailyCount>
where
    I: IntoIterator<Item = (Option<NaiveDateTime>, Option<NaiveDateTime>)>,
{
    let complete: Vec<(NaiveDateTime, NaiveDateTime)> = intervals
        .into_iter()
        .filter_map(|(arrival, berthing)| Some((arrival?, berthing?)))
        .collect();
    let (Some(start), Some(end)) = (
        complete.iter().map(|(a, _)| *a).min(),
        complete.iter().map(|(_, b)| *b).max(),
    ) else {
        return Vec::new();
    };

    let mut arrivals: Vec<NaiveDateTime> = Vec::with_capacity(complete.len());
    let mut berthings: Vec<NaiveDateTime> = Vec::with_capacity(complete.len());
    for (a, b) in complete.into_iter().filter(|(a, b)| a <= b) {
        arrivals.push(a);
        berthings.push(b);
    }
    arrivals.sort_unstable();
    berthings.sort_unstable();

    // waiting(d) = #(arrival <= d) - #(berthing <= d)
    let (mut ai, mut bi) = (0usize, 0usize);
    let mut out = Vec::new();
    let mut day = start;
    while day <= end {
        while ai < arrivals.len() && arrivals[ai] <= day {
            ai += 1;
        }
        while bi < berthings.len() && berthings[bi] <= day {
            bi += 1;
        }
        out.push(DailyCount {
            day,
            waiting: ai - bi,
        });
        day += Duration::days(1);
    }
    out
}
