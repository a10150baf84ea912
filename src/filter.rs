//! Row filters over a numeric metric: IQR outlier removal and threshold
//! selection.

use crate::util::{mean, quantile};

/// Tukey fences multiplier.
pub const IQR_FENCE: f64 = 1.5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IqrBounds {
    pub q1: f64,
    pub q3: f64,
    pub lower: f64,
    pub upper: f64,
}

impl IqrBounds {
    pub fn of(values: &[f64]) -> Option<Self> {
        let q1 = quantile(values, 0.25)?;
        let q3 = quantile(values, 0.75)?;
        let iqr = q3 - q1;
        Some(Self {
            q1,
            q3,
            lower: q1 - IQR_FENCE * iqr,
            upper: q3 + IQR_FENCE * iqr,
        })
    }

    pub fn contains(&self, v: f64) -> bool {
        v >= self.lower && v <= self.upper
    }
}

fn present<T, F>(rows: &[T], metric: &F) -> Vec<f64>
where
    F: Fn(&T) -> Option<f64>,
{
    rows.iter().filter_map(metric).collect()
}

/// Keep rows whose metric lies inside the IQR fences computed on `rows`.
/// Rows without a value are dropped; order is preserved.
pub fn remove_outliers_iqr<T, F>(rows: Vec<T>, metric: F) -> Vec<T>
where
    F: Fn(&T) -> Option<f64>,
{
    let Some(bounds) = IqrBounds::of(&present(&rows, &metric)) else {
        return Vec::new();
    };
    rows.into_iter()
        .filter(|r| metric(r).is_some_and(|v| bounds.contains(v)))
        .collect()
}

/// How the cutoff of a "metric above threshold" report is chosen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ThresholdPolicy {
    /// Quantile (0..=1) of the metric over the whole population.
    Quantile(f64),
    Fixed(f64),
    /// Arithmetic mean of the metric over the whole population.
    Mean,
}

impl ThresholdPolicy {
    pub fn cutoff(&self, values: &[f64]) -> Option<f64> {
        match *self {
            ThresholdPolicy::Quantile(q) => quantile(values, q),
            ThresholdPolicy::Fixed(v) => Some(v),
            ThresholdPolicy::Mean => mean(values),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Selection<'a, T> {
    pub cutoff: Option<f64>,
    pub rows: Vec<&'a T>,
}

/// Rows whose metric is strictly above the cutoff. The cutoff is computed
/// once, over the unfiltered population.
pub fn select_above<'a, T, F>(rows: &'a [T], policy: ThresholdPolicy, metric: F) -> Selection<'a, T>
where
    F: Fn(&T) -> Option<f64>,
{
    let cutoff = policy.cutoff(&present(rows, &metric));
    let selected = match cutoff {
        Some(c) => rows
            .iter()
            .filter(|r| metric(*r).is_some_and(|v| v > c))
            .collect(),
        None => Vec::new(),
    };
    Selection {
        cutoff,
        rows: selected,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retained_values_stay_within_input_fences() {
        let values = vec![
            Some(1.0),
            Some(2.0),
            Some(2.5),
            Some(3.0),
            None,
            Some(3.5),
            Some(4.0),
            Some(50.0),
            Some(-40.0),
        ];
        let bounds = IqrBounds::of(&values.iter().flatten().copied().collect::<Vec<_>>()).unwrap();
        let kept = remove_outliers_iqr(values.clone(), |v| *v);

        assert!(kept.len() < values.len());
        for v in &kept {
            let v = v.unwrap();
            assert!(bounds.contains(v));
            assert!(values.contains(&Some(v)));
        }
        assert!(!kept.contains(&Some(50.0)));
        assert!(!kept.contains(&Some(-40.0)));
        assert!(!kept.contains(&None));
    }

    #[test]
    fn chained_filters_recompute_on_filtered_rows() {
        let rows: Vec<(f64, f64)> = vec![(1.0, 10.0), (2.0, 11.0), (3.0, 12.0), (100.0, 13.0), (2.5, 500.0)];
        let first = remove_outliers_iqr(rows, |r| Some(r.0));
        assert_eq!(first.len(), 4);
        let second = remove_outliers_iqr(first, |r| Some(r.1));
        assert_eq!(second, vec![(1.0, 10.0), (2.0, 11.0), (3.0, 12.0)]);
    }

    #[test]
    fn mean_cutoff_is_taken_from_unfiltered_population() {
        let rows = [1.0, 2.0, 3.0, 10.0];
        let sel = select_above(&rows, ThresholdPolicy::Mean, |v| Some(*v));
        assert_eq!(sel.cutoff, Some(4.0));
        assert_eq!(sel.rows, vec![&10.0]);
    }

    #[test]
    fn quantile_and_fixed_policies() {
        let rows = [1.0, 2.0, 3.0, 4.0, 5.0];
        let q = select_above(&rows, ThresholdPolicy::Quantile(0.75), |v| Some(*v));
        assert_eq!(q.cutoff, Some(4.0));
        assert_eq!(q.rows, vec![&5.0]);

        let fixed = select_above(&rows, ThresholdPolicy::Fixed(1.0), |v| Some(*v));
        assert_eq!(fixed.rows.len(), 4);

        let empty: [f64; 0] = [];
        assert!(select_above(&empty, ThresholdPolicy::Mean, |v| Some(*v)).rows.is_empty());
    }
}
