//! Group-and-reduce over typed rows.
//!
//! Groups come out in first-appearance order. Month-keyed tables are put in
//! calendar order with [`chronological`].

use std::cmp::Ordering;
use std::collections::HashMap;
use std::hash::Hash;

use crate::types::MonthKey;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reduction {
    /// Sum of present values; `0` when none are present.
    Sum,
    /// Mean of present values; missing when none are present.
    Mean,
    /// Number of present values.
    Count,
}

impl Reduction {
    pub fn apply<I>(self, values: I) -> Option<f64>
    where
        I: IntoIterator<Item = Option<f64>>,
    {
        let present: Vec<f64> = values.into_iter().flatten().collect();
        match self {
            Reduction::Sum => Some(present.iter().sum()),
            Reduction::Mean => crate::util::mean(&present),
            Reduction::Count => Some(present.len() as f64),
        }
    }
}

/// Group rows by `key`. Rows without a key are left out.
pub fn group_by<'a, T, K, F>(rows: impl IntoIterator<Item = &'a T>, key: F) -> Vec<(K, Vec<&'a T>)>
where
    T: 'a,
    K: Eq + Hash + Clone,
    F: Fn(&T) -> Option<K>,
{
    let mut slots: HashMap<K, usize> = HashMap::new();
    let mut groups: Vec<(K, Vec<&'a T>)> = Vec::new();
    for row in rows {
        let Some(k) = key(row) else { continue };
        match slots.get(&k) {
            Some(&i) => groups[i].1.push(row),
            None => {
                slots.insert(k.clone(), groups.len());
                groups.push((k, vec![row]));
            }
        }
    }
    groups
}

/// Reduce one metric over a group.
pub fn reduce<T, F>(rows: &[&T], reduction: Reduction, metric: F) -> Option<f64>
where
    F: Fn(&T) -> Option<f64>,
{
    reduction.apply(rows.iter().map(|r| metric(*r)))
}

/// Sort month-keyed rows into calendar order.
pub fn chronological<V>(mut rows: Vec<(MonthKey, V)>) -> Vec<(MonthKey, V)> {
    rows.sort_by_key(|(k, _)| *k);
    rows
}

/// Stable descending sort by `value`, truncated to `n` rows.
pub fn top_n<R, F>(mut rows: Vec<R>, n: usize, value: F) -> Vec<R>
where
    F: Fn(&R) -> f64,
{
    rows.sort_by(|a, b| value(b).partial_cmp(&value(a)).unwrap_or(Ordering::Equal));
    rows.truncate(n);
    rows
}
