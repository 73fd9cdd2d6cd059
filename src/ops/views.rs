//! Derived views over leads and tasks. Everything here is a pure function
//! of its input and is recomputed on each call.

use std::collections::{BTreeMap, BTreeSet};
use std::hash::Hash;

use chrono::NaiveDate;
use indexmap::IndexMap;

use crate::model::board::TaskBoard;
use crate::model::task::TaskGroup;

/// Count items per distinct key, in order of first appearance
pub fn group_count<T, K, F>(items: &[T], mut key: F) -> IndexMap<K, usize>
where
    K: Hash + Eq,
    F: FnMut(&T) -> K,
{
    let mut counts = IndexMap::new();
    for item in items {
        *counts.entry(key(item)).or_insert(0) += 1;
    }
    counts
}

/// Count items per date string, ascending. Items without a date are
/// skipped. ISO `yyyy-mm-dd` strings sort chronologically.
pub fn date_bucket<T, F>(items: &[T], mut date_of: F) -> BTreeMap<String, usize>
where
    F: FnMut(&T) -> Option<String>,
{
    let mut buckets = BTreeMap::new();
    for item in items {
        if let Some(date) = date_of(item).filter(|d| !d.is_empty()) {
            *buckets.entry(date).or_insert(0) += 1;
        }
    }
    buckets
}

/// One status's counts along a [`Timeline`]'s date axis
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Series<S> {
    pub status: S,
    pub counts: Vec<usize>,
}

/// Per-status counts aligned to a shared, sorted date axis. Every series
/// has exactly `dates.len()` entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timeline<S> {
    pub dates: Vec<String>,
    pub series: Vec<Series<S>>,
}

/// Build a stacked time series: one series per entry of `statuses` (in that
/// order) over the sorted union of all item dates.
pub fn status_timeline<T, S, FS, FD>(
    items: &[T],
    statuses: &[S],
    mut status_of: FS,
    mut date_of: FD,
) -> Timeline<S>
where
    S: PartialEq + Clone,
    FS: FnMut(&T) -> S,
    FD: FnMut(&T) -> Option<String>,
{
    let points: Vec<(S, String)> = items
        .iter()
        .filter_map(|item| {
            let date = date_of(item).filter(|d| !d.is_empty())?;
            Some((status_of(item), date))
        })
        .collect();

    let dates: Vec<String> = points
        .iter()
        .map(|(_, d)| d.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let series = statuses
        .iter()
        .map(|status| {
            let mut counts = vec![0; dates.len()];
            for (s, date) in &points {
                if s == status
                    && let Ok(idx) = dates.binary_search(date)
                {
                    counts[idx] += 1;
                }
            }
            Series {
                status: status.clone(),
                counts,
            }
        })
        .collect();

    Timeline { dates, series }
}

/// A task laid out on a calendar
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GanttBar {
    pub id: u64,
    pub label: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub duration_days: i64,
    pub group: TaskGroup,
}

/// Bars for every task that has both a start and an end date, in board
/// order. Tasks missing either are left out.
pub fn gantt_bars(board: &TaskBoard) -> Vec<GanttBar> {
    board
        .iter()
        .filter_map(|(group, task)| {
            let start = task.start_date()?;
            let end = task.expiry_date?;
            Some(GanttBar {
                id: task.id,
                label: task.title.clone(),
                start,
                end,
                duration_days: (end - start).num_days(),
                group,
            })
        })
        .collect()
}
