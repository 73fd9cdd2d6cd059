//! Dashboard summaries for the task board and the lead pipeline.

use chrono::NaiveDate;
use indexmap::IndexMap;

use crate::model::board::TaskBoard;
use crate::model::lead::{Lead, LeadStatus};
use crate::model::task::{Task, TaskGroup};
use crate::ops::lead_ops::pipeline_value;
use crate::ops::views::{Timeline, date_bucket, group_count, status_timeline};

/// Report statuses, in display order
pub const REPORT_STATUSES: [&str; 3] = ["Pending", "In Progress", "Completed"];

/// Headline numbers for the task board
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardSummary {
    pub total: usize,
    pub completed: usize,
    pub open: usize,
    /// Share of completed tasks, rounded to a whole percent
    pub completed_percent: u8,
    /// Task counts per report status, in [`REPORT_STATUSES`] order
    pub by_status: Vec<(&'static str, usize)>,
    /// Assignee with the most in-progress tasks, and how many
    pub top_assignee: Option<(String, usize)>,
    /// Earliest expiry among pending tasks
    pub next_due: Option<NextDue>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NextDue {
    pub task_id: u64,
    pub title: String,
    pub date: NaiveDate,
}

pub fn board_summary(board: &TaskBoard) -> BoardSummary {
    let total = board.len();
    let completed = board.completed.len();
    let completed_percent = ((completed as f64 * 100.0) / total.max(1) as f64).round() as u8;

    let mut by_status: IndexMap<&'static str, usize> =
        REPORT_STATUSES.iter().map(|s| (*s, 0)).collect();
    for group in TaskGroup::ALL {
        *by_status.entry(group.report_status()).or_insert(0) += board.group(group).len();
    }

    // Every task reported as "In Progress", review included
    let active: Vec<&str> = board
        .iter()
        .filter(|(group, _)| group.report_status() == "In Progress")
        .map(|(_, t)| t.user_name.as_str())
        .filter(|u| !u.is_empty())
        .collect();
    let mut top_assignee: Option<(String, usize)> = None;
    for (user, count) in group_count(&active[..], |u| *u) {
        if top_assignee.as_ref().is_none_or(|(_, best)| count > *best) {
            top_assignee = Some((user.to_string(), count));
        }
    }

    let next_due = board
        .todo
        .iter()
        .filter_map(|t| t.expiry_date.map(|d| (d, t)))
        .min_by_key(|(d, _)| *d)
        .map(|(date, t)| NextDue {
            task_id: t.id,
            title: t.title.clone(),
            date,
        });

    BoardSummary {
        total,
        completed,
        open: total - completed,
        completed_percent,
        by_status: by_status.into_iter().collect(),
        top_assignee,
        next_due,
    }
}

/// Series order of the due-date timeline, bottom of the stack first
pub const TIMELINE_STATUSES: [&str; 3] = ["Completed", "In Progress", "Pending"];

/// The task board laid out by due date
#[derive(Debug, Clone, PartialEq)]
pub struct DueCharts {
    /// Tasks per expiry date, ascending
    pub due_dates: Vec<(String, usize)>,
    /// Report status counts per expiry date
    pub timeline: Timeline<&'static str>,
}

fn due_date(entry: &(TaskGroup, &Task)) -> Option<String> {
    entry.1.expiry_date.map(|d| d.format("%Y-%m-%d").to_string())
}

/// Due-date charts over every task with an expiry date
pub fn due_charts(board: &TaskBoard) -> DueCharts {
    let tasks: Vec<(TaskGroup, &Task)> = board.iter().collect();
    DueCharts {
        due_dates: date_bucket(&tasks[..], due_date).into_iter().collect(),
        timeline: status_timeline(
            &tasks[..],
            &TIMELINE_STATUSES,
            |(group, _)| group.report_status(),
            due_date,
        ),
    }
}

/// Headline numbers for the lead pipeline
#[derive(Debug, Clone, PartialEq)]
pub struct LeadSummary {
    pub total: usize,
    /// Lead counts per status in the fixed status order; zero counts omitted
    pub by_status: Vec<(LeadStatus, usize)>,
    /// Lead counts per source, in order of first appearance
    pub by_source: IndexMap<String, usize>,
    /// Sum of all parseable potential values
    pub pipeline_value: f64,
}

pub fn lead_summary(leads: &[Lead]) -> LeadSummary {
    let status_counts = group_count(leads, |l| l.status);
    let by_status = LeadStatus::ALL
        .iter()
        .filter_map(|s| status_counts.get(s).map(|n| (*s, *n)))
        .collect();
    let by_source = group_count(leads, |l| {
        let source = l.lead_source.trim();
        if source.is_empty() {
            "Unknown".to_string()
        } else {
            source.to_string()
        }
    });
    LeadSummary {
        total: leads.len(),
        by_status,
        by_source,
        pipeline_value: pipeline_value(leads),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn task(id: u64, user: &str) -> Task {
        Task {
            id,
            title: format!("Task {}", id),
            user_name: user.into(),
            ..Default::default()
        }
    }

    #[test]
    fn empty_board_summary() {
        let summary = board_summary(&TaskBoard::default());
        assert_eq!(summary.total, 0);
        assert_eq!(summary.completed_percent, 0);
        assert_eq!(
            summary.by_status,
            vec![("Pending", 0), ("In Progress", 0), ("Completed", 0)]
        );
        assert_eq!(summary.top_assignee, None);
        assert_eq!(summary.next_due, None);
    }

    #[test]
    fn board_summary_counts() {
        let mut due_late = task(1, "Ava");
        due_late.expiry_date = Some(date("2025-12-01"));
        let mut due_soon = task(2, "Ava");
        due_soon.expiry_date = Some(date("2025-11-10"));
        let board = TaskBoard {
            todo: vec![due_late, due_soon, task(3, "Liam")],
            in_progress: vec![task(4, "Liam"), task(5, "Noah"), task(6, "Liam")],
            review_ready: vec![task(7, "Noah")],
            completed: vec![task(8, "Ava"), task(9, "Ava")],
        };
        let summary = board_summary(&board);
        assert_eq!(summary.total, 9);
        assert_eq!(summary.completed, 2);
        assert_eq!(summary.open, 7);
        assert_eq!(summary.completed_percent, 22);
        assert_eq!(
            summary.by_status,
            vec![("Pending", 3), ("In Progress", 4), ("Completed", 2)]
        );
        assert_eq!(summary.top_assignee, Some(("Liam".to_string(), 2)));
        let next = summary.next_due.unwrap();
        assert_eq!((next.task_id, next.date), (2, date("2025-11-10")));
    }

    #[test]
    fn top_assignee_tie_goes_to_first_seen() {
        let board = TaskBoard {
            in_progress: vec![task(1, "Noah"), task(2, "Ava")],
            ..Default::default()
        };
        assert_eq!(
            board_summary(&board).top_assignee,
            Some(("Noah".to_string(), 1))
        );
    }

    #[test]
    fn top_assignee_counts_review_ready_as_in_progress() {
        let board = TaskBoard {
            in_progress: vec![task(1, "Liam")],
            review_ready: vec![task(2, "Ava"), task(3, "Ava")],
            ..Default::default()
        };
        let summary = board_summary(&board);
        assert_eq!(
            summary.by_status,
            vec![("Pending", 0), ("In Progress", 3), ("Completed", 0)]
        );
        assert_eq!(summary.top_assignee, Some(("Ava".to_string(), 2)));
    }

    #[test]
    fn due_charts_bucket_and_stack_by_expiry() {
        let due = |id: u64, day: &str| Task {
            expiry_date: Some(date(day)),
            ..task(id, "")
        };
        let board = TaskBoard {
            todo: vec![due(1, "2025-11-12"), due(2, "2025-11-15"), task(3, "Noah")],
            in_progress: vec![due(4, "2025-11-10")],
            review_ready: vec![due(5, "2025-11-12")],
            completed: vec![due(6, "2025-11-05"), due(7, "2025-11-02")],
        };
        let charts = due_charts(&board);
        assert_eq!(
            charts.due_dates,
            vec![
                ("2025-11-02".to_string(), 1),
                ("2025-11-05".to_string(), 1),
                ("2025-11-10".to_string(), 1),
                ("2025-11-12".to_string(), 2),
                ("2025-11-15".to_string(), 1),
            ]
        );
        assert_eq!(
            charts.timeline.dates,
            vec!["2025-11-02", "2025-11-05", "2025-11-10", "2025-11-12", "2025-11-15"]
        );
        let series: Vec<(&str, Vec<usize>)> = charts
            .timeline
            .series
            .iter()
            .map(|s| (s.status, s.counts.clone()))
            .collect();
        assert_eq!(
            series,
            vec![
                ("Completed", vec![1, 1, 0, 0, 0]),
                ("In Progress", vec![0, 0, 1, 1, 0]),
                ("Pending", vec![0, 0, 0, 1, 1]),
            ]
        );
    }

    #[test]
    fn lead_summary_orders_statuses_and_omits_zeros() {
        let lead = |status: LeadStatus, source: &str, value: &str| Lead {
            status,
            lead_source: source.into(),
            potential_value: value.into(),
            ..Default::default()
        };
        let leads = vec![
            lead(LeadStatus::Won, "Referral", "5,000"),
            lead(LeadStatus::NewLead, "Website", "1200"),
            lead(LeadStatus::Won, "", "n/a"),
            lead(LeadStatus::Contacted, "Website", ""),
        ];
        let summary = lead_summary(&leads);
        assert_eq!(summary.total, 4);
        assert_eq!(
            summary.by_status,
            vec![
                (LeadStatus::NewLead, 1),
                (LeadStatus::Contacted, 1),
                (LeadStatus::Won, 2),
            ]
        );
        let sources: Vec<(&str, usize)> = summary
            .by_source
            .iter()
            .map(|(k, v)| (k.as_str(), *v))
            .collect();
        assert_eq!(sources, vec![("Referral", 1), ("Website", 2), ("Unknown", 1)]);
        assert_eq!(summary.pipeline_value, 6200.0);
    }
}
