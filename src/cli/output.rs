use chrono::NaiveDate;
use serde::Serialize;

use crate::io::recovery::RecoveryEntry;
use crate::model::lead::Lead;
use crate::model::task::{Task, TaskGroup};
use crate::ops::report::{BoardSummary, DueCharts, LeadSummary};
use crate::ops::search::{LeadHit, TaskHit};
use crate::ops::task_ops::due_label;
use crate::ops::update::UpdateOutcome;
use crate::ops::views::{GanttBar, Timeline};
use crate::util::unicode::pad_to_width;

// ---------------------------------------------------------------------------
// JSON output structs
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct TaskJson {
    pub id: u64,
    pub group: TaskGroup,
    pub title: String,
    pub user: String,
    pub category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assign_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<NaiveDate>,
    pub completion: u8,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub updates: Vec<UpdateJson>,
}

#[derive(Serialize)]
pub struct UpdateJson {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

#[derive(Serialize)]
pub struct UpdateOutcomeJson {
    pub task_id: u64,
    pub previous: u8,
    pub completion: u8,
    pub manual: bool,
}

#[derive(Serialize)]
pub struct BoardSummaryJson {
    pub total: usize,
    pub completed: usize,
    pub open: usize,
    pub completed_percent: u8,
    pub by_status: Vec<CountJson>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_assignee: Option<CountJson>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_due: Option<NextDueJson>,
    pub schedule: Vec<GanttBarJson>,
    pub due_dates: Vec<CountJson>,
    pub timeline: TimelineJson,
}

#[derive(Serialize)]
pub struct CountJson {
    pub name: String,
    pub count: usize,
}

#[derive(Serialize)]
pub struct NextDueJson {
    pub task_id: u64,
    pub title: String,
    pub date: NaiveDate,
}

#[derive(Serialize)]
pub struct GanttBarJson {
    pub id: u64,
    pub label: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub duration_days: i64,
    pub group: TaskGroup,
}

#[derive(Serialize)]
pub struct LeadSummaryJson {
    pub total: usize,
    pub by_status: Vec<CountJson>,
    pub by_source: Vec<CountJson>,
    pub pipeline_value: f64,
    pub follow_ups: Vec<CountJson>,
    pub timeline: TimelineJson,
}

#[derive(Serialize)]
pub struct TimelineJson {
    pub dates: Vec<String>,
    pub series: Vec<SeriesJson>,
}

#[derive(Serialize)]
pub struct SeriesJson {
    pub status: String,
    pub counts: Vec<usize>,
}

#[derive(Serialize)]
pub struct SearchHitJson {
    pub id: String,
    pub field: String,
    pub text: String,
}

#[derive(Serialize)]
pub struct RecoveryEntryJson {
    pub timestamp: String,
    pub category: String,
    pub key: String,
    pub description: String,
    pub body: String,
}

// ---------------------------------------------------------------------------
// Conversions
// ---------------------------------------------------------------------------

pub fn task_to_json(group: TaskGroup, task: &Task) -> TaskJson {
    TaskJson {
        id: task.id,
        group,
        title: task.title.clone(),
        user: task.user_name.clone(),
        category: task.category.clone(),
        assign_date: task.assign_date,
        expiry_date: task.expiry_date,
        completion: task.completion,
        description: task.description.clone(),
        email: task.email.clone(),
        updates: task
            .updates
            .iter()
            .map(|u| UpdateJson {
                text: u.text.clone(),
                timestamp: u.timestamp.map(|t| t.to_rfc3339()),
            })
            .collect(),
    }
}

pub fn outcome_to_json(outcome: &UpdateOutcome) -> UpdateOutcomeJson {
    UpdateOutcomeJson {
        task_id: outcome.task_id,
        previous: outcome.previous,
        completion: outcome.completion,
        manual: outcome.manual,
    }
}

pub fn board_summary_to_json(
    summary: &BoardSummary,
    bars: &[GanttBar],
    charts: &DueCharts,
) -> BoardSummaryJson {
    BoardSummaryJson {
        total: summary.total,
        completed: summary.completed,
        open: summary.open,
        completed_percent: summary.completed_percent,
        by_status: summary
            .by_status
            .iter()
            .map(|(name, count)| count_json(name, *count))
            .collect(),
        top_assignee: summary
            .top_assignee
            .as_ref()
            .map(|(name, count)| count_json(name, *count)),
        next_due: summary.next_due.as_ref().map(|d| NextDueJson {
            task_id: d.task_id,
            title: d.title.clone(),
            date: d.date,
        }),
        schedule: bars
            .iter()
            .map(|b| GanttBarJson {
                id: b.id,
                label: b.label.clone(),
                start: b.start,
                end: b.end,
                duration_days: b.duration_days,
                group: b.group,
            })
            .collect(),
        due_dates: charts
            .due_dates
            .iter()
            .map(|(date, count)| count_json(date, *count))
            .collect(),
        timeline: timeline_json(&charts.timeline),
    }
}

pub fn lead_summary_to_json<S: std::fmt::Display>(
    summary: &LeadSummary,
    follow_ups: &[(String, usize)],
    timeline: &Timeline<S>,
) -> LeadSummaryJson {
    LeadSummaryJson {
        total: summary.total,
        by_status: summary
            .by_status
            .iter()
            .map(|(status, count)| count_json(status.label(), *count))
            .collect(),
        by_source: summary
            .by_source
            .iter()
            .map(|(source, count)| count_json(source, *count))
            .collect(),
        pipeline_value: summary.pipeline_value,
        follow_ups: follow_ups
            .iter()
            .map(|(date, count)| count_json(date, *count))
            .collect(),
        timeline: timeline_json(timeline),
    }
}

fn timeline_json<S: std::fmt::Display>(timeline: &Timeline<S>) -> TimelineJson {
    TimelineJson {
        dates: timeline.dates.clone(),
        series: timeline
            .series
            .iter()
            .map(|s| SeriesJson {
                status: s.status.to_string(),
                counts: s.counts.clone(),
            })
            .collect(),
    }
}

fn count_json(name: &str, count: usize) -> CountJson {
    CountJson {
        name: name.to_string(),
        count,
    }
}

pub fn lead_hit_to_json(hit: &LeadHit) -> SearchHitJson {
    SearchHitJson {
        id: hit.lead_id.clone(),
        field: hit.field.label().to_string(),
        text: hit.text.clone(),
    }
}

pub fn task_hit_to_json(hit: &TaskHit) -> SearchHitJson {
    SearchHitJson {
        id: hit.task_id.to_string(),
        field: hit.field.label().to_string(),
        text: hit.text.clone(),
    }
}

pub fn recovery_to_json(entry: &RecoveryEntry) -> RecoveryEntryJson {
    RecoveryEntryJson {
        timestamp: entry.timestamp.to_rfc3339(),
        category: entry.category.to_string(),
        key: entry.key.clone(),
        description: entry.description.clone(),
        body: entry.body.clone(),
    }
}

// ---------------------------------------------------------------------------
// Human-readable formatting
// ---------------------------------------------------------------------------

const NAME_CELLS: usize = 24;
const STATUS_CELLS: usize = 22;

/// One row of the lead table
pub fn format_lead_line(lead: &Lead) -> String {
    let follow_up = if lead.follow_up_date.is_empty() {
        String::new()
    } else {
        format!("  follow-up {}", lead.follow_up_date)
    };
    format!(
        "{}  {}  {}{}",
        lead.id,
        pad_to_width(&lead.customer_name, NAME_CELLS),
        pad_to_width(lead.status.label(), STATUS_CELLS),
        follow_up
    )
    .trim_end()
    .to_string()
}

/// Format the detailed lead view, comments newest first
pub fn format_lead_detail(lead: &Lead, previous_methods: &[String]) -> Vec<String> {
    let mut lines = vec![format!("{}  {}", lead.id, lead.customer_name)];
    lines.push(format!("status: {}", lead.status));

    let fields = [
        ("contact", &lead.contact_person),
        ("contact info", &lead.contact_info),
        ("source", &lead.lead_source),
        ("industry", &lead.industry),
        ("lead date", &lead.lead_date),
        ("assigned to", &lead.assigned_to),
        ("follow-up", &lead.follow_up_date),
        ("last contact", &lead.last_contact_date),
        ("value", &lead.potential_value),
        ("probability", &lead.probability),
        ("close date", &lead.expected_close_date),
        ("outcome", &lead.final_outcome),
        ("notes", &lead.notes),
        ("remarks", &lead.remarks),
    ];
    for (label, value) in fields {
        if !value.is_empty() {
            lines.push(format!("{}: {}", label, value));
        }
    }
    if let Some(method) = lead.follow_up_method {
        lines.push(format!("method: {}", method));
    }
    if !previous_methods.is_empty() {
        lines.push(format!("earlier methods: {}", previous_methods.join(", ")));
    }

    if !lead.comments.is_empty() {
        lines.push(String::new());
        lines.push("comments:".to_string());
        for c in &lead.comments {
            let mut header = c.timestamp.format("%Y-%m-%d %H:%M").to_string();
            if let Some(method) = c.method {
                header.push_str(&format!(" [{}]", method));
            }
            if let Some(status) = c.status {
                header.push_str(&format!(" -> {}", status));
            }
            lines.push(format!("  {}", header));
            for line in c.text.lines() {
                lines.push(format!("    {}", line));
            }
        }
    }
    lines
}

/// Format a group heading for the task listing
pub fn format_group_header(group: TaskGroup, count: usize) -> String {
    format!("== {} ({}) ==", group.title(), count)
}

/// One line per task: ID, completion, title, assignee
pub fn format_task_line(task: &Task) -> String {
    let user = if task.user_name.is_empty() {
        String::new()
    } else {
        format!("  @{}", task.user_name)
    };
    format!(
        "{:>4}  {:>3}%  {}{}",
        task.id,
        task.completion,
        pad_to_width(&task.title, NAME_CELLS + 8),
        user
    )
    .trim_end()
    .to_string()
}

/// Format detailed task view
pub fn format_task_detail(group: TaskGroup, task: &Task, today: NaiveDate) -> Vec<String> {
    let mut lines = vec![format!("#{} {}", task.id, task.title)];
    lines.push(format!("group: {}", group.title()));
    lines.push(format!("completion: {}%", task.completion));
    if !task.user_name.is_empty() {
        lines.push(format!("assignee: {}", task.user_name));
    }
    if let Some(email) = &task.email {
        lines.push(format!("email: {}", email));
    }
    if !task.category.is_empty() {
        lines.push(format!("category: {}", task.category));
    }
    if let Some(start) = task.start_date() {
        lines.push(format!("start: {}", start));
    }
    if let Some(end) = task.expiry_date {
        lines.push(format!("due: {} ({})", end, due_label(end, today)));
    }
    if !task.description.is_empty() {
        lines.push("description:".to_string());
        for line in task.description.lines() {
            lines.push(format!("  {}", line));
        }
    }
    if !task.updates.is_empty() {
        lines.push(String::new());
        lines.push("updates:".to_string());
        for u in &task.updates {
            match u.timestamp {
                Some(ts) => lines.push(format!("  {}  {}", ts.format("%Y-%m-%d %H:%M"), u.text)),
                None => lines.push(format!("  {}", u.text)),
            }
        }
    }
    lines
}

/// Progress line after an update: `old% → new%` or `set to new%`
pub fn format_update_outcome(title: &str, outcome: &UpdateOutcome) -> String {
    if outcome.manual {
        format!("{}: set to {}%", title, outcome.completion)
    } else {
        format!("{}: {}% → {}%", title, outcome.previous, outcome.completion)
    }
}

pub fn format_board_summary(
    summary: &BoardSummary,
    bars: &[GanttBar],
    charts: &DueCharts,
) -> Vec<String> {
    let mut lines = vec![format!(
        "{} tasks  {} completed  {} open  ({}% done)",
        summary.total, summary.completed, summary.open, summary.completed_percent
    )];
    for (status, count) in &summary.by_status {
        lines.push(format!("  {} {}", pad_to_width(status, 12), count));
    }
    if let Some((user, count)) = &summary.top_assignee {
        lines.push(format!("busiest: {} ({} in progress)", user, count));
    }
    if let Some(next) = &summary.next_due {
        lines.push(format!("next due: #{} {} on {}", next.task_id, next.title, next.date));
    }
    if !bars.is_empty() {
        lines.push(String::new());
        lines.push("schedule:".to_string());
        for bar in bars {
            lines.push(format!(
                "  {} {} → {}  {}d  [{}]",
                pad_to_width(&bar.label, NAME_CELLS),
                bar.start,
                bar.end,
                bar.duration_days,
                bar.group
            ));
        }
    }
    if !charts.due_dates.is_empty() {
        lines.push(String::new());
        lines.push("due dates:".to_string());
        for (date, count) in &charts.due_dates {
            lines.push(format!("  {}  {}", date, count));
        }
        lines.push("status by due date:".to_string());
        lines.extend(timeline_lines(&charts.timeline));
    }
    lines
}

pub fn format_lead_summary<S: std::fmt::Display>(
    summary: &LeadSummary,
    follow_ups: &[(String, usize)],
    timeline: &Timeline<S>,
) -> Vec<String> {
    let mut lines = vec![format!(
        "{} leads  pipeline value {:.2}",
        summary.total, summary.pipeline_value
    )];
    if !summary.by_status.is_empty() {
        lines.push("by status:".to_string());
        for (status, count) in &summary.by_status {
            lines.push(format!("  {} {}", pad_to_width(status.label(), STATUS_CELLS + 2), count));
        }
    }
    if !summary.by_source.is_empty() {
        lines.push("by source:".to_string());
        for (source, count) in &summary.by_source {
            lines.push(format!("  {} {}", pad_to_width(source, STATUS_CELLS + 2), count));
        }
    }
    if !follow_ups.is_empty() {
        lines.push("follow-ups:".to_string());
        for (date, count) in follow_ups {
            lines.push(format!("  {}  {}", date, count));
        }
    }
    if !timeline.dates.is_empty() {
        lines.push("new leads by date:".to_string());
        lines.extend(timeline_lines(timeline));
    }
    lines
}

/// One line per date listing the non-zero series
fn timeline_lines<S: std::fmt::Display>(timeline: &Timeline<S>) -> Vec<String> {
    timeline
        .dates
        .iter()
        .enumerate()
        .map(|(i, date)| {
            let parts: Vec<String> = timeline
                .series
                .iter()
                .filter(|s| s.counts[i] > 0)
                .map(|s| format!("{} {}", s.status, s.counts[i]))
                .collect();
            format!("  {}  {}", date, parts.join(", "))
        })
        .collect()
}

pub fn format_recovery_entry(entry: &RecoveryEntry) -> Vec<String> {
    let mut lines = vec![format!(
        "{} {} [{}]: {}",
        entry
            .timestamp
            .to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
        entry.category,
        entry.key,
        entry.description
    )];
    for line in entry.body.lines().take(5) {
        lines.push(format!("  {}", line));
    }
    if entry.body.lines().count() > 5 {
        lines.push("  …".to_string());
    }
    lines
}
