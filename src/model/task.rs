use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// The board column a task belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TaskGroup {
    Todo,
    InProgress,
    ReviewReady,
    Completed,
}

impl TaskGroup {
    /// All groups in board order
    pub const ALL: [TaskGroup; 4] = [
        TaskGroup::Todo,
        TaskGroup::InProgress,
        TaskGroup::ReviewReady,
        TaskGroup::Completed,
    ];

    /// The persisted key (`todo`, `inProgress`, ...)
    pub fn key(self) -> &'static str {
        match self {
            TaskGroup::Todo => "todo",
            TaskGroup::InProgress => "inProgress",
            TaskGroup::ReviewReady => "reviewReady",
            TaskGroup::Completed => "completed",
        }
    }

    /// Column heading
    pub fn title(self) -> &'static str {
        match self {
            TaskGroup::Todo => "To Do",
            TaskGroup::InProgress => "In Progress",
            TaskGroup::ReviewReady => "Review Ready",
            TaskGroup::Completed => "Completed",
        }
    }

    /// Status vocabulary used by the reporting dashboard
    pub fn report_status(self) -> &'static str {
        match self {
            TaskGroup::Todo => "Pending",
            TaskGroup::InProgress | TaskGroup::ReviewReady => "In Progress",
            TaskGroup::Completed => "Completed",
        }
    }
}

impl fmt::Display for TaskGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for TaskGroup {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted: String = s
            .chars()
            .filter(|c| c.is_alphanumeric())
            .flat_map(char::to_lowercase)
            .collect();
        match wanted.as_str() {
            "todo" | "backlog" => Ok(TaskGroup::Todo),
            "inprogress" | "active" => Ok(TaskGroup::InProgress),
            "reviewready" | "review" => Ok(TaskGroup::ReviewReady),
            "completed" | "done" => Ok(TaskGroup::Completed),
            _ => Err(format!("unknown task group: {}", s)),
        }
    }
}

/// One note appended to a task's update log. Never edited once written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateEntry {
    pub text: String,
    /// Absent for entries carried over from a legacy single-string log
    pub timestamp: Option<DateTime<Utc>>,
}

/// A unit of work on the board
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Task {
    /// Unique across all groups
    pub id: u64,
    pub category: String,
    pub user_name: String,
    pub title: String,
    pub assign_date: Option<NaiveDate>,
    pub expiry_date: Option<NaiveDate>,
    /// Human-formatted assign date, as shown on the card
    pub display_date: Option<String>,
    pub description: String,
    /// Number of comments shown on the card footer
    pub comments: u32,
    pub avatar: Option<String>,
    pub log: Option<String>,
    pub duration: Option<String>,
    pub email: Option<String>,
    /// Completion percentage, 0-100
    pub completion: u8,
    pub updates: Vec<UpdateEntry>,
}

/// The fields a task form submits on create or edit
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TaskDraft {
    pub category: String,
    pub user_name: String,
    pub title: String,
    pub assign_date: Option<NaiveDate>,
    pub expiry_date: Option<NaiveDate>,
    pub description: String,
    pub email: Option<String>,
}

impl Task {
    /// Create a task with the given ID from a submitted form
    pub fn from_draft(id: u64, draft: TaskDraft) -> Self {
        let mut task = Task {
            id,
            ..Default::default()
        };
        task.apply_draft(draft);
        task
    }

    /// Overwrite the form fields, leaving the update log, completion and
    /// card counters untouched
    pub fn apply_draft(&mut self, draft: TaskDraft) {
        self.category = draft.category;
        self.user_name = draft.user_name;
        self.title = draft.title;
        self.assign_date = draft.assign_date;
        self.expiry_date = draft.expiry_date;
        self.display_date = draft.assign_date.map(display_date);
        self.description = draft.description;
        self.email = draft.email.filter(|e| !e.is_empty());
    }

    pub fn to_draft(&self) -> TaskDraft {
        TaskDraft {
            category: self.category.clone(),
            user_name: self.user_name.clone(),
            title: self.title.clone(),
            assign_date: self.assign_date,
            expiry_date: self.expiry_date,
            description: self.description.clone(),
            email: self.email.clone(),
        }
    }

    /// Start of the task's span: the assign date, falling back to the
    /// display date when that is parseable
    pub fn start_date(&self) -> Option<NaiveDate> {
        self.assign_date
            .or_else(|| self.display_date.as_deref().and_then(parse_loose_date))
    }
}

/// Format a date the way task cards show it (`m/d/yyyy`)
pub fn display_date(date: NaiveDate) -> String {
    date.format("%-m/%-d/%Y").to_string()
}

/// Parse an ISO `yyyy-mm-dd` date or a card-style `m/d/yyyy` date
pub fn parse_loose_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(s, "%m/%d/%Y"))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn group_parses_keys_and_aliases() {
        assert_eq!("inProgress".parse::<TaskGroup>(), Ok(TaskGroup::InProgress));
        assert_eq!("in-progress".parse::<TaskGroup>(), Ok(TaskGroup::InProgress));
        assert_eq!("done".parse::<TaskGroup>(), Ok(TaskGroup::Completed));
        assert!("later".parse::<TaskGroup>().is_err());
    }

    #[test]
    fn from_draft_sets_display_date() {
        let task = Task::from_draft(
            3,
            TaskDraft {
                title: "Security Audit".into(),
                assign_date: Some(date("2025-11-05")),
                ..Default::default()
            },
        );
        assert_eq!(task.id, 3);
        assert_eq!(task.display_date.as_deref(), Some("11/5/2025"));
        assert_eq!(task.completion, 0);
    }

    #[test]
    fn apply_draft_keeps_progress_and_log() {
        let mut task = Task {
            id: 1,
            completion: 60,
            updates: vec![UpdateEntry {
                text: "halfway".into(),
                timestamp: None,
            }],
            ..Default::default()
        };
        task.apply_draft(TaskDraft {
            title: "Renamed".into(),
            email: Some(String::new()),
            ..Default::default()
        });
        assert_eq!(task.title, "Renamed");
        assert_eq!(task.completion, 60);
        assert_eq!(task.updates.len(), 1);
        assert!(task.email.is_none());
    }

    #[test]
    fn start_date_falls_back_to_display_date() {
        let task = Task {
            display_date: Some("10/28/2025".into()),
            ..Default::default()
        };
        assert_eq!(task.start_date(), Some(date("2025-10-28")));

        let unparseable = Task {
            display_date: Some("someday".into()),
            ..Default::default()
        };
        assert_eq!(unparseable.start_date(), None);
    }
}
