//! JSON encoding of the persisted record sets.
//!
//! Leads decode straight into [`Lead`]. Tasks go through [`TaskRecord`],
//! which accepts the older field spellings (`user`, `taskName`, `dateFrom`,
//! `dateTo`, a string `updatesFromUser`) and the three redundant progress
//! fields, and always writes the canonical form back.

use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Number, Value};

use crate::model::board::TaskBoard;
use crate::model::lead::Lead;
use crate::model::task::{Task, TaskGroup, UpdateEntry, parse_loose_date};

/// Error type for decoding persisted values
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("could not parse {key}: {source}")]
    Json {
        key: String,
        source: serde_json::Error,
    },
    #[error("unexpected shape for {key}: {detail}")]
    Shape { key: String, detail: String },
}

// ---------------------------------------------------------------------------
// Leads
// ---------------------------------------------------------------------------

pub fn decode_leads(key: &str, text: &str) -> Result<Vec<Lead>, DecodeError> {
    let value = parse_value(key, text)?;
    if !value.is_array() {
        return Err(shape(key, format!("expected a list of leads, found {}", kind(&value))));
    }
    serde_json::from_value(value).map_err(|e| shape(key, e.to_string()))
}

pub fn encode_leads(leads: &[Lead]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(leads)
}

// ---------------------------------------------------------------------------
// Tasks
// ---------------------------------------------------------------------------

/// A decoded task board, and whether it came from the flat legacy layout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedBoard {
    pub board: TaskBoard,
    pub legacy: bool,
}

/// Decode either the grouped layout or a flat legacy list (which lands in
/// `todo`). Missing or duplicate IDs are renumbered past the current max.
pub fn decode_board(key: &str, text: &str) -> Result<DecodedBoard, DecodeError> {
    let value = parse_value(key, text)?;
    let (mut board, legacy) = match value {
        Value::Array(_) => {
            let records: Vec<TaskRecord> =
                serde_json::from_value(value).map_err(|e| shape(key, e.to_string()))?;
            let board = TaskBoard {
                todo: records.into_iter().map(Task::from).collect(),
                ..Default::default()
            };
            (board, true)
        }
        Value::Object(_) => {
            let grouped: GroupedRecord =
                serde_json::from_value(value).map_err(|e| shape(key, e.to_string()))?;
            (grouped.into_board(), false)
        }
        other => {
            return Err(shape(
                key,
                format!("expected task groups or a task list, found {}", kind(&other)),
            ));
        }
    };
    normalize_ids(&mut board);
    Ok(DecodedBoard { board, legacy })
}

pub fn encode_board(board: &TaskBoard) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&GroupedRecord::from_board(board))
}

/// Give every task a unique, non-zero ID, keeping the first occurrence of
/// each existing ID.
fn normalize_ids(board: &mut TaskBoard) {
    let mut next = board.max_id() + 1;
    let mut seen = HashSet::new();
    for group in TaskGroup::ALL {
        for task in board.group_mut(group) {
            if task.id == 0 || !seen.insert(task.id) {
                tracing::debug!(old_id = task.id, new_id = next, "renumbering task");
                task.id = next;
                seen.insert(next);
                next += 1;
            }
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct GroupedRecord {
    #[serde(default)]
    todo: Vec<TaskRecord>,
    #[serde(default)]
    in_progress: Vec<TaskRecord>,
    #[serde(default)]
    review_ready: Vec<TaskRecord>,
    #[serde(default)]
    completed: Vec<TaskRecord>,
}

impl GroupedRecord {
    fn from_board(board: &TaskBoard) -> Self {
        let records = |g: TaskGroup| board.group(g).iter().map(TaskRecord::from).collect();
        GroupedRecord {
            todo: records(TaskGroup::Todo),
            in_progress: records(TaskGroup::InProgress),
            review_ready: records(TaskGroup::ReviewReady),
            completed: records(TaskGroup::Completed),
        }
    }

    fn into_board(self) -> TaskBoard {
        let tasks = |records: Vec<TaskRecord>| records.into_iter().map(Task::from).collect();
        TaskBoard {
            todo: tasks(self.todo),
            in_progress: tasks(self.in_progress),
            review_ready: tasks(self.review_ready),
            completed: tasks(self.completed),
        }
    }
}

/// Persisted shape of a task
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct TaskRecord {
    #[serde(default)]
    id: u64,
    #[serde(default, deserialize_with = "nullable")]
    category: String,
    #[serde(default, alias = "user", deserialize_with = "nullable")]
    user_name: String,
    #[serde(default, alias = "taskName", deserialize_with = "nullable")]
    title: String,
    #[serde(default, alias = "dateFrom", deserialize_with = "loose_date")]
    assign_date: Option<NaiveDate>,
    #[serde(default, alias = "dateTo", deserialize_with = "loose_date")]
    expiry_date: Option<NaiveDate>,
    #[serde(default, rename = "date")]
    display_date: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    description: String,
    #[serde(default, deserialize_with = "nullable")]
    comments: u32,
    #[serde(default)]
    avatar: Option<String>,
    #[serde(default)]
    log: Option<String>,
    #[serde(default)]
    duration: Option<String>,
    #[serde(default)]
    email: Option<String>,
    /// Canonical completion percentage
    #[serde(default, skip_serializing_if = "Option::is_none")]
    progress: Option<Number>,
    /// Duplicate of `progress`, read only
    #[serde(default, skip_serializing)]
    status_percent: Option<Number>,
    /// Completion as written by the update flow, read only
    #[serde(default, skip_serializing)]
    status: Option<Number>,
    #[serde(
        default,
        rename = "updatesFromUser",
        deserialize_with = "update_log",
        skip_serializing_if = "Vec::is_empty"
    )]
    updates: Vec<UpdateRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct UpdateRecord {
    #[serde(default)]
    text: String,
    #[serde(default, alias = "timestamp")]
    ts: Option<DateTime<Utc>>,
}

impl From<TaskRecord> for Task {
    fn from(r: TaskRecord) -> Self {
        let completion = r
            .progress
            .or(r.status_percent)
            .or(r.status)
            .and_then(|n| n.as_f64())
            .map(|v| v.clamp(0.0, 100.0).round() as u8)
            .unwrap_or(0);
        Task {
            id: r.id,
            category: r.category,
            user_name: r.user_name,
            title: r.title,
            assign_date: r.assign_date,
            expiry_date: r.expiry_date,
            display_date: r.display_date,
            description: r.description,
            comments: r.comments,
            avatar: r.avatar,
            log: r.log,
            duration: r.duration,
            email: r.email,
            completion,
            updates: r
                .updates
                .into_iter()
                .map(|u| UpdateEntry {
                    text: u.text,
                    timestamp: u.ts,
                })
                .collect(),
        }
    }
}

impl From<&Task> for TaskRecord {
    fn from(t: &Task) -> Self {
        TaskRecord {
            id: t.id,
            category: t.category.clone(),
            user_name: t.user_name.clone(),
            title: t.title.clone(),
            assign_date: t.assign_date,
            expiry_date: t.expiry_date,
            display_date: t.display_date.clone(),
            description: t.description.clone(),
            comments: t.comments,
            avatar: t.avatar.clone(),
            log: t.log.clone(),
            duration: t.duration.clone(),
            email: t.email.clone(),
            progress: Some(Number::from(t.completion)),
            status_percent: None,
            status: None,
            updates: t
                .updates
                .iter()
                .map(|u| UpdateRecord {
                    text: u.text.clone(),
                    ts: u.timestamp,
                })
                .collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Field helpers
// ---------------------------------------------------------------------------

/// `null` decodes to the type's default
fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Dates may be `null`, empty, `yyyy-mm-dd`, `m/d/yyyy`, or a full timestamp
fn loose_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    let Some(raw) = raw.filter(|s| !s.trim().is_empty()) else {
        return Ok(None);
    };
    parse_loose_date(&raw)
        .or_else(|| {
            DateTime::parse_from_rfc3339(raw.trim())
                .ok()
                .map(|dt| dt.date_naive())
        })
        .map(Some)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid date: {}", raw)))
}

/// The update log was once a single string
fn update_log<'de, D>(deserializer: D) -> Result<Vec<UpdateRecord>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Log {
        Entries(Vec<UpdateRecord>),
        Text(String),
    }

    Ok(match Option::<Log>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(Log::Entries(entries)) => entries,
        Some(Log::Text(text)) if text.trim().is_empty() => Vec::new(),
        Some(Log::Text(text)) => vec![UpdateRecord { text, ts: None }],
    })
}

fn parse_value(key: &str, text: &str) -> Result<Value, DecodeError> {
    serde_json::from_str(text).map_err(|e| DecodeError::Json {
        key: key.to_string(),
        source: e,
    })
}

fn shape(key: &str, detail: String) -> DecodeError {
    DecodeError::Shape {
        key: key.to_string(),
        detail,
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn leads_must_be_a_list() {
        let err = decode_leads("leads", r#"{"id":"x"}"#).unwrap_err();
        assert!(matches!(err, DecodeError::Shape { .. }));
        let err = decode_leads("leads", "not json").unwrap_err();
        assert!(matches!(err, DecodeError::Json { .. }));
        assert!(decode_leads("leads", "[]").unwrap().is_empty());
    }

    #[test]
    fn grouped_layout_fills_missing_groups() {
        let decoded = decode_board("tasks", r#"{"inProgress":[{"id":4,"title":"API"}]}"#).unwrap();
        assert!(!decoded.legacy);
        assert!(decoded.board.todo.is_empty());
        assert_eq!(decoded.board.in_progress[0].title, "API");
    }

    #[test]
    fn unknown_group_is_rejected() {
        let err = decode_board("tasks", r#"{"todo":[],"archived":[]}"#).unwrap_err();
        assert!(matches!(err, DecodeError::Shape { .. }));
    }

    #[test]
    fn scalar_board_is_rejected() {
        let err = decode_board("tasks", "42").unwrap_err();
        match err {
            DecodeError::Shape { detail, .. } => assert!(detail.contains("a number")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn flat_legacy_list_lands_in_todo() {
        let text = r#"[
            {"id":1,"user":"Priya Sharma","taskName":"API Integration","dateFrom":"2025-11-01",
             "dateTo":"2025-11-10","status":40,"updatesFromUser":"started on auth"},
            {"id":2,"user":"Amit Patel","taskName":"Bug Fixes","status":0}
        ]"#;
        let decoded = decode_board("legacy", text).unwrap();
        assert!(decoded.legacy);
        assert_eq!(decoded.board.todo.len(), 2);
        let first = &decoded.board.todo[0];
        assert_eq!(first.user_name, "Priya Sharma");
        assert_eq!(first.title, "API Integration");
        assert_eq!(first.assign_date, Some(date("2025-11-01")));
        assert_eq!(first.expiry_date, Some(date("2025-11-10")));
        assert_eq!(first.completion, 40);
        assert_eq!(
            first.updates,
            vec![UpdateEntry {
                text: "started on auth".into(),
                timestamp: None
            }]
        );
    }

    #[test]
    fn progress_fields_collapse_in_order() {
        let decoded = decode_board(
            "tasks",
            r#"{"todo":[
                {"id":1,"progress":80,"statusPercent":20},
                {"id":2,"statusPercent":35},
                {"id":3,"status":140},
                {"id":4}
            ]}"#,
        )
        .unwrap();
        let completions: Vec<u8> = decoded.board.todo.iter().map(|t| t.completion).collect();
        assert_eq!(completions, vec![80, 35, 100, 0]);
    }

    #[test]
    fn encode_writes_only_canonical_progress() {
        let board = TaskBoard {
            completed: vec![Task {
                id: 9,
                completion: 100,
                ..Default::default()
            }],
            ..Default::default()
        };
        let text = encode_board(&board).unwrap();
        let value: Value = serde_json::from_str(&text).unwrap();
        let task = &value["completed"][0];
        assert_eq!(task["progress"], 100);
        assert!(task.get("statusPercent").is_none());
        assert!(task.get("status").is_none());
        assert!(value["todo"].as_array().unwrap().is_empty());
    }

    #[test]
    fn missing_and_duplicate_ids_are_renumbered() {
        let decoded = decode_board(
            "tasks",
            r#"{"todo":[{"id":3},{"title":"no id"}],"completed":[{"id":3}]}"#,
        )
        .unwrap();
        let ids: Vec<u64> = decoded.board.iter().map(|(_, t)| t.id).collect();
        assert_eq!(ids, vec![3, 4, 5]);
    }

    #[test]
    fn dates_accept_several_spellings() {
        let decoded = decode_board(
            "tasks",
            r#"{"todo":[
                {"id":1,"assignDate":"","expiryDate":null},
                {"id":2,"assignDate":"2025-10-20T00:00:00.000Z","expiryDate":"11/2/2025"}
            ]}"#,
        )
        .unwrap();
        assert_eq!(decoded.board.todo[0].assign_date, None);
        assert_eq!(decoded.board.todo[1].assign_date, Some(date("2025-10-20")));
        assert_eq!(decoded.board.todo[1].expiry_date, Some(date("2025-11-02")));

        let bad = decode_board("tasks", r#"{"todo":[{"id":1,"assignDate":"soon"}]}"#);
        assert!(bad.is_err());
    }

    #[test]
    fn null_strings_decode_to_empty() {
        let decoded =
            decode_board("tasks", r#"{"todo":[{"id":1,"description":null,"email":null}]}"#)
                .unwrap();
        assert_eq!(decoded.board.todo[0].description, "");
        assert_eq!(decoded.board.todo[0].email, None);
    }
}
