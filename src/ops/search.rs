use std::ops::Range;

use regex::Regex;

use crate::model::board::TaskBoard;
use crate::model::lead::Lead;
use crate::model::task::TaskGroup;

/// Which field of a lead or task matched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchField {
    Customer,
    Contact,
    Source,
    Industry,
    Assignee,
    Notes,
    Remarks,
    /// Lead comment text
    Comment,
    Title,
    Description,
    /// Task progress-update text
    Update,
}

impl MatchField {
    pub fn label(self) -> &'static str {
        match self {
            MatchField::Customer => "customer",
            MatchField::Contact => "contact",
            MatchField::Source => "source",
            MatchField::Industry => "industry",
            MatchField::Assignee => "assignee",
            MatchField::Notes => "notes",
            MatchField::Remarks => "remarks",
            MatchField::Comment => "comment",
            MatchField::Title => "title",
            MatchField::Description => "description",
            MatchField::Update => "update",
        }
    }
}

/// A search hit for a lead field
#[derive(Debug, Clone)]
pub struct LeadHit {
    pub lead_id: String,
    pub field: MatchField,
    pub text: String,
    pub spans: Vec<Range<usize>>,
}

/// A search hit for a task field
#[derive(Debug, Clone)]
pub struct TaskHit {
    pub task_id: u64,
    pub group: TaskGroup,
    pub field: MatchField,
    pub text: String,
    pub spans: Vec<Range<usize>>,
}

/// Collect all non-overlapping match byte-ranges for a regex in the given text.
fn find_matches(re: &Regex, text: &str) -> Vec<Range<usize>> {
    re.find_iter(text).map(|m| m.start()..m.end()).collect()
}

// ---------------------------------------------------------------------------
// Lead search
// ---------------------------------------------------------------------------

/// Search lead text fields and comment history, in list order
pub fn search_leads(leads: &[Lead], re: &Regex) -> Vec<LeadHit> {
    let mut hits = Vec::new();
    for lead in leads {
        let fields = [
            (MatchField::Customer, lead.customer_name.as_str()),
            (MatchField::Contact, lead.contact_person.as_str()),
            (MatchField::Contact, lead.contact_info.as_str()),
            (MatchField::Source, lead.lead_source.as_str()),
            (MatchField::Industry, lead.industry.as_str()),
            (MatchField::Assignee, lead.assigned_to.as_str()),
            (MatchField::Notes, lead.notes.as_str()),
            (MatchField::Remarks, lead.remarks.as_str()),
        ];
        let comments = lead
            .comments
            .iter()
            .map(|c| (MatchField::Comment, c.text.as_str()));
        for (field, text) in fields.into_iter().chain(comments) {
            let spans = find_matches(re, text);
            if !spans.is_empty() {
                hits.push(LeadHit {
                    lead_id: lead.id.clone(),
                    field,
                    text: text.to_string(),
                    spans,
                });
            }
        }
    }
    hits
}

// ---------------------------------------------------------------------------
// Task search
// ---------------------------------------------------------------------------

/// Search task titles, descriptions, assignees and update logs across all
/// groups, in board order.
pub fn search_tasks(board: &TaskBoard, re: &Regex) -> Vec<TaskHit> {
    let mut hits = Vec::new();
    for (group, task) in board.iter() {
        let fields = [
            (MatchField::Title, task.title.as_str()),
            (MatchField::Description, task.description.as_str()),
            (MatchField::Assignee, task.user_name.as_str()),
        ];
        let updates = task
            .updates
            .iter()
            .map(|u| (MatchField::Update, u.text.as_str()));
        for (field, text) in fields.into_iter().chain(updates) {
            let spans = find_matches(re, text);
            if !spans.is_empty() {
                hits.push(TaskHit {
                    task_id: task.id,
                    group,
                    field,
                    text: text.to_string(),
                    spans,
                });
            }
        }
    }
    hits
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::lead::Comment;
    use crate::model::task::{Task, UpdateEntry};
    use chrono::Utc;

    fn sample_leads() -> Vec<Lead> {
        vec![
            Lead {
                id: "a1".into(),
                customer_name: "Acme Logistics".into(),
                lead_source: "Referral".into(),
                notes: "Wants a fleet tracking demo".into(),
                comments: vec![Comment {
                    id: "c1".into(),
                    timestamp: Utc::now(),
                    text: "Demo scheduled for the fleet team".into(),
                    method: None,
                    status: None,
                    probability: None,
                }],
                ..Default::default()
            },
            Lead {
                id: "b2".into(),
                customer_name: "Bluewave Retail".into(),
                industry: "Retail".into(),
                ..Default::default()
            },
        ]
    }

    fn sample_board() -> TaskBoard {
        TaskBoard {
            todo: vec![Task {
                id: 1,
                title: "Customer Database Migration".into(),
                description: "Move records to the new cluster".into(),
                user_name: "Priya Sharma".into(),
                ..Default::default()
            }],
            in_progress: vec![Task {
                id: 2,
                title: "API Integration".into(),
                updates: vec![UpdateEntry {
                    text: "migration scripts drafted".into(),
                    timestamp: None,
                }],
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    #[test]
    fn lead_search_covers_fields_and_comments() {
        let re = Regex::new("(?i)fleet").unwrap();
        let hits = search_leads(&sample_leads(), &re);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].field, MatchField::Notes);
        assert_eq!(hits[1].field, MatchField::Comment);
        assert!(hits.iter().all(|h| h.lead_id == "a1"));
    }

    #[test]
    fn lead_search_reports_spans() {
        let re = Regex::new("Retail").unwrap();
        let hits = search_leads(&sample_leads(), &re);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].field, MatchField::Customer);
        assert_eq!(hits[0].spans, vec![9..15]);
        assert_eq!(hits[1].field, MatchField::Industry);
    }

    #[test]
    fn task_search_spans_groups_and_updates() {
        let re = Regex::new("(?i)migration").unwrap();
        let hits = search_tasks(&sample_board(), &re);
        assert_eq!(hits.len(), 2);
        assert_eq!((hits[0].task_id, hits[0].field), (1, MatchField::Title));
        assert_eq!(hits[0].group, TaskGroup::Todo);
        assert_eq!((hits[1].task_id, hits[1].field), (2, MatchField::Update));
        assert_eq!(hits[1].group, TaskGroup::InProgress);
    }

    #[test]
    fn no_hits_when_nothing_matches() {
        let re = Regex::new("zeppelin").unwrap();
        assert!(search_leads(&sample_leads(), &re).is_empty());
        assert!(search_tasks(&sample_board(), &re).is_empty());
    }
}
