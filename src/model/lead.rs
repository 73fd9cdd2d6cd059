use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Pipeline status of a lead
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LeadStatus {
    #[default]
    #[serde(rename = "New Lead")]
    NewLead,
    #[serde(rename = "Contacted")]
    Contacted,
    #[serde(rename = "Interested")]
    Interested,
    #[serde(rename = "Proposal Sent")]
    ProposalSent,
    #[serde(rename = "Negotiation")]
    Negotiation,
    #[serde(rename = "Follow-up Required")]
    FollowUpRequired,
    #[serde(rename = "On Hold")]
    OnHold,
    #[serde(rename = "Converted / Won")]
    Won,
    #[serde(rename = "Lost")]
    Lost,
    #[serde(rename = "Inactive / No Response")]
    Inactive,
}

impl LeadStatus {
    /// All statuses in pipeline order
    pub const ALL: [LeadStatus; 10] = [
        LeadStatus::NewLead,
        LeadStatus::Contacted,
        LeadStatus::Interested,
        LeadStatus::ProposalSent,
        LeadStatus::Negotiation,
        LeadStatus::FollowUpRequired,
        LeadStatus::OnHold,
        LeadStatus::Won,
        LeadStatus::Lost,
        LeadStatus::Inactive,
    ];

    /// The display label, which is also the persisted form
    pub fn label(self) -> &'static str {
        match self {
            LeadStatus::NewLead => "New Lead",
            LeadStatus::Contacted => "Contacted",
            LeadStatus::Interested => "Interested",
            LeadStatus::ProposalSent => "Proposal Sent",
            LeadStatus::Negotiation => "Negotiation",
            LeadStatus::FollowUpRequired => "Follow-up Required",
            LeadStatus::OnHold => "On Hold",
            LeadStatus::Won => "Converted / Won",
            LeadStatus::Lost => "Lost",
            LeadStatus::Inactive => "Inactive / No Response",
        }
    }

    /// Short CLI-friendly name
    pub fn short_name(self) -> &'static str {
        match self {
            LeadStatus::NewLead => "new",
            LeadStatus::Contacted => "contacted",
            LeadStatus::Interested => "interested",
            LeadStatus::ProposalSent => "proposal",
            LeadStatus::Negotiation => "negotiation",
            LeadStatus::FollowUpRequired => "follow-up",
            LeadStatus::OnHold => "on-hold",
            LeadStatus::Won => "won",
            LeadStatus::Lost => "lost",
            LeadStatus::Inactive => "inactive",
        }
    }
}

impl fmt::Display for LeadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for LeadStatus {
    type Err = String;

    /// Accepts the full label or the short name, ignoring case and punctuation
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = normalize(s);
        LeadStatus::ALL
            .into_iter()
            .find(|st| normalize(st.label()) == wanted || normalize(st.short_name()) == wanted)
            .ok_or_else(|| format!("unknown lead status: {}", s))
    }
}

/// Contact channel used for a follow-up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FollowUpMethod {
    Call,
    Email,
    Meeting,
    WhatsApp,
    Other,
}

impl FollowUpMethod {
    pub const ALL: [FollowUpMethod; 5] = [
        FollowUpMethod::Call,
        FollowUpMethod::Email,
        FollowUpMethod::Meeting,
        FollowUpMethod::WhatsApp,
        FollowUpMethod::Other,
    ];

    pub fn label(self) -> &'static str {
        match self {
            FollowUpMethod::Call => "Call",
            FollowUpMethod::Email => "Email",
            FollowUpMethod::Meeting => "Meeting",
            FollowUpMethod::WhatsApp => "WhatsApp",
            FollowUpMethod::Other => "Other",
        }
    }
}

impl fmt::Display for FollowUpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for FollowUpMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = normalize(s);
        FollowUpMethod::ALL
            .into_iter()
            .find(|m| normalize(m.label()) == wanted)
            .ok_or_else(|| format!("unknown follow-up method: {}", s))
    }
}

fn normalize(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// A log entry on a lead. Owned by its lead and deleted with it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Comment {
    pub id: String,
    #[serde(rename = "date")]
    pub timestamp: DateTime<Utc>,
    pub text: String,
    #[serde(
        default,
        deserialize_with = "empty_as_none",
        serialize_with = "none_as_empty"
    )]
    pub method: Option<FollowUpMethod>,
    /// Lead status recorded alongside this comment, if it changed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<LeadStatus>,
    /// Probability recorded alongside this comment, if it changed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probability: Option<String>,
}

/// A sales-pipeline prospect.
///
/// Dates other than the timestamps are kept as entered (`yyyy-mm-dd` or
/// empty). Missing fields decode to their defaults; unknown fields are
/// rejected.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct Lead {
    pub id: String,
    pub customer_name: String,
    pub contact_person: String,
    pub contact_info: String,
    pub lead_source: String,
    pub industry: String,
    pub lead_date: String,
    pub assigned_to: String,
    pub status: LeadStatus,
    pub follow_up_date: String,
    #[serde(deserialize_with = "empty_as_none", serialize_with = "none_as_empty")]
    pub follow_up_method: Option<FollowUpMethod>,
    pub last_contact_date: String,
    pub notes: String,
    pub potential_value: String,
    pub probability: String,
    pub expected_close_date: String,
    pub final_outcome: String,
    pub remarks: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Newest first
    pub comments: Vec<Comment>,
}

/// The user-editable fields of a lead, as submitted by a form
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LeadDraft {
    pub customer_name: String,
    pub contact_person: String,
    pub contact_info: String,
    pub lead_source: String,
    pub industry: String,
    pub lead_date: String,
    pub assigned_to: String,
    pub status: LeadStatus,
    pub follow_up_date: String,
    pub follow_up_method: Option<FollowUpMethod>,
    pub last_contact_date: String,
    pub notes: String,
    pub potential_value: String,
    pub probability: String,
    pub expected_close_date: String,
    pub final_outcome: String,
    pub remarks: String,
}

impl Lead {
    /// Overwrite every editable field from `draft`
    pub fn apply_draft(&mut self, draft: LeadDraft) {
        self.customer_name = draft.customer_name;
        self.contact_person = draft.contact_person;
        self.contact_info = draft.contact_info;
        self.lead_source = draft.lead_source;
        self.industry = draft.industry;
        self.lead_date = draft.lead_date;
        self.assigned_to = draft.assigned_to;
        self.status = draft.status;
        self.follow_up_date = draft.follow_up_date;
        self.follow_up_method = draft.follow_up_method;
        self.last_contact_date = draft.last_contact_date;
        self.notes = draft.notes;
        self.potential_value = draft.potential_value;
        self.probability = draft.probability;
        self.expected_close_date = draft.expected_close_date;
        self.final_outcome = draft.final_outcome;
        self.remarks = draft.remarks;
    }

    /// The editable fields of this lead, for prefilling an edit
    pub fn to_draft(&self) -> LeadDraft {
        LeadDraft {
            customer_name: self.customer_name.clone(),
            contact_person: self.contact_person.clone(),
            contact_info: self.contact_info.clone(),
            lead_source: self.lead_source.clone(),
            industry: self.industry.clone(),
            lead_date: self.lead_date.clone(),
            assigned_to: self.assigned_to.clone(),
            status: self.status,
            follow_up_date: self.follow_up_date.clone(),
            follow_up_method: self.follow_up_method,
            last_contact_date: self.last_contact_date.clone(),
            notes: self.notes.clone(),
            potential_value: self.potential_value.clone(),
            probability: self.probability.clone(),
            expected_close_date: self.expected_close_date.clone(),
            final_outcome: self.final_outcome.clone(),
            remarks: self.remarks.clone(),
        }
    }
}

/// Empty strings were written for "no method selected"
fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<FollowUpMethod>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => s.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

fn none_as_empty<S>(value: &Option<FollowUpMethod>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(value.map_or("", FollowUpMethod::label))
}
