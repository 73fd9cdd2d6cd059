use chrono::Utc;
use uuid::Uuid;

use crate::model::lead::{Comment, FollowUpMethod, Lead, LeadDraft, LeadStatus};

/// Error type for lead operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LeadError {
    #[error("{0}")]
    Validation(String),
}

/// A comment as entered, with the optional state change it carries
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentInput {
    pub text: String,
    pub method: FollowUpMethod,
    pub new_status: Option<LeadStatus>,
    pub new_probability: Option<String>,
}

impl CommentInput {
    pub fn new(text: &str, method: FollowUpMethod) -> Self {
        CommentInput {
            text: text.to_string(),
            method,
            new_status: None,
            new_probability: None,
        }
    }
}

/// A quick edit of the fields shown inline in the lead table
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LeadPatch {
    pub status: Option<LeadStatus>,
    pub follow_up_date: Option<String>,
    pub follow_up_method: Option<FollowUpMethod>,
    pub probability: Option<String>,
    pub assigned_to: Option<String>,
}

impl LeadPatch {
    pub fn is_empty(&self) -> bool {
        *self == LeadPatch::default()
    }
}

/// All leads, newest first
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LeadStore {
    leads: Vec<Lead>,
}

impl LeadStore {
    pub fn new(leads: Vec<Lead>) -> Self {
        LeadStore { leads }
    }

    pub fn leads(&self) -> &[Lead] {
        &self.leads
    }

    pub fn get(&self, id: &str) -> Option<&Lead> {
        self.leads.iter().find(|l| l.id == id)
    }

    pub fn len(&self) -> usize {
        self.leads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.leads.is_empty()
    }

    /// Add a lead at the front of the list. Returns its new ID.
    pub fn create(&mut self, draft: LeadDraft) -> Result<String, LeadError> {
        validate(&draft)?;
        let now = Utc::now();
        let mut lead = Lead {
            id: self.fresh_id(),
            created_at: now,
            updated_at: now,
            comments: Vec::new(),
            ..Default::default()
        };
        lead.apply_draft(draft);
        let id = lead.id.clone();
        self.leads.insert(0, lead);
        Ok(id)
    }

    /// Replace every editable field of a lead. Returns `false` if no lead
    /// has this ID.
    pub fn update(&mut self, id: &str, draft: LeadDraft) -> Result<bool, LeadError> {
        validate(&draft)?;
        let Some(lead) = self.get_mut(id) else {
            return Ok(false);
        };
        lead.apply_draft(draft);
        lead.updated_at = Utc::now();
        Ok(true)
    }

    /// Apply a quick edit. Returns `false` if no lead has this ID.
    pub fn patch(&mut self, id: &str, patch: LeadPatch) -> Result<bool, LeadError> {
        if let Some(p) = &patch.probability {
            validate_probability(p)?;
        }
        let Some(lead) = self.get_mut(id) else {
            return Ok(false);
        };
        if let Some(status) = patch.status {
            lead.status = status;
        }
        if let Some(date) = patch.follow_up_date {
            lead.follow_up_date = date;
        }
        if let Some(method) = patch.follow_up_method {
            lead.follow_up_method = Some(method);
        }
        if let Some(p) = patch.probability {
            lead.probability = p;
        }
        if let Some(owner) = patch.assigned_to {
            lead.assigned_to = owner;
        }
        lead.updated_at = Utc::now();
        Ok(true)
    }

    /// Log a contact with a lead.
    ///
    /// Besides prepending the comment, this records the contact on the lead
    /// itself: `lastContactDate` becomes today, `followUpMethod` becomes the
    /// comment's method, and status/probability change if new values were
    /// given. Returns `false` if no lead has this ID.
    pub fn add_comment(&mut self, id: &str, input: CommentInput) -> Result<bool, LeadError> {
        if input.text.trim().is_empty() {
            return Err(LeadError::Validation("comment text is required".into()));
        }
        let new_probability = input.new_probability.filter(|p| !p.trim().is_empty());
        if let Some(p) = &new_probability {
            validate_probability(p)?;
        }
        let comment_id = Uuid::new_v4().simple().to_string();
        let Some(lead) = self.get_mut(id) else {
            return Ok(false);
        };

        let now = Utc::now();
        lead.comments.insert(
            0,
            Comment {
                id: comment_id,
                timestamp: now,
                text: input.text,
                method: Some(input.method),
                status: input.new_status,
                probability: new_probability.clone(),
            },
        );
        lead.last_contact_date = now.format("%Y-%m-%d").to_string();
        lead.follow_up_method = Some(input.method);
        if let Some(status) = input.new_status {
            lead.status = status;
        }
        if let Some(p) = new_probability {
            lead.probability = p;
        }
        lead.updated_at = now;
        Ok(true)
    }

    /// Remove one lead and its comments
    pub fn delete(&mut self, id: &str) -> Option<Lead> {
        let idx = self.leads.iter().position(|l| l.id == id)?;
        Some(self.leads.remove(idx))
    }

    /// Remove every lead, returning what was removed
    pub fn delete_all(&mut self) -> Vec<Lead> {
        std::mem::take(&mut self.leads)
    }

    fn get_mut(&mut self, id: &str) -> Option<&mut Lead> {
        self.leads.iter_mut().find(|l| l.id == id)
    }

    /// Short random ID not already in use
    fn fresh_id(&self) -> String {
        loop {
            let mut id = Uuid::new_v4().simple().to_string();
            id.truncate(8);
            if self.get(&id).is_none() {
                return id;
            }
        }
    }
}

/// Follow-up methods used in earlier comments, most recent first, without
/// repeats and without the lead's current method
pub fn previous_methods(lead: &Lead) -> Vec<FollowUpMethod> {
    let mut methods = Vec::new();
    for method in lead.comments.iter().filter_map(|c| c.method) {
        if Some(method) != lead.follow_up_method && !methods.contains(&method) {
            methods.push(method);
        }
    }
    methods
}

fn validate(draft: &LeadDraft) -> Result<(), LeadError> {
    if draft.customer_name.trim().is_empty() {
        return Err(LeadError::Validation("customer name is required".into()));
    }
    if !draft.probability.trim().is_empty() {
        validate_probability(&draft.probability)?;
    }
    let value = draft.potential_value.trim();
    if !value.is_empty() && value.replace(',', "").parse::<f64>().is_err() {
        return Err(LeadError::Validation(format!(
            "potential value must be a number, got {:?}",
            draft.potential_value
        )));
    }
    Ok(())
}

fn validate_probability(p: &str) -> Result<(), LeadError> {
    match p.trim().parse::<u8>() {
        Ok(n) if n <= 100 => Ok(()),
        _ => Err(LeadError::Validation(format!(
            "probability must be a whole number from 0 to 100, got {:?}",
            p
        ))),
    }
}

/// Sum of the potential values that parse as numbers
pub fn pipeline_value(leads: &[Lead]) -> f64 {
    leads
        .iter()
        .filter_map(|l| l.potential_value.trim().replace(',', "").parse::<f64>().ok())
        .sum()
}
