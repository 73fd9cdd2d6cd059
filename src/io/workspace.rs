use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::mpsc;

use crate::io::codec::{decode_board, decode_leads, encode_board, encode_leads};
use crate::io::config_io::store_dir;
use crate::io::recovery::{RecoveryCategory, RecoveryEntry, log_recovery};
use crate::io::signal::{ChangeBus, ChangeEvent};
use crate::io::storage::{DirStore, KeyValueStore, StorageError};
use crate::model::board::TaskBoard;
use crate::model::config::{StorageConfig, WorkspaceConfig};
use crate::model::lead::{Lead, LeadDraft};
use crate::model::task::{Task, TaskDraft, TaskGroup};
use crate::ops::lead_ops::{CommentInput, LeadError, LeadPatch, LeadStore};
use crate::ops::task_ops::{TaskError, TaskStore};
use crate::ops::update::{UpdateError, UpdateOutcome, UpdateRequest, submit_update};

/// The lead and task stores bound to a key-value backend.
///
/// Every successful mutation is written through to storage and announced on
/// the change bus. Storage failures are logged and swallowed: the in-memory
/// change stands even when it could not be saved.
pub struct Workspace<S: KeyValueStore> {
    storage: S,
    keys: StorageConfig,
    recovery_dir: Option<PathBuf>,
    leads: LeadStore,
    tasks: TaskStore,
    bus: ChangeBus,
}

impl Workspace<DirStore> {
    /// Open the file-backed stores of the workspace rooted at `root`
    pub fn open(root: &Path, config: &WorkspaceConfig) -> Self {
        let dir = store_dir(root);
        Workspace::load(DirStore::new(&dir), config.storage.clone(), Some(dir))
    }
}

impl<S: KeyValueStore> Workspace<S> {
    /// Read both stores from `storage`. Values that fail to decode are set
    /// aside in the recovery log under `recovery_dir` and the affected store
    /// starts empty.
    pub fn load(storage: S, keys: StorageConfig, recovery_dir: Option<PathBuf>) -> Self {
        let mut ws = Workspace {
            storage,
            keys,
            recovery_dir,
            leads: LeadStore::default(),
            tasks: TaskStore::default(),
            bus: ChangeBus::new(),
        };
        ws.leads = LeadStore::new(ws.read_leads());
        ws.tasks = TaskStore::new(ws.read_board());
        ws
    }

    pub fn leads(&self) -> &LeadStore {
        &self.leads
    }

    pub fn tasks(&self) -> &TaskStore {
        &self.tasks
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn keys(&self) -> &StorageConfig {
        &self.keys
    }

    /// Observe change events from this workspace's mutations
    pub fn subscribe(&mut self) -> mpsc::Receiver<ChangeEvent> {
        self.bus.subscribe()
    }

    /// Replace the in-memory task board with what storage currently holds
    pub fn reload_tasks(&mut self) {
        self.tasks = TaskStore::new(self.read_board());
    }

    /// Replace the in-memory lead list with what storage currently holds
    pub fn reload_leads(&mut self) {
        self.leads = LeadStore::new(self.read_leads());
    }

    // -----------------------------------------------------------------------
    // Leads
    // -----------------------------------------------------------------------

    pub fn create_lead(&mut self, draft: LeadDraft) -> Result<String, LeadError> {
        let id = self.leads.create(draft)?;
        self.leads_changed();
        Ok(id)
    }

    pub fn update_lead(&mut self, id: &str, draft: LeadDraft) -> Result<bool, LeadError> {
        let found = self.leads.update(id, draft)?;
        if found {
            self.leads_changed();
        }
        Ok(found)
    }

    pub fn patch_lead(&mut self, id: &str, patch: LeadPatch) -> Result<bool, LeadError> {
        let found = self.leads.patch(id, patch)?;
        if found {
            self.leads_changed();
        }
        Ok(found)
    }

    pub fn comment_lead(&mut self, id: &str, input: CommentInput) -> Result<bool, LeadError> {
        let found = self.leads.add_comment(id, input)?;
        if found {
            self.leads_changed();
        }
        Ok(found)
    }

    pub fn delete_lead(&mut self, id: &str) -> Option<Lead> {
        let removed = self.leads.delete(id)?;
        self.set_aside_leads(std::slice::from_ref(&removed));
        self.leads_changed();
        Some(removed)
    }

    pub fn delete_all_leads(&mut self) -> Vec<Lead> {
        let removed = self.leads.delete_all();
        if !removed.is_empty() {
            self.set_aside_leads(&removed);
            self.leads_changed();
        }
        removed
    }

    // -----------------------------------------------------------------------
    // Tasks
    // -----------------------------------------------------------------------

    pub fn create_task(&mut self, draft: TaskDraft) -> Result<u64, TaskError> {
        let id = self.tasks.create(draft)?;
        self.tasks_changed();
        Ok(id)
    }

    pub fn update_task(&mut self, id: u64, draft: TaskDraft) -> Result<bool, TaskError> {
        let found = self.tasks.update(id, draft)?;
        if found {
            self.tasks_changed();
        }
        Ok(found)
    }

    /// Remove every task in `ids`; returns how many were removed
    pub fn delete_tasks(&mut self, ids: &BTreeSet<u64>) -> usize {
        let removed = self.tasks.bulk_delete(ids);
        if !removed.is_empty() {
            self.set_aside_tasks(&removed);
            self.tasks_changed();
        }
        removed.len()
    }

    pub fn relocate_task(&mut self, id: u64, to: TaskGroup) -> Result<(), TaskError> {
        self.tasks.relocate(id, to)?;
        self.tasks_changed();
        Ok(())
    }

    /// Apply a progress update against the latest persisted board
    pub fn submit_update(&mut self, request: &UpdateRequest) -> Result<UpdateOutcome, UpdateError> {
        self.reload_tasks();
        let outcome = submit_update(&mut self.tasks, request)?;
        self.tasks_changed();
        Ok(outcome)
    }

    // -----------------------------------------------------------------------
    // Persistence
    // -----------------------------------------------------------------------

    fn leads_changed(&mut self) {
        match encode_leads(self.leads.leads()) {
            Ok(text) => {
                let key = self.keys.leads_key.clone();
                self.write(&key, text);
            }
            Err(e) => tracing::warn!(error = %e, "could not encode leads"),
        }
        self.bus.publish(ChangeEvent::LeadsChanged);
    }

    fn tasks_changed(&mut self) {
        match encode_board(self.tasks.board()) {
            Ok(text) => {
                let key = self.keys.tasks_key.clone();
                self.write(&key, text);
            }
            Err(e) => tracing::warn!(error = %e, "could not encode tasks"),
        }
        self.bus.publish(ChangeEvent::TasksChanged);
    }

    fn write(&mut self, key: &str, text: String) {
        match self.storage.put(key, &text) {
            Ok(()) => tracing::debug!(key, bytes = text.len(), "saved"),
            Err(e) => {
                tracing::warn!(key, error = %e, "save failed; in-memory state kept");
                self.recover(RecoveryCategory::Write, key, format!("save failed: {}", e), text);
            }
        }
    }

    fn read_leads(&self) -> Vec<Lead> {
        let key = self.keys.leads_key.as_str();
        let Ok(Some(text)) = self.read_raw(key) else {
            return Vec::new();
        };
        match decode_leads(key, &text) {
            Ok(leads) => leads,
            Err(e) => {
                tracing::warn!(key, error = %e, "discarding undecodable leads");
                self.recover(RecoveryCategory::Decode, key, e.to_string(), text);
                Vec::new()
            }
        }
    }

    /// Read the grouped board, migrating a flat list found under either the
    /// grouped key or the legacy key. The legacy key is only consulted when
    /// the grouped key is absent, not when it is unreadable.
    fn read_board(&mut self) -> TaskBoard {
        let grouped_key = self.keys.tasks_key.clone();
        let (key, text) = match self.read_raw(&grouped_key) {
            Ok(Some(text)) => (grouped_key.clone(), text),
            Ok(None) => {
                let legacy_key = self.keys.legacy_tasks_key.clone();
                match self.read_raw(&legacy_key) {
                    Ok(Some(text)) => (legacy_key, text),
                    Ok(None) | Err(_) => return TaskBoard::default(),
                }
            }
            Err(_) => return TaskBoard::default(),
        };
        match decode_board(&key, &text) {
            Ok(decoded) => {
                if decoded.legacy || key != grouped_key {
                    tracing::info!(
                        from = %key,
                        to = %grouped_key,
                        tasks = decoded.board.len(),
                        "migrating flat task list to grouped layout"
                    );
                    match encode_board(&decoded.board) {
                        Ok(encoded) => self.write(&grouped_key, encoded),
                        Err(e) => tracing::warn!(error = %e, "could not encode migrated tasks"),
                    }
                }
                decoded.board
            }
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "discarding undecodable tasks");
                self.recover(RecoveryCategory::Decode, &key, e.to_string(), text);
                TaskBoard::default()
            }
        }
    }

    /// Read a stored value. On failure whatever bytes can be salvaged are
    /// set aside in the recovery log before the error is returned.
    fn read_raw(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.storage.get(key).inspect_err(|e| {
            tracing::warn!(key, error = %e, "read failed; starting empty");
            let body = self.storage.salvage(key).unwrap_or_default();
            self.recover(RecoveryCategory::Decode, key, format!("read failed: {}", e), body);
        })
    }

    fn set_aside_leads(&self, removed: &[Lead]) {
        if let Ok(body) = encode_leads(removed) {
            let description = format!("deleted {} lead(s)", removed.len());
            self.recover(RecoveryCategory::Delete, &self.keys.leads_key, description, body);
        }
    }

    fn set_aside_tasks(&self, removed: &[Task]) {
        let board = TaskBoard {
            todo: removed.to_vec(),
            ..Default::default()
        };
        if let Ok(body) = encode_board(&board) {
            let description = format!("deleted {} task(s)", removed.len());
            self.recover(RecoveryCategory::Delete, &self.keys.tasks_key, description, body);
        }
    }

    fn recover(&self, category: RecoveryCategory, key: &str, description: String, body: String) {
        if let Some(dir) = &self.recovery_dir {
            log_recovery(dir, RecoveryEntry::new(category, key, description, body));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::recovery::read_recovery_entries;
    use crate::io::signal::drain;
    use crate::io::storage::MemoryStore;
    use tempfile::TempDir;

    fn keys() -> StorageConfig {
        StorageConfig::default()
    }

    fn task_draft(title: &str) -> TaskDraft {
        TaskDraft {
            title: title.into(),
            user_name: "Priya Sharma".into(),
            ..Default::default()
        }
    }

    #[test]
    fn mutations_write_through_and_notify() {
        let mut ws = Workspace::load(MemoryStore::new(), keys(), None);
        let rx = ws.subscribe();
        ws.create_task(task_draft("API Integration")).unwrap();
        ws.create_lead(LeadDraft {
            customer_name: "Acme".into(),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(drain(&rx), vec![ChangeEvent::TasksChanged, ChangeEvent::LeadsChanged]);

        let stored = ws.storage().get("taskTrackerTasksGrouped").unwrap().unwrap();
        assert!(stored.contains("API Integration"));
        assert!(ws.storage().get("leadTrackerData").unwrap().is_some());
    }

    #[test]
    fn failed_validation_does_not_notify() {
        let mut ws = Workspace::load(MemoryStore::new(), keys(), None);
        let rx = ws.subscribe();
        assert!(ws.create_lead(LeadDraft::default()).is_err());
        assert!(!ws.update_task(9, task_draft("Missing")).unwrap());
        assert!(drain(&rx).is_empty());
        assert!(ws.storage().get("leadTrackerData").unwrap().is_none());
    }

    #[test]
    fn undecodable_value_goes_to_recovery_log() {
        let tmp = TempDir::new().unwrap();
        let mut store = MemoryStore::new();
        store.put("leadTrackerData", "{not json").unwrap();
        let ws = Workspace::load(store, keys(), Some(tmp.path().to_path_buf()));
        assert!(ws.leads().is_empty());

        let entries = read_recovery_entries(tmp.path(), None);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].category, RecoveryCategory::Decode);
        assert_eq!(entries[0].key, "leadTrackerData");
        assert_eq!(entries[0].body, "{not json");
    }

    #[test]
    fn deleted_tasks_are_set_aside() {
        let tmp = TempDir::new().unwrap();
        let mut ws = Workspace::load(MemoryStore::new(), keys(), Some(tmp.path().to_path_buf()));
        let id = ws.create_task(task_draft("Bug Fixes")).unwrap();
        assert_eq!(ws.delete_tasks(&BTreeSet::from([id, 99])), 1);
        assert_eq!(ws.delete_tasks(&BTreeSet::from([id])), 0);

        let entries = read_recovery_entries(tmp.path(), None);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].category, RecoveryCategory::Delete);
        assert!(entries[0].body.contains("Bug Fixes"));
    }

    #[test]
    fn update_sees_changes_made_elsewhere() {
        let mut ws = Workspace::load(MemoryStore::new(), keys(), None);
        ws.create_task(task_draft("Bug Fixes")).unwrap();

        // Another view rewrites storage behind this workspace's back
        let mut other = TaskStore::new(ws.tasks().board().clone());
        other.create(task_draft("Security Audit")).unwrap();
        let text = encode_board(other.board()).unwrap();
        ws.storage.put("taskTrackerTasksGrouped", &text).unwrap();

        let outcome = ws
            .submit_update(&UpdateRequest {
                user: "Priya Sharma".into(),
                text: "done".into(),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(outcome.task_id, 2);
        assert_eq!(ws.tasks().len(), 2);
    }

    #[test]
    fn unreadable_grouped_tasks_are_set_aside_not_replaced() {
        let tmp = TempDir::new().unwrap();
        let grouped = tmp.path().join("taskTrackerTasksGrouped.json");
        let original: &[u8] = b"{\"todo\": [{\"id\": 1, \"title\": \"caf\xe9\"}]}";
        std::fs::write(&grouped, original).unwrap();
        std::fs::write(
            tmp.path().join("taskTrackerTasks.json"),
            r#"[{"id": 7, "title": "Old legacy task"}]"#,
        )
        .unwrap();

        let ws = Workspace::load(DirStore::new(tmp.path()), keys(), Some(tmp.path().to_path_buf()));

        // No fallback to the legacy list, and the grouped file is untouched
        assert!(ws.tasks().is_empty());
        assert_eq!(std::fs::read(&grouped).unwrap(), original);

        let entries = read_recovery_entries(tmp.path(), None);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].category, RecoveryCategory::Decode);
        assert_eq!(entries[0].key, "taskTrackerTasksGrouped");
        assert!(entries[0].description.starts_with("read failed"));
        assert!(entries[0].body.contains("caf\u{FFFD}"));
    }
}
