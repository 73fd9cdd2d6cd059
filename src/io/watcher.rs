use std::path::{Path, PathBuf};
use std::sync::mpsc;

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

use crate::io::signal::ChangeEvent;
use crate::model::config::StorageConfig;

/// Turns file changes in a store directory into [`ChangeEvent`]s, so a
/// view in another process learns that it should re-read.
pub struct StoreWatcher {
    _watcher: RecommendedWatcher,
    rx: mpsc::Receiver<ChangeEvent>,
}

impl StoreWatcher {
    /// Start watching `store_dir`. Call [`StoreWatcher::poll`] each tick.
    pub fn start(store_dir: &Path, storage: &StorageConfig) -> Result<Self, notify::Error> {
        let (tx, rx) = mpsc::channel();
        let tasks_file = format!("{}.json", storage.tasks_key);
        let leads_file = format!("{}.json", storage.leads_key);

        let mut watcher = RecommendedWatcher::new(
            move |result: Result<Event, notify::Error>| {
                let event = match result {
                    Ok(e) => e,
                    Err(_) => return,
                };
                match event.kind {
                    EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_) => {}
                    _ => return,
                }
                for change in classify(&event.paths, &tasks_file, &leads_file) {
                    let _ = tx.send(change);
                }
            },
            Config::default(),
        )?;

        watcher.watch(store_dir, RecursiveMode::NonRecursive)?;
        Ok(StoreWatcher {
            _watcher: watcher,
            rx,
        })
    }

    /// Non-blocking poll. Repeated events of one kind are collapsed.
    pub fn poll(&self) -> Vec<ChangeEvent> {
        let mut events = Vec::new();
        while let Ok(evt) = self.rx.try_recv() {
            if !events.contains(&evt) {
                events.push(evt);
            }
        }
        events
    }
}

/// Map changed paths to the record sets they hold
fn classify(paths: &[PathBuf], tasks_file: &str, leads_file: &str) -> Vec<ChangeEvent> {
    let mut events = Vec::new();
    for path in paths {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let event = if name == tasks_file {
            ChangeEvent::TasksChanged
        } else if name == leads_file {
            ChangeEvent::LeadsChanged
        } else {
            continue;
        };
        if !events.contains(&event) {
            events.push(event);
        }
    }
    events
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_ignores_unrelated_files() {
        let paths = vec![
            PathBuf::from("/w/.leadboard/.taskTrackerTasksGrouped.lock"),
            PathBuf::from("/w/.leadboard/taskTrackerTasksGrouped.json"),
            PathBuf::from("/w/.leadboard/.tmpAbc123"),
            PathBuf::from("/w/.leadboard/taskTrackerTasksGrouped.json"),
            PathBuf::from("/w/.leadboard/leadTrackerData.json"),
        ];
        assert_eq!(
            classify(&paths, "taskTrackerTasksGrouped.json", "leadTrackerData.json"),
            vec![ChangeEvent::TasksChanged, ChangeEvent::LeadsChanged]
        );
        assert!(classify(&paths[..1], "t.json", "l.json").is_empty());
    }
}
