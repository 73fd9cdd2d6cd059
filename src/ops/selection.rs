use std::collections::BTreeSet;

/// How a click on a task card is interpreted
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SelectionMode {
    /// Clicks open the task's detail view
    #[default]
    None,
    /// The next click opens that task for editing, then the mode ends
    EditSelect,
    /// Clicks toggle tasks in a pending-removal set
    RemoveSelect(BTreeSet<u64>),
}

/// What a click resolved to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickOutcome {
    ShowDetail(u64),
    OpenEditor(u64),
    Toggled { id: u64, selected: bool },
}

impl SelectionMode {
    pub fn begin_edit(&mut self) {
        *self = SelectionMode::EditSelect;
    }

    /// Enter removal mode with an empty pending set
    pub fn begin_remove(&mut self) {
        *self = SelectionMode::RemoveSelect(BTreeSet::new());
    }

    pub fn click(&mut self, id: u64) -> ClickOutcome {
        match self {
            SelectionMode::None => ClickOutcome::ShowDetail(id),
            SelectionMode::EditSelect => {
                *self = SelectionMode::None;
                ClickOutcome::OpenEditor(id)
            }
            SelectionMode::RemoveSelect(pending) => {
                let selected = if pending.remove(&id) {
                    false
                } else {
                    pending.insert(id);
                    true
                };
                ClickOutcome::Toggled { id, selected }
            }
        }
    }

    /// Tasks currently marked for removal
    pub fn pending(&self) -> Option<&BTreeSet<u64>> {
        match self {
            SelectionMode::RemoveSelect(pending) => Some(pending),
            _ => None,
        }
    }

    /// Finish removal mode, handing back the IDs to delete. With nothing
    /// selected the mode stays open and `None` is returned.
    pub fn confirm(&mut self) -> Option<BTreeSet<u64>> {
        match self {
            SelectionMode::RemoveSelect(pending) if !pending.is_empty() => {
                let ids = std::mem::take(pending);
                *self = SelectionMode::None;
                Some(ids)
            }
            _ => None,
        }
    }

    /// Leave any mode, dropping pending selections
    pub fn cancel(&mut self) {
        *self = SelectionMode::None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_click_shows_detail() {
        let mut mode = SelectionMode::default();
        assert_eq!(mode.click(4), ClickOutcome::ShowDetail(4));
        assert_eq!(mode, SelectionMode::None);
    }

    #[test]
    fn edit_select_is_one_shot() {
        let mut mode = SelectionMode::default();
        mode.begin_edit();
        assert_eq!(mode.click(4), ClickOutcome::OpenEditor(4));
        assert_eq!(mode, SelectionMode::None);
        assert_eq!(mode.click(4), ClickOutcome::ShowDetail(4));
    }

    #[test]
    fn remove_select_toggles_and_confirms() {
        let mut mode = SelectionMode::default();
        mode.begin_remove();
        assert_eq!(mode.click(1), ClickOutcome::Toggled { id: 1, selected: true });
        assert_eq!(mode.click(2), ClickOutcome::Toggled { id: 2, selected: true });
        assert_eq!(mode.click(1), ClickOutcome::Toggled { id: 1, selected: false });
        assert_eq!(mode.pending().unwrap().len(), 1);

        let ids = mode.confirm().unwrap();
        assert_eq!(ids.into_iter().collect::<Vec<_>>(), vec![2]);
        assert_eq!(mode, SelectionMode::None);
    }

    #[test]
    fn confirm_with_nothing_selected_stays_open() {
        let mut mode = SelectionMode::default();
        mode.begin_remove();
        assert!(mode.confirm().is_none());
        assert!(mode.pending().is_some());
        assert!(SelectionMode::None.confirm().is_none());
    }

    #[test]
    fn cancel_clears_pending() {
        let mut mode = SelectionMode::default();
        mode.begin_remove();
        mode.click(3);
        mode.cancel();
        assert_eq!(mode, SelectionMode::None);
        assert!(mode.pending().is_none());
    }
}
