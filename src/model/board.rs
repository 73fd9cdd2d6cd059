use super::task::{Task, TaskGroup};

/// All tasks, partitioned into the four board groups.
///
/// A task lives in exactly one group; group membership only changes through
/// an explicit relocation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TaskBoard {
    pub todo: Vec<Task>,
    pub in_progress: Vec<Task>,
    pub review_ready: Vec<Task>,
    pub completed: Vec<Task>,
}

impl TaskBoard {
    /// Tasks in one group
    pub fn group(&self, group: TaskGroup) -> &[Task] {
        match group {
            TaskGroup::Todo => &self.todo,
            TaskGroup::InProgress => &self.in_progress,
            TaskGroup::ReviewReady => &self.review_ready,
            TaskGroup::Completed => &self.completed,
        }
    }

    pub fn group_mut(&mut self, group: TaskGroup) -> &mut Vec<Task> {
        match group {
            TaskGroup::Todo => &mut self.todo,
            TaskGroup::InProgress => &mut self.in_progress,
            TaskGroup::ReviewReady => &mut self.review_ready,
            TaskGroup::Completed => &mut self.completed,
        }
    }

    /// Every task with its group, in board order
    pub fn iter(&self) -> impl Iterator<Item = (TaskGroup, &Task)> {
        TaskGroup::ALL
            .into_iter()
            .flat_map(move |g| self.group(g).iter().map(move |t| (g, t)))
    }

    pub fn len(&self) -> usize {
        TaskGroup::ALL.iter().map(|g| self.group(*g).len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Find a task by ID across all groups
    pub fn find(&self, id: u64) -> Option<(TaskGroup, &Task)> {
        self.iter().find(|(_, t)| t.id == id)
    }

    pub fn find_mut(&mut self, id: u64) -> Option<&mut Task> {
        let (group, _) = self.find(id)?;
        self.group_mut(group).iter_mut().find(|t| t.id == id)
    }

    /// Highest task ID on the board, or 0 when empty
    pub fn max_id(&self) -> u64 {
        self.iter().map(|(_, t)| t.id).max().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(id: u64) -> Task {
        Task {
            id,
            title: format!("task {}", id),
            ..Default::default()
        }
    }

    #[test]
    fn iter_walks_groups_in_board_order() {
        let board = TaskBoard {
            todo: vec![task(4)],
            in_progress: vec![task(2)],
            review_ready: vec![],
            completed: vec![task(9), task(1)],
        };
        let ids: Vec<(TaskGroup, u64)> = board.iter().map(|(g, t)| (g, t.id)).collect();
        assert_eq!(
            ids,
            vec![
                (TaskGroup::Todo, 4),
                (TaskGroup::InProgress, 2),
                (TaskGroup::Completed, 9),
                (TaskGroup::Completed, 1),
            ]
        );
        assert_eq!(board.len(), 4);
        assert_eq!(board.max_id(), 9);
    }

    #[test]
    fn find_searches_every_group() {
        let mut board = TaskBoard {
            review_ready: vec![task(7)],
            ..Default::default()
        };
        assert_eq!(board.find(7).map(|(g, _)| g), Some(TaskGroup::ReviewReady));
        assert!(board.find(8).is_none());
        board.find_mut(7).unwrap().title = "edited".into();
        assert_eq!(board.review_ready[0].title, "edited");
    }

    #[test]
    fn empty_board_max_id_is_zero() {
        assert_eq!(TaskBoard::default().max_id(), 0);
        assert!(TaskBoard::default().is_empty());
    }
}
