use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::task::{Task, TaskId};

/// A list that breaks one of the task list invariants
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ListError {
    #[error("duplicate task id {0}")]
    DuplicateId(TaskId),
    #[error("task {0} has empty text")]
    BlankText(TaskId),
    #[error("task {0} has leading or trailing whitespace in its text")]
    UntrimmedText(TaskId),
}

/// The ordered, id-unique collection of tasks. Most recently created first.
///
/// Serializes as a flat JSON array of task records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskList {
    tasks: Vec<Task>,
}

impl TaskList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap tasks as-is. Call [`TaskList::validate`] on untrusted input.
    pub fn from_tasks(tasks: Vec<Task>) -> Self {
        TaskList { tasks }
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Task> {
        self.tasks.iter()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn contains(&self, id: TaskId) -> bool {
        self.get(id).is_some()
    }

    /// Largest id in the list, if any
    pub fn max_id(&self) -> Option<TaskId> {
        self.tasks.iter().map(|t| t.id).max()
    }

    /// Check id uniqueness and text shape.
    pub fn validate(&self) -> Result<(), ListError> {
        let mut seen = HashSet::with_capacity(self.tasks.len());
        for task in &self.tasks {
            if !seen.insert(task.id) {
                return Err(ListError::DuplicateId(task.id));
            }
            if task.text.trim().is_empty() {
                return Err(ListError::BlankText(task.id));
            }
            if task.text.trim() != task.text {
                return Err(ListError::UntrimmedText(task.id));
            }
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a TaskList {
    type Item = &'a Task;
    type IntoIter = std::slice::Iter<'a, Task>;

    fn into_iter(self) -> Self::IntoIter {
        self.tasks.iter()
    }
}
