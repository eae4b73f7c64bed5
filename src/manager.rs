use chrono::{DateTime, Utc};

use crate::io::store::{StoreError, TaskStore};
use crate::model::config::CorruptPolicy;
use crate::model::filter::FilterMode;
use crate::model::list::TaskList;
use crate::model::task::{Task, TaskId};
use crate::ops::task_ops::{self, Counts};

/// Owns the task list and keeps it in sync with the injected store.
///
/// Every mutation goes through the pure functions in [`task_ops`]; when the
/// resulting list differs from the current one it is saved before it
/// replaces the in-memory copy, so a failed write leaves both untouched.
pub struct TaskManager<S: TaskStore> {
    store: S,
    list: TaskList,
}

impl<S: TaskStore> TaskManager<S> {
    /// Load the list from `store`. A corrupt stored value is an error.
    pub fn open(store: S) -> Result<Self, StoreError> {
        Self::open_with_policy(store, CorruptPolicy::Fail)
    }

    /// Load the list from `store`, applying `policy` to a corrupt value.
    pub fn open_with_policy(mut store: S, policy: CorruptPolicy) -> Result<Self, StoreError> {
        let list = match store.load() {
            Ok(list) => list,
            Err(e) if e.is_corrupt() && policy == CorruptPolicy::Reset => {
                let raw = store.read_slot()?.unwrap_or_default();
                store.quarantine(&raw, &e)?;
                let empty = TaskList::new();
                store.save(&empty)?;
                empty
            }
            Err(e) => return Err(e),
        };
        Ok(TaskManager { store, list })
    }

    pub fn tasks(&self) -> &TaskList {
        &self.list
    }

    pub fn find(&self, id: TaskId) -> Option<&Task> {
        self.list.get(id)
    }

    pub fn filter(&self, mode: FilterMode) -> Vec<&Task> {
        task_ops::filter_tasks(&self.list, mode)
    }

    pub fn counts(&self) -> Counts {
        task_ops::task_counts(&self.list)
    }

    /// Add a task stamped with the current time.
    /// Returns the new id, or `None` if the text was blank.
    pub fn add(&mut self, raw_text: &str) -> Result<Option<TaskId>, StoreError> {
        self.add_at(raw_text, Utc::now())
    }

    pub fn add_at(
        &mut self,
        raw_text: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<TaskId>, StoreError> {
        let next = task_ops::add_task(&self.list, raw_text, now);
        let id = (next.len() > self.list.len()).then(|| next.tasks()[0].id);
        self.commit(next)?;
        Ok(id)
    }

    /// Returns whether a task was toggled
    pub fn toggle(&mut self, id: TaskId) -> Result<bool, StoreError> {
        self.commit(task_ops::toggle_task(&self.list, id))
    }

    /// Returns the removed task, if there was one
    pub fn delete(&mut self, id: TaskId) -> Result<Option<Task>, StoreError> {
        let removed = self.list.get(id).cloned();
        self.commit(task_ops::delete_task(&self.list, id))?;
        Ok(removed)
    }

    /// Returns whether the text changed
    pub fn edit(&mut self, id: TaskId, raw_text: &str) -> Result<bool, StoreError> {
        self.commit(task_ops::edit_task(&self.list, id, raw_text))
    }

    /// Merge tasks from another list. Returns how many were added.
    pub fn import(&mut self, incoming: &TaskList) -> Result<usize, StoreError> {
        let before = self.list.len();
        let next = task_ops::merge_tasks(&self.list, incoming);
        let added = next.len() - before;
        self.commit(next)?;
        Ok(added)
    }

    fn commit(&mut self, next: TaskList) -> Result<bool, StoreError> {
        if next == self.list {
            return Ok(false);
        }
        self.store.save(&next)?;
        self.list = next;
        Ok(true)
    }
}
