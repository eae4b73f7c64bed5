//! Headless presentation state for a task list view.
//!
//! A renderer feeds [`UiEvent`]s into [`App::handle`] and draws from
//! [`App::visible`], [`App::editing`] and [`App::counts`]. Nothing here is
//! persisted except through the manager.

use crate::io::store::{StoreError, TaskStore};
use crate::manager::TaskManager;
use crate::model::filter::FilterMode;
use crate::model::task::{Task, TaskId};
use crate::ops::task_ops::Counts;

/// Inputs a view produces
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    Add(String),
    Toggle(TaskId),
    Delete(TaskId),
    StartEdit(TaskId),
    /// Keystroke in the edit field
    UpdateDraft(String),
    SaveEdit(TaskId, String),
    CancelEdit,
    SetFilter(FilterMode),
}

/// The task currently being edited and its unsaved text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditSession {
    pub task_id: TaskId,
    pub draft: String,
}

pub struct App<S: TaskStore> {
    manager: TaskManager<S>,
    filter: FilterMode,
    editing: Option<EditSession>,
}

impl<S: TaskStore> App<S> {
    pub fn new(manager: TaskManager<S>) -> Self {
        App {
            manager,
            filter: FilterMode::All,
            editing: None,
        }
    }

    pub fn with_filter(mut self, filter: FilterMode) -> Self {
        self.filter = filter;
        self
    }

    pub fn handle(&mut self, event: UiEvent) -> Result<(), StoreError> {
        match event {
            UiEvent::Add(text) => {
                self.manager.add(&text)?;
            }
            UiEvent::Toggle(id) => {
                self.manager.toggle(id)?;
            }
            UiEvent::Delete(id) => {
                self.manager.delete(id)?;
                if self.editing.as_ref().is_some_and(|e| e.task_id == id) {
                    self.editing = None;
                }
            }
            UiEvent::StartEdit(id) => {
                self.editing = self.manager.find(id).map(|task| EditSession {
                    task_id: id,
                    draft: task.text.clone(),
                });
            }
            UiEvent::UpdateDraft(text) => {
                if let Some(session) = self.editing.as_mut() {
                    session.draft = text;
                }
            }
            UiEvent::SaveEdit(id, text) => {
                // The session ends even when the write fails or the text is blank
                self.editing = None;
                self.manager.edit(id, &text)?;
            }
            UiEvent::CancelEdit => self.editing = None,
            UiEvent::SetFilter(mode) => self.filter = mode,
        }
        Ok(())
    }

    /// Save the open edit session with its current draft, if any
    pub fn commit_draft(&mut self) -> Result<(), StoreError> {
        match self.editing.clone() {
            Some(session) => self.handle(UiEvent::SaveEdit(session.task_id, session.draft)),
            None => Ok(()),
        }
    }

    pub fn filter(&self) -> FilterMode {
        self.filter
    }

    pub fn editing(&self) -> Option<&EditSession> {
        self.editing.as_ref()
    }

    pub fn is_editing(&self, id: TaskId) -> bool {
        self.editing.as_ref().is_some_and(|e| e.task_id == id)
    }

    /// Tasks shown under the current filter
    pub fn visible(&self) -> Vec<&Task> {
        self.manager.filter(self.filter)
    }

    pub fn counts(&self) -> Counts {
        self.manager.counts()
    }

    /// Placeholder text when [`App::visible`] is empty
    pub fn empty_message(&self) -> String {
        match self.filter {
            FilterMode::All => "No todos yet".to_string(),
            mode => format!("No {} todos", mode),
        }
    }

    pub fn manager(&self) -> &TaskManager<S> {
        &self.manager
    }
}
