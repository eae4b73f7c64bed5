//! A small task list: the list manager, its storage seam, a headless UI
//! session and the `gt` command-line client.

pub mod app;
pub mod cli;
pub mod io;
pub mod manager;
pub mod model;
pub mod ops;
pub mod util;

pub use app::{App, EditSession, UiEvent};
pub use io::store::{FileStore, MemoryStore, StoreError, TaskStore};
pub use manager::TaskManager;
pub use model::{FilterMode, Task, TaskId, TaskList};
