use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::model::filter::FilterMode;
use crate::model::task::TaskId;

#[derive(Parser)]
#[command(name = "gt", about = concat!("glasstodo v", env!("CARGO_PKG_VERSION"), " - a small task list"), version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Use this slot file instead of the configured one
    #[arg(long, global = true, value_name = "PATH")]
    pub store: Option<PathBuf>,

    /// Read configuration from this file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Add a task to the top of the list
    Add(AddArgs),
    /// List tasks
    #[command(alias = "ls")]
    List(ListArgs),
    /// Show one task
    Show(IdArgs),
    /// Mark a task completed, or active again
    Toggle(IdArgs),
    /// Change a task's text
    Edit(EditArgs),
    /// Delete a task
    #[command(alias = "rm")]
    Delete(IdArgs),
    /// Show active and completed counts
    Stats,
    /// Merge tasks from a JSON file
    Import(ImportArgs),
    /// Print the stored list as JSON
    Export,
    /// View or prune the recovery log
    Recovery(RecoveryArgs),
}

#[derive(Args)]
pub struct AddArgs {
    /// Task text
    pub text: String,
}

#[derive(Args)]
pub struct ListArgs {
    /// Which tasks to show: all, active or completed
    #[arg(long, short)]
    pub filter: Option<FilterMode>,
    /// Do not truncate task text
    #[arg(long)]
    pub full: bool,
}

#[derive(Args)]
pub struct IdArgs {
    /// Task id
    pub id: TaskId,
}

#[derive(Args)]
pub struct EditArgs {
    /// Task id
    pub id: TaskId,
    /// New text
    pub text: String,
}

#[derive(Args)]
pub struct ImportArgs {
    /// JSON file holding an array of task records
    pub file: PathBuf,
}

#[derive(Args)]
pub struct RecoveryArgs {
    /// Maximum number of entries to show
    #[arg(long, default_value = "10")]
    pub limit: usize,
    /// Remove entries instead of showing them
    #[arg(long)]
    pub prune: bool,
    /// With --prune, remove every entry rather than those older than 30 days
    #[arg(long, requires = "prune")]
    pub all: bool,
}
