use serde::Serialize;

use crate::io::recovery::RecoveryEntry;
use crate::model::task::Task;
use crate::ops::task_ops::Counts;
use crate::util::unicode::{pad_to_width, truncate_to_width};

// ---------------------------------------------------------------------------
// JSON output structs
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct CountsJson {
    pub active: usize,
    pub completed: usize,
    pub total: usize,
    pub summary: String,
}

#[derive(Serialize)]
pub struct RecoveryEntryJson {
    pub timestamp: String,
    pub category: String,
    pub description: String,
    pub fields: Vec<(String, String)>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub body: String,
}

pub fn counts_to_json(counts: &Counts) -> CountsJson {
    CountsJson {
        active: counts.active,
        completed: counts.completed,
        total: counts.total,
        summary: counts.summary(),
    }
}

pub fn recovery_entry_to_json(entry: &RecoveryEntry) -> RecoveryEntryJson {
    RecoveryEntryJson {
        timestamp: entry
            .timestamp
            .to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
        category: entry.category.to_string(),
        description: entry.description.clone(),
        fields: entry.fields.clone(),
        body: entry.body.clone(),
    }
}

// ---------------------------------------------------------------------------
// Human-readable formatting
// ---------------------------------------------------------------------------

/// `[x] <id>  <text>`, with the text cut to `text_width` cells (0 = no limit)
pub fn format_task_line(task: &Task, id_width: usize, text_width: usize) -> String {
    let text = if text_width == 0 {
        task.text.clone()
    } else {
        truncate_to_width(&task.text, text_width)
    };
    format!(
        "[{}] {}  {}",
        task.checkbox_char(),
        pad_to_width(&task.id.to_string(), id_width),
        text
    )
}

/// One line per task with ids aligned, or `empty_message` alone
pub fn format_task_listing(tasks: &[&Task], text_width: usize, empty_message: &str) -> Vec<String> {
    if tasks.is_empty() {
        return vec![empty_message.to_string()];
    }
    let id_width = tasks
        .iter()
        .map(|t| t.id.to_string().len())
        .max()
        .unwrap_or(0);
    tasks
        .iter()
        .map(|t| format_task_line(t, id_width, text_width))
        .collect()
}

/// Detailed view of one task
pub fn format_task_detail(task: &Task) -> Vec<String> {
    vec![
        format!("[{}] {}", task.checkbox_char(), task.text),
        format!("id: {}", task.id),
        format!(
            "created: {}",
            task.created_at
                .to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
        ),
        format!(
            "status: {}",
            if task.completed { "completed" } else { "active" }
        ),
    ]
}

pub fn format_counts(counts: &Counts) -> Vec<String> {
    vec![counts.header(), counts.summary()]
}

pub fn format_recovery_entry(entry: &RecoveryEntry) -> Vec<String> {
    let mut lines = vec![format!(
        "{} {}: {}",
        entry
            .timestamp
            .to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
        entry.category,
        entry.description
    )];
    for (key, value) in &entry.fields {
        lines.push(format!("  {}: {}", key, value));
    }
    for line in entry.body.lines() {
        lines.push(format!("  | {}", line));
    }
    lines
}
