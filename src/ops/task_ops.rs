use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;

use crate::model::filter::FilterMode;
use crate::model::list::TaskList;
use crate::model::task::{Task, TaskId};

// Every operation here takes the current list by reference and returns the
// next list. Blank text and unknown ids leave the list unchanged.

// ---------------------------------------------------------------------------
// Task CRUD
// ---------------------------------------------------------------------------

/// Trim `raw`, returning `None` if nothing is left
pub fn normalize_text(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Pick an id for a task created at `now`: the millisecond timestamp, bumped
/// past the largest existing id so rapid adds never collide. When the
/// largest id is `u64::MAX` the smallest unused id is taken instead.
pub fn fresh_id(list: &TaskList, now: DateTime<Utc>) -> TaskId {
    let millis = now.timestamp_millis().max(0) as u64;
    match list.max_id() {
        Some(TaskId(max)) if max >= millis => match max.checked_add(1) {
            Some(next) => TaskId(next),
            None => smallest_unused_id(list),
        },
        _ => TaskId(millis),
    }
}

fn smallest_unused_id(list: &TaskList) -> TaskId {
    let mut ids: Vec<u64> = list.iter().map(|t| t.id.0).collect();
    ids.sort_unstable();
    let mut candidate = 0;
    for id in ids {
        if id != candidate {
            break;
        }
        candidate += 1;
    }
    TaskId(candidate)
}

/// Prepend a new open task. Blank text is rejected silently.
pub fn add_task(list: &TaskList, raw_text: &str, now: DateTime<Utc>) -> TaskList {
    let Some(text) = normalize_text(raw_text) else {
        return list.clone();
    };
    let created_at = Utc
        .timestamp_millis_opt(now.timestamp_millis())
        .single()
        .unwrap_or(now);
    let task = Task::new(fresh_id(list, now), text, created_at);

    let mut tasks = Vec::with_capacity(list.len() + 1);
    tasks.push(task);
    tasks.extend(list.iter().cloned());
    TaskList::from_tasks(tasks)
}

/// Flip the completed flag of the task with `id`
pub fn toggle_task(list: &TaskList, id: TaskId) -> TaskList {
    map_task(list, id, |task| task.completed = !task.completed)
}

/// Remove the task with `id`
pub fn delete_task(list: &TaskList, id: TaskId) -> TaskList {
    TaskList::from_tasks(list.iter().filter(|t| t.id != id).cloned().collect())
}

/// Replace the text of the task with `id`. Blank text is rejected silently.
pub fn edit_task(list: &TaskList, id: TaskId, raw_text: &str) -> TaskList {
    let Some(text) = normalize_text(raw_text) else {
        return list.clone();
    };
    map_task(list, id, |task| task.text = text.clone())
}

/// Append the tasks of `incoming` whose ids are not already present,
/// keeping their relative order. Existing tasks are left alone.
pub fn merge_tasks(list: &TaskList, incoming: &TaskList) -> TaskList {
    let mut tasks: Vec<Task> = list.iter().cloned().collect();
    for task in incoming {
        if !tasks.iter().any(|t| t.id == task.id) {
            tasks.push(task.clone());
        }
    }
    TaskList::from_tasks(tasks)
}

fn map_task(list: &TaskList, id: TaskId, f: impl Fn(&mut Task)) -> TaskList {
    TaskList::from_tasks(
        list.iter()
            .cloned()
            .map(|mut task| {
                if task.id == id {
                    f(&mut task);
                }
                task
            })
            .collect(),
    )
}

// ---------------------------------------------------------------------------
// Derived views
// ---------------------------------------------------------------------------

/// Tasks visible under `mode`, in list order
pub fn filter_tasks(list: &TaskList, mode: FilterMode) -> Vec<&Task> {
    list.iter().filter(|t| mode.matches(t)).collect()
}

/// Task counts for display
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Counts {
    pub active: usize,
    pub completed: usize,
    pub total: usize,
}

impl Counts {
    /// `"2 active, 1 completed"`
    pub fn header(&self) -> String {
        format!("{} active, {} completed", self.active, self.completed)
    }

    /// `"1 of 3 completed"`, or `"No tasks yet"` for an empty list
    pub fn summary(&self) -> String {
        if self.total == 0 {
            "No tasks yet".to_string()
        } else {
            format!("{} of {} completed", self.completed, self.total)
        }
    }
}

pub fn task_counts(list: &TaskList) -> Counts {
    let completed = list.iter().filter(|t| t.completed).count();
    Counts {
        active: list.len() - completed,
        completed,
        total: list.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashSet;

    fn at(millis: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(millis).unwrap()
    }

    fn texts(list: &TaskList) -> Vec<&str> {
        list.iter().map(|t| t.text.as_str()).collect()
    }

    fn sample() -> TaskList {
        let list = add_task(&TaskList::new(), "one", at(1_000));
        let list = add_task(&list, "two", at(2_000));
        let list = add_task(&list, "three", at(3_000));
        toggle_task(&list, TaskId(2_000))
    }

    // --- add ---

    #[test]
    fn add_prepends_trimmed_open_task() {
        let list = sample();
        let next = add_task(&list, "  Buy milk \n", at(5_000));

        assert_eq!(next.len(), list.len() + 1);
        let head = &next.tasks()[0];
        assert_eq!(head.text, "Buy milk");
        assert!(!head.completed);
        assert_eq!(head.id, TaskId(5_000));
        assert_eq!(head.created_at, at(5_000));
        assert!(!list.contains(head.id));
        assert_eq!(&next.tasks()[1..], list.tasks());
    }

    #[test]
    fn add_blank_leaves_list_unchanged() {
        let list = sample();
        assert_eq!(add_task(&list, "", at(9_000)), list);
        assert_eq!(add_task(&list, "   ", at(9_000)), list);
        assert_eq!(add_task(&list, "\t\n", at(9_000)), list);
    }

    #[test]
    fn add_within_same_millisecond_keeps_ids_unique() {
        let mut list = TaskList::new();
        for i in 0..5 {
            list = add_task(&list, &format!("task {}", i), at(42));
        }
        let ids: HashSet<_> = list.iter().map(|t| t.id).collect();
        assert_eq!(ids.len(), 5);
        assert_eq!(list.validate(), Ok(()));
    }

    #[test]
    fn add_with_clock_behind_existing_ids_still_unique() {
        let list = add_task(&TaskList::new(), "future", at(10_000));
        let next = add_task(&list, "past", at(1_000));
        assert_eq!(next.tasks()[0].id, TaskId(10_001));
    }

    #[test]
    fn add_after_max_id_takes_smallest_unused() {
        let list = TaskList::from_tasks(vec![
            Task::new(TaskId(u64::MAX), "last".to_string(), at(1_000)),
            Task::new(TaskId(0), "zero".to_string(), at(1_000)),
            Task::new(TaskId(1), "one".to_string(), at(1_000)),
        ]);
        let next = add_task(&list, "new", at(2_000));
        assert_eq!(next.tasks()[0].id, TaskId(2));
        assert!(next.validate().is_ok());
    }

    #[test]
    fn add_truncates_timestamp_to_millis() {
        let now = at(1_500) + chrono::Duration::nanoseconds(123_456);
        let list = add_task(&TaskList::new(), "x", now);
        assert_eq!(list.tasks()[0].created_at, at(1_500));
    }

    // --- toggle ---

    #[test]
    fn double_toggle_restores_state() {
        let list = sample();
        for task in &list {
            let twice = toggle_task(&toggle_task(&list, task.id), task.id);
            assert_eq!(twice, list);
        }
    }

    #[test]
    fn toggle_flips_only_target() {
        let list = sample();
        let next = toggle_task(&list, TaskId(3_000));
        assert!(next.get(TaskId(3_000)).unwrap().completed);
        assert!(next.get(TaskId(2_000)).unwrap().completed);
        assert!(!next.get(TaskId(1_000)).unwrap().completed);
    }

    #[test]
    fn toggle_unknown_id_is_noop() {
        let list = sample();
        assert_eq!(toggle_task(&list, TaskId(77)), list);
    }

    // --- delete ---

    #[test]
    fn delete_removes_only_target() {
        let list = sample();
        let next = delete_task(&list, TaskId(2_000));
        assert_eq!(next.len(), list.len() - 1);
        assert!(!next.contains(TaskId(2_000)));
        assert_eq!(texts(&next), vec!["three", "one"]);
    }

    #[test]
    fn delete_unknown_id_is_noop() {
        let list = sample();
        assert_eq!(delete_task(&list, TaskId(77)), list);
    }

    // --- edit ---

    #[test]
    fn edit_changes_only_text_of_target() {
        let list = sample();
        let next = edit_task(&list, TaskId(2_000), "  second  ");

        let before = list.get(TaskId(2_000)).unwrap();
        let after = next.get(TaskId(2_000)).unwrap();
        assert_eq!(after.text, "second");
        assert_eq!(after.id, before.id);
        assert_eq!(after.completed, before.completed);
        assert_eq!(after.created_at, before.created_at);

        for (a, b) in list.iter().zip(next.iter()) {
            if a.id != TaskId(2_000) {
                assert_eq!(a, b);
            }
        }
    }

    #[test]
    fn edit_blank_keeps_original_text() {
        let list = sample();
        assert_eq!(edit_task(&list, TaskId(1_000), ""), list);
        assert_eq!(edit_task(&list, TaskId(1_000), "   "), list);
    }

    #[test]
    fn edit_unknown_id_is_noop() {
        let list = sample();
        assert_eq!(edit_task(&list, TaskId(77), "new"), list);
    }

    // --- merge ---

    #[test]
    fn merge_appends_only_new_ids() {
        let list = sample();
        let incoming = TaskList::from_tasks(vec![
            Task::new(TaskId(9_000), "imported".into(), at(9_000)),
            list.tasks()[0].clone(),
        ]);

        let merged = merge_tasks(&list, &incoming);
        assert_eq!(texts(&merged), vec!["three", "two", "one", "imported"]);
        assert_eq!(merged.validate(), Ok(()));
    }

    // --- filter / counts ---

    #[test]
    fn filter_partitions_the_list() {
        let list = sample();
        let all = filter_tasks(&list, FilterMode::All);
        let active = filter_tasks(&list, FilterMode::Active);
        let completed = filter_tasks(&list, FilterMode::Completed);

        assert_eq!(all.len(), list.len());
        assert_eq!(active.len() + completed.len(), all.len());

        let active_ids: HashSet<_> = active.iter().map(|t| t.id).collect();
        let completed_ids: HashSet<_> = completed.iter().map(|t| t.id).collect();
        assert!(active_ids.is_disjoint(&completed_ids));
        let union: HashSet<_> = active_ids.union(&completed_ids).copied().collect();
        let all_ids: HashSet<_> = all.iter().map(|t| t.id).collect();
        assert_eq!(union, all_ids);
    }

    #[test]
    fn filter_keeps_list_order() {
        let list = add_task(&sample(), "four", at(4_000));
        let active: Vec<&str> = filter_tasks(&list, FilterMode::Active)
            .iter()
            .map(|t| t.text.as_str())
            .collect();
        assert_eq!(active, vec!["four", "three", "one"]);
    }

    #[test]
    fn counts_and_phrases() {
        let counts = task_counts(&sample());
        assert_eq!(
            counts,
            Counts {
                active: 2,
                completed: 1,
                total: 3
            }
        );
        assert_eq!(counts.header(), "2 active, 1 completed");
        assert_eq!(counts.summary(), "1 of 3 completed");
        assert_eq!(task_counts(&TaskList::new()).summary(), "No tasks yet");
    }

    #[test]
    fn milk_and_dog_scenario() {
        let list = add_task(&TaskList::new(), "Buy milk", at(1_000));
        let list = add_task(&list, "Walk dog", at(2_000));
        assert_eq!(texts(&list), vec!["Walk dog", "Buy milk"]);

        let milk = list.tasks()[1].id;
        let dog = list.tasks()[0].id;
        let list = toggle_task(&list, milk);
        assert_eq!(
            task_counts(&list),
            Counts {
                active: 1,
                completed: 1,
                total: 2
            }
        );

        let list = delete_task(&list, dog);
        assert_eq!(texts(&list), vec!["Buy milk"]);
        assert!(list.tasks()[0].completed);
    }
}
