use super::model::{Task, TaskPatch};

/// Apply a validated partial update onto a stored task.
///
/// Supplied fields overwrite, absent fields keep their stored value and the
/// id is never touched. The patch is expected to have passed the editing
/// ruleset already.
pub fn merge(existing: Task, patch: TaskPatch) -> Task {
    Task {
        id: existing.id,
        title: patch.title.unwrap_or(existing.title),
        description: patch.description.unwrap_or(existing.description),
        due_date: patch.due_date.unwrap_or(existing.due_date),
        completed: patch.completed.unwrap_or(existing.completed),
    }
}
