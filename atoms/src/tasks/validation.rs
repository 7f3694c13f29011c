//! Field-level validation of incoming task payloads.
//!
//! A payload is checked against one of two rulesets. `Creation` requires
//! every business field and a present-or-future due date. `Editing` only
//! checks the fields that were supplied, against the same size bounds, so a
//! partial edit can never leave an out-of-bounds value in storage.
//!
//! Every violated field is reported; validation never stops at the first
//! bad field.

use super::model::{NewTask, TaskPatch, TaskPayload};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use utoipa::ToSchema;

pub const TITLE_MIN_CHARS: usize = 3;
pub const TITLE_MAX_CHARS: usize = 255;
pub const DESCRIPTION_MAX_CHARS: usize = 1024;

pub const TITLE_MISSING: &str = "Task title must be present";
pub const TITLE_SIZE: &str = "Task title must be between 3 and 255 characters";
pub const DESCRIPTION_MISSING: &str = "Task description must be present";
pub const DESCRIPTION_SIZE: &str = "Task description must be at most 1024 characters";
pub const DUE_DATE_MISSING: &str = "The due date must be present";
pub const DUE_DATE_PAST: &str = "Due date must be at least in present time or in future";

/// Named set of field constraints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ruleset {
    Creation,
    Editing,
}

/// Field name -> violation message, one entry per invalid field.
///
/// Serializes as a flat JSON object, e.g. `{"title": "..."}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    pub fn add(&mut self, field: &str, message: &str) {
        self.0.insert(field.to_string(), message.to_string());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, message) in &self.0 {
            if !first {
                f.write_str("; ")?;
            }
            write!(f, "{field}: {message}")?;
            first = false;
        }
        Ok(())
    }
}

impl std::error::Error for FieldErrors {}

/// Validates `payload` under `ruleset`. `now` is the instant due dates are
/// compared against for creation.
pub fn validate(
    payload: &TaskPayload,
    ruleset: Ruleset,
    now: DateTime<Utc>,
) -> Result<TaskPatch, FieldErrors> {
    let mut errors = FieldErrors::default();

    check_text(
        &mut errors,
        ruleset,
        Field {
            name: "title",
            missing: TITLE_MISSING,
            size: TITLE_SIZE,
            min: TITLE_MIN_CHARS,
            max: TITLE_MAX_CHARS,
        },
        payload.title.as_deref(),
    );
    check_text(
        &mut errors,
        ruleset,
        Field {
            name: "description",
            missing: DESCRIPTION_MISSING,
            size: DESCRIPTION_SIZE,
            min: 0,
            max: DESCRIPTION_MAX_CHARS,
        },
        payload.description.as_deref(),
    );

    if ruleset == Ruleset::Creation {
        match payload.due_date {
            None => errors.add("dueDate", DUE_DATE_MISSING),
            Some(due) if due < now => errors.add("dueDate", DUE_DATE_PAST),
            Some(_) => {}
        }
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    Ok(TaskPatch {
        title: payload.title.clone(),
        description: payload.description.clone(),
        due_date: payload.due_date,
        completed: payload.completed,
    })
}

/// Creation-ruleset validation producing a task ready to insert.
/// `completed` defaults to false.
pub fn validate_new(payload: &TaskPayload, now: DateTime<Utc>) -> Result<NewTask, FieldErrors> {
    let patch = validate(payload, Ruleset::Creation, now)?;
    NewTask::try_from(patch)
}

impl TryFrom<TaskPatch> for NewTask {
    type Error = FieldErrors;

    fn try_from(patch: TaskPatch) -> Result<Self, Self::Error> {
        match (patch.title, patch.description, patch.due_date) {
            (Some(title), Some(description), Some(due_date)) => Ok(NewTask {
                title,
                description,
                due_date,
                completed: patch.completed.unwrap_or(false),
            }),
            (title, description, due_date) => {
                let mut errors = FieldErrors::default();
                if title.is_none() {
                    errors.add("title", TITLE_MISSING);
                }
                if description.is_none() {
                    errors.add("description", DESCRIPTION_MISSING);
                }
                if due_date.is_none() {
                    errors.add("dueDate", DUE_DATE_MISSING);
                }
                Err(errors)
            }
        }
    }
}

struct Field {
    name: &'static str,
    missing: &'static str,
    size: &'static str,
    min: usize,
    max: usize,
}

fn check_text(errors: &mut FieldErrors, ruleset: Ruleset, field: Field, value: Option<&str>) {
    match value {
        None if ruleset == Ruleset::Creation => errors.add(field.name, field.missing),
        None => {}
        Some(text) => {
            let chars = text.chars().count();
            if chars < field.min || chars > field.max {
                errors.add(field.name, field.size);
            }
        }
    }
}
