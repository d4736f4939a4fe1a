//! The task record and its validated inputs.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::text::sanitize_text;
use crate::{DomainError, DomainResult, OwnedResource, PrincipalId, TaskId};

pub const TITLE_MAX_CHARS: usize = 255;
pub const DESCRIPTION_MAX_CHARS: usize = 1000;

/// A to-do item owned by exactly one principal.
///
/// `owner_id` is private: it is set by [`Task::create`] (or rehydrated from
/// storage by [`Task::restore`]) and never changes afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Task {
    pub id: TaskId,
    owner_id: PrincipalId,
    pub title: String,
    pub description: Option<String>,
    pub is_completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Materialize a new task for `owner_id`.
    pub fn create(id: TaskId, owner_id: PrincipalId, draft: NewTask, now: DateTime<Utc>) -> Self {
        Self {
            id,
            owner_id,
            title: draft.title,
            description: draft.description,
            is_completed: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Rehydrate a task from a persisted row.
    pub fn restore(
        id: TaskId,
        owner_id: PrincipalId,
        title: String,
        description: Option<String>,
        is_completed: bool,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            owner_id,
            title,
            description,
            is_completed,
            created_at,
            updated_at,
        }
    }

    /// Apply a partial update. Absent fields are left untouched.
    pub fn apply(&mut self, patch: &TaskPatch, now: DateTime<Utc>) {
        if let Some(title) = &patch.title {
            self.title = title.clone();
        }
        if let Some(description) = &patch.description {
            self.description = Some(description.clone());
        }
        if let Some(done) = patch.is_completed {
            self.is_completed = done;
        }
        self.updated_at = now;
    }
}

impl OwnedResource for Task {
    type Id = TaskId;

    fn id(&self) -> &TaskId {
        &self.id
    }

    fn owner_id(&self) -> PrincipalId {
        self.owner_id
    }
}

/// Validated input for task creation.
///
/// There is deliberately no owner field here: ownership comes from the
/// authorized context, never from the request body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    title: String,
    description: Option<String>,
}

impl NewTask {
    pub fn new(title: &str, description: Option<&str>) -> DomainResult<Self> {
        Ok(Self {
            title: validate_title(title)?,
            description: description.map(validate_description).transpose()?,
        })
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

/// Validated partial update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    title: Option<String>,
    description: Option<String>,
    is_completed: Option<bool>,
}

impl TaskPatch {
    pub fn new(
        title: Option<&str>,
        description: Option<&str>,
        is_completed: Option<bool>,
    ) -> DomainResult<Self> {
        Ok(Self {
            title: title.map(validate_title).transpose()?,
            description: description.map(validate_description).transpose()?,
            is_completed,
        })
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn is_completed(&self) -> Option<bool> {
        self.is_completed
    }
}

fn validate_title(raw: &str) -> DomainResult<String> {
    let title = sanitize_text(raw);
    let len = title.chars().count();
    if len == 0 {
        return Err(DomainError::validation("title must not be empty"));
    }
    if len > TITLE_MAX_CHARS {
        return Err(DomainError::validation(format!(
            "title must be at most {TITLE_MAX_CHARS} characters"
        )));
    }
    Ok(title)
}

fn validate_description(raw: &str) -> DomainResult<String> {
    let description = sanitize_text(raw);
    if description.chars().count() > DESCRIPTION_MAX_CHARS {
        return Err(DomainError::validation(format!(
            "description must be at most {DESCRIPTION_MAX_CHARS} characters"
        )));
    }
    Ok(description)
}
