use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use taskgate_auth::{IssuedCredential, Principal, UserAccount};
use taskgate_core::{OwnedResource, PrincipalId, Task, TaskId};

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    pub email: String,
    pub password: String,
}

/// Unknown fields (including any client-supplied owner) are ignored.
#[derive(Debug, Deserialize)]
pub struct CreateTaskRequest {
    pub title: String,
    pub description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateTaskRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub is_completed: Option<bool>,
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: PrincipalId,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl From<&UserAccount> for UserResponse {
    fn from(account: &UserAccount) -> Self {
        Self {
            id: account.id,
            email: account.email.clone(),
            created_at: account.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_at: DateTime<Utc>,
    pub user: UserResponse,
}

impl TokenResponse {
    pub fn new(issued: IssuedCredential, account: &UserAccount) -> Self {
        Self {
            access_token: issued.token,
            token_type: "bearer",
            expires_at: issued.credential.expires_at,
            user: account.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct WhoAmIResponse {
    pub principal_id: PrincipalId,
    pub email: String,
}

impl From<Principal> for WhoAmIResponse {
    fn from(principal: Principal) -> Self {
        Self {
            principal_id: principal.id,
            email: principal.email,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TaskResponse {
    pub id: TaskId,
    pub user_id: PrincipalId,
    pub title: String,
    pub description: Option<String>,
    pub is_completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Task> for TaskResponse {
    fn from(task: Task) -> Self {
        Self {
            id: task.id,
            user_id: task.owner_id(),
            title: task.title,
            description: task.description,
            is_completed: task.is_completed,
            created_at: task.created_at,
            updated_at: task.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TaskListResponse {
    pub tasks: Vec<TaskResponse>,
    pub total: usize,
}

impl From<Vec<Task>> for TaskListResponse {
    fn from(tasks: Vec<Task>) -> Self {
        let tasks: Vec<TaskResponse> = tasks.into_iter().map(Into::into).collect();
        Self {
            total: tasks.len(),
            tasks,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
    pub message: &'static str,
    pub version: &'static str,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}
