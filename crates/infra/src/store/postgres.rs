//! Postgres-backed account and task stores.
//!
//! Every task query that addresses a single row by id for mutation also
//! constrains `user_id`, so the owner predicate and the write are one
//! statement.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError |
//! |------------|----------------------|------------|
//! | Database (unique violation) | `23505` | `Conflict` |
//! | PoolTimedOut / PoolClosed / Io | N/A | `Unavailable` |
//! | Anything else | Any | `Backend` |

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SubsecRound, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use tracing::instrument;

use taskgate_auth::{PrincipalStore, ResourceStore, StoreError, UserAccount};
use taskgate_core::{NewTask, PrincipalId, Task, TaskId, TaskPatch};

use super::AccountStore;

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id UUID PRIMARY KEY,
        email VARCHAR(255) NOT NULL UNIQUE,
        hashed_password TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL,
        updated_at TIMESTAMPTZ NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS tasks (
        id UUID PRIMARY KEY,
        user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        title VARCHAR(255) NOT NULL,
        description VARCHAR(1000),
        is_completed BOOLEAN NOT NULL DEFAULT FALSE,
        created_at TIMESTAMPTZ NOT NULL,
        updated_at TIMESTAMPTZ NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS tasks_user_id_created_at_idx ON tasks (user_id, created_at DESC)",
];

/// Open a connection pool.
pub async fn connect(database_url: &str) -> Result<PgPool, StoreError> {
    PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_url)
        .await
        .map_err(|e| map_sqlx_error("connect", e))
}

/// Create the tables if they do not exist yet.
pub async fn migrate(pool: &PgPool) -> Result<(), StoreError> {
    for statement in SCHEMA {
        sqlx::query(statement)
            .execute(pool)
            .await
            .map_err(|e| map_sqlx_error("migrate", e))?;
    }
    Ok(())
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    if is_unique_violation(&err) {
        return StoreError::Conflict(format!("unique constraint violated in {operation}"));
    }
    match err {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            StoreError::Unavailable(format!("database unavailable in {operation}: {err}"))
        }
        other => StoreError::Backend(format!("sqlx error in {operation}: {other}")),
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db_err) = err {
        if let Some(code) = db_err.code() {
            return code.as_ref() == "23505";
        }
    }
    false
}

fn account_from_row(row: &PgRow) -> Result<UserAccount, sqlx::Error> {
    Ok(UserAccount {
        id: PrincipalId::from_uuid(row.try_get("id")?),
        email: row.try_get("email")?,
        password_hash: row.try_get("hashed_password")?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
        updated_at: row.try_get::<DateTime<Utc>, _>("updated_at")?,
    })
}

fn task_from_row(row: &PgRow) -> Result<Task, sqlx::Error> {
    Ok(Task::restore(
        TaskId::from_uuid(row.try_get("id")?),
        PrincipalId::from_uuid(row.try_get("user_id")?),
        row.try_get("title")?,
        row.try_get("description")?,
        row.try_get("is_completed")?,
        row.try_get("created_at")?,
        row.try_get("updated_at")?,
    ))
}

/// `timestamptz` stores microseconds; values handed back to callers must match
/// what a later read returns.
fn column_precision(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.trunc_subsecs(6)
}

const TASK_COLUMNS: &str = "id, user_id, title, description, is_completed, created_at, updated_at";

#[derive(Clone)]
pub struct PostgresAccountStore {
    pool: Arc<PgPool>,
}

impl PostgresAccountStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }
}

#[async_trait]
impl PrincipalStore for PostgresAccountStore {
    #[instrument(skip(self), fields(principal_id = %id))]
    async fn get_by_id(&self, id: PrincipalId) -> Result<Option<UserAccount>, StoreError> {
        let row = sqlx::query(
            "SELECT id, email, hashed_password, created_at, updated_at FROM users WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_user", e))?;

        row.as_ref()
            .map(account_from_row)
            .transpose()
            .map_err(|e| map_sqlx_error("decode_user", e))
    }
}

#[async_trait]
impl AccountStore for PostgresAccountStore {
    #[instrument(skip(self, email))]
    async fn find_by_email(&self, email: &str) -> Result<Option<UserAccount>, StoreError> {
        let row = sqlx::query(
            "SELECT id, email, hashed_password, created_at, updated_at FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_user_by_email", e))?;

        row.as_ref()
            .map(account_from_row)
            .transpose()
            .map_err(|e| map_sqlx_error("decode_user", e))
    }

    #[instrument(skip(self, account), fields(principal_id = %account.id))]
    async fn insert(&self, account: UserAccount) -> Result<UserAccount, StoreError> {
        let row = sqlx::query(
            r#"
            INSERT INTO users (id, email, hashed_password, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, email, hashed_password, created_at, updated_at
            "#,
        )
        .bind(account.id.as_uuid())
        .bind(&account.email)
        .bind(&account.password_hash)
        .bind(column_precision(account.created_at))
        .bind(column_precision(account.updated_at))
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_user", e))?;

        account_from_row(&row).map_err(|e| map_sqlx_error("decode_user", e))
    }
}

#[derive(Clone)]
pub struct PostgresTaskStore {
    pool: Arc<PgPool>,
}

impl PostgresTaskStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }
}

#[async_trait]
impl ResourceStore for PostgresTaskStore {
    type Resource = Task;
    type Draft = NewTask;
    type Patch = TaskPatch;

    #[instrument(skip(self), fields(task_id = %id))]
    async fn get_by_id(&self, id: &TaskId) -> Result<Option<Task>, StoreError> {
        let row = sqlx::query(&format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_task", e))?;

        row.as_ref()
            .map(task_from_row)
            .transpose()
            .map_err(|e| map_sqlx_error("decode_task", e))
    }

    #[instrument(skip(self), fields(principal_id = %owner))]
    async fn list_by_owner(&self, owner: PrincipalId) -> Result<Vec<Task>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE user_id = $1 ORDER BY created_at DESC, id DESC"
        ))
        .bind(owner.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_tasks", e))?;

        rows.iter()
            .map(task_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| map_sqlx_error("decode_task", e))
    }

    #[instrument(skip(self, draft), fields(principal_id = %owner))]
    async fn create_with_owner(&self, owner: PrincipalId, draft: NewTask) -> Result<Task, StoreError> {
        let task = Task::create(TaskId::new(), owner, draft, column_precision(Utc::now()));

        let row = sqlx::query(&format!(
            r#"
            INSERT INTO tasks (id, user_id, title, description, is_completed, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {TASK_COLUMNS}
            "#
        ))
        .bind(task.id.as_uuid())
        .bind(owner.as_uuid())
        .bind(&task.title)
        .bind(task.description.as_deref())
        .bind(task.is_completed)
        .bind(task.created_at)
        .bind(task.updated_at)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_task", e))?;

        task_from_row(&row).map_err(|e| map_sqlx_error("decode_task", e))
    }

    #[instrument(skip(self, patch), fields(task_id = %id, principal_id = %owner))]
    async fn update_if_owner(
        &self,
        id: &TaskId,
        owner: PrincipalId,
        patch: TaskPatch,
    ) -> Result<Option<Task>, StoreError> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE tasks SET
                title = COALESCE($3, title),
                description = COALESCE($4, description),
                is_completed = COALESCE($5, is_completed),
                updated_at = $6
            WHERE id = $1 AND user_id = $2
            RETURNING {TASK_COLUMNS}
            "#
        ))
        .bind(id.as_uuid())
        .bind(owner.as_uuid())
        .bind(patch.title())
        .bind(patch.description())
        .bind(patch.is_completed())
        .bind(column_precision(Utc::now()))
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_task", e))?;

        row.as_ref()
            .map(task_from_row)
            .transpose()
            .map_err(|e| map_sqlx_error("decode_task", e))
    }

    #[instrument(skip(self), fields(task_id = %id, principal_id = %owner))]
    async fn delete_if_owner(&self, id: &TaskId, owner: PrincipalId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1 AND user_id = $2")
            .bind(id.as_uuid())
            .bind(owner.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_task", e))?;

        Ok(result.rows_affected() > 0)
    }
}
