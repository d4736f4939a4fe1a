//! In-memory stores for tests/dev.
//!
//! Each owner-scoped operation runs under a single lock acquisition, so the
//! owner predicate and the read/write are one step.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;

use taskgate_auth::{PrincipalStore, ResourceStore, StoreError, UserAccount};
use taskgate_core::{NewTask, OwnedResource, PrincipalId, Task, TaskId, TaskPatch};

use super::AccountStore;

fn poisoned() -> StoreError {
    StoreError::Unavailable("in-memory store lock poisoned".to_string())
}

#[derive(Debug, Default)]
pub struct InMemoryAccountStore {
    inner: RwLock<HashMap<PrincipalId, UserAccount>>,
}

impl InMemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delete an account (outstanding tokens stop resolving).
    pub fn remove(&self, id: PrincipalId) -> Option<UserAccount> {
        self.inner.write().ok()?.remove(&id)
    }
}

#[async_trait]
impl PrincipalStore for InMemoryAccountStore {
    async fn get_by_id(&self, id: PrincipalId) -> Result<Option<UserAccount>, StoreError> {
        let map = self.inner.read().map_err(|_| poisoned())?;
        Ok(map.get(&id).cloned())
    }
}

#[async_trait]
impl AccountStore for InMemoryAccountStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserAccount>, StoreError> {
        let map = self.inner.read().map_err(|_| poisoned())?;
        Ok(map.values().find(|a| a.email == email).cloned())
    }

    async fn insert(&self, account: UserAccount) -> Result<UserAccount, StoreError> {
        let mut map = self.inner.write().map_err(|_| poisoned())?;
        if map.values().any(|a| a.email == account.email) {
            return Err(StoreError::Conflict("email already registered".to_string()));
        }
        if map.contains_key(&account.id) {
            return Err(StoreError::Conflict("account id already exists".to_string()));
        }
        map.insert(account.id, account.clone());
        Ok(account)
    }
}

#[derive(Debug, Default)]
pub struct InMemoryTaskStore {
    inner: RwLock<HashMap<TaskId, Task>>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ResourceStore for InMemoryTaskStore {
    type Resource = Task;
    type Draft = NewTask;
    type Patch = TaskPatch;

    async fn get_by_id(&self, id: &TaskId) -> Result<Option<Task>, StoreError> {
        let map = self.inner.read().map_err(|_| poisoned())?;
        Ok(map.get(id).cloned())
    }

    async fn list_by_owner(&self, owner: PrincipalId) -> Result<Vec<Task>, StoreError> {
        let map = self.inner.read().map_err(|_| poisoned())?;
        let mut tasks: Vec<Task> = map
            .values()
            .filter(|t| t.is_owned_by(owner))
            .cloned()
            .collect();
        // Newest first; UUIDv7 ids break ties in creation order.
        tasks.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.as_uuid().cmp(a.id.as_uuid()))
        });
        Ok(tasks)
    }

    async fn create_with_owner(&self, owner: PrincipalId, draft: NewTask) -> Result<Task, StoreError> {
        let task = Task::create(TaskId::new(), owner, draft, Utc::now());
        let mut map = self.inner.write().map_err(|_| poisoned())?;
        map.insert(task.id, task.clone());
        Ok(task)
    }

    async fn update_if_owner(
        &self,
        id: &TaskId,
        owner: PrincipalId,
        patch: TaskPatch,
    ) -> Result<Option<Task>, StoreError> {
        let mut map = self.inner.write().map_err(|_| poisoned())?;
        match map.get_mut(id) {
            Some(task) if task.is_owned_by(owner) => {
                task.apply(&patch, Utc::now());
                Ok(Some(task.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn delete_if_owner(&self, id: &TaskId, owner: PrincipalId) -> Result<bool, StoreError> {
        let mut map = self.inner.write().map_err(|_| poisoned())?;
        match map.get(id) {
            Some(task) if task.is_owned_by(owner) => {
                map.remove(id);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(title: &str) -> NewTask {
        NewTask::new(title, None).unwrap()
    }

    #[tokio::test]
    async fn list_by_owner_excludes_foreign_tasks_and_orders_newest_first() {
        let store = InMemoryTaskStore::new();
        let alice = PrincipalId::new();
        let bob = PrincipalId::new();

        let first = store.create_with_owner(alice, draft("first")).await.unwrap();
        let second = store.create_with_owner(alice, draft("second")).await.unwrap();
        store.create_with_owner(bob, draft("bob's")).await.unwrap();

        let listed = store.list_by_owner(alice).await.unwrap();
        let ids: Vec<_> = listed.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);
    }

    #[tokio::test]
    async fn owner_predicate_guards_mutations() {
        let store = InMemoryTaskStore::new();
        let alice = PrincipalId::new();
        let bob = PrincipalId::new();
        let task = store.create_with_owner(alice, draft("mine")).await.unwrap();

        let patch = TaskPatch::new(Some("hijacked"), None, None).unwrap();
        assert_eq!(store.update_if_owner(&task.id, bob, patch).await.unwrap(), None);
        assert!(!store.delete_if_owner(&task.id, bob).await.unwrap());

        let unchanged = store.get_by_id(&task.id).await.unwrap().unwrap();
        assert_eq!(unchanged.title, "mine");

        assert!(store.delete_if_owner(&task.id, alice).await.unwrap());
        assert_eq!(store.get_by_id(&task.id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn duplicate_email_is_conflict() {
        let store = InMemoryAccountStore::new();
        let now = Utc::now();
        store
            .insert(UserAccount::register("dana@example.com", "password-1", now).unwrap())
            .await
            .unwrap();

        let dup = UserAccount::register("DANA@example.com", "password-2", now).unwrap();
        assert!(matches!(store.insert(dup).await, Err(StoreError::Conflict(_))));
    }
}
