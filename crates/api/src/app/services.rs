use std::sync::Arc;

use chrono::Duration;

use taskgate_auth::{
    AuditLog, AuthorizationPipeline, PrincipalResolver, ResourceStore, StoreError, TokenCodec,
};
use taskgate_core::{NewTask, Task, TaskPatch};
use taskgate_infra::store::{self, postgres};
use taskgate_infra::{AccountStore, DynTaskStore};

use crate::config::ApiConfig;

/// Everything request handlers need, shared behind an `Arc`.
pub struct AppServices {
    pub codec: Arc<TokenCodec>,
    pub accounts: Arc<dyn AccountStore>,
    pub tasks: AuthorizationPipeline<DynTaskStore>,
    pub token_ttl: Duration,
}

/// Wire stores, codec and pipeline.
///
/// Uses Postgres when `database_url` is configured (creating the schema if
/// needed), in-memory stores otherwise.
pub async fn build_services(
    config: &ApiConfig,
    audit: Arc<dyn AuditLog>,
) -> Result<AppServices, StoreError> {
    match &config.database_url {
        Some(url) => {
            let pool = postgres::connect(url).await?;
            postgres::migrate(&pool).await?;
            tracing::info!("using postgres stores");
            Ok(wire(
                config,
                audit,
                Arc::new(store::PostgresAccountStore::new(pool.clone())),
                Arc::new(store::PostgresTaskStore::new(pool)),
            ))
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using in-memory stores");
            Ok(wire(
                config,
                audit,
                Arc::new(store::InMemoryAccountStore::new()),
                Arc::new(store::InMemoryTaskStore::new()),
            ))
        }
    }
}

fn wire<A, T>(config: &ApiConfig, audit: Arc<dyn AuditLog>, accounts: Arc<A>, tasks: Arc<T>) -> AppServices
where
    A: AccountStore + 'static,
    T: ResourceStore<Resource = Task, Draft = NewTask, Patch = TaskPatch> + 'static,
{
    let codec = Arc::new(TokenCodec::new(config.keyring.clone()));
    let tasks: Arc<DynTaskStore> = tasks;
    let pipeline = AuthorizationPipeline::new(
        codec.clone(),
        PrincipalResolver::new(accounts.clone()),
        tasks,
        audit,
    );

    AppServices {
        codec,
        accounts,
        tasks: pipeline,
        token_ttl: config.token_ttl,
    }
}
