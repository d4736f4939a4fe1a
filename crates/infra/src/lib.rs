//! Infrastructure layer: account and task storage (in-memory and Postgres).

pub mod store;


pub use store::{
    AccountStore, DynTaskStore, InMemoryAccountStore, InMemoryTaskStore, PostgresAccountStore,
    PostgresTaskStore,
};
