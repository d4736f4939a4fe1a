//! `taskgate-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod entity;
pub mod error;
pub mod id;
pub mod task;
pub mod text;

pub use entity::OwnedResource;
pub use error::{DomainError, DomainResult};
pub use id::{PrincipalId, TaskId};
pub use task::{NewTask, Task, TaskPatch};
