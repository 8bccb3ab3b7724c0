//! The task domain: entity model, validation contract, and the
//! ownership-scoped store (queries, mutations, statistics).

pub mod model;
pub mod store;
pub mod validate;

pub use model::{Task, TaskRow};
pub use store::{StatusCount, TaskListParams, TaskOverview, TaskStore};
pub use validate::TaskPayload;
