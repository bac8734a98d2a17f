//! Domain layer: task tree model and time assignment
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod arena;
pub mod assigner;
pub mod error;
pub mod node;

pub use arena::{TaskArena, TaskNode};
pub use assigner::{assign, assign_scoped, distribute, AssignReport, Scope};
pub use error::DomainError;
pub use node::{parse_number, Node};
