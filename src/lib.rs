//! Assign time estimates to the leaves of a hierarchical task tree.
//!
//! Authors give some nodes a total `time` budget. Leaves without their own time
//! share what is left of their nearest budgeted ancestor; see [`domain::assigner`].

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod tree_traits;
pub mod util;

pub use domain::{assign, AssignReport, Node};
