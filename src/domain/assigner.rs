//! Tree time assignment.
//!
//! Leaves without an explicit time share the budget of their nearest ancestor that has
//! one, after subtracting the time already claimed inside that ancestor's subtree.
//!
//! A run makes three pre-order passes over a [`TaskArena`]:
//!
//! 1. every non-leaf with a parseable `time` becomes a budget owner;
//! 2. every node walks up to its nearest owner and either joins the owner's affected
//!    leaves or adds its own time (explicit or defaulted) to the owner's exclusion total;
//! 3. owners split `max(0, time - exclusion)` across their affected leaves.
//!
//! Per-owner scratch state lives in a side-table keyed by arena index and is dropped
//! with the arena; the raw `time`/`default_time` inputs are stripped from every node.

use std::collections::HashMap;
use std::fmt;
use std::ops::AddAssign;

use generational_arena::Index;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, trace};

use crate::domain::arena::TaskArena;
use crate::domain::node::Node;

/// Which subtrees an assignment run covers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// One run over the whole document, root included
    #[default]
    Document,
    /// One independent run per top-level child; the root is left untouched
    Sheet,
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Document => write!(f, "document"),
            Scope::Sheet => write!(f, "sheet"),
        }
    }
}

/// Outcome counts of an assignment run. Leaf counters are disjoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AssignReport {
    /// Nodes visited
    pub nodes: usize,
    /// Nodes acting as budget owners
    pub owners: usize,
    /// Leaves that received a share of an owner's budget
    pub distributed: usize,
    /// Leaves estimated from their own `time`
    pub explicit: usize,
    /// Leaves estimated from an ancestor's `default_time`
    pub defaulted: usize,
    /// Cancelled leaves
    pub excluded: usize,
    /// Leaves left without an estimate
    pub unassigned: usize,
}

impl AddAssign for AssignReport {
    fn add_assign(&mut self, other: Self) {
        self.nodes += other.nodes;
        self.owners += other.owners;
        self.distributed += other.distributed;
        self.explicit += other.explicit;
        self.defaulted += other.defaulted;
        self.excluded += other.excluded;
        self.unassigned += other.unassigned;
    }
}

impl fmt::Display for AssignReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} nodes, {} owners: {} distributed, {} explicit, {} defaulted, {} excluded, {} unassigned",
            self.nodes,
            self.owners,
            self.distributed,
            self.explicit,
            self.defaulted,
            self.excluded,
            self.unassigned
        )
    }
}

/// Scratch state of one budget owner.
#[derive(Debug, Default)]
struct Budget {
    /// Leaves sharing the remainder, in traversal order
    affected: Vec<Index>,
    /// Time already claimed inside the owner's subtree
    exclusion: i64,
}

/// Split `adjusted` into `count` shares; the first `adjusted % count` shares get one
/// extra unit. Returns no shares when `count` is zero.
pub fn distribute(adjusted: i64, count: usize) -> Vec<i64> {
    if count == 0 {
        return Vec::new();
    }
    let divisor = count as i64;
    let base = adjusted / divisor;
    let remain = adjusted % divisor;
    (0..divisor)
        .map(|i| if i < remain { base + 1 } else { base })
        .collect()
}

/// Assign estimates to the leaves of `root` in place.
#[instrument(level = "debug", skip(root))]
pub fn assign(root: &mut Node) -> AssignReport {
    let mut arena = TaskArena::from_tree(std::mem::take(root));
    let report = run(&mut arena);
    if let Some(tree) = arena.into_tree() {
        *root = tree;
    }
    info!("{}", report);
    report
}

/// Assign with the given scope.
#[instrument(level = "debug", skip(root))]
pub fn assign_scoped(root: &mut Node, scope: Scope) -> AssignReport {
    match scope {
        Scope::Document => assign(root),
        Scope::Sheet => {
            let mut report = AssignReport::default();
            for sheet in root.children.iter_mut() {
                report += assign(sheet);
            }
            report
        }
    }
}

fn run(arena: &mut TaskArena) -> AssignReport {
    let order = arena.preorder();
    let mut report = AssignReport {
        nodes: order.len(),
        ..Default::default()
    };

    let mut budgets = init_budgets(arena, &order);
    report.owners = budgets.len();
    debug!("pass 1: {} budget owners", budgets.len());

    for &idx in &order {
        classify(arena, &mut budgets, idx, &mut report);
    }
    for &idx in &order {
        apply(arena, &mut budgets, idx, &mut report);
    }

    for &idx in &order {
        if let Some(task) = arena.get_node_mut(idx) {
            task.data.strip_run_fields();
        }
    }
    report
}

/// Pass 1: non-leaf nodes with a parseable time own a budget.
fn init_budgets(arena: &TaskArena, order: &[Index]) -> HashMap<Index, Budget> {
    order
        .iter()
        .filter_map(|&idx| arena.get_node(idx).map(|task| (idx, task)))
        .filter(|(_, task)| !task.is_leaf() && task.data.time().is_some())
        .map(|(idx, _)| (idx, Budget::default()))
        .collect()
}

/// Pass 2: attribute a node to its nearest budget owner.
fn classify(
    arena: &mut TaskArena,
    budgets: &mut HashMap<Index, Budget>,
    idx: Index,
    report: &mut AssignReport,
) {
    let Some(task) = arena.get_node(idx) else {
        return;
    };
    let leaf = task.is_leaf();
    if leaf && task.data.is_excluded() {
        trace!(?idx, "excluded leaf skipped");
        report.excluded += 1;
        return;
    }

    let mut time = task.data.time();
    let mut defaulted = None;
    let mut owner = None;
    for (ancestor_idx, ancestor) in arena.ancestors(idx) {
        if ancestor.data.time().is_some() {
            owner = Some(ancestor_idx);
            break;
        }
        if leaf && time.is_none() {
            if let Some(default_time) = ancestor.data.default_time() {
                defaulted = Some(default_time);
                time = Some(default_time);
            }
        }
    }

    if let Some(default_time) = defaulted {
        if let Some(task) = arena.get_node_mut(idx) {
            task.data.set_estimated_time(default_time);
        }
        report.defaulted += 1;
    }

    let budget = match owner {
        Some(owner) => budgets.get_mut(&owner),
        None => None,
    };
    match budget {
        Some(budget) => match time {
            Some(claimed) => budget.exclusion = budget.exclusion.saturating_add(claimed),
            None if leaf => budget.affected.push(idx),
            None => {}
        },
        None if leaf && time.is_none() => {
            trace!(?idx, "leaf has no budget owner");
            report.unassigned += 1;
        }
        None => {}
    }
}

/// Pass 3: write explicit leaf times and split owner budgets.
fn apply(
    arena: &mut TaskArena,
    budgets: &mut HashMap<Index, Budget>,
    idx: Index,
    report: &mut AssignReport,
) {
    let Some(task) = arena.get_node(idx) else {
        return;
    };
    let Some(time) = task.data.time() else {
        return;
    };

    if task.is_leaf() {
        if task.data.is_excluded() {
            return;
        }
        if let Some(task) = arena.get_node_mut(idx) {
            task.data.set_estimated_time(time);
        }
        report.explicit += 1;
        return;
    }

    let Some(budget) = budgets.remove(&idx) else {
        return;
    };
    let adjusted = time.saturating_sub(budget.exclusion).max(0);
    let shares = distribute(adjusted, budget.affected.len());
    debug!(
        ?idx,
        time,
        exclusion = budget.exclusion,
        adjusted,
        leaves = budget.affected.len(),
        "distributing budget"
    );
    for (leaf_idx, share) in budget.affected.into_iter().zip(shares) {
        if let Some(leaf) = arena.get_node_mut(leaf_idx) {
            leaf.data.set_estimated_time(share);
            report.distributed += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distribute_places_remainder_first() {
        assert_eq!(distribute(100, 3), vec![34, 33, 33]);
        assert_eq!(distribute(5, 3), vec![2, 2, 1]);
        assert_eq!(distribute(2, 4), vec![1, 1, 0, 0]);
    }

    #[test]
    fn distribute_without_recipients_is_empty() {
        assert!(distribute(10, 0).is_empty());
    }

    #[test]
    fn report_adds_up() {
        let mut total = AssignReport {
            nodes: 2,
            distributed: 1,
            ..Default::default()
        };
        total += AssignReport {
            nodes: 3,
            excluded: 1,
            ..Default::default()
        };
        assert_eq!(total.nodes, 5);
        assert_eq!(total.distributed, 1);
        assert_eq!(total.excluded, 1);
    }
}
