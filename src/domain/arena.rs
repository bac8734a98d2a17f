use std::collections::{HashMap, VecDeque};
use std::fmt;

use generational_arena::{Arena, Index};
use tracing::instrument;

use crate::domain::node::Node;

/// Tree node in the arena-based task hierarchy.
#[derive(Debug)]
pub struct TaskNode {
    /// The document node with its children detached
    pub data: Node,
    /// Index of parent node in the arena, None for the root
    pub parent: Option<Index>,
    /// Indices of child nodes in the arena, in document order
    pub children: Vec<Index>,
}

impl TaskNode {
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

impl fmt::Display for TaskNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = self.data.label().unwrap_or("*");
        match self.data.estimated_time() {
            Some(minutes) => write!(f, "{} [{}]", label, minutes),
            None => write!(f, "{}", label),
        }
    }
}

/// Arena-based task tree.
///
/// Parent links are plain indices, so the back-references needed for the upward
/// owner search carry no ownership. The arena lives for one assignment run.
#[derive(Debug)]
pub struct TaskArena {
    /// Arena storage for all tree nodes
    arena: Arena<TaskNode>,
    /// Index of the root node, None for empty trees
    root: Option<Index>,
}

impl Default for TaskArena {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskArena {
    pub fn new() -> Self {
        Self {
            arena: Arena::new(),
            root: None,
        }
    }

    /// Flatten an owned tree into the arena, linking every node to its parent.
    ///
    /// Breadth-first, so siblings are attached in document order.
    #[instrument(level = "debug", skip(root))]
    pub fn from_tree(root: Node) -> Self {
        let mut tree = Self::new();
        let mut queue = VecDeque::new();
        queue.push_back((root, None));

        while let Some((mut node, parent)) = queue.pop_front() {
            let children = std::mem::take(&mut node.children);
            let idx = tree.insert_node(node, parent);
            for child in children {
                queue.push_back((child, Some(idx)));
            }
        }
        tracing::trace!("linked {} nodes", tree.len());
        tree
    }

    /// Reassemble the owned tree, dropping all links.
    #[instrument(level = "debug", skip(self))]
    pub fn into_tree(mut self) -> Option<Node> {
        let order: Vec<Index> = self.iter_postorder().map(|(idx, _)| idx).collect();
        let mut built: HashMap<Index, Node> = HashMap::with_capacity(order.len());

        for idx in order {
            if let Some(TaskNode { mut data, children, .. }) = self.arena.remove(idx) {
                data.children = children
                    .iter()
                    .filter_map(|child| built.remove(child))
                    .collect();
                built.insert(idx, data);
            }
        }
        self.root.and_then(|root| built.remove(&root))
    }

    #[instrument(level = "trace", skip(self, data))]
    pub fn insert_node(&mut self, data: Node, parent: Option<Index>) -> Index {
        let node = TaskNode {
            data,
            parent,
            children: Vec::new(),
        };
        let node_idx = self.arena.insert(node);

        if let Some(parent_idx) = parent {
            if let Some(parent) = self.arena.get_mut(parent_idx) {
                parent.children.push(node_idx);
            }
        } else {
            self.root = Some(node_idx);
        }

        node_idx
    }

    pub fn get_node(&self, idx: Index) -> Option<&TaskNode> {
        self.arena.get(idx)
    }

    pub fn get_node_mut(&mut self, idx: Index) -> Option<&mut TaskNode> {
        self.arena.get_mut(idx)
    }

    pub fn root(&self) -> Option<Index> {
        self.root
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    /// Pre-order, left-to-right traversal.
    pub fn iter(&self) -> TreeIterator {
        TreeIterator::new(self)
    }

    pub fn iter_postorder(&self) -> PostOrderIterator {
        PostOrderIterator::new(self)
    }

    /// Indices in pre-order; the fixed visiting order of every pass.
    pub fn preorder(&self) -> Vec<Index> {
        self.iter().map(|(idx, _)| idx).collect()
    }

    /// Strict ancestors of `idx`, nearest first.
    pub fn ancestors(&self, idx: Index) -> Ancestors {
        Ancestors {
            arena: self,
            next: self.get_node(idx).and_then(|node| node.parent),
        }
    }

    #[instrument(level = "debug", skip(self))]
    pub fn depth(&self) -> usize {
        self.iter()
            .map(|(idx, _)| self.ancestors(idx).count() + 1)
            .max()
            .unwrap_or(0)
    }

    pub fn leaf_count(&self) -> usize {
        self.iter().filter(|(_, node)| node.is_leaf()).count()
    }
}

pub struct TreeIterator<'a> {
    arena: &'a TaskArena,
    stack: Vec<Index>,
}

impl<'a> TreeIterator<'a> {
    fn new(arena: &'a TaskArena) -> Self {
        let mut stack = Vec::new();
        if let Some(root) = arena.root() {
            stack.push(root);
        }
        Self { arena, stack }
    }
}

impl<'a> Iterator for TreeIterator<'a> {
    type Item = (Index, &'a TaskNode);

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(current_idx) = self.stack.pop() {
            if let Some(node) = self.arena.get_node(current_idx) {
                // Push children in reverse order for left-to-right traversal
                for &child in node.children.iter().rev() {
                    self.stack.push(child);
                }
                return Some((current_idx, node));
            }
        }
        None
    }
}

pub struct PostOrderIterator<'a> {
    arena: &'a TaskArena,
    stack: Vec<(Index, bool)>,
}

impl<'a> PostOrderIterator<'a> {
    fn new(arena: &'a TaskArena) -> Self {
        let mut stack = Vec::new();
        if let Some(root) = arena.root() {
            stack.push((root, false));
        }
        Self { arena, stack }
    }
}

impl<'a> Iterator for PostOrderIterator<'a> {
    type Item = (Index, &'a TaskNode);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((current_idx, visited)) = self.stack.pop() {
            if let Some(node) = self.arena.get_node(current_idx) {
                if !visited {
                    self.stack.push((current_idx, true));
                    for &child in node.children.iter().rev() {
                        self.stack.push((child, false));
                    }
                } else {
                    return Some((current_idx, node));
                }
            }
        }
        None
    }
}

pub struct Ancestors<'a> {
    arena: &'a TaskArena,
    next: Option<Index>,
}

impl<'a> Iterator for Ancestors<'a> {
    type Item = (Index, &'a TaskNode);

    fn next(&mut self) -> Option<Self::Item> {
        let idx = self.next?;
        let node = self.arena.get_node(idx)?;
        self.next = node.parent;
        Some((idx, node))
    }
}
