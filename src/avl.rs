use std::cmp::Ordering;
use std::fmt::Debug;

use crate::debugln;

/// Stable handle to a node in the tree's arena.
///
/// Handles stay valid until their node is removed, even across rotations and
/// removals of other nodes. This is what lets pending circle events keep a
/// back-reference to the beach-line arc they would delete.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

impl Debug for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "n{}", self.0)
    }
}

struct Node<T> {
    /// `None` only while the slot sits on the free list.
    value: Option<T>,
    parent: Option<NodeId>,
    left: Option<NodeId>,
    right: Option<NodeId>,
    /// In-order predecessor, maintained as a doubly linked list.
    prev: Option<NodeId>,
    /// In-order successor.
    next: Option<NodeId>,
    /// Height of the subtree rooted here. A leaf has level 1.
    level: u32,
    /// Number of nodes in the subtree rooted here, including this one.
    len: u32,
    /// `level(right) - level(left)`, kept in {-1, 0, 1} by rebalancing.
    factor: i8,
}

impl<T> Node<T> {
    fn new(value: T) -> Self {
        Node {
            value: Some(value),
            parent: None,
            left: None,
            right: None,
            prev: None,
            next: None,
            level: 1,
            len: 1,
            factor: 0,
        }
    }
}

/// A self-balancing binary search tree with subtree-size bookkeeping, backed by
/// an arena of index-addressed nodes.
///
/// The tree does not store a comparator: ordering is a capability of each call,
/// passed as a closure, so the same structure serves both the event schedule
/// (ordered by event key) and the beach line (ordered by the current sweep
/// position, which changes between calls). Equal keys descend to the left.
pub struct AvlTree<T> {
    nodes: Vec<Node<T>>,
    free: Vec<NodeId>,
    root: Option<NodeId>,
    len: usize,
}

impl<T> AvlTree<T> {
    pub fn new() -> Self {
        AvlTree {
            nodes: Vec::new(),
            free: Vec::new(),
            root: None,
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    /// Whether this handle refers to a node still in the tree. A removed
    /// node's slot may later be reused for a different value.
    pub fn is_live(&self, id: NodeId) -> bool {
        self.nodes
            .get(id.0 as usize)
            .is_some_and(|node| node.value.is_some())
    }

    pub fn value(&self, id: NodeId) -> &T {
        self.nodes[id.0 as usize].value.as_ref().expect("freed node")
    }

    pub fn value_mut(&mut self, id: NodeId) -> &mut T {
        self.nodes[id.0 as usize].value.as_mut().expect("freed node")
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    pub fn prev(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).prev
    }

    pub fn next(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).next
    }

    /// Leftmost node, the minimum.
    pub fn first(&self) -> Option<NodeId> {
        self.root.map(|r| self.subtree_min(r))
    }

    /// Rightmost node, the maximum.
    pub fn last(&self) -> Option<NodeId> {
        self.root.map(|r| self.subtree_max(r))
    }

    /// In-order traversal over the neighbor links.
    pub fn iter(&self) -> impl Iterator<Item = NodeId> + '_ {
        let mut cur = self.first();
        std::iter::from_fn(move || {
            let id = cur?;
            cur = self.next(id);
            Some(id)
        })
    }

    /// The `n`-th node in order, found through the subtree sizes.
    pub fn select(&self, mut n: usize) -> Option<NodeId> {
        if n >= self.len {
            return None;
        }
        let mut cur = self.root?;
        loop {
            let left_len = self.node(cur).left.map_or(0, |l| self.node(l).len as usize);
            match n.cmp(&left_len) {
                Ordering::Less => cur = self.node(cur).left?,
                Ordering::Equal => return Some(cur),
                Ordering::Greater => {
                    n -= left_len + 1;
                    cur = self.node(cur).right?;
                }
            }
        }
    }

    /// Insert ordered by `cmp`, where `cmp(new, stored)` places `new` relative
    /// to an already stored value. Equal values descend to the left.
    pub fn insert(&mut self, value: T, cmp: impl Fn(&T, &T) -> Ordering) -> NodeId {
        let Some(mut cur) = self.root else {
            let id = self.alloc(Node::new(value));
            self.root = Some(id);
            self.len = 1;
            return id;
        };

        let left_side = loop {
            let go_left = cmp(&value, self.value(cur)) != Ordering::Greater;
            let child = if go_left {
                self.node(cur).left
            } else {
                self.node(cur).right
            };
            match child {
                Some(c) => cur = c,
                None => break go_left,
            }
        };

        let id = self.alloc(Node::new(value));
        self.attach(id, cur, left_side);
        self.rebalance_upto(cur, None);
        id
    }

    /// Insert `value` as the in-order predecessor of `at`, without a root-to-leaf
    /// search. Rebalances only below `at`; the caller is expected to finish its
    /// edits and then call [`AvlTree::rebalance_to_root`].
    pub fn insert_before(&mut self, at: NodeId, value: T) -> NodeId {
        let id = self.alloc(Node::new(value));
        match self.node(at).left {
            None => self.attach(id, at, true),
            Some(l) => {
                let p = self.subtree_max(l);
                self.attach(id, p, false);
                self.rebalance_upto(p, Some(at));
            }
        }
        id
    }

    /// Insert `value` as the in-order successor of `at`. See [`AvlTree::insert_before`].
    pub fn insert_after(&mut self, at: NodeId, value: T) -> NodeId {
        let id = self.alloc(Node::new(value));
        match self.node(at).right {
            None => self.attach(id, at, false),
            Some(r) => {
                let p = self.subtree_min(r);
                self.attach(id, p, true);
                self.rebalance_upto(p, Some(at));
            }
        }
        id
    }

    /// Search with a three-way probe: `cmp(stored)` tells where the target lies
    /// relative to a stored value (`Less` means "to the left of it").
    pub fn search(&self, cmp: impl Fn(&T) -> Ordering) -> Option<NodeId> {
        let mut cur = self.root;
        while let Some(id) = cur {
            match cmp(self.value(id)) {
                Ordering::Equal => return Some(id),
                Ordering::Less => cur = self.node(id).left,
                Ordering::Greater => cur = self.node(id).right,
            }
        }
        None
    }

    /// Remove the minimum node and return its value.
    pub fn remove_min(&mut self) -> Option<T> {
        let id = self.first()?;
        Some(self.remove_node(id))
    }

    /// Physically detach a node, keeping every other `NodeId` valid.
    ///
    /// A node with two children is replaced in place by its in-order
    /// predecessor, by relinking rather than by moving values, so
    /// back-references held elsewhere never dangle.
    pub fn remove_node(&mut self, id: NodeId) -> T {
        debugln!("avl: removing {:?}", id);
        let parent = self.node(id).parent;
        let (l, r) = (self.node(id).left, self.node(id).right);

        let rebalance_from = match (l, r) {
            (None, None) => {
                self.replace_child(parent, id, None);
                parent
            }
            (Some(c), None) | (None, Some(c)) => {
                self.node_mut(c).parent = parent;
                self.replace_child(parent, id, Some(c));
                parent
            }
            (Some(l), Some(r)) => {
                let pred = self.subtree_max(l);
                if pred == l {
                    // The left child steps into `id`'s place, keeping its own
                    // left subtree.
                    self.node_mut(l).right = Some(r);
                    self.node_mut(r).parent = Some(l);
                    self.node_mut(l).parent = parent;
                    self.replace_child(parent, id, Some(l));
                    Some(l)
                } else {
                    let pp = self.node(pred).parent.expect("predecessor below left child");
                    let pred_left = self.node(pred).left;
                    self.node_mut(pp).right = pred_left;
                    if let Some(pl) = pred_left {
                        self.node_mut(pl).parent = Some(pp);
                    }
                    self.node_mut(pred).left = Some(l);
                    self.node_mut(l).parent = Some(pred);
                    self.node_mut(pred).right = Some(r);
                    self.node_mut(r).parent = Some(pred);
                    self.node_mut(pred).parent = parent;
                    self.replace_child(parent, id, Some(pred));
                    Some(pp)
                }
            }
        };

        // splice out of the neighbor list
        let (pv, nx) = (self.node(id).prev, self.node(id).next);
        if let Some(pv) = pv {
            self.node_mut(pv).next = nx;
        }
        if let Some(nx) = nx {
            self.node_mut(nx).prev = pv;
        }

        if let Some(from) = rebalance_from {
            self.rebalance_upto(from, None);
        }

        self.len -= 1;
        let value = self.node_mut(id).value.take().expect("freed node");
        self.free.push(id);
        value
    }

    /// Rebalance from `from` all the way to the root, refreshing levels, factors
    /// and subtree sizes along the way.
    pub fn rebalance_to_root(&mut self, from: NodeId) {
        self.rebalance_upto(from, None);
    }

    fn node(&self, id: NodeId) -> &Node<T> {
        &self.nodes[id.0 as usize]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node<T> {
        &mut self.nodes[id.0 as usize]
    }

    fn alloc(&mut self, node: Node<T>) -> NodeId {
        match self.free.pop() {
            Some(id) => {
                self.nodes[id.0 as usize] = node;
                id
            }
            None => {
                self.nodes.push(node);
                NodeId(self.nodes.len() as u32 - 1)
            }
        }
    }

    /// Attach a fresh leaf under `parent` on the given side and thread it into
    /// the neighbor list.
    fn attach(&mut self, id: NodeId, parent: NodeId, left_side: bool) {
        self.node_mut(id).parent = Some(parent);
        if left_side {
            debug_assert!(self.node(parent).left.is_none());
            self.node_mut(parent).left = Some(id);
            let pv = self.node(parent).prev;
            self.node_mut(id).prev = pv;
            self.node_mut(id).next = Some(parent);
            if let Some(pv) = pv {
                self.node_mut(pv).next = Some(id);
            }
            self.node_mut(parent).prev = Some(id);
        } else {
            debug_assert!(self.node(parent).right.is_none());
            self.node_mut(parent).right = Some(id);
            let nx = self.node(parent).next;
            self.node_mut(id).next = nx;
            self.node_mut(id).prev = Some(parent);
            if let Some(nx) = nx {
                self.node_mut(nx).prev = Some(id);
            }
            self.node_mut(parent).next = Some(id);
        }
        self.len += 1;
    }

    fn replace_child(&mut self, parent: Option<NodeId>, old: NodeId, new: Option<NodeId>) {
        match parent {
            None => self.root = new,
            Some(p) => {
                if self.node(p).left == Some(old) {
                    self.node_mut(p).left = new;
                } else {
                    debug_assert_eq!(self.node(p).right, Some(old));
                    self.node_mut(p).right = new;
                }
            }
        }
    }

    fn subtree_min(&self, mut id: NodeId) -> NodeId {
        while let Some(l) = self.node(id).left {
            id = l;
        }
        id
    }

    fn subtree_max(&self, mut id: NodeId) -> NodeId {
        while let Some(r) = self.node(id).right {
            id = r;
        }
        id
    }

    fn level_of(&self, id: Option<NodeId>) -> u32 {
        id.map_or(0, |id| self.node(id).level)
    }

    fn len_of(&self, id: Option<NodeId>) -> u32 {
        id.map_or(0, |id| self.node(id).len)
    }

    /// Refresh level, factor and subtree size from the children.
    fn update(&mut self, id: NodeId) {
        let (l, r) = (self.node(id).left, self.node(id).right);
        let (ll, rl) = (self.level_of(l), self.level_of(r));
        let len = self.len_of(l) + self.len_of(r) + 1;
        let node = self.node_mut(id);
        node.level = ll.max(rl) + 1;
        node.factor = (rl as i64 - ll as i64) as i8;
        node.len = len;
    }

    fn rotate_left(&mut self, id: NodeId) {
        let r = self.node(id).right.expect("rotate_left without right child");
        let rl = self.node(r).left;
        self.node_mut(id).right = rl;
        if let Some(rl) = rl {
            self.node_mut(rl).parent = Some(id);
        }
        let parent = self.node(id).parent;
        self.node_mut(r).parent = parent;
        self.replace_child(parent, id, Some(r));
        self.node_mut(id).parent = Some(r);
        self.node_mut(r).left = Some(id);
        self.update(id);
        self.update(r);
    }

    fn rotate_right(&mut self, id: NodeId) {
        let l = self.node(id).left.expect("rotate_right without left child");
        let lr = self.node(l).right;
        self.node_mut(id).left = lr;
        if let Some(lr) = lr {
            self.node_mut(lr).parent = Some(id);
        }
        let parent = self.node(id).parent;
        self.node_mut(l).parent = parent;
        self.replace_child(parent, id, Some(l));
        self.node_mut(id).parent = Some(l);
        self.node_mut(l).right = Some(id);
        self.update(id);
        self.update(l);
    }

    /// Restore the balance factor of one node. Returns the root of the
    /// rebalanced subtree (the node's parent after a rotation).
    fn rebalance_node(&mut self, id: NodeId) -> NodeId {
        self.update(id);
        let factor = self.node(id).factor;
        if factor.abs() <= 1 {
            return id;
        }
        if factor > 0 {
            let child = self.node(id).right.expect("right-heavy without right child");
            if self.node(child).factor < 0 {
                self.rotate_right(child);
            }
            self.rotate_left(id);
        } else {
            let child = self.node(id).left.expect("left-heavy without left child");
            if self.node(child).factor > 0 {
                self.rotate_left(child);
            }
            self.rotate_right(id);
        }
        self.node(id).parent.expect("rotation leaves a parent")
    }

    /// Walk from `from` toward the root, rebalancing, stopping at `stop`
    /// (exclusive). `stop` must be an ancestor of `from`, or `None` for the
    /// root.
    fn rebalance_upto(&mut self, from: NodeId, stop: Option<NodeId>) {
        let mut cur = Some(from);
        while let Some(id) = cur {
            if stop == Some(id) {
                break;
            }
            let top = self.rebalance_node(id);
            cur = self.node(top).parent;
        }
    }
}

impl<T: Debug> Debug for AvlTree<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.iter().map(|id| self.value(id))).finish()
    }
}

#[cfg(test)]
mod test;
