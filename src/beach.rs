use std::cmp::Ordering;

use crate::avl::{AvlTree, NodeId};
use crate::boundary::Boundary;
use crate::debugln;
use crate::schedule::EventKey;
use crate::{Point, Site, SiteIdx};

/// One arc of the beach line: a site together with the boundaries separating
/// it from its neighbor arcs. A missing boundary means the arc is unbounded on
/// that side, which only holds for the two end arcs.
#[derive(Clone, Copy, Debug)]
pub struct Region {
    pub site: SiteIdx,
    pub left: Option<Boundary>,
    pub right: Option<Boundary>,
    /// Key of the at-most-one pending circle event that would collapse this
    /// arc, kept for exact cancellation when the arc's boundaries change.
    pub event: Option<EventKey>,
}

impl Region {
    pub fn new(site: SiteIdx, left: Option<Boundary>, right: Option<Boundary>) -> Self {
        Region {
            site,
            left,
            right,
            event: None,
        }
    }

    /// Three-way placement of a query point against this arc at the query's
    /// sweep height: `Less` when the point lies left of the arc's left
    /// boundary, `Greater` when right of its right boundary, `Equal` when the
    /// arc contains it.
    fn side_of(&self, sites: &[Site], p: Point) -> Ordering {
        if let Some(left) = &self.left {
            if left.point_cmp(sites, p) < 0.0 {
                return Ordering::Less;
            }
        }
        if let Some(right) = &self.right {
            if right.point_cmp(sites, p) > 0.0 {
                return Ordering::Greater;
            }
        }
        Ordering::Equal
    }
}

/// The beach line: the ordered sequence of active arcs, held simultaneously as
/// a balanced tree (point location by the current sweep position) and as a
/// doubly linked list (neighbor queries), both provided by [`AvlTree`].
pub struct Beachline {
    tree: AvlTree<Region>,
}

impl Beachline {
    /// Seed with the boundary-less arc of the first site.
    pub fn new(site: SiteIdx) -> (Self, NodeId) {
        let mut tree = AvlTree::new();
        let node = tree.insert(Region::new(site, None, None), |_, _| Ordering::Equal);
        (Beachline { tree }, node)
    }

    /// A beach line with no arcs at all, for the empty input.
    pub fn empty() -> Self {
        Beachline {
            tree: AvlTree::new(),
        }
    }

    /// Whether the handle still refers to a live arc.
    pub fn is_live(&self, node: NodeId) -> bool {
        self.tree.is_live(node)
    }

    pub fn len(&self) -> usize {
        self.tree.len()
    }

    pub fn region(&self, node: NodeId) -> &Region {
        self.tree.value(node)
    }

    pub fn region_mut(&mut self, node: NodeId) -> &mut Region {
        self.tree.value_mut(node)
    }

    pub fn left_neighbor(&self, node: NodeId) -> Option<NodeId> {
        self.tree.prev(node)
    }

    pub fn right_neighbor(&self, node: NodeId) -> Option<NodeId> {
        self.tree.next(node)
    }

    /// Arcs in beach-line order.
    pub fn iter(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.tree.iter()
    }

    /// The sites of the arcs, in order (mainly for tests and introspection).
    pub fn sites(&self) -> Vec<SiteIdx> {
        self.iter().map(|id| self.region(id).site).collect()
    }

    /// The boundaries still on the beach line, left to right.
    pub fn boundaries(&self) -> Vec<Boundary> {
        self.iter()
            .filter_map(|id| self.region(id).right)
            .collect()
    }

    /// Find the arc containing the query point. The arcs cover the whole
    /// line, so a miss means the tree and the schedule have desynchronized;
    /// the driver turns `None` into a fatal internal error.
    pub fn find_region(&self, sites: &[Site], p: Point) -> Option<NodeId> {
        let found = self.tree.search(|region| region.side_of(sites, p));
        debugln!("find_region {:?} -> {:?}", p, found);
        found
    }

    /// Replace the arc at `node` with the triple `(left, center, right)`,
    /// reusing the node for the center arc. The side arcs are attached
    /// directly next to it, without a fresh root-to-leaf search.
    pub fn split3(
        &mut self,
        node: NodeId,
        left: Region,
        center: Region,
        right: Region,
    ) -> (NodeId, NodeId, NodeId) {
        *self.tree.value_mut(node) = center;
        let l = self.tree.insert_before(node, left);
        let r = self.tree.insert_after(node, right);
        self.tree.rebalance_to_root(node);
        (l, node, r)
    }

    /// Replace the arc at `node` with the pair `(updated, new_right)`: the
    /// two-arc split used when the new site is level with the arc's site and
    /// the bisector is a vertical line.
    pub fn split2(&mut self, node: NodeId, updated: Region, new_right: Region) -> NodeId {
        *self.tree.value_mut(node) = updated;
        let r = self.tree.insert_after(node, new_right);
        self.tree.rebalance_to_root(node);
        r
    }

    /// Splice the arc at `node` out, installing `boundary` between its former
    /// neighbors.
    pub fn remove_region(&mut self, node: NodeId, boundary: Option<Boundary>) {
        let left = self.tree.prev(node);
        let right = self.tree.next(node);
        self.tree.remove_node(node);
        if let Some(left) = left {
            self.tree.value_mut(left).right = boundary;
        }
        if let Some(right) = right {
            self.tree.value_mut(right).left = boundary;
        }
    }
}

impl std::fmt::Debug for Beachline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.sites()).finish()
    }
}
