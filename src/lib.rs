//! Additively-weighted Voronoi diagrams by a generalized Fortune sweep.
//!
//! Sites are points with an optional non-negative weight; the distance to a
//! weighted site is the euclidean distance plus the weight. The sweep line
//! moves upward, maintaining the beach line in a balanced tree, and emits the
//! diagram's vertices and bisector edges.

use std::cmp::Ordering;
use std::collections::HashMap;

pub mod avl;
pub mod beach;
pub mod bisector;
pub mod boundary;
pub mod conic;
pub mod schedule;

use avl::NodeId;
use beach::{Beachline, Region};
use bisector::{Bisector, BisectorKind};
use boundary::{Boundary, Sign};
use conic::VERTEX_EPS;
use schedule::{CircleEvent, Event, Schedule};


#[macro_export]
macro_rules! debugln {
    ($($arg:tt)*) => {
        log::trace!($($arg)*)
    };
}

/// A point in 2D space, ordered in lexicographic `(y, x)` order: the order in
/// which the upward-moving sweep line reaches it.
#[derive(PartialEq, Clone, Copy)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl std::fmt::Debug for Point {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Point").field(&self.x).field(&self.y).finish()
    }
}

impl std::hash::Hash for Point {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.x.to_bits().hash(state);
        self.y.to_bits().hash(state);
    }
}

impl Eq for Point {}

impl PartialOrd for Point {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Point {
    fn cmp(&self, other: &Self) -> Ordering {
        if self.y == other.y {
            self.x.total_cmp(&other.x)
        } else {
            self.y.total_cmp(&other.y)
        }
    }
}

pub fn dist(a: Point, b: Point) -> f64 {
    (a.x - b.x).hypot(a.y - b.y)
}

pub type SiteIdx = u32;

/// An input site: a point, a non-negative weight (0 for a plain point site),
/// and a display name. Two sites are equal iff coordinates and weight match.
#[derive(Clone, Debug)]
pub struct Site {
    pub point: Point,
    pub weight: f64,
    pub name: String,
}

impl PartialEq for Site {
    fn eq(&self, other: &Self) -> bool {
        self.point == other.point && self.weight == other.weight
    }
}

impl Site {
    pub fn new(x: f64, y: f64) -> Self {
        Self::weighted(x, y, 0.0)
    }

    pub fn weighted(x: f64, y: f64, weight: f64) -> Self {
        Site {
            point: Point::new(x, y),
            weight,
            name: String::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// The highest point of the weight circle: where the upward sweep line
    /// first touches the site.
    pub fn event_point(&self) -> Point {
        Point::new(self.point.x, self.point.y + self.weight)
    }

    /// Distance under which the diagram is equidistant: euclidean distance to
    /// the site point plus the weight.
    pub fn weighted_distance(&self, p: Point) -> f64 {
        dist(self.point, p) + self.weight
    }

    /// A site whose weighted distance exceeds another site's everywhere has an
    /// empty region and is excluded from the diagram. An exact duplicate is
    /// dominated by the earlier copy.
    pub fn is_dominated(&self, other: &Site) -> bool {
        self.weight >= other.weighted_distance(self.point)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("site {index} has a non-finite coordinate or weight")]
    NonFiniteSite { index: usize },
    #[error("site {index} has negative weight {weight}")]
    NegativeWeight { index: usize, weight: f64 },
    #[error("no beach-line region contains ({x}, {y})")]
    RegionNotFound { x: f64, y: f64 },
    #[error("circle event fired for a region that was edited without cancellation")]
    StaleCircleEvent,
    #[error("a recorded circle event is missing from the schedule")]
    ScheduleDesync,
    #[error("circle event fired for a region without both neighbors")]
    MissingNeighbor,
}

impl Error {
    /// Internal invariant violations, as opposed to invalid input. These
    /// indicate a bug in the schedule/beach-line synchronization, never a
    /// property of the sites.
    pub fn is_internal(&self) -> bool {
        !matches!(
            self,
            Error::NonFiniteSite { .. } | Error::NegativeWeight { .. }
        )
    }
}

pub type EdgeIdx = usize;
pub type VertexIdx = usize;

/// A diagram edge: one bisector and the vertices found on it. An edge with
/// fewer than two vertices is unbounded on the missing side.
#[derive(Clone, Debug)]
pub struct Edge {
    pub bisector: Bisector,
    pub vertices: Vec<VertexIdx>,
}

impl Edge {
    pub fn is_unbounded(&self) -> bool {
        self.vertices.len() < 2
    }
}

/// A diagram vertex: a point where the arcs of three (or, after coordinate
/// deduplication, more) regions met, with the edges incident to it.
#[derive(Clone, Debug)]
pub struct Vertex {
    pub point: Point,
    pub edges: Vec<EdgeIdx>,
}

/// The finished diagram: the input sites unchanged, the deduplicated vertices,
/// and one edge per adjacent site pair.
#[derive(Clone, Debug)]
pub struct VoronoiDiagram {
    pub sites: Vec<Site>,
    pub vertices: Vec<Vertex>,
    pub edges: Vec<Edge>,
}

/// What one [`Fortune::step`] call did.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Step {
    /// A site event split an arc of the beach line.
    Site(SiteIdx),
    /// A site was dominated by the arc above it and dropped.
    DominatedSite(SiteIdx),
    /// A circle event recorded this diagram vertex.
    Circle(Point),
    /// The schedule is empty; the diagram is complete.
    Done,
}

/// The sweep driver, runnable one event at a time.
///
/// Construction validates the input and seeds the schedule; each
/// [`Fortune::step`] processes the lowest pending event, and
/// [`Fortune::finish`] runs the sweep to completion and yields the diagram.
/// Between steps the beach line and the schedule can be inspected read-only,
/// which is all a step-by-step visualization layer needs.
pub struct Fortune {
    sites: Vec<Site>,
    schedule: Schedule,
    beach: Beachline,
    edges: Vec<Edge>,
    edge_ids: HashMap<(SiteIdx, SiteIdx), EdgeIdx>,
    vertices: Vec<Vertex>,
    vertex_ids: HashMap<(i64, i64), VertexIdx>,
}

/// Compute the diagram of the given sites in one call.
pub fn compute(sites: Vec<Site>) -> Result<VoronoiDiagram, Error> {
    Fortune::new(sites)?.finish()
}

impl Fortune {
    pub fn new(sites: Vec<Site>) -> Result<Self, Error> {
        for (index, site) in sites.iter().enumerate() {
            if !site.point.x.is_finite() || !site.point.y.is_finite() || !site.weight.is_finite() {
                return Err(Error::NonFiniteSite { index });
            }
            if site.weight < 0.0 {
                return Err(Error::NegativeWeight {
                    index,
                    weight: site.weight,
                });
            }
        }

        let mut schedule = Schedule::new();
        for idx in 0..sites.len() {
            schedule.enqueue(&sites, Event::Site(idx as SiteIdx));
        }

        // seed the beach line with the arc of the lowest site
        let beach = match schedule.dequeue() {
            Some(Event::Site(first)) => {
                debugln!("seeding beach line with site {}", first);
                Beachline::new(first).0
            }
            Some(Event::Circle(_)) => unreachable!("schedule seeded with site events only"),
            None => Beachline::empty(),
        };

        Ok(Fortune {
            sites,
            schedule,
            beach,
            edges: Vec::new(),
            edge_ids: HashMap::new(),
            vertices: Vec::new(),
            vertex_ids: HashMap::new(),
        })
    }

    pub fn sites(&self) -> &[Site] {
        &self.sites
    }

    /// The sites of the current beach-line arcs, in order.
    pub fn beach_sites(&self) -> Vec<SiteIdx> {
        self.beach.sites()
    }

    /// The boundaries currently on the beach line. After [`Step::Done`] these
    /// belong to the diagram's unbounded edges.
    pub fn beach_boundaries(&self) -> Vec<Boundary> {
        self.beach.boundaries()
    }

    /// Pending events in firing order.
    pub fn pending_events(&self) -> Vec<Event> {
        self.schedule.events()
    }

    pub fn is_done(&self) -> bool {
        self.schedule.is_empty()
    }

    /// Process the lowest pending event.
    pub fn step(&mut self) -> Result<Step, Error> {
        let Some(event) = self.schedule.dequeue() else {
            return Ok(Step::Done);
        };
        log::debug!("event {:?} over beach {:?}", event, self.beach);
        match event {
            Event::Site(idx) => self.site_event(idx),
            Event::Circle(circle) => self.circle_event(circle),
        }
    }

    /// Run the sweep to completion and return the diagram.
    pub fn finish(mut self) -> Result<VoronoiDiagram, Error> {
        while self.step()? != Step::Done {}
        Ok(VoronoiDiagram {
            sites: self.sites,
            vertices: self.vertices,
            edges: self.edges,
        })
    }

    fn site_event(&mut self, p_idx: SiteIdx) -> Result<Step, Error> {
        let p = self.sites[p_idx as usize].event_point();

        // the arc vertically above the new site
        let node = self
            .beach
            .find_region(&self.sites, p)
            .ok_or(Error::RegionNotFound { x: p.x, y: p.y })?;
        let q_idx = self.beach.region(node).site;

        if self.sites[p_idx as usize].is_dominated(&self.sites[q_idx as usize]) {
            debugln!("site {} dominated by {}", p_idx, q_idx);
            return Ok(Step::DominatedSite(p_idx));
        }

        let bisector = Bisector::new(&self.sites, p_idx, q_idx);
        self.register_edge(bisector);

        // the split arc's pending collapse is voided by the split
        self.cancel_event_for(node)?;
        let old = *self.beach.region(node);

        let cohorizontal = matches!(bisector.kind, BisectorKind::Line)
            && self.sites[p_idx as usize].point.y == self.sites[q_idx as usize].point.y;
        if cohorizontal {
            // level equal-weight sites: the bisector is a vertical line and
            // the new arc sits beside the old one, not inside it
            let vertical = Boundary::new(bisector, Sign::Plus);
            let new_node = self.beach.split2(
                node,
                Region::new(q_idx, old.left, Some(vertical)),
                Region::new(p_idx, Some(vertical), old.right),
            );
            self.enqueue_circle_for(node)?;
            self.enqueue_circle_for(new_node)?;
        } else {
            let minus = Boundary::new(bisector, Sign::Minus);
            let plus = Boundary::new(bisector, Sign::Plus);
            let (left, _, right) = self.beach.split3(
                node,
                Region::new(q_idx, old.left, Some(minus)),
                Region::new(p_idx, Some(minus), Some(plus)),
                Region::new(q_idx, Some(plus), old.right),
            );
            self.enqueue_circle_for(left)?;
            self.enqueue_circle_for(right)?;
        }

        Ok(Step::Site(p_idx))
    }

    fn circle_event(&mut self, circle: CircleEvent) -> Result<Step, Error> {
        let node = circle.region;
        if !self.beach.is_live(node) || self.beach.region(node).event != Some(circle.key()) {
            // cancellation is supposed to make this unreachable
            return Err(Error::StaleCircleEvent);
        }
        self.beach.region_mut(node).event = None;

        let q_node = self.beach.left_neighbor(node).ok_or(Error::MissingNeighbor)?;
        let s_node = self.beach.right_neighbor(node).ok_or(Error::MissingNeighbor)?;
        let region = *self.beach.region(node);
        let (old_left, old_right) = match (region.left, region.right) {
            (Some(l), Some(r)) => (l, r),
            _ => return Err(Error::MissingNeighbor),
        };
        let q_idx = self.beach.region(q_node).site;
        let s_idx = self.beach.region(s_node).site;

        // the neighbors' pending collapses involved the dying boundaries
        self.cancel_event_for(q_node)?;
        self.cancel_event_for(s_node)?;

        let bisector = Bisector::new(&self.sites, q_idx, s_idx);
        let edge = self.register_edge(bisector);

        // the merged boundary continues rightward iff the event lies at or
        // right of the higher of the two sites; a vertical line bisector keeps
        // its whole locus on the plus branch
        let higher_x = self.sites[bisector.a as usize].point.x;
        let cohorizontal = matches!(bisector.kind, BisectorKind::Line)
            && self.sites[q_idx as usize].point.y == self.sites[s_idx as usize].point.y;
        let sign = if cohorizontal || circle.point.x >= higher_x {
            Sign::Plus
        } else {
            Sign::Minus
        };
        self.beach
            .remove_region(node, Some(Boundary::new(bisector, sign)));

        // the event's circle center becomes a diagram vertex of the three
        // bisectors involved
        let vertex = self.register_vertex(circle.vertex);
        self.attach(vertex, self.edge_of(&old_left.bisector));
        self.attach(vertex, self.edge_of(&old_right.bisector));
        self.attach(vertex, edge);

        self.enqueue_circle_for(q_node)?;
        self.enqueue_circle_for(s_node)?;

        Ok(Step::Circle(circle.vertex))
    }

    /// Test an arc's boundary pair for a future intersection and schedule the
    /// earliest one as this arc's circle event.
    fn enqueue_circle_for(&mut self, node: NodeId) -> Result<(), Error> {
        debug_assert!(self.beach.region(node).event.is_none());
        let region = *self.beach.region(node);
        let (Some(left), Some(right)) = (region.left, region.right) else {
            return Ok(());
        };
        if left.bisector.key() == right.bisector.key() {
            return Ok(());
        }

        let found = left.intersections(&self.sites, &right);
        let Some(&(vertex, star)) = found.iter().min_by_key(|(_, star)| *star) else {
            return Ok(());
        };
        debugln!(
            "circle event at {:?} (vertex {:?}) for region of {}",
            star,
            vertex,
            region.site
        );

        let circle = CircleEvent {
            point: star,
            vertex,
            region: node,
            seq: self.schedule.next_seq(),
        };
        self.beach.region_mut(node).event = Some(circle.key());
        self.schedule.enqueue(&self.sites, Event::Circle(circle));
        Ok(())
    }

    /// Cancel the arc's pending circle event, if any.
    fn cancel_event_for(&mut self, node: NodeId) -> Result<(), Error> {
        if let Some(key) = self.beach.region_mut(node).event.take() {
            debugln!("cancelling circle event {:?}", key);
            if !self.schedule.cancel(&self.sites, key) {
                return Err(Error::ScheduleDesync);
            }
        }
        Ok(())
    }

    /// One edge per unordered site pair, created on first sight.
    fn register_edge(&mut self, bisector: Bisector) -> EdgeIdx {
        let key = bisector.key();
        if let Some(&idx) = self.edge_ids.get(&key) {
            return idx;
        }
        let idx = self.edges.len();
        self.edges.push(Edge {
            bisector,
            vertices: Vec::new(),
        });
        self.edge_ids.insert(key, idx);
        idx
    }

    fn edge_of(&self, bisector: &Bisector) -> EdgeIdx {
        self.edge_ids[&bisector.key()]
    }

    /// Vertices are deduplicated by coordinate: cocircular configurations
    /// reach the same vertex through several circle events.
    fn register_vertex(&mut self, p: Point) -> VertexIdx {
        let key = (
            (p.x / VERTEX_EPS).round() as i64,
            (p.y / VERTEX_EPS).round() as i64,
        );
        if let Some(&idx) = self.vertex_ids.get(&key) {
            return idx;
        }
        let idx = self.vertices.len();
        self.vertices.push(Vertex {
            point: p,
            edges: Vec::new(),
        });
        self.vertex_ids.insert(key, idx);
        idx
    }

    /// Cross-link a vertex and an edge, each at most once, edges keeping at
    /// most their two endpoints.
    fn attach(&mut self, vertex: VertexIdx, edge: EdgeIdx) {
        let e = &mut self.edges[edge];
        if !e.vertices.contains(&vertex) && e.vertices.len() < 2 {
            e.vertices.push(vertex);
        }
        let v = &mut self.vertices[vertex];
        if !v.edges.contains(&edge) {
            v.edges.push(edge);
        }
    }
}
