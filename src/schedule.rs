use std::cmp::Ordering;

use crate::avl::{AvlTree, NodeId};
use crate::{Point, Site, SiteIdx};

/// A pending moment of the sweep: a site about to be reached, or a predicted
/// collapse of a beach-line region into a diagram vertex.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Event {
    Site(SiteIdx),
    Circle(CircleEvent),
}

/// A predicted region collapse.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CircleEvent {
    /// Sweep-ordering point: the top of the circle through the three
    /// converging sites (the star image of the vertex).
    pub point: Point,
    /// The candidate diagram vertex, the circle's center.
    pub vertex: Point,
    /// The beach-line node this event would splice out.
    pub region: NodeId,
    /// Creation counter; makes the schedule order total so an arbitrary
    /// pending event can be cancelled by key.
    pub seq: u64,
}

impl CircleEvent {
    pub fn key(&self) -> EventKey {
        EventKey {
            point: self.point,
            seq: self.seq,
        }
    }
}

/// The position of a circle event in the schedule's total order.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EventKey {
    pub point: Point,
    pub seq: u64,
}

impl Event {
    /// The sweep position at which this event fires. Site events fire when the
    /// sweep line first touches the site's weight circle.
    pub fn point(&self, sites: &[Site]) -> Point {
        match self {
            Event::Site(idx) => sites[*idx as usize].event_point(),
            Event::Circle(circle) => circle.point,
        }
    }
}

/// Total order of the schedule: ascending `(y, x)` of the event point; at a
/// tie, site events fire before circle events, lighter sites before heavier
/// ones (keeping the sweep correct for touching weighted sites), and circle
/// events in creation order.
fn event_cmp(sites: &[Site], a: &Event, b: &Event) -> Ordering {
    a.point(sites).cmp(&b.point(sites)).then_with(|| match (a, b) {
        (Event::Site(i), Event::Site(j)) => {
            let (si, sj) = (&sites[*i as usize], &sites[*j as usize]);
            si.weight.total_cmp(&sj.weight).then(i.cmp(j))
        }
        (Event::Site(_), Event::Circle(_)) => Ordering::Less,
        (Event::Circle(_), Event::Site(_)) => Ordering::Greater,
        (Event::Circle(c), Event::Circle(d)) => c.seq.cmp(&d.seq),
    })
}

/// Where a circle-event key falls relative to a stored event, consistent with
/// [`event_cmp`].
fn key_cmp(sites: &[Site], key: &EventKey, stored: &Event) -> Ordering {
    key.point.cmp(&stored.point(sites)).then_with(|| match stored {
        Event::Site(_) => Ordering::Greater,
        Event::Circle(c) => key.seq.cmp(&c.seq),
    })
}

/// The priority schedule of pending events, built on the balanced tree:
/// insert, extract-minimum, and cancellation of an arbitrary pending circle
/// event, all logarithmic.
pub struct Schedule {
    tree: AvlTree<Event>,
    seq: u64,
}

impl Schedule {
    pub fn new() -> Self {
        Schedule {
            tree: AvlTree::new(),
            seq: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// Fresh creation counter for a circle event about to be enqueued.
    pub fn next_seq(&mut self) -> u64 {
        self.seq += 1;
        self.seq
    }

    pub fn enqueue(&mut self, sites: &[Site], event: Event) {
        self.tree.insert(event, |a, b| event_cmp(sites, a, b));
    }

    /// Remove and return the earliest pending event.
    pub fn dequeue(&mut self) -> Option<Event> {
        self.tree.remove_min()
    }

    pub fn peek(&self) -> Option<&Event> {
        self.tree.first().map(|id| self.tree.value(id))
    }

    /// Cancel a still-pending circle event by its key. Returns whether it was
    /// found; a recorded-but-missing event indicates schedule/beach-line
    /// desynchronization, which the driver surfaces as a fatal error.
    pub fn cancel(&mut self, sites: &[Site], key: EventKey) -> bool {
        match self.tree.search(|stored| key_cmp(sites, &key, stored)) {
            Some(id) => {
                self.tree.remove_node(id);
                true
            }
            None => false,
        }
    }

    /// Pending events in firing order, for read-only introspection.
    pub fn events(&self) -> Vec<Event> {
        self.tree.iter().map(|id| *self.tree.value(id)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn site_events(sites: &[Site]) -> Schedule {
        let mut schedule = Schedule::new();
        for idx in 0..sites.len() {
            schedule.enqueue(sites, Event::Site(idx as SiteIdx));
        }
        schedule
    }

    #[test]
    fn dequeues_in_sweep_order() {
        let sites = [
            Site::new(2.0, 5.0),
            Site::new(0.0, 1.0),
            Site::new(3.0, 1.0),
            Site::new(-1.0, 3.0),
        ];
        let mut schedule = site_events(&sites);
        let order: Vec<Event> = std::iter::from_fn(|| schedule.dequeue()).collect();
        assert_eq!(
            order,
            [Event::Site(1), Event::Site(2), Event::Site(3), Event::Site(0)]
        );
        assert!(schedule.is_empty());
    }

    #[test]
    fn weighted_sites_fire_at_their_circle_top() {
        // the heavy low site is reached after the light high one
        let sites = [Site::weighted(0.0, 0.0, 5.0), Site::weighted(9.0, 2.0, 0.0)];
        let mut schedule = site_events(&sites);
        assert_eq!(schedule.dequeue(), Some(Event::Site(1)));
        assert_eq!(schedule.dequeue(), Some(Event::Site(0)));
    }

    #[test]
    fn tied_weighted_sites_lighter_first() {
        // event points coincide at y = 4; the lighter site must come first
        let sites = [Site::weighted(1.0, 0.0, 4.0), Site::weighted(1.0, 3.0, 1.0)];
        let mut schedule = site_events(&sites);
        assert_eq!(schedule.dequeue(), Some(Event::Site(1)));
        assert_eq!(schedule.dequeue(), Some(Event::Site(0)));
    }

    #[test]
    fn site_beats_circle_at_the_same_point() {
        let sites = [Site::new(1.0, 1.0)];
        let mut schedule = Schedule::new();
        let seq = schedule.next_seq();
        let circle = CircleEvent {
            point: Point::new(1.0, 1.0),
            vertex: Point::new(1.0, 0.0),
            region: fake_node(),
            seq,
        };
        schedule.enqueue(&sites, Event::Circle(circle));
        schedule.enqueue(&sites, Event::Site(0));
        assert_eq!(schedule.dequeue(), Some(Event::Site(0)));
        assert_eq!(schedule.dequeue(), Some(Event::Circle(circle)));
    }

    #[test]
    fn cancel_removes_exactly_one() {
        let sites = [Site::new(0.0, 0.0)];
        let mut schedule = Schedule::new();
        let region = fake_node();
        let mut keys = Vec::new();
        // several circle events at the same coordinates, told apart by seq
        for _ in 0..3 {
            let seq = schedule.next_seq();
            let circle = CircleEvent {
                point: Point::new(2.0, 2.0),
                vertex: Point::new(2.0, 1.0),
                region,
                seq,
            };
            keys.push(circle.key());
            schedule.enqueue(&sites, Event::Circle(circle));
        }

        assert!(schedule.cancel(&sites, keys[1]));
        assert!(!schedule.cancel(&sites, keys[1]));
        assert_eq!(schedule.len(), 2);

        let remaining: Vec<u64> = schedule
            .events()
            .iter()
            .map(|e| match e {
                Event::Circle(c) => c.seq,
                Event::Site(_) => unreachable!(),
            })
            .collect();
        assert_eq!(remaining, [keys[0].seq, keys[2].seq]);
    }

    /// Any valid `NodeId` will do for schedule-only tests.
    fn fake_node() -> NodeId {
        let mut tree: AvlTree<u32> = AvlTree::new();
        tree.insert(0, u32::cmp)
    }
}
