use crate::conic::{are_close, Conic, DISTANCE_EPS, ROOT_EPS};
use crate::{debugln, Point, Site, SiteIdx};

/// The equidistant locus of two sites, under weighted distance.
///
/// Site indices are canonically ordered: the site whose point is higher (ties
/// broken toward larger x) comes first, and is the one boundaries measure the
/// star transform against. Equal weights give a straight line; otherwise the
/// locus is one branch of a general conic, whose implicit coefficients are
/// derived once at construction.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bisector {
    /// The higher of the two sites.
    pub a: SiteIdx,
    /// The lower site.
    pub b: SiteIdx,
    pub kind: BisectorKind,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum BisectorKind {
    /// Equal weights: the classic perpendicular bisector.
    Line,
    /// Distinct weights: `dist(z, a) - dist(z, b) = k` squared into a conic.
    Conic(Conic),
}

impl Bisector {
    pub fn new(sites: &[Site], mut a: SiteIdx, mut b: SiteIdx) -> Self {
        let (p, q) = (sites[a as usize].point, sites[b as usize].point);
        if p.y < q.y || (p.y == q.y && p.x <= q.x) {
            std::mem::swap(&mut a, &mut b);
        }

        let (s0, s1) = (&sites[a as usize], &sites[b as usize]);
        let kind = if s0.weight == s1.weight {
            BisectorKind::Line
        } else {
            BisectorKind::Conic(conic_coefficients(s0, s1))
        };

        Bisector { a, b, kind }
    }

    pub fn sites<'a>(&self, sites: &'a [Site]) -> (&'a Site, &'a Site) {
        (&sites[self.a as usize], &sites[self.b as usize])
    }

    /// Unordered site-pair key, for the edge registry.
    pub fn key(&self) -> (SiteIdx, SiteIdx) {
        (self.a.min(self.b), self.a.max(self.b))
    }

    /// The midpoint of the segment between the two weight-circle frontiers,
    /// a point on the bisector of co-horizontal or co-vertical sites.
    pub fn middle(&self, sites: &[Site]) -> Point {
        let (s0, s1) = self.sites(sites);
        let f0 = frontier_toward(s0, s1.point);
        let f1 = frontier_toward(s1, s0.point);
        Point::new((f0.x + f1.x) / 2.0, (f0.y + f1.y) / 2.0)
    }

    /// The y values of the bisector at x: 0, 1 or 2 values.
    ///
    /// A vertical bisector (co-horizontal equal-weight sites) has no functional
    /// y; the symmetric midpoint y is returned instead.
    pub fn formula_y(&self, sites: &[Site], x: f64) -> Vec<f64> {
        let (s0, s1) = self.sites(sites);
        let (p, q) = (s0.point, s1.point);
        match &self.kind {
            BisectorKind::Line => {
                if p.y == q.y {
                    return vec![self.middle(sites).y];
                }
                let m = -((q.x - p.x) / (q.y - p.y));
                let b = (q.x * q.x - p.x * p.x + q.y * q.y - p.y * p.y) / (2.0 * (q.y - p.y));
                vec![m * x + b]
            }
            BisectorKind::Conic(conic) => self.filter_on_locus(sites, conic.ys_at(x), |y| (x, y)),
        }
    }

    /// The x values of the bisector at y. Mirror of [`Bisector::formula_y`].
    pub fn formula_x(&self, sites: &[Site], y: f64) -> Vec<f64> {
        let (s0, s1) = self.sites(sites);
        let (p, q) = (s0.point, s1.point);
        match &self.kind {
            BisectorKind::Line => {
                if p.y == q.y {
                    return vec![self.middle(sites).x];
                }
                if p.x == q.x {
                    return vec![self.middle(sites).x];
                }
                let n = (2.0 * q.y - 2.0 * p.y) * y + (p.y * p.y - q.y * q.y)
                    - (q.x * q.x - p.x * p.x);
                vec![n / (2.0 * p.x - 2.0 * q.x)]
            }
            BisectorKind::Conic(conic) => self.filter_on_locus(sites, conic.xs_at(y), |x| (x, y)),
        }
    }

    /// Keep only the quadratic-solution candidates that satisfy the defining
    /// equidistance property; squaring the distance equation introduces a
    /// spurious second branch.
    fn filter_on_locus(
        &self,
        sites: &[Site],
        candidates: Vec<f64>,
        to_point: impl Fn(f64) -> (f64, f64),
    ) -> Vec<f64> {
        let mut values: Vec<f64> = candidates
            .into_iter()
            .filter(|&v| {
                let (x, y) = to_point(v);
                self.contains(sites, Point::new(x, y))
            })
            .collect();
        values.sort_by(f64::total_cmp);
        values.dedup_by(|a, b| are_close(*a, *b, ROOT_EPS));
        values
    }

    /// Whether a point is (weighted-)equidistant from both sites.
    pub fn contains(&self, sites: &[Site], p: Point) -> bool {
        let (s0, s1) = self.sites(sites);
        let d0 = s0.weighted_distance(p);
        let d1 = s1.weighted_distance(p);
        are_close(d0, d1, DISTANCE_EPS * (1.0 + d0.abs().max(d1.abs())))
    }

    /// Whether the two bisectors have the same slope (parallel or coincident
    /// lines); such pairs never intersect in a single point.
    pub fn is_same_slope(&self, sites: &[Site], other: &Bisector) -> bool {
        if !matches!(
            (&self.kind, &other.kind),
            (BisectorKind::Line, BisectorKind::Line)
        ) {
            return false;
        }
        let (p1, p2) = {
            let (s0, s1) = self.sites(sites);
            (s0.point, s1.point)
        };
        let (q1, q2) = {
            let (s0, s1) = other.sites(sites);
            (s0.point, s1.point)
        };
        let dy_zero = p1.y - p2.y == 0.0 && q1.y - q2.y == 0.0;
        let dx_zero = p1.x - p2.x == 0.0 && q1.x - q2.x == 0.0;
        let same_deltas = p1.y - p2.y == q1.y - q2.y && p1.x - p2.x == q1.x - q2.x;
        dy_zero || dx_zero || same_deltas
    }

    /// The implicit conic form, promoting a line bisector to a degenerate conic
    /// so the elimination machinery applies uniformly.
    pub fn to_conic(&self, sites: &[Site]) -> Conic {
        match &self.kind {
            BisectorKind::Conic(conic) => *conic,
            BisectorKind::Line => {
                let (s0, s1) = self.sites(sites);
                let (p, q) = (s0.point, s1.point);
                let u = 2.0 * (q.x - p.x);
                let v = 2.0 * (q.y - p.y);
                let w = p.x * p.x + p.y * p.y - q.x * q.x - q.y * q.y;
                Conic::new(0.0, 0.0, 0.0, u, v, w)
            }
        }
    }

    /// Intersection points of two bisectors: at most 1 when both are lines, at
    /// most 2 otherwise. Candidates from the conic elimination are kept only
    /// when equidistant under both bisectors, and near-equal results are
    /// deduplicated.
    pub fn intersections(&self, sites: &[Site], other: &Bisector) -> Vec<Point> {
        if let (BisectorKind::Line, BisectorKind::Line) = (&self.kind, &other.kind) {
            if self.is_same_slope(sites, other) {
                debugln!("parallel line bisectors");
                return Vec::new();
            }
            return self.line_line_intersection(sites, other).into_iter().collect();
        }

        let mut points: Vec<Point> = self
            .to_conic(sites)
            .intersections(&other.to_conic(sites))
            .into_iter()
            .map(|(x, y)| Point::new(x, y))
            .filter(|&p| self.contains(sites, p) && other.contains(sites, p))
            .collect();
        points.sort();
        points.dedup_by(|a, b| are_close(a.x, b.x, ROOT_EPS) && are_close(a.y, b.y, ROOT_EPS));
        points
    }

    fn line_line_intersection(&self, sites: &[Site], other: &Bisector) -> Option<Point> {
        let (p, q) = {
            let (s0, s1) = self.sites(sites);
            (s0.point, s1.point)
        };
        let (r, s) = {
            let (s0, s1) = other.sites(sites);
            (s0.point, s1.point)
        };

        // vertical bisectors have a fixed x; evaluate the other line there
        if p.y == q.y {
            let x = self.middle(sites).x;
            return Some(Point::new(x, other.formula_y(sites, x)[0]));
        }
        if r.y == s.y {
            let x = other.middle(sites).x;
            return Some(Point::new(x, self.formula_y(sites, x)[0]));
        }

        let f1 = |a: Point, b: Point| {
            (b.x * b.x - a.x * a.x + b.y * b.y - a.y * a.y) / (2.0 * (b.y - a.y))
        };
        let f2 = |a: Point, b: Point| (b.x - a.x) / (b.y - a.y);
        let denom = f2(r, s) - f2(p, q);
        if denom == 0.0 {
            return None;
        }
        let x = (f1(r, s) - f1(p, q)) / denom;
        Some(Point::new(x, self.formula_y(sites, x)[0]))
    }
}

/// The conic `(A - B - k²)² = 4k²B` from squaring the weighted-distance
/// equation `dist(z, s0) - dist(z, s1) = k`, `k = w1 - w0`, where `A` and `B`
/// are the squared distances to `s0` and `s1`.
fn conic_coefficients(s0: &Site, s1: &Site) -> Conic {
    let (p, q) = (s0.point, s1.point);
    let k = s1.weight - s0.weight;
    let k2 = k * k;
    let u = 2.0 * (q.x - p.x);
    let v = 2.0 * (q.y - p.y);
    let w = p.x * p.x + p.y * p.y - q.x * q.x - q.y * q.y;
    let wk = w - k2;
    Conic::new(
        u * u - 4.0 * k2,
        2.0 * u * v,
        v * v - 4.0 * k2,
        2.0 * u * wk + 8.0 * k2 * q.x,
        2.0 * v * wk + 8.0 * k2 * q.y,
        wk * wk - 4.0 * k2 * (q.x * q.x + q.y * q.y),
    )
}

/// The point where the site's weight circle crosses the segment toward
/// `target`; for a plain site this is the site point itself.
fn frontier_toward(site: &Site, target: Point) -> Point {
    let p = site.point;
    if site.weight == 0.0 || (p.x == target.x && p.y == target.y) {
        return p;
    }
    let (dx, dy) = (target.x - p.x, target.y - p.y);
    let len = dx.hypot(dy);
    Point::new(
        p.x + site.weight * dx / len,
        p.y + site.weight * dy / len,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conic::are_close;

    fn close(a: f64, b: f64) -> bool {
        are_close(a, b, 1e-5)
    }

    #[test]
    fn point_bisector_formulas() {
        let sites = [Site::new(0.0, 0.0), Site::new(2.0, 2.0)];
        let bisector = Bisector::new(&sites, 0, 1);
        assert_eq!(bisector.formula_x(&sites, 1.0), vec![1.0]);
        assert_eq!(bisector.formula_y(&sites, 1.0), vec![1.0]);

        let sites = [Site::new(0.0, 0.0), Site::new(-2.0, -2.0)];
        let bisector = Bisector::new(&sites, 0, 1);
        assert_eq!(bisector.formula_x(&sites, -1.0), vec![-1.0]);
        assert_eq!(bisector.formula_y(&sites, -1.0), vec![-1.0]);
    }

    #[test]
    fn point_bisector_round_trip() {
        let sites = [Site::new(-31.0, 7.0), Site::new(48.0, -22.0)];
        let bisector = Bisector::new(&sites, 0, 1);
        for x in [-50.0, -3.0, 0.0, 17.0, 80.0] {
            let y = bisector.formula_y(&sites, x)[0];
            assert!(close(bisector.formula_x(&sites, y)[0], x));
        }
    }

    #[test]
    fn weighted_formulas_cohorizontal() {
        // the bisector's single point on the axis between the two circles
        let sites = [
            Site::weighted(2.0, 2.0, 2.5),
            Site::weighted(9.0, 2.0, 1.5),
        ];
        let bisector = Bisector::new(&sites, 0, 1);
        let ys = bisector.formula_y(&sites, 5.0);
        assert_eq!(ys.len(), 1);
        assert!(close(ys[0], 2.0));
        let xs = bisector.formula_x(&sites, 2.0);
        assert_eq!(xs.len(), 1);
        assert!(close(xs[0], 5.0));
    }

    #[test]
    fn weighted_formulas_covertical() {
        let sites = [
            Site::weighted(4.0, 9.0, 2.5),
            Site::weighted(4.0, 1.0, 1.5),
        ];
        let bisector = Bisector::new(&sites, 0, 1);
        let ys = bisector.formula_y(&sites, 4.0);
        assert_eq!(ys.len(), 1);
        assert!(close(ys[0], 5.5));
        let xs = bisector.formula_x(&sites, 5.5);
        assert_eq!(xs.len(), 1);
        assert!(close(xs[0], 4.0));
    }

    #[test]
    fn weighted_formulas_general() {
        let sites = [
            Site::weighted(2.0, 5.0, 2.5),
            Site::weighted(9.0, 2.0, 1.5),
        ];
        let bisector = Bisector::new(&sites, 0, 1);
        let ys = bisector.formula_y(&sites, 5.0);
        assert_eq!(ys.len(), 1);
        assert!(close(ys[0], 3.603093956613265));
        let xs = bisector.formula_x(&sites, ys[0]);
        assert_eq!(xs.len(), 1);
        assert!(close(xs[0], 5.0));
    }

    #[test]
    fn weighted_formulas_two_values_in_x() {
        // co-vertical sites with very different weights: the conic folds and a
        // single y cuts it twice
        let sites = [
            Site::weighted(4.0, 8.0, 4.0),
            Site::weighted(4.0, -5.0, 0.5),
        ];
        let bisector = Bisector::new(&sites, 0, 1);
        let xs = bisector.formula_x(&sites, 3.5);
        assert_eq!(xs.len(), 2);
        assert!(close(xs[0], 0.5364507410190114));
        assert!(close(xs[1], 7.463549258980988));
        for x in xs {
            let ys = bisector.formula_y(&sites, x);
            assert_eq!(ys.len(), 1);
            assert!(close(ys[0], 3.5));
        }
    }

    #[test]
    fn weighted_formulas_two_values_in_y() {
        let sites = [
            Site::weighted(-18.0, -5.0, 7.0),
            Site::weighted(4.0, -5.0, 0.5),
        ];
        let bisector = Bisector::new(&sites, 0, 1);
        let ys = bisector.formula_y(&sites, -11.0);
        assert_eq!(ys.len(), 2);
        assert!(close(ys[0], -12.540055757645454));
        assert!(close(ys[1], 2.5400557576454544));
        for y in ys {
            let xs = bisector.formula_x(&sites, y);
            assert_eq!(xs.len(), 1);
            assert!(close(xs[0], -11.0));
        }
    }

    #[test]
    fn line_line_intersection_point() {
        let sites = [
            Site::new(0.0, 0.0),
            Site::new(2.0, 2.0),
            Site::new(2.0, -2.0),
        ];
        let bpq = Bisector::new(&sites, 0, 1);
        let bpr = Bisector::new(&sites, 0, 2);
        let points = bpq.intersections(&sites, &bpr);
        assert_eq!(points.len(), 1);
        assert!(close(points[0].x, 2.0));
        assert!(close(points[0].y, 0.0));

        // symmetric
        let points2 = bpr.intersections(&sites, &bpq);
        assert_eq!(points2.len(), 1);
        assert!(close(points2[0].x, points[0].x));
        assert!(close(points2[0].y, points[0].y));
    }

    #[test]
    fn parallel_bisectors_do_not_intersect() {
        let sites = [
            Site::new(0.0, 0.0),
            Site::new(0.0, 2.0),
            Site::new(0.0, 4.0),
        ];
        let b01 = Bisector::new(&sites, 0, 1);
        let b12 = Bisector::new(&sites, 1, 2);
        assert!(b01.intersections(&sites, &b12).is_empty());
    }

    #[test]
    fn weighted_bisectors_meet_at_the_diagram_vertex() {
        let sites = [
            Site::weighted(38.0, 2.0, 1.0),
            Site::weighted(34.0, 39.0, 2.0),
            Site::weighted(10.0, 7.0, 5.0),
        ];
        let b01 = Bisector::new(&sites, 0, 1);
        let b02 = Bisector::new(&sites, 0, 2);
        let points = b01.intersections(&sites, &b02);
        assert!(
            points
                .iter()
                .any(|p| close(p.x, 23.7599947570548) && close(p.y, 19.7788815631923)),
            "{points:?}"
        );
    }

    #[test]
    fn conic_matches_equidistance() {
        let sites = [
            Site::weighted(3.0, 11.0, 2.0),
            Site::weighted(-7.0, -2.0, 0.5),
        ];
        let bisector = Bisector::new(&sites, 0, 1);
        for y in [-20.0, -5.0, 0.0, 3.0, 12.0, 40.0] {
            for x in bisector.formula_x(&sites, y) {
                assert!(bisector.contains(&sites, Point::new(x, y)));
            }
        }
    }
}
