use crate::bisector::{Bisector, BisectorKind};
use crate::conic::{are_close, solve_quadratic, Conic, RESAMPLE_EPS};
use crate::{debugln, Point, Site};

/// Which of the two branches of a bisector a boundary selects. The minus
/// branch is everywhere to the left of the plus branch of the same bisector on
/// the beach line. The sign is fixed at creation and never flips.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Sign {
    Minus,
    Plus,
}

/// One signed, sweep-trimmed half of a bisector, as it appears on the beach
/// line.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Boundary {
    pub bisector: Bisector,
    pub sign: Sign,
}

impl Boundary {
    pub fn new(bisector: Bisector, sign: Sign) -> Self {
        Boundary { bisector, sign }
    }

    /// The defining site: the canonical first (higher) site of the bisector,
    /// which the star transform measures distance against.
    pub fn site<'a>(&self, sites: &'a [Site]) -> &'a Site {
        &sites[self.bisector.a as usize]
    }

    /// `*(x, y) = (x, y + weighted_distance(site, (x, y)))`: lifts a bisector
    /// point to the sweep position at which the beach line reaches it.
    pub fn star(&self, sites: &[Site], p: Point) -> Point {
        Point::new(p.x, p.y + self.site(sites).weighted_distance(p))
    }

    /// Left/right placement of `p` against this boundary at the sweep height
    /// `p.y`: negative when `p` is left of the branch, positive when right,
    /// near zero on it.
    ///
    /// A vertical line bisector keeps its whole locus on the plus branch; the
    /// minus branch is empty and everything counts as right of it. When the
    /// branch has no point at this height (no real solution, or a finite
    /// asymptote), the defining site's x stands in for the curve.
    pub fn point_cmp(&self, sites: &[Site], p: Point) -> f64 {
        if let BisectorKind::Line = self.bisector.kind {
            let (s0, s1) = self.bisector.sites(sites);
            if s0.point.y == s1.point.y {
                return match self.sign {
                    Sign::Minus => 1.0,
                    Sign::Plus => p.x - self.bisector.middle(sites).x,
                };
            }
        }

        match self.star_x_at(sites, p.y) {
            Some(x) => p.x - x,
            None => {
                let cmp = p.x - self.site(sites).point.x;
                // the empty left branch keeps the region split point inside
                // the newly created arc
                if cmp == 0.0 && self.sign == Sign::Minus {
                    1.0
                } else {
                    cmp
                }
            }
        }
    }

    /// The star-mapped y values of the underlying bisector at `x`, for
    /// sampling the curve over a coordinate range. Empty when the bisector has
    /// no point at this x.
    pub fn star_ys_at(&self, sites: &[Site], x: f64) -> Vec<f64> {
        self.bisector
            .formula_y(sites, x)
            .into_iter()
            .map(|y| self.star(sites, Point::new(x, y)).y)
            .collect()
    }

    /// The x coordinate where this signed branch, star-mapped, crosses the
    /// horizontal line at sweep height `y`. `None` when the branch has no
    /// point there.
    pub fn star_x_at(&self, sites: &[Site], y: f64) -> Option<f64> {
        let mut candidates = self.branch_points_at(sites, y);
        if candidates.is_empty() {
            // a query landing on a vertical tangent can lose both roots to
            // rounding; re-sample just above and below
            candidates = self.branch_points_at(sites, y + RESAMPLE_EPS);
        }
        if candidates.is_empty() {
            candidates = self.branch_points_at(sites, y - RESAMPLE_EPS);
        }
        if candidates.is_empty() {
            return None;
        }

        // Each signed branch keeps to one side of the defining site. The minus
        // branch excludes the shared start point (the plus branch includes
        // it), so a lone candidate at the site's x belongs to plus only. A
        // weighted boundary folded past a vertical tangent fails the side test
        // entirely; both branches are then present among the candidates and
        // the invariant "minus left of plus" picks the right one.
        let sx = self.site(sites).point.x;
        let tie = 1e-9 * (1.0 + sx.abs());
        let on_side: Vec<f64> = candidates
            .iter()
            .copied()
            .filter(|&x| match self.sign {
                Sign::Minus => x <= sx - tie,
                Sign::Plus => x >= sx - tie,
            })
            .collect();
        let pool = if !on_side.is_empty() {
            on_side
        } else if candidates.len() >= 2 {
            candidates
        } else {
            return None;
        };

        pool.into_iter().reduce(|a, b| match self.sign {
            Sign::Minus => a.min(b),
            Sign::Plus => a.max(b),
        })
    }

    /// The x coordinates of bisector points whose star image lies at sweep
    /// height `y`: the bisector intersected with the parabola of focus
    /// `site` and directrix `y - weight`.
    fn branch_points_at(&self, sites: &[Site], y: f64) -> Vec<f64> {
        let s0 = self.site(sites);
        let focus = s0.point;
        let k = y - s0.weight;

        match &self.bisector.kind {
            BisectorKind::Line => {
                let (_, s1) = self.bisector.sites(sites);
                let q = s1.point;
                if focus.y == q.y {
                    // vertical line bisector: single branch point at the middle
                    let mx = self.bisector.middle(sites).x;
                    let reach = k - self.bisector.formula_y(sites, mx)[0];
                    return if reach >= 0.0 { vec![mx] } else { Vec::new() };
                }
                // substitute the line into the parabola equation
                let m = -((q.x - focus.x) / (q.y - focus.y));
                let b = (q.x * q.x - focus.x * focus.x + q.y * q.y - focus.y * focus.y)
                    / (2.0 * (q.y - focus.y));
                let c = k - b;
                solve_quadratic(
                    1.0,
                    -2.0 * focus.x + 2.0 * m * (b - focus.y) + 2.0 * c * m,
                    focus.x * focus.x + (b - focus.y) * (b - focus.y) - c * c,
                )
                .into_iter()
                .filter(|&x| c - m * x >= 0.0)
                .collect()
            }
            BisectorKind::Conic(conic) => {
                let parabola = Conic::new(
                    1.0,
                    0.0,
                    0.0,
                    -2.0 * focus.x,
                    2.0 * (k - focus.y),
                    focus.x * focus.x + focus.y * focus.y - k * k,
                );
                conic
                    .intersections(&parabola)
                    .into_iter()
                    .map(|(x, y)| Point::new(x, y))
                    .filter(|&z| z.y <= k + RESAMPLE_EPS)
                    .filter(|&z| self.bisector.contains(sites, z))
                    .map(|z| z.x)
                    .collect()
            }
        }
    }

    /// Whether a bisector point, already star-mapped, lies on this trimmed
    /// signed branch.
    fn branch_contains(&self, sites: &[Site], star: Point) -> bool {
        match &self.bisector.kind {
            BisectorKind::Line => {
                let (s0, s1) = self.bisector.sites(sites);
                if s0.point.y == s1.point.y {
                    // vertical line: the whole locus is the plus branch
                    let mx = self.bisector.middle(sites).x;
                    return self.sign == Sign::Plus
                        && are_close(star.x, mx, 1e-9 * (1.0 + mx.abs()));
                }
                let sx = s0.point.x;
                match self.sign {
                    Sign::Minus => sx >= star.x,
                    Sign::Plus => sx <= star.x,
                }
            }
            // the folded weighted cases make the plain side test wrong;
            // re-derive the branch x at this sweep height instead
            BisectorKind::Conic(_) => match self.star_x_at(sites, star.y) {
                Some(x) => are_close(x, star.x, RESAMPLE_EPS * (1.0 + star.x.abs())),
                None => false,
            },
        }
    }

    /// Intersections of two boundaries: the future circle events they imply.
    ///
    /// Returns `(point, star)` pairs: the candidate diagram vertex and its
    /// sweep-ordering image. Only points lying on both trimmed signed branches
    /// survive. Never called on two boundaries of the same bisector.
    pub fn intersections(&self, sites: &[Site], other: &Boundary) -> Vec<(Point, Point)> {
        let self_site = self.site(sites);
        let other_site = other.site(sites);

        // sign combinations that cannot meet: a minus branch running left
        // cannot reach a plus branch starting further right, and conversely
        let impossible = (self_site.point.x < other_site.point.x
            && self.sign == Sign::Minus
            && other.sign == Sign::Plus)
            || (self_site.point.x > other_site.point.x
                && self.sign == Sign::Plus
                && other.sign == Sign::Minus)
            || (self_site.point == other_site.point && self_site.weight == other_site.weight)
            || self.bisector.is_same_slope(sites, &other.bisector);
        if impossible {
            debugln!("boundary pair cannot intersect: {:?} {:?}", self, other);
            return Vec::new();
        }

        self.bisector
            .intersections(sites, &other.bisector)
            .into_iter()
            .filter_map(|p| {
                let star = self.star(sites, p);
                (self.branch_contains(sites, star) && other.branch_contains(sites, star))
                    .then_some((p, star))
            })
            .collect()
    }
}
