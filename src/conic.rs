//! Implicit conic sections and the numeric root-finding they need.
//!
//! The weighted bisector of two sites is a general conic, and circle events
//! are discovered by intersecting two of them: eliminating one variable between
//! the two implicit equations leaves a polynomial of degree at most 4 whose
//! real roots are found numerically.

/// Root pairing and result deduplication tolerance.
pub(crate) const ROOT_EPS: f64 = 1e-4;
/// Relative tolerance of the weighted-equidistance filters.
pub(crate) const DISTANCE_EPS: f64 = 1e-4;
/// Offset used to re-sample a boundary query that lands on a vertical tangent.
pub(crate) const RESAMPLE_EPS: f64 = 1e-3;
/// Coordinate quantum of the vertex deduplication registry.
pub(crate) const VERTEX_EPS: f64 = 1e-4;

/// Imaginary part below which a polynomial root counts as real.
const REAL_EPS: f64 = 1e-5;

/// Check if `a` and `b` are within `epsilon` of each other.
pub(crate) fn are_close(a: f64, b: f64, epsilon: f64) -> bool {
    (a - b).abs() <= epsilon
}

/// A conic section `ax² + bxy + cy² + dx + ey + f = 0`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Conic {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl Conic {
    pub fn new(a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Self {
        Conic { a, b, c, d, e, f }
    }

    pub fn eval(&self, x: f64, y: f64) -> f64 {
        self.a * x * x + self.b * x * y + self.c * y * y + self.d * x + self.e * y + self.f
    }

    /// The y values on the conic at a given x: the roots of a quadratic in y.
    pub fn ys_at(&self, x: f64) -> Vec<f64> {
        solve_quadratic(
            self.c,
            self.b * x + self.e,
            self.a * x * x + self.d * x + self.f,
        )
    }

    /// The x values on the conic at a given y.
    pub fn xs_at(&self, y: f64) -> Vec<f64> {
        solve_quadratic(
            self.a,
            self.b * y + self.d,
            self.c * y * y + self.e * y + self.f,
        )
    }

    /// The x locations where the two y branches of the conic meet, the roots of
    /// the discriminant of the quadratic solved by [`Conic::ys_at`]. Between
    /// consecutive tangents the branches are x-monotone.
    pub fn vertical_tangents(&self) -> Vec<f64> {
        solve_quadratic(
            self.b * self.b - 4.0 * self.c * self.a,
            2.0 * self.b * self.e - 4.0 * self.c * self.d,
            self.e * self.e - 4.0 * self.c * self.f,
        )
    }

    /// True when the equation has no y term at all, so the locus is one or two
    /// vertical lines.
    fn is_vertical(&self) -> bool {
        self.b == 0.0 && self.c == 0.0 && self.e == 0.0
    }

    /// Intersection points of two conics.
    ///
    /// One variable is eliminated by substitution, keeping the coefficient
    /// algebra exact up to f64 rounding, and the surviving polynomial in x
    /// (degree ≤ 4) is solved numerically. For each real root the y values of
    /// both conics are paired when they agree within [`ROOT_EPS`]. Tangencies
    /// and squaring artifacts can still produce spurious candidates; callers
    /// filter by the geometric property they need.
    pub fn intersections(&self, other: &Conic) -> Vec<(f64, f64)> {
        if self.is_vertical() && other.is_vertical() {
            return Vec::new();
        }
        if self.is_vertical() || other.is_vertical() {
            let (vertical, curve) = if self.is_vertical() {
                (self, other)
            } else {
                (other, self)
            };
            let mut points = Vec::new();
            for x in poly_roots(&[vertical.a, vertical.d, vertical.f]) {
                for y in curve.ys_at(x) {
                    points.push((x, y));
                }
            }
            return points;
        }

        let poly = if self.c == 0.0 && other.c == 0.0 {
            eliminate_both_linear_in_y(self, other)
        } else if self.c == 0.0 {
            eliminate_one_linear_in_y(self, other)
        } else if other.c == 0.0 {
            eliminate_one_linear_in_y(other, self)
        } else {
            eliminate_general(self, other)
        };

        let mut xs = poly_roots(&poly);
        xs.sort_by(f64::total_cmp);
        xs.dedup_by(|a, b| are_close(*a, *b, ROOT_EPS));

        let mut points = Vec::new();
        for x in xs {
            for &y in &self.ys_at(x) {
                if other.ys_at(x).iter().any(|&oy| are_close(y, oy, ROOT_EPS)) {
                    points.push((x, y));
                }
            }
        }
        points
    }
}

/// Both conics are linear in y (`c = 0`): solving each for y and equating the
/// two rational expressions leaves a cubic in x.
fn eliminate_both_linear_in_y(p: &Conic, q: &Conic) -> [f64; 5] {
    let a1 = p.a * q.b;
    let a2 = p.a * q.e + p.d * q.b;
    let a3 = p.d * q.e + p.f * q.b;
    let a4 = p.f * q.e;
    let b1 = q.a * p.b;
    let b2 = q.a * p.e + q.d * p.b;
    let b3 = q.d * p.e + q.f * p.b;
    let b4 = q.f * p.e;
    [0.0, a1 - b1, a2 - b2, a3 - b3, a4 - b4]
}

/// `p` is linear in y (`p.c = 0`), `q` is not: substitute the solved y of `p`
/// into `q` and clear denominators, a quartic in x.
fn eliminate_one_linear_in_y(p: &Conic, q: &Conic) -> [f64; 5] {
    let a = 2.0 * q.c;
    let b = p.b * q.b;
    let c = p.b * q.e + p.e * q.b;
    let d = p.e * q.e;
    let e = -a * p.a + b;
    let f = -a * p.d + c;
    let g = -a * p.f + d;
    let h1 = p.b * p.b * q.b * q.b;
    let h2 = 2.0 * p.b * p.b * q.b * q.e + 2.0 * p.b * p.e * q.b * q.b;
    let h3 = p.b * p.b * q.e * q.e + 4.0 * p.b * p.e * q.b * q.e + p.e * p.e * q.b * q.b;
    let h4 = 2.0 * p.b * p.e * q.e * q.e + 2.0 * p.e * p.e * q.b * q.e;
    let h5 = p.e * p.e * q.e * q.e;
    let i1 = 4.0 * p.b * p.b * q.c * q.a;
    let i2 = 4.0 * p.b * p.b * q.c * q.d + 8.0 * p.b * p.e * q.c * q.a;
    let i3 = 4.0 * p.b * p.b * q.c * q.f
        + 8.0 * p.b * p.e * q.c * q.d
        + 4.0 * p.e * p.e * q.c * q.a;
    let i4 = 8.0 * p.b * p.e * q.c * q.f + 4.0 * p.e * p.e * q.c * q.d;
    let i5 = 4.0 * p.e * p.e * q.c * q.f;
    let j1 = h1 - i1;
    let j2 = h2 - i2;
    let j3 = h3 - i3;
    let j4 = h4 - i4;
    let j5 = h5 - i5;
    [
        e * e - j1,
        2.0 * e * f - j2,
        f * f + 2.0 * e * g - j3,
        2.0 * f * g - j4,
        g * g - j5,
    ]
}

/// Neither conic is linear in y: scale to cancel the y² terms, isolate the
/// remaining square root and square once more, a quartic in x.
fn eliminate_general(p: &Conic, q: &Conic) -> [f64; 5] {
    let a = q.c / p.c;
    let b = q.b - a * p.b;
    let c = q.e - a * p.e;
    let d = 4.0 * q.c;
    let e = q.e * q.e - d * q.f - c * c - a * a * p.e * p.e + 4.0 * a * a * p.c * p.f;
    let f = q.b * q.b - d * q.a - b * b - a * a * p.b * p.b + 4.0 * a * a * p.c * p.a;
    let g = 2.0 * q.b * q.e - d * q.d - 2.0 * p.b * p.e * a * a + 4.0 * a * a * p.c * p.d
        - 2.0 * b * c;
    let h = (2.0 * c * a) * (2.0 * c * a);
    let i = 2.0 * b * a;
    let j = 8.0 * b * a * a * c;
    let l1 = p.b * p.b * i * i;
    let l2 = 2.0 * p.b * p.e * i * i + p.b * p.b * j;
    let l3 = p.e * p.e * i * i + 2.0 * p.b * p.e * j + p.b * p.b * h;
    let l4 = p.e * p.e * j + 2.0 * p.b * p.e * h;
    let l5 = h * p.e * p.e;
    let m1 = -(4.0 * p.c * p.a * i * i);
    let m2 = -(4.0 * p.c * p.d * i * i + 4.0 * p.c * p.a * j);
    let m3 = -(4.0 * p.c * p.f * i * i + 4.0 * p.c * p.d * j + 4.0 * p.c * p.a * h);
    let m4 = -(4.0 * p.c * p.f * j + 4.0 * p.c * p.d * h);
    let m5 = -(4.0 * p.c * p.f * h);
    let n1 = l1 + m1;
    let n2 = l2 + m2;
    let n3 = l3 + m3;
    let n4 = l4 + m4;
    let n5 = l5 + m5;
    let o1 = f * f;
    let o2 = 2.0 * f * g;
    let o3 = 2.0 * f * e + g * g;
    let o4 = 2.0 * g * e;
    let o5 = e * e;
    [n1 - o1, n2 - o2, n3 - o3, n4 - o4, n5 - o5]
}

/// Real roots of `ax² + bx + c = 0`, degenerating gracefully to the linear and
/// constant cases. A negative discriminant yields no roots, a zero one a single
/// root.
pub(crate) fn solve_quadratic(a: f64, b: f64, c: f64) -> Vec<f64> {
    if a == 0.0 {
        if b == 0.0 {
            return Vec::new();
        }
        return vec![-c / b];
    }
    let disc = b * b - 4.0 * a * c;
    if disc < 0.0 {
        return Vec::new();
    }
    if disc == 0.0 {
        return vec![-b / (2.0 * a)];
    }
    let sq = disc.sqrt();
    // the root farther from cancellation first, its sibling via Vieta
    let q = -0.5 * (b + b.signum() * sq);
    let r1 = q / a;
    let r2 = if q == 0.0 { -b / (2.0 * a) } else { c / q };
    vec![r1.min(r2), r1.max(r2)]
}

/// Real roots of a polynomial given by coefficients in descending powers, like
/// the elimination results above produce them. Degrees 0–2 are solved in closed
/// form; cubics and quartics go through a Durand–Kerner iteration on the monic
/// polynomial, keeping roots whose imaginary part is negligible.
pub(crate) fn poly_roots(coeffs: &[f64]) -> Vec<f64> {
    let scale = coeffs.iter().fold(0.0f64, |m, c| m.max(c.abs()));
    if scale == 0.0 {
        return Vec::new();
    }
    // drop leading coefficients that are pure cancellation noise
    let mut first = 0;
    while first < coeffs.len() && coeffs[first].abs() <= scale * 1e-12 {
        first += 1;
    }
    let coeffs = &coeffs[first..];
    match coeffs.len() {
        0 | 1 => Vec::new(),
        2 => vec![-coeffs[1] / coeffs[0]],
        3 => solve_quadratic(coeffs[0], coeffs[1], coeffs[2]),
        _ => durand_kerner(coeffs),
    }
}

#[derive(Clone, Copy)]
struct Complex {
    re: f64,
    im: f64,
}

impl Complex {
    fn sub(self, o: Complex) -> Complex {
        Complex {
            re: self.re - o.re,
            im: self.im - o.im,
        }
    }

    fn mul(self, o: Complex) -> Complex {
        Complex {
            re: self.re * o.re - self.im * o.im,
            im: self.re * o.im + self.im * o.re,
        }
    }

    fn div(self, o: Complex) -> Complex {
        let den = o.re * o.re + o.im * o.im;
        Complex {
            re: (self.re * o.re + self.im * o.im) / den,
            im: (self.im * o.re - self.re * o.im) / den,
        }
    }

    fn norm(self) -> f64 {
        self.re.hypot(self.im)
    }
}

/// Simultaneous root iteration on the monic polynomial. The starting points
/// `(0.4 + 0.9i)^k` are the customary non-real, non-unit seeds.
fn durand_kerner(coeffs: &[f64]) -> Vec<f64> {
    let lead = coeffs[0];
    let monic: Vec<f64> = coeffs.iter().map(|c| c / lead).collect();
    let degree = monic.len() - 1;

    let eval = |z: Complex| {
        let mut acc = Complex { re: 0.0, im: 0.0 };
        for &c in &monic {
            acc = acc.mul(z);
            acc.re += c;
        }
        acc
    };

    let seed = Complex { re: 0.4, im: 0.9 };
    let mut roots = Vec::with_capacity(degree);
    let mut z = Complex { re: 1.0, im: 0.0 };
    for _ in 0..degree {
        z = z.mul(seed);
        roots.push(z);
    }

    for _ in 0..200 {
        let mut worst = 0.0f64;
        for k in 0..degree {
            let mut den = Complex { re: 1.0, im: 0.0 };
            for j in 0..degree {
                if j != k {
                    den = den.mul(roots[k].sub(roots[j]));
                }
            }
            let delta = eval(roots[k]).div(den);
            roots[k] = roots[k].sub(delta);
            worst = worst.max(delta.norm());
        }
        if worst <= 1e-13 {
            break;
        }
    }

    roots
        .into_iter()
        .filter(|z| z.im.abs() <= REAL_EPS * (1.0 + z.re.abs()))
        .map(|z| z.re)
        .collect()
}
