// crates/aggrow-core/src/grow.rs

//! Grow functions: how a glyph's radius depends on weight and time, and
//! how distances are measured.
//!
//! A grow function is a (shape, speed) pair. The shape picks the metric
//! (circles → Euclidean, squares → Chebyshev); the speed picks the radius
//! law. All interaction times are computed analytically:
//!
//! - linear: `r(t) = t·w`, two glyphs close a gap `d` at `t = d/(w_a+w_b)`
//! - linear-area: `r(t) = t·√w`, same with square-rooted rates
//! - logarithmic: `r(t) = fA·log₂(1 + t·w)` with `fA` calibrated so that
//!   `fA·log₂(N_total) = MAX_RADIUS`
//!
//! Negative or non-finite solutions mean "never" and are reported as
//! `f64::INFINITY`. Compression multiplies the speed-transformed weight
//! and adds a border of `2·level` around the shape.

use crate::geometry::{
    chebyshev, chebyshev_to_rect, distance_to_side, euclidean, euclidean_to_rect, Rect, Side,
};
use crate::glyph::Glyph;
use serde::{Deserialize, Serialize};

/// Glyph shape, which fixes the distance metric.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum Shape {
    /// Disks; Euclidean distance.
    Circles,
    /// Axis-aligned squares; Chebyshev distance.
    Squares,
}

/// Radius law.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum Speed {
    /// `r(t) = t·w`.
    Linear,
    /// `r(t) = t·√w`; area grows linearly in weight.
    LinearArea,
    /// `r(t) = fA·log₂(1 + t·w)`.
    Logarithmic,
}

/// A fully determined grow function.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct GrowFunction {
    pub shape: Shape,
    pub speed: Speed,
    /// Logarithmic scale factor; set by [`Self::calibrate`], unused by the
    /// linear speeds.
    fa: f64,
}

impl GrowFunction {
    #[must_use]
    pub const fn new(shape: Shape, speed: Speed) -> Self {
        Self {
            shape,
            speed,
            fa: 1.0,
        }
    }

    /// Scale the logarithmic speed so the heaviest possible glyph reaches
    /// `max_radius`: `fA·log₂(total_weight) = max_radius`.
    pub fn calibrate(&mut self, total_weight: u64, max_radius: f64) {
        #[allow(clippy::cast_precision_loss)]
        let lg = (total_weight as f64).log2();
        self.fa = if lg > 0.0 { max_radius / lg } else { max_radius };
    }

    #[inline]
    #[must_use]
    pub const fn scale(&self) -> f64 {
        self.fa
    }

    /// Speed-transformed growth rate, compression applied.
    #[inline]
    #[must_use]
    pub fn rate(&self, g: &Glyph) -> f64 {
        #[allow(clippy::cast_precision_loss)]
        let n = g.n as f64;
        match self.speed {
            Speed::Linear | Speed::Logarithmic => g.factor * n,
            Speed::LinearArea => g.factor * n.sqrt(),
        }
    }

    /// Radius of `g` at time `t` (compression border excluded).
    #[must_use]
    pub fn radius(&self, g: &Glyph, t: f64) -> f64 {
        let w = self.rate(g);
        match self.speed {
            Speed::Linear | Speed::LinearArea => t * w,
            Speed::Logarithmic => self.fa * (1.0 + t * w).log2(),
        }
    }

    /// Radius plus the compression border of `2·level`.
    #[inline]
    #[must_use]
    pub fn size_at(&self, g: &Glyph, t: f64) -> f64 {
        self.radius(g, t) + g.border()
    }

    /// Metric distance between two points under this shape.
    #[inline]
    #[must_use]
    pub fn dist(&self, ax: f64, ay: f64, bx: f64, by: f64) -> f64 {
        match self.shape {
            Shape::Circles => euclidean(ax, ay, bx, by),
            Shape::Squares => chebyshev(ax, ay, bx, by),
        }
    }

    /// Metric distance from a point to a rectangle (0 inside).
    #[inline]
    #[must_use]
    pub fn dist_to_rect(&self, x: f64, y: f64, rect: &Rect) -> f64 {
        match self.shape {
            Shape::Circles => euclidean_to_rect(x, y, rect),
            Shape::Squares => chebyshev_to_rect(x, y, rect),
        }
    }

    /// Earliest `t ≥ 0` at which the boundaries of `a` and `b` touch, or
    /// `f64::INFINITY` when they never do.
    #[must_use]
    pub fn intersect_at(&self, a: &Glyph, b: &Glyph) -> f64 {
        let d = self.dist(a.x, a.y, b.x, b.y) - a.border() - b.border();
        self.time_to_span(d, self.rate(a), self.rate(b))
    }

    /// Earliest `t ≥ 0` at which `g`'s shape reaches `rect`.
    #[must_use]
    pub fn enter_at(&self, g: &Glyph, rect: &Rect) -> f64 {
        let d = self.dist_to_rect(g.x, g.y, rect) - g.border();
        self.time_to_reach(d, self.rate(g))
    }

    /// Earliest `t ≥ 0` at which `g`'s shape crosses the line carrying the
    /// given side of `rect`; with `rect` a cell this is the out-of-cell time.
    #[must_use]
    pub fn exit_at(&self, g: &Glyph, rect: &Rect, side: Side) -> f64 {
        let d = distance_to_side(g.x, g.y, rect, side) - g.border();
        self.time_to_reach(d, self.rate(g))
    }

    /// Does `g`'s bordered shape touch `rect` at time `t`?
    #[must_use]
    pub fn touches(&self, g: &Glyph, t: f64, rect: &Rect, eps: f64) -> bool {
        self.dist_to_rect(g.x, g.y, rect) <= self.size_at(g, t) + eps
    }

    /// Solve `r(t) = d` for one glyph with rate `w`.
    fn time_to_reach(&self, d: f64, w: f64) -> f64 {
        if d <= 0.0 {
            return 0.0;
        }
        let t = match self.speed {
            Speed::Linear | Speed::LinearArea => d / w,
            Speed::Logarithmic => ((d / self.fa).exp2() - 1.0) / w,
        };
        sanitize(t)
    }

    /// Solve `r_a(t) + r_b(t) = d` for two glyphs with rates `wa`, `wb`.
    fn time_to_span(&self, d: f64, wa: f64, wb: f64) -> f64 {
        if d <= 0.0 {
            return 0.0;
        }
        let t = match self.speed {
            Speed::Linear | Speed::LinearArea => d / (wa + wb),
            Speed::Logarithmic => {
                // (1 + t·wa)(1 + t·wb) = 2^(d/fA), quadratic in t.
                let big = (d / self.fa).exp2();
                let disc = wa * wa + 4.0 * wa * wb * big - 2.0 * wa * wb + wb * wb;
                (disc.sqrt() - wa - wb) / (2.0 * wa * wb)
            }
        };
        sanitize(t)
    }
}

/// Map NaN/negative solver output to "never".
#[inline]
fn sanitize(t: f64) -> f64 {
    if t.is_finite() && t >= 0.0 {
        t
    } else {
        f64::INFINITY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn glyph(x: f64, y: f64, n: u64) -> Glyph {
        Glyph::new(x, y, n)
    }

    #[test]
    fn linear_squares_unit_pair() {
        let gf = GrowFunction::new(Shape::Squares, Speed::Linear);
        let a = glyph(-1.0, 0.0, 1);
        let b = glyph(1.0, 0.0, 1);
        assert!((gf.intersect_at(&a, &b) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn linear_circles_weighted_pair() {
        let gf = GrowFunction::new(Shape::Circles, Speed::Linear);
        let a = glyph(0.0, 0.0, 4);
        let b = glyph(10.0, 0.0, 1);
        assert!((gf.intersect_at(&a, &b) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn chebyshev_diagonal_corners_touch_like_adjacent_ones() {
        let gf = GrowFunction::new(Shape::Squares, Speed::Linear);
        let a = glyph(0.0, 0.0, 1);
        let diag = glyph(1.0, 1.0, 1);
        let adj = glyph(1.0, 0.0, 1);
        assert!((gf.intersect_at(&a, &diag) - 0.5).abs() < 1e-12);
        assert!((gf.intersect_at(&a, &adj) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn area_speed_with_compression_factor() {
        let gf = GrowFunction::new(Shape::Squares, Speed::LinearArea);
        let mut a = glyph(0.0, 0.0, 2000);
        let mut b = glyph(80.0, 0.0, 2000);
        for g in [&mut a, &mut b] {
            g.level = 1;
            g.factor = 0.5;
        }
        // Rate is 0.5·√2000 per glyph; the gap shrinks by both borders.
        let d = 80.0 - a.border() - b.border();
        let expect = d / (2.0 * 0.5 * 2000f64.sqrt());
        assert!((gf.intersect_at(&a, &b) - expect).abs() < 1e-12);
    }

    #[test]
    fn logarithmic_closed_form_matches_symmetric_case() {
        let mut gf = GrowFunction::new(Shape::Circles, Speed::Logarithmic);
        gf.fa = 1.0;
        let a = glyph(0.0, 0.0, 1);
        let b = glyph(6.0, 0.0, 1);
        // log₂(1+t) + log₂(1+t) = 6 ⇒ t = 2³ − 1.
        let t = gf.intersect_at(&a, &b);
        assert!((t - 7.0).abs() < 1e-9);
        let met = gf.radius(&a, t) + gf.radius(&b, t);
        assert!((met - 6.0).abs() < 1e-9);
    }

    #[test]
    fn calibrate_fixes_max_radius() {
        let mut gf = GrowFunction::new(Shape::Circles, Speed::Logarithmic);
        gf.calibrate(1024, 256.0);
        assert!((gf.scale() * 1024f64.log2() - 256.0).abs() < 1e-9);
    }

    #[test]
    fn exit_time_reaches_the_side() {
        let gf = GrowFunction::new(Shape::Squares, Speed::Linear);
        let g = glyph(3.0, 4.0, 2);
        let cell = Rect::new(0.0, 0.0, 8.0, 8.0);
        for side in Side::ALL {
            let t = gf.exit_at(&g, &cell, side);
            let d = distance_to_side(g.x, g.y, &cell, side);
            assert!((gf.radius(&g, t) - d).abs() < 1e-12);
        }
    }

    #[test]
    fn impossible_times_are_never() {
        assert_eq!(sanitize(f64::NAN), f64::INFINITY);
        assert_eq!(sanitize(-1.0), f64::INFINITY);
        assert_eq!(sanitize(3.5), 3.5);
    }

    #[test]
    fn touching_glyphs_merge_immediately() {
        let gf = GrowFunction::new(Shape::Circles, Speed::Linear);
        let mut a = glyph(0.0, 0.0, 1);
        let b = glyph(1.0, 0.0, 1);
        a.level = 1; // border 2 already overlaps b
        assert_eq!(gf.intersect_at(&a, &b), 0.0);
    }
}
