//! Planar geometry primitives: points, quadrilaterals, canonical corner order.
//!
//! All coordinates are `f64` image-space pixels. Nothing in this module
//! depends on an imaging crate, so the geometry is testable with plain
//! numbers.

use std::cmp::Ordering;

/// A 2D image-space point.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Midpoint of the segment from `self` to `other`.
    pub fn midpoint(self, other: Point2D) -> Point2D {
        Point2D::new(0.5 * (self.x + other.x), 0.5 * (self.y + other.y))
    }
}

/// Euclidean distance between two points.
pub fn distance(a: Point2D, b: Point2D) -> f64 {
    let dx = a.x - b.x;
    let dy = a.y - b.y;
    (dx * dx + dy * dy).sqrt()
}

/// Perpendicular distance from `point` to the infinite line through
/// `line_start` and `line_end`. Returns 0 for a degenerate (zero-length) line.
pub fn distance_to_line(point: Point2D, line_start: Point2D, line_end: Point2D) -> f64 {
    let numerator = ((line_end.y - line_start.y) * point.x
        - (line_end.x - line_start.x) * point.y
        + line_end.x * line_start.y
        - line_end.y * line_start.x)
        .abs();
    let denominator = distance(line_start, line_end);
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

fn centroid(points: &[Point2D; 4]) -> Point2D {
    let x = points.iter().map(|p| p.x).sum::<f64>() / 4.0;
    let y = points.iter().map(|p| p.y).sum::<f64>() / 4.0;
    Point2D::new(x, y)
}

/// Canonically order four corners as `[top-left, top-right, bottom-right,
/// bottom-left]`, independent of input order.
///
/// Two passes: a polar-angle sort around the centroid establishes a
/// consistent winding, then extremal re-selection (min/max of `x+y` and
/// `x-y`) assigns the corner labels. The angular sort alone can mislabel
/// corners of near-square or rotated quadrilaterals; the extremal pass
/// corrects that.
pub fn order_vertices(points: [Point2D; 4]) -> [Point2D; 4] {
    let c = centroid(&points);
    let mut sorted = points;
    sorted.sort_by(|a, b| {
        polar_angle_deg(*a, c)
            .partial_cmp(&polar_angle_deg(*b, c))
            .unwrap_or(Ordering::Equal)
    });

    let tl = select(&sorted, |p| p.x + p.y, false);
    let br = select(&sorted, |p| p.x + p.y, true);
    let tr = select(&sorted, |p| p.x - p.y, true);
    let bl = select(&sorted, |p| p.x - p.y, false);
    [tl, tr, br, bl]
}

fn polar_angle_deg(p: Point2D, center: Point2D) -> f64 {
    let angle = (p.y - center.y).atan2(p.x - center.x).to_degrees();
    if angle < 0.0 {
        angle + 360.0
    } else {
        angle
    }
}

fn select(points: &[Point2D; 4], key: impl Fn(&Point2D) -> f64, max: bool) -> Point2D {
    let mut best = points[0];
    let mut best_key = key(&points[0]);
    for p in &points[1..] {
        let k = key(p);
        if (max && k > best_key) || (!max && k < best_key) {
            best = *p;
            best_key = k;
        }
    }
    best
}

/// A document boundary: four corners in canonical order
/// `[top-left, top-right, bottom-right, bottom-left]`.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Quadrilateral {
    points: [Point2D; 4],
}

impl Quadrilateral {
    /// Build a quadrilateral from four corners in any order; corners are
    /// canonically re-ordered.
    pub fn ordered(points: [Point2D; 4]) -> Self {
        Self {
            points: order_vertices(points),
        }
    }

    /// The four corners in canonical order.
    pub fn points(&self) -> &[Point2D; 4] {
        &self.points
    }

    pub fn top_left(&self) -> Point2D {
        self.points[0]
    }

    pub fn top_right(&self) -> Point2D {
        self.points[1]
    }

    pub fn bottom_right(&self) -> Point2D {
        self.points[2]
    }

    pub fn bottom_left(&self) -> Point2D {
        self.points[3]
    }

    /// Edge `i` as a `(start, end)` vertex pair. Edges are indexed
    /// `0: tl→tr, 1: tr→br, 2: br→bl, 3: bl→tl`.
    pub fn edge(&self, i: usize) -> (Point2D, Point2D) {
        (self.points[i], self.points[(i + 1) % 4])
    }

    /// Lengths of the four edges in index order.
    pub fn edge_lengths(&self) -> [f64; 4] {
        [
            distance(self.points[0], self.points[1]),
            distance(self.points[1], self.points[2]),
            distance(self.points[2], self.points[3]),
            distance(self.points[3], self.points[0]),
        ]
    }

    /// Representative width: the longer of the two horizontal edges.
    pub fn width(&self) -> f64 {
        let top = distance(self.top_left(), self.top_right());
        let bottom = distance(self.bottom_left(), self.bottom_right());
        top.max(bottom)
    }

    /// Representative height: the longer of the two vertical edges.
    pub fn height(&self) -> f64 {
        let left = distance(self.top_left(), self.bottom_left());
        let right = distance(self.top_right(), self.bottom_right());
        left.max(right)
    }

    /// Uniformly scale all corners about the origin. Used to map a boundary
    /// detected on a downscaled frame back to source coordinates.
    pub fn scaled(&self, factor: f64) -> Self {
        let mut points = self.points;
        for p in &mut points {
            p.x *= factor;
            p.y *= factor;
        }
        Self { points }
    }
}
