//! Contour extraction and quadrilateral fitting.
//!
//! Candidate contours are ranked by enclosed area over a bounded set (top 5
//! inside a plausible area band) and evaluated largest-first, so the
//! tie-break rule stays auditable. When polygon approximation does not yield
//! exactly four corners, the minimum-area bounding rectangle of the
//! approximation force-fits a quadrilateral, which keeps rotated documents
//! detectable.

use std::cmp::Ordering;

use image::GrayImage;
use imageproc::contours::{find_contours, BorderType, Contour};
use imageproc::geometry::{approximate_polygon_dp, arc_length, min_area_rect};
use imageproc::point::Point as IPoint;

use crate::quad::{Point2D, Quadrilateral};
use crate::DetectError;

/// Contour fitting configuration.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ContourConfig {
    /// Minimum candidate area as a fraction of image area (rejects specks).
    pub min_area_frac: f64,
    /// Maximum candidate area as a fraction of image area (rejects
    /// whole-frame false positives).
    pub max_area_frac: f64,
    /// Number of largest candidates evaluated for polygon approximation.
    pub max_candidates: usize,
    /// Douglas-Peucker epsilon as a fraction of the closed contour perimeter.
    pub epsilon_frac: f64,
    /// Maximum accepted `max(w/h, h/w)` of the fitted quadrilateral.
    pub max_aspect_ratio: f64,
}

impl Default for ContourConfig {
    fn default() -> Self {
        Self {
            min_area_frac: 0.01,
            max_area_frac: 0.99,
            max_candidates: 5,
            epsilon_frac: 0.05,
            max_aspect_ratio: 5.0,
        }
    }
}

/// Fit the document quadrilateral from a binary edge map.
pub fn fit_quadrilateral(
    edge_map: &GrayImage,
    config: &ContourConfig,
) -> Result<Quadrilateral, DetectError> {
    let contours: Vec<Contour<i32>> = find_contours(edge_map);
    let external: Vec<&Contour<i32>> = contours
        .iter()
        .filter(|c| c.border_type == BorderType::Outer)
        .collect();
    if external.is_empty() {
        return Err(DetectError::NoContours);
    }

    let (w, h) = edge_map.dimensions();
    let image_area = f64::from(w) * f64::from(h);
    let mut candidates: Vec<(f64, &Contour<i32>)> = external
        .into_iter()
        .map(|c| (shoelace_area(&c.points), c))
        .filter(|(area, _)| {
            *area > image_area * config.min_area_frac && *area < image_area * config.max_area_frac
        })
        .collect();
    candidates.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));
    candidates.truncate(config.max_candidates);

    // Largest-area-first: the first candidate whose approximation has at
    // least 4 corners wins.
    let mut accepted: Option<Vec<IPoint<i32>>> = None;
    for (area, contour) in &candidates {
        let perimeter = arc_length(&contour.points, true);
        let epsilon = config.epsilon_frac * perimeter;
        let approx = approximate_polygon_dp(&contour.points, epsilon, true);
        if approx.len() >= 4 {
            tracing::trace!(area = *area, corners = approx.len(), "accepted contour candidate");
            accepted = Some(approx);
            break;
        }
    }
    let polygon = accepted.ok_or(DetectError::NoQuadrilateral)?;

    let corners: [IPoint<i32>; 4] = if polygon.len() == 4 {
        [polygon[0], polygon[1], polygon[2], polygon[3]]
    } else {
        // Force-fit via the minimum-area bounding rectangle.
        min_area_rect(&polygon)
    };
    let quad = Quadrilateral::ordered(corners.map(|p| Point2D::new(f64::from(p.x), f64::from(p.y))));

    let qw = quad.width();
    let qh = quad.height();
    let aspect = if qw > qh { qw / qh } else { qh / qw };
    if !aspect.is_finite() || aspect > config.max_aspect_ratio {
        return Err(DetectError::ImplausibleShape { aspect });
    }
    Ok(quad)
}

/// Enclosed polygon area by the shoelace formula.
fn shoelace_area(points: &[IPoint<i32>]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let mut acc = 0.0f64;
    for i in 0..points.len() {
        let a = points[i];
        let b = points[(i + 1) % points.len()];
        acc += f64::from(a.x) * f64::from(b.y) - f64::from(b.x) * f64::from(a.y);
    }
    acc.abs() * 0.5
}
