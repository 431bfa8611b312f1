//! Per-edge curvature (bulge point) estimation for non-flat documents.
//!
//! Flatness is judged from the quadrilateral alone: when opposite edges have
//! similar lengths the page is treated as flat and every bulge point is the
//! edge midpoint. Otherwise each edge is re-examined inside a padded region
//! of interest, so unrelated edges elsewhere in the frame cannot pull the
//! bulge point away from the document boundary.

use image::imageops;
use image::GrayImage;
use imageproc::edges::canny;

use crate::quad::{distance_to_line, Point2D, Quadrilateral};

/// Curvature estimation configuration.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CurvatureConfig {
    /// Opposite-edge length ratio below which the document counts as flat.
    pub flatness_ratio: f64,
    /// Deviations below this (pixels) are treated as flat per edge.
    pub min_deviation_px: f64,
    /// Padding around each edge's bounding box when cropping the ROI.
    pub roi_pad_px: u32,
    /// Canny low threshold inside the ROI.
    pub canny_low: f32,
    /// Canny high threshold inside the ROI.
    pub canny_high: f32,
}

impl Default for CurvatureConfig {
    fn default() -> Self {
        Self {
            flatness_ratio: 1.2,
            min_deviation_px: 5.0,
            roi_pad_px: 10,
            canny_low: 50.0,
            canny_high: 150.0,
        }
    }
}

/// A per-edge bulge point.
///
/// `edge` indexes the quadrilateral edge this point was computed from
/// (`0: tl→tr, 1: tr→br, 2: br→bl, 3: bl→tl`); the array returned by
/// [`estimate_curvature`] is always aligned 1:1 with those edges.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CurvaturePoint {
    pub point: Point2D,
    pub edge: usize,
    /// True when the point is an edge midpoint (flat document, or per-edge
    /// deviation below threshold).
    pub is_flat_edge: bool,
}

impl CurvaturePoint {
    /// Midpoint curvature for every edge. This is the manual-override path:
    /// user-supplied corners carry no curvature information.
    pub fn midpoints(quad: &Quadrilateral) -> [CurvaturePoint; 4] {
        [0, 1, 2, 3].map(|i| {
            let (start, end) = quad.edge(i);
            CurvaturePoint {
                point: start.midpoint(end),
                edge: i,
                is_flat_edge: true,
            }
        })
    }
}

/// Estimate one bulge point per quadrilateral edge.
///
/// `gray` is the full-resolution grayscale source frame; `quad` must be in
/// the same coordinate space.
pub fn estimate_curvature(
    gray: &GrayImage,
    quad: &Quadrilateral,
    config: &CurvatureConfig,
) -> [CurvaturePoint; 4] {
    let flat = is_document_flat(quad, config.flatness_ratio);
    [0, 1, 2, 3].map(|i| {
        let (start, end) = quad.edge(i);
        if flat {
            CurvaturePoint {
                point: start.midpoint(end),
                edge: i,
                is_flat_edge: true,
            }
        } else {
            edge_bulge_point(gray, start, end, i, config)
        }
    })
}

/// A document is flat when both opposite-edge length ratios stay below the
/// configured bound.
pub fn is_document_flat(quad: &Quadrilateral, flatness_ratio: f64) -> bool {
    let [top, right, bottom, left] = quad.edge_lengths();
    let horizontal = top.max(bottom) / top.min(bottom).max(f64::MIN_POSITIVE);
    let vertical = left.max(right) / left.min(right).max(f64::MIN_POSITIVE);
    horizontal < flatness_ratio && vertical < flatness_ratio
}

/// Find the boundary pixel with maximum perpendicular deviation from the
/// straight edge, falling back to the midpoint for negligible deviation.
fn edge_bulge_point(
    gray: &GrayImage,
    start: Point2D,
    end: Point2D,
    edge: usize,
    config: &CurvatureConfig,
) -> CurvaturePoint {
    let midpoint = start.midpoint(end);
    let (iw, ih) = gray.dimensions();

    let pad = f64::from(config.roi_pad_px);
    let x0 = (start.x.min(end.x) - pad).max(0.0) as u32;
    let y0 = (start.y.min(end.y) - pad).max(0.0) as u32;
    let x1 = ((start.x.max(end.x) + pad).ceil() as u32).min(iw);
    let y1 = ((start.y.max(end.y) + pad).ceil() as u32).min(ih);
    if x1 <= x0 || y1 <= y0 {
        return CurvaturePoint {
            point: midpoint,
            edge,
            is_flat_edge: true,
        };
    }

    let roi = imageops::crop_imm(gray, x0, y0, x1 - x0, y1 - y0).to_image();
    let roi_edges = canny(&roi, config.canny_low, config.canny_high);

    let mut max_dist = 0.0f64;
    let mut bulge = midpoint;
    for (x, y, pixel) in roi_edges.enumerate_pixels() {
        if pixel[0] == 0 {
            continue;
        }
        let p = Point2D::new(f64::from(x + x0), f64::from(y + y0));
        let dist = distance_to_line(p, start, end);
        if dist > max_dist {
            max_dist = dist;
            bulge = p;
        }
    }

    if max_dist < config.min_deviation_px {
        CurvaturePoint {
            point: midpoint,
            edge,
            is_flat_edge: true,
        }
    } else {
        CurvaturePoint {
            point: bulge,
            edge,
            is_flat_edge: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use image::Luma;

    fn rect_quad() -> Quadrilateral {
        Quadrilateral::ordered([
            Point2D::new(20.0, 20.0),
            Point2D::new(180.0, 20.0),
            Point2D::new(180.0, 120.0),
            Point2D::new(20.0, 120.0),
        ])
    }

    #[test]
    fn flat_document_uses_midpoints() {
        let gray = GrayImage::new(200, 140);
        let points = estimate_curvature(&gray, &rect_quad(), &CurvatureConfig::default());
        for (i, cp) in points.iter().enumerate() {
            assert_eq!(cp.edge, i);
            assert!(cp.is_flat_edge);
        }
        assert_relative_eq!(points[0].point.x, 100.0);
        assert_relative_eq!(points[0].point.y, 20.0);
        assert_relative_eq!(points[1].point.x, 180.0);
        assert_relative_eq!(points[1].point.y, 70.0);
    }

    #[test]
    fn flatness_judgment_uses_opposite_edge_ratios() {
        assert!(is_document_flat(&rect_quad(), 1.2));
        let trapezoid = Quadrilateral::ordered([
            Point2D::new(20.0, 20.0),
            Point2D::new(180.0, 20.0),
            Point2D::new(160.0, 180.0),
            Point2D::new(40.0, 180.0),
        ]);
        // top = 160, bottom = 120: ratio 1.33 exceeds 1.2.
        assert!(!is_document_flat(&trapezoid, 1.2));
    }

    #[test]
    fn featureless_roi_falls_back_to_midpoint() {
        let gray = GrayImage::new(200, 200);
        let trapezoid = Quadrilateral::ordered([
            Point2D::new(20.0, 20.0),
            Point2D::new(180.0, 20.0),
            Point2D::new(160.0, 180.0),
            Point2D::new(40.0, 180.0),
        ]);
        let points = estimate_curvature(&gray, &trapezoid, &CurvatureConfig::default());
        for cp in &points {
            assert!(cp.is_flat_edge);
        }
        assert_relative_eq!(points[0].point.x, 100.0);
        assert_relative_eq!(points[0].point.y, 20.0);
    }

    #[test]
    fn bulged_edge_yields_deviating_point() {
        // Bright region below a bulging top boundary: y >= 20 + bump(x),
        // where the bump peaks at ~15 px around x = 100.
        let mut gray = GrayImage::new(200, 200);
        for y in 0..200u32 {
            for x in 0..200u32 {
                let dx = (f64::from(x) - 100.0) / 60.0;
                let bump = (15.0 * (1.0 - dx * dx)).max(0.0);
                if f64::from(y) >= 20.0 + bump {
                    gray.put_pixel(x, y, Luma([240]));
                }
            }
        }
        let trapezoid = Quadrilateral::ordered([
            Point2D::new(20.0, 20.0),
            Point2D::new(180.0, 20.0),
            Point2D::new(160.0, 180.0),
            Point2D::new(40.0, 180.0),
        ]);
        let points = estimate_curvature(&gray, &trapezoid, &CurvatureConfig::default());
        let top = &points[0];
        assert!(!top.is_flat_edge);
        assert!(top.point.y > 25.0, "bulge at y = {}", top.point.y);
        assert!((top.point.x - 100.0).abs() < 50.0, "bulge at x = {}", top.point.x);
    }

    #[test]
    fn midpoints_helper_marks_all_edges_flat() {
        let points = CurvaturePoint::midpoints(&rect_quad());
        assert!(points.iter().all(|cp| cp.is_flat_edge));
        assert_relative_eq!(points[2].point.y, 120.0);
    }
}
