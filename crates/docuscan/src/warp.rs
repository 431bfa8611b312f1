//! Perspective correction: corner refinement, 4-point DLT homography, and
//! bilinear inverse-mapping warp.
//!
//! The projective mapping assumes a planar quad; blending each corner toward
//! its adjacent curvature point compensates for slight page curvature near
//! the corners before that linear mapping is computed.

use image::{DynamicImage, GenericImageView, Rgba, RgbaImage};
use nalgebra::{DMatrix, Matrix3, Vector3};

use crate::curvature::CurvaturePoint;
use crate::quad::{order_vertices, Point2D, Quadrilateral};

// ── Error type ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum WarpError {
    /// Source image has a zero dimension.
    EmptySource,
    /// Requested output width or height is zero.
    EmptyTarget,
    /// The homography solve failed (degenerate corner geometry).
    NumericalFailure(String),
}

impl std::fmt::Display for WarpError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptySource => write!(f, "source image is empty"),
            Self::EmptyTarget => write!(f, "target size must be non-zero"),
            Self::NumericalFailure(msg) => write!(f, "numerical failure: {}", msg),
        }
    }
}

impl std::error::Error for WarpError {}

// ── Configuration ────────────────────────────────────────────────────────

/// Perspective warp configuration.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct WarpConfig {
    /// Weight of the adjacent curvature point when refining each corner:
    /// `refined = (1 - w) * vertex + w * curve`. Zero skips refinement
    /// entirely (pure projective mapping).
    pub corner_blend: f64,
}

impl Default for WarpConfig {
    fn default() -> Self {
        Self { corner_blend: 0.3 }
    }
}

// ── Corner refinement ────────────────────────────────────────────────────

/// Blend each corner toward the curvature point of its leading edge, then
/// re-canonicalize the order (blending can perturb ordering for
/// near-degenerate quads).
pub fn refine_corners(
    quad: &Quadrilateral,
    curvature: &[CurvaturePoint; 4],
    corner_blend: f64,
) -> [Point2D; 4] {
    let w = corner_blend;
    let refined = [0, 1, 2, 3].map(|i| {
        let vertex = quad.points()[i];
        let curve = curvature[i].point;
        Point2D::new(
            vertex.x * (1.0 - w) + curve.x * w,
            vertex.y * (1.0 - w) + curve.y * w,
        )
    });
    order_vertices(refined)
}

// ── Homography (DLT with Hartley normalization) ──────────────────────────

/// Project a 2D point through a 3×3 homography: H * [x, y, 1]^T → [u, v].
fn project(h: &Matrix3<f64>, x: f64, y: f64) -> [f64; 2] {
    let p = h * Vector3::new(x, y, 1.0);
    if p[2].abs() < 1e-15 {
        return [f64::NAN, f64::NAN];
    }
    [p[0] / p[2], p[1] / p[2]]
}

/// Translate centroid to origin, scale so mean distance from origin is
/// sqrt(2).
fn normalize_points(pts: &[[f64; 2]; 4]) -> (Matrix3<f64>, [[f64; 2]; 4]) {
    let cx: f64 = pts.iter().map(|p| p[0]).sum::<f64>() / 4.0;
    let cy: f64 = pts.iter().map(|p| p[1]).sum::<f64>() / 4.0;

    let mean_dist: f64 = pts
        .iter()
        .map(|p| ((p[0] - cx).powi(2) + (p[1] - cy).powi(2)).sqrt())
        .sum::<f64>()
        / 4.0;

    let s = if mean_dist > 1e-15 {
        std::f64::consts::SQRT_2 / mean_dist
    } else {
        1.0
    };

    let t = Matrix3::new(s, 0.0, -s * cx, 0.0, s, -s * cy, 0.0, 0.0, 1.0);
    let normalized = pts.map(|p| [s * (p[0] - cx), s * (p[1] - cy)]);
    (t, normalized)
}

/// Estimate the homography mapping the 4 `src` points onto the 4 `dst`
/// points via DLT: solve for the eigenvector of the smallest eigenvalue of
/// A^T A, then denormalize.
fn estimate_homography(
    src: &[[f64; 2]; 4],
    dst: &[[f64; 2]; 4],
) -> Result<Matrix3<f64>, WarpError> {
    let (t_src, src_n) = normalize_points(src);
    let (t_dst, dst_n) = normalize_points(dst);

    let mut a = DMatrix::zeros(8, 9);
    for i in 0..4 {
        let (sx, sy) = (src_n[i][0], src_n[i][1]);
        let (dx, dy) = (dst_n[i][0], dst_n[i][1]);

        a[(2 * i, 3)] = -sx;
        a[(2 * i, 4)] = -sy;
        a[(2 * i, 5)] = -1.0;
        a[(2 * i, 6)] = dy * sx;
        a[(2 * i, 7)] = dy * sy;
        a[(2 * i, 8)] = dy;

        a[(2 * i + 1, 0)] = sx;
        a[(2 * i + 1, 1)] = sy;
        a[(2 * i + 1, 2)] = 1.0;
        a[(2 * i + 1, 6)] = -dx * sx;
        a[(2 * i + 1, 7)] = -dx * sy;
        a[(2 * i + 1, 8)] = -dx;
    }

    let ata = a.transpose() * &a;
    let eig = nalgebra::SymmetricEigen::new(ata);

    let mut min_idx = 0;
    let mut min_val = eig.eigenvalues[0].abs();
    for i in 1..9 {
        let v = eig.eigenvalues[i].abs();
        if v < min_val {
            min_val = v;
            min_idx = i;
        }
    }
    let hv: Vec<f64> = (0..9).map(|j| eig.eigenvectors[(j, min_idx)]).collect();
    let h_norm = Matrix3::new(hv[0], hv[1], hv[2], hv[3], hv[4], hv[5], hv[6], hv[7], hv[8]);

    let t_dst_inv = t_dst
        .try_inverse()
        .ok_or_else(|| WarpError::NumericalFailure("T_dst not invertible".into()))?;
    let h = t_dst_inv * h_norm * t_src;

    let scale = h[(2, 2)];
    if scale.abs() < 1e-15 {
        Ok(h)
    } else {
        Ok(h / scale)
    }
}

// ── Warp ─────────────────────────────────────────────────────────────────

const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// Snap tolerance for coordinates that land epsilon-outside the source due
/// to homography round-off.
const EDGE_SNAP: f64 = 1e-6;

fn sample_bilinear(src: &RgbaImage, x: f64, y: f64) -> Rgba<u8> {
    if !x.is_finite() || !y.is_finite() {
        return TRANSPARENT;
    }
    let max_x = f64::from(src.width() - 1);
    let max_y = f64::from(src.height() - 1);
    let x = if x < 0.0 && x > -EDGE_SNAP { 0.0 } else { x };
    let y = if y < 0.0 && y > -EDGE_SNAP { 0.0 } else { y };
    let x = if x > max_x && x < max_x + EDGE_SNAP { max_x } else { x };
    let y = if y > max_y && y < max_y + EDGE_SNAP { max_y } else { y };
    if x < 0.0 || y < 0.0 || x > max_x || y > max_y {
        return TRANSPARENT;
    }

    let x0 = x.floor() as u32;
    let y0 = y.floor() as u32;
    let x1 = (x0 + 1).min(src.width() - 1);
    let y1 = (y0 + 1).min(src.height() - 1);
    let fx = x - f64::from(x0);
    let fy = y - f64::from(y0);

    let p00 = src.get_pixel(x0, y0);
    let p10 = src.get_pixel(x1, y0);
    let p01 = src.get_pixel(x0, y1);
    let p11 = src.get_pixel(x1, y1);

    let mut out = [0u8; 4];
    for c in 0..4 {
        let v = f64::from(p00[c]) * (1.0 - fx) * (1.0 - fy)
            + f64::from(p10[c]) * fx * (1.0 - fy)
            + f64::from(p01[c]) * (1.0 - fx) * fy
            + f64::from(p11[c]) * fx * fy;
        out[c] = v.round().clamp(0.0, 255.0) as u8;
    }
    Rgba(out)
}

/// Rectify the region bounded by `quad` into a `width` × `height` image.
///
/// Corners are refined by `config.corner_blend` toward their adjacent
/// curvature points, re-ordered, and mapped to the target rectangle corners
/// `(0,0) → (w,0) → (w,h) → (0,h)` in matching winding order. Output pixels
/// that map outside the source are fully transparent.
///
/// Precondition failures (empty source, zero target size) are rejected
/// before any pixel work; a malformed vertex count cannot occur because
/// [`Quadrilateral`] always carries exactly four corners.
pub fn rectify(
    image: &DynamicImage,
    quad: &Quadrilateral,
    curvature: &[CurvaturePoint; 4],
    width: u32,
    height: u32,
    config: &WarpConfig,
) -> Result<RgbaImage, WarpError> {
    if width == 0 || height == 0 {
        return Err(WarpError::EmptyTarget);
    }
    let (sw, sh) = image.dimensions();
    if sw == 0 || sh == 0 {
        return Err(WarpError::EmptySource);
    }

    let refined = refine_corners(quad, curvature, config.corner_blend);
    let src_pts = refined.map(|p| [p.x, p.y]);
    let dst_pts = [
        [0.0, 0.0],
        [f64::from(width), 0.0],
        [f64::from(width), f64::from(height)],
        [0.0, f64::from(height)],
    ];

    // Solve the inverse mapping (target → source) directly; the warp pulls
    // every output pixel from the source.
    let h_inv = estimate_homography(&dst_pts, &src_pts)?;

    let src = image.to_rgba8();
    let mut out = RgbaImage::new(width, height);
    for y in 0..height {
        for x in 0..width {
            let [sx, sy] = project(&h_inv, f64::from(x), f64::from(y));
            out.put_pixel(x, y, sample_bilinear(&src, sx, sy));
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn unit_square_quad(size: f64) -> Quadrilateral {
        Quadrilateral::ordered([
            Point2D::new(0.0, 0.0),
            Point2D::new(size, 0.0),
            Point2D::new(size, size),
            Point2D::new(0.0, size),
        ])
    }

    fn gradient_image(w: u32, h: u32) -> DynamicImage {
        let mut img = RgbaImage::new(w, h);
        for y in 0..h {
            for x in 0..w {
                img.put_pixel(x, y, Rgba([(x % 256) as u8, (y % 256) as u8, 7, 255]));
            }
        }
        DynamicImage::ImageRgba8(img)
    }

    #[test]
    fn homography_maps_corners_exactly() {
        let src = [[0.0, 0.0], [100.0, 0.0], [100.0, 100.0], [0.0, 100.0]];
        let dst = [[10.0, 20.0], [210.0, 30.0], [190.0, 220.0], [5.0, 200.0]];
        let h = estimate_homography(&src, &dst).unwrap();
        for (s, d) in src.iter().zip(&dst) {
            let p = project(&h, s[0], s[1]);
            assert_relative_eq!(p[0], d[0], epsilon = 1e-6);
            assert_relative_eq!(p[1], d[1], epsilon = 1e-6);
        }
    }

    #[test]
    fn axis_aligned_rectangle_warps_to_identity() {
        let image = gradient_image(100, 100);
        let quad = unit_square_quad(100.0);
        let curvature = CurvaturePoint::midpoints(&quad);
        // Pure projective mapping: refinement disabled.
        let config = WarpConfig { corner_blend: 0.0 };
        let out = rectify(&image, &quad, &curvature, 100, 100, &config).unwrap();
        let src = image.to_rgba8();
        for y in 0..100 {
            for x in 0..100 {
                assert_eq!(out.get_pixel(x, y), src.get_pixel(x, y), "mismatch at ({x}, {y})");
            }
        }
    }

    #[test]
    fn default_blend_pulls_corners_toward_curvature_points() {
        let quad = unit_square_quad(100.0);
        let curvature = CurvaturePoint::midpoints(&quad);
        let refined = refine_corners(&quad, &curvature, 0.3);
        // tl blends toward the top-edge midpoint (50, 0).
        assert_relative_eq!(refined[0].x, 15.0);
        assert_relative_eq!(refined[0].y, 0.0);
        // br blends toward the bottom-edge midpoint (50, 100).
        assert_relative_eq!(refined[2].x, 85.0);
        assert_relative_eq!(refined[2].y, 100.0);
    }

    #[test]
    fn zero_target_is_rejected_before_any_work() {
        let image = gradient_image(10, 10);
        let quad = unit_square_quad(10.0);
        let curvature = CurvaturePoint::midpoints(&quad);
        let config = WarpConfig::default();
        assert_eq!(
            rectify(&image, &quad, &curvature, 0, 50, &config).unwrap_err(),
            WarpError::EmptyTarget
        );
        assert_eq!(
            rectify(&image, &quad, &curvature, 50, 0, &config).unwrap_err(),
            WarpError::EmptyTarget
        );
    }

    #[test]
    fn empty_source_is_rejected() {
        let image = DynamicImage::new_rgba8(0, 0);
        let quad = unit_square_quad(10.0);
        let curvature = CurvaturePoint::midpoints(&quad);
        assert_eq!(
            rectify(&image, &quad, &curvature, 10, 10, &WarpConfig::default()).unwrap_err(),
            WarpError::EmptySource
        );
    }

    #[test]
    fn pixels_outside_source_are_transparent() {
        // Quad hangs off the left edge of a small source image.
        let image = gradient_image(50, 50);
        let quad = Quadrilateral::ordered([
            Point2D::new(-20.0, 0.0),
            Point2D::new(30.0, 0.0),
            Point2D::new(30.0, 50.0),
            Point2D::new(-20.0, 50.0),
        ]);
        let curvature = CurvaturePoint::midpoints(&quad);
        let config = WarpConfig { corner_blend: 0.0 };
        let out = rectify(&image, &quad, &curvature, 50, 50, &config).unwrap();
        // Left portion maps to negative source x.
        assert_eq!(out.get_pixel(0, 25)[3], 0);
        // Right portion maps inside the source.
        assert_eq!(out.get_pixel(45, 25)[3], 255);
    }

    #[test]
    fn output_has_requested_dimensions() {
        let image = gradient_image(64, 48);
        let quad = unit_square_quad(40.0);
        let curvature = CurvaturePoint::midpoints(&quad);
        let out = rectify(&image, &quad, &curvature, 200, 300, &WarpConfig::default()).unwrap();
        assert_eq!(out.dimensions(), (200, 300));
    }
}
