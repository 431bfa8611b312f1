//! docuscan — document boundary detection and perspective correction.
//!
//! Locates a document's quadrilateral boundary in a photographed or
//! live-camera frame, tracks boundary stability across frames to decide when
//! to auto-capture, and produces a de-skewed output image. The pipeline
//! stages are:
//!
//! 1. **Preprocess** – bounded downscale, grayscale, Gaussian blur, Otsu
//!    binarization.
//! 2. **Edges** – Canny edge detection plus gap-bridging dilation.
//! 3. **Contour** – ranked candidate contours, polygon approximation,
//!    min-area-rect force fit, aspect-ratio gate.
//! 4. **Curvature** – per-edge bulge points for non-flat pages.
//! 5. **Stability** – per-session state machine emitting a single
//!    "document stable" event for auto-capture.
//! 6. **Warp** – curvature-refined 4-point homography and bilinear
//!    perspective correction.
//!
//! # Concurrency contract
//!
//! [`Detector::detect`] is synchronous and takes `&self`; run at most one
//! detection per frame stream at a time, dropping or superseding frames
//! rather than queuing them. [`StabilityTracker::observe`] takes `&mut
//! self`, so in-order single-writer application of results is enforced by
//! the borrow checker. [`DetectionResult`] is an owned value and may be
//! marshaled freely to other threads; dropping an unconsumed result
//! publishes nothing.

mod contour;
mod curvature;
mod detector;
mod edges;
mod preprocess;
mod quad;
mod stability;
mod warp;

pub use contour::{fit_quadrilateral, ContourConfig};
pub use curvature::{estimate_curvature, is_document_flat, CurvatureConfig, CurvaturePoint};
pub use detector::{DetectConfig, Detector};
pub use edges::{edge_map, EdgeConfig};
pub use preprocess::{preprocess, Preprocessed, PreprocessConfig};
pub use quad::{distance, distance_to_line, order_vertices, Point2D, Quadrilateral};
pub use stability::{StabilityConfig, StabilityEvent, StabilityTracker};
pub use warp::{rectify, refine_corners, WarpConfig, WarpError};

/// Per-frame detection outcome.
///
/// Produced fresh for every frame and never mutated after construction.
/// Detection-inconclusive conditions surface as `NotDetected`, never as an
/// error: the stream is inherently self-retrying on the next frame.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum DetectionResult {
    /// A document boundary was found.
    Detected {
        /// Corners in canonical order, source-image coordinates.
        vertices: Quadrilateral,
        /// One bulge point per edge, aligned with the quadrilateral's edges.
        curvature: [CurvaturePoint; 4],
    },
    /// No usable boundary in this frame.
    NotDetected,
}

impl DetectionResult {
    pub fn is_detected(&self) -> bool {
        matches!(self, Self::Detected { .. })
    }
}

/// Why a single frame failed to produce a boundary.
///
/// Every variant except `InvalidInput` is an ordinary inconclusive-frame
/// condition; the [`Detector`] absorbs all of them into
/// [`DetectionResult::NotDetected`].
#[derive(Debug, Clone, PartialEq)]
pub enum DetectError {
    /// Empty or malformed source image.
    InvalidInput(String),
    /// The edge map contained no external contours.
    NoContours,
    /// No candidate contour approximated to a usable polygon.
    NoQuadrilateral,
    /// The fitted quadrilateral failed the aspect-ratio gate.
    ImplausibleShape { aspect: f64 },
}

impl std::fmt::Display for DetectError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidInput(msg) => write!(f, "invalid input: {}", msg),
            Self::NoContours => write!(f, "no contours found"),
            Self::NoQuadrilateral => write!(f, "no usable quadrilateral candidate"),
            Self::ImplausibleShape { aspect } => {
                write!(f, "implausible aspect ratio: {:.2}", aspect)
            }
        }
    }
}

impl std::error::Error for DetectError {}
