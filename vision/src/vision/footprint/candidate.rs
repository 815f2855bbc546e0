use opencv::core::{Mat, Point, Rect, Vector};

/// One connected colored region of a frame, before merging.
#[derive(Debug, Clone)]
pub struct FootprintCandidate {
    /// Contour centroid, bounding box center when the contour has no area.
    pub center: Point,
    pub area: f64,
    pub bbox: Rect,
    pub contour: Vector<Point>,
    /// Fitted ellipse angle in degrees, absent for contours under 5 points.
    pub angle: Option<f32>,
}

/// Candidates joined by proximity, represented by the hull of their contours.
#[derive(Debug, Clone)]
pub struct FootprintGroup {
    /// Indices into the candidate list the group was built from.
    pub members: Vec<usize>,
    pub hull: Vector<Point>,
    pub area: f64,
    pub bbox: Rect,
    /// Bounding box center of the hull.
    pub center: Point,
}

pub struct FootprintDetection {
    /// Sorted by area, largest first.
    pub candidates: Vec<FootprintCandidate>,
    /// Cleaned binary mask (0/255).
    pub mask: Mat,
}
