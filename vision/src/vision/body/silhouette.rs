use opencv::core::{Point, Rect, Vector};

/// Reference points on the body hull, taken along the frame's fixed axes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyExtrema {
    /// Largest x.
    pub head: Point,
    /// Smallest x.
    pub tail: Point,
    /// Largest y.
    pub left: Point,
    /// Smallest y.
    pub right: Point,
}

#[derive(Debug, Clone)]
pub struct BodySilhouette {
    pub bbox: Rect,
    /// Bounding box center, not the contour centroid.
    pub center: Point,
    pub contour: Vector<Point>,
    pub area: f64,
    pub extrema: BodyExtrema,
}
