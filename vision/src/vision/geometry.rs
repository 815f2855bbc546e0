use nalgebra::Vector2;
use opencv::{
    core::{Point, Vector},
    imgproc::convex_hull,
    prelude::*,
};

use crate::utils::to_vector2;

/// Convex hull of a point sequence, returned as hull points.
pub fn hull_of(points: &Vector<Point>) -> anyhow::Result<Vector<Point>> {
    let mut hull: Vector<Point> = Vector::new();
    convex_hull(points, &mut hull, false, true)?;
    Ok(hull)
}

/// Finds the hull points with the largest and smallest projection onto `axis`.
///
/// The axis doesn't need to be normalized. Ties resolve to the first hull point.
/// Returns `None` for contours with fewer than 3 points.
pub fn directional_extrema(contour: &Vector<Point>, axis: &Vector2<f64>) -> anyhow::Result<Option<(Point, Point)>> {
    if contour.len() < 3 {
        return Ok(None);
    }

    let hull = hull_of(contour)?;
    let mut hull_iter = hull.iter();
    let Some(first) = hull_iter.next() else {
        return Ok(None);
    };

    let first_proj = to_vector2(first).dot(axis);
    let (mut max_pt, mut max_proj) = (first, first_proj);
    let (mut min_pt, mut min_proj) = (first, first_proj);

    for p in hull_iter {
        let proj = to_vector2(p).dot(axis);
        if proj > max_proj {
            max_pt = p;
            max_proj = proj;
        }
        if proj < min_proj {
            min_pt = p;
            min_proj = proj;
        }
    }

    Ok(Some((max_pt, min_pt)))
}

/// Partitions point indices into connected components where an edge joins two
/// points closer than `threshold`.
///
/// Groups are ordered by their smallest index and members are sorted ascending.
pub fn cluster_by_proximity(points: &[Vector2<f64>], threshold: f64) -> Vec<Vec<usize>> {
    let mut visited = vec![false; points.len()];
    let mut groups = Vec::new();

    for i in 0..points.len() {
        if visited[i] {
            continue;
        }

        visited[i] = true;
        let mut group = vec![i];
        let mut stack = vec![i];

        while let Some(j) = stack.pop() {
            for k in 0..points.len() {
                if !visited[k] && (points[j] - points[k]).norm() < threshold {
                    visited[k] = true;
                    stack.push(k);
                    group.push(k);
                }
            }
        }

        group.sort_unstable();
        groups.push(group);
    }

    groups
}

/// Convex hull of the union of several contours.
pub fn merged_hull<'a>(contours: impl IntoIterator<Item = &'a Vector<Point>>) -> anyhow::Result<Vector<Point>> {
    let union: Vector<Point> = contours.into_iter().flat_map(|c| c.iter()).collect();
    hull_of(&union)
}
