pub mod candidate;
pub mod classify;
pub mod contact;
pub mod filter;
pub mod segment;

use opencv::{
    core::{Mat, Point, Scalar, Vector},
    imgproc::{
        bounding_rect, contour_area, find_contours_def, fit_ellipse, moments, put_text, CHAIN_APPROX_SIMPLE,
        FONT_HERSHEY_SIMPLEX, LINE_8, RETR_EXTERNAL,
    },
    prelude::*,
};

use crate::{
    config::FootprintConfig,
    utils::{rect_center, to_vector2},
    vision::geometry::{cluster_by_proximity, merged_hull},
};

pub use candidate::{FootprintCandidate, FootprintDetection, FootprintGroup};
pub use classify::{classify_paw, PawSide};
pub use contact::{measure_contact, ContactMeasurement};

/// Segments print-colored regions and returns them largest first, together with the cleaned mask.
pub fn detect_footprints(frame: &Mat, config: &FootprintConfig) -> anyhow::Result<FootprintDetection> {
    let mask = segment::footprint_mask(frame, config)?;

    let mut contours: Vector<Vector<Point>> = Vector::new();
    find_contours_def(&mask, &mut contours, RETR_EXTERNAL, CHAIN_APPROX_SIMPLE)?;

    let bounds = filter::area_bounds(config, frame.size()?);
    let mut candidates = Vec::new();
    for contour in contours.iter() {
        let area = contour_area(&contour, false)?;
        if !filter::within_bounds(area, bounds) {
            continue;
        }
        candidates.push(make_candidate(contour, area)?);
    }

    candidates.sort_by(|a, b| b.area.total_cmp(&a.area));

    Ok(FootprintDetection { candidates, mask })
}

fn make_candidate(contour: Vector<Point>, area: f64) -> anyhow::Result<FootprintCandidate> {
    let bbox = bounding_rect(&contour)?;
    let m = moments(&contour, false)?;
    let center = if m.m00 != 0.0 {
        Point::new((m.m10 / m.m00) as i32, (m.m01 / m.m00) as i32)
    } else {
        rect_center(&bbox)
    };

    let angle = if contour.len() >= 5 {
        match fit_ellipse(&contour) {
            Ok(ellipse) => Some(ellipse.angle),
            Err(e) => {
                log::debug!("Ellipse fit failed for print at {center:?}: {e}");
                None
            }
        }
    } else {
        None
    };

    Ok(FootprintCandidate {
        center,
        area,
        bbox,
        contour,
        angle,
    })
}

/// Merges nearby candidates (toe marks of one paw) and returns the group with the largest hull area.
pub fn select_tracked_footprint(
    candidates: &[FootprintCandidate],
    merge_distance: f64,
) -> anyhow::Result<Option<FootprintGroup>> {
    if candidates.is_empty() {
        return Ok(None);
    }

    let centers: Vec<_> = candidates.iter().map(|c| to_vector2(c.center)).collect();

    let mut best: Option<FootprintGroup> = None;
    for members in cluster_by_proximity(&centers, merge_distance) {
        let hull = merged_hull(members.iter().map(|&i| &candidates[i].contour))?;
        let area = contour_area(&hull, false)?;
        if best.as_ref().is_some_and(|b| b.area >= area) {
            continue;
        }

        let bbox = bounding_rect(&hull)?;
        best = Some(FootprintGroup {
            members,
            hull,
            area,
            bbox,
            center: rect_center(&bbox),
        });
    }

    Ok(best)
}

/// Pastes the highlighted crop into the paws view and labels it with the counts and paw side.
pub fn draw_tracked_footprint(
    paws_view: &mut Mat,
    group: &FootprintGroup,
    measurement: &ContactMeasurement,
    side: PawSide,
) -> anyhow::Result<()> {
    let bbox = group.bbox;
    {
        let mut target = Mat::roi_mut(paws_view, bbox)?;
        measurement.highlighted.copy_to(&mut *target)?;
    }

    put_text(
        paws_view,
        &measurement.contact_pixels.to_string(),
        Point::new(bbox.x + 10, bbox.y + 10),
        FONT_HERSHEY_SIMPLEX,
        0.3,
        Scalar::new(0.0, 255.0, 255.0, 0.0),
        1,
        LINE_8,
        false,
    )?;
    put_text(
        paws_view,
        side.as_str(),
        Point::new(bbox.x + bbox.width, bbox.y + bbox.height),
        FONT_HERSHEY_SIMPLEX,
        1.4,
        Scalar::new(255.0, 255.0, 255.0, 0.0),
        3,
        LINE_8,
        false,
    )?;

    Ok(())
}
