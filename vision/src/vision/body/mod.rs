pub mod silhouette;

use nalgebra::Vector2;
use opencv::{
    core::{Mat, Point, Scalar, Vector},
    imgproc::{
        bounding_rect, circle, contour_area, cvt_color_def, find_contours_def, median_blur, polylines, put_text,
        rectangle, threshold, CHAIN_APPROX_SIMPLE, COLOR_BGR2GRAY, FONT_HERSHEY_SIMPLEX, LINE_8, RETR_EXTERNAL,
        THRESH_BINARY, THRESH_OTSU, THRESH_TRUNC,
    },
};

use crate::{config::BodyConfig, utils::rect_center, vision::geometry::directional_extrema};

pub use silhouette::{BodyExtrema, BodySilhouette};

/// Isolates the largest silhouette in a motion-isolated frame.
///
/// Returns `None` when no external contour reaches `config.min_area`.
pub fn detect_body_pose(frame: &Mat, config: &BodyConfig) -> anyhow::Result<Option<BodySilhouette>> {
    let mask = silhouette_mask(frame, config)?;

    let mut contours: Vector<Vector<Point>> = Vector::new();
    find_contours_def(&mask, &mut contours, RETR_EXTERNAL, CHAIN_APPROX_SIMPLE)?;

    let Some((area, contour)) = largest_contour(&contours, config.min_area)? else {
        return Ok(None);
    };

    let bbox = bounding_rect(&contour)?;
    let center = rect_center(&bbox);

    let horizontal = directional_extrema(&contour, &Vector2::new(-1.0, 0.0))?;
    let vertical = directional_extrema(&contour, &Vector2::new(0.0, 1.0))?;
    let (Some((tail, head)), Some((left, right))) = (horizontal, vertical) else {
        log::warn!("Body contour with area {area} has a degenerate hull");
        return Ok(None);
    };

    Ok(Some(BodySilhouette {
        bbox,
        center,
        contour,
        area,
        extrema: BodyExtrema { head, tail, left, right },
    }))
}

/// Median filtered gray frame truncated at its Otsu level.
fn silhouette_mask(frame: &Mat, config: &BodyConfig) -> anyhow::Result<Mat> {
    let mut filtered = Mat::default();
    median_blur(frame, &mut filtered, config.blur_ksize)?;

    let mut gray = Mat::default();
    cvt_color_def(&filtered, &mut gray, COLOR_BGR2GRAY)?;

    // Otsu on a two-level frame lands on 0, which would truncate everything to black.
    let mut scratch = Mat::default();
    let level = threshold(&gray, &mut scratch, 0.0, 255.0, THRESH_BINARY | THRESH_OTSU)?;
    let mut mask = Mat::default();
    threshold(&gray, &mut mask, level.max(1.0), 255.0, THRESH_TRUNC)?;
    Ok(mask)
}

/// Largest contour of at least `min_area`. Equal areas go to the later contour.
fn largest_contour(contours: &Vector<Vector<Point>>, min_area: f64) -> anyhow::Result<Option<(f64, Vector<Point>)>> {
    let mut largest: Option<(f64, Vector<Point>)> = None;
    for contour in contours.iter() {
        let area = contour_area(&contour, false)?;
        if area < min_area {
            continue;
        }
        if largest.as_ref().map_or(true, |(best, _)| area >= *best) {
            largest = Some((area, contour));
        }
    }
    Ok(largest)
}

/// Draws the contour, box, reference points and center onto `img`.
pub fn annotate_body(img: &mut Mat, body: &BodySilhouette) -> anyhow::Result<()> {
    let white = Scalar::new(255.0, 255.0, 255.0, 0.0);

    let contours: Vector<Vector<Point>> = Vector::from_iter([body.contour.clone()]);
    polylines(img, &contours, true, white, 2, LINE_8, 0)?;
    rectangle(img, body.bbox, white, 1, LINE_8, 0)?;

    let markers = [
        (body.extrema.head, "HEAD", Scalar::new(255.0, 34.0, 155.0, 0.0), 1.0),
        (body.extrema.tail, "TAIL", Scalar::new(20.0, 255.0, 55.0, 0.0), 1.0),
        (body.extrema.right, "RIGHT", Scalar::new(100.0, 140.0, 250.0, 0.0), 0.6),
        (body.extrema.left, "LEFT", Scalar::new(255.0, 146.0, 125.0, 0.0), 0.6),
    ];
    for (pt, label, color, scale) in markers {
        circle(img, pt, 8, color, -1, LINE_8, 0)?;
        put_text(img, label, Point::new(pt.x + 8, pt.y - 8), FONT_HERSHEY_SIMPLEX, scale, white, 2, LINE_8, false)?;
    }

    circle(img, body.center, 8, Scalar::new(0.0, 0.0, 255.0, 0.0), -1, LINE_8, 0)?;
    put_text(
        img,
        "CENTER",
        Point::new(body.center.x + 5, body.center.y + 5),
        FONT_HERSHEY_SIMPLEX,
        1.4,
        white,
        3,
        LINE_8,
        false,
    )?;

    Ok(())
}
