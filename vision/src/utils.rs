use nalgebra::Vector2;
use opencv::{
    core::{count_non_zero, in_range, Mat, Point, Rect, Scalar, Size},
    imgproc::{cvt_color_def, resize, COLOR_BGR2HSV, INTER_AREA},
    prelude::*,
};

use crate::config::HsvRange;

pub fn hsv_bounds(range: &HsvRange) -> (Scalar, Scalar) {
    let [hl, sl, vl] = range.lower;
    let [hu, su, vu] = range.upper;
    (
        Scalar::new(hl as f64, sl as f64, vl as f64, 0.0),
        Scalar::new(hu as f64, su as f64, vu as f64, 0.0),
    )
}

/// Binary mask (0/255) of the BGR pixels whose HSV value lies in `range`.
pub fn hsv_mask(img_bgr: &Mat, range: &HsvRange) -> anyhow::Result<Mat> {
    let mut img_hsv = Mat::default();
    cvt_color_def(img_bgr, &mut img_hsv, COLOR_BGR2HSV)?;

    let (lower, upper) = hsv_bounds(range);
    let mut mask = Mat::default();
    in_range(&img_hsv, &lower, &upper, &mut mask)?;

    Ok(mask)
}

pub fn count_in_range(img_bgr: &Mat, range: &HsvRange) -> anyhow::Result<i32> {
    if img_bgr.empty() {
        return Ok(0);
    }
    let mask = hsv_mask(img_bgr, range)?;
    Ok(count_non_zero(&mask)?)
}

/// Bounding box center with integer halving, the convention used for both body and print centers.
pub fn rect_center(rect: &Rect) -> Point {
    Point::new(rect.x + rect.width / 2, rect.y + rect.height / 2)
}

pub fn to_vector2(p: Point) -> Vector2<f64> {
    Vector2::new(p.x as f64, p.y as f64)
}

/// Clamps a requested (x, y, w, h) region to the frame, keeping each side at least 10 px when possible.
pub fn clamp_roi(roi: [i32; 4], frame: Size) -> Rect {
    let [x, y, w, h] = roi;
    let x = x.clamp(0, (frame.width - 1).max(0));
    let y = y.clamp(0, (frame.height - 1).max(0));
    let w = w.max(10).min(frame.width - x);
    let h = h.max(10).min(frame.height - y);

    Rect::new(x, y, w, h)
}

pub fn resize_with_aspect_ratio(img: &Mat, width: i32) -> anyhow::Result<Mat> {
    let size = img.size()?;
    if size.width == 0 || size.width == width {
        return Ok(img.try_clone()?);
    }

    let ratio = width as f64 / size.width as f64;
    let height = (size.height as f64 * ratio) as i32;
    let mut resized = Mat::default();
    resize(img, &mut resized, Size::new(width, height), 0.0, 0.0, INTER_AREA)?;

    Ok(resized)
}
