use opencv::{
    core::{bitwise_and_def, extract_channel, Mat, Point, Size},
    imgproc::{
        cvt_color_def, get_structuring_element, median_blur, morphology_ex_def, threshold, COLOR_BGR2Lab,
        MORPH_CLOSE, MORPH_ELLIPSE, MORPH_OPEN, THRESH_BINARY_INV,
    },
};

use crate::{config::FootprintConfig, utils::hsv_mask};

/// Binary mask of print-colored pixels.
///
/// A pixel must pass both the HSV range and the Lab 'a' threshold. The mask is
/// then median filtered and cleaned up with an elliptic opening and closing.
pub fn footprint_mask(frame: &Mat, config: &FootprintConfig) -> anyhow::Result<Mat> {
    let mask_hsv = hsv_mask(frame, &config.hsv)?;

    let mut lab = Mat::default();
    cvt_color_def(frame, &mut lab, COLOR_BGR2Lab)?;
    let mut a = Mat::default();
    extract_channel(&lab, &mut a, 1)?;
    let mut mask_lab = Mat::default();
    threshold(&a, &mut mask_lab, config.lab_a_threshold, 255.0, THRESH_BINARY_INV)?;

    let mut combined = Mat::default();
    bitwise_and_def(&mask_hsv, &mask_lab, &mut combined)?;

    let mut despeckled = Mat::default();
    median_blur(&combined, &mut despeckled, 3)?;

    let open_kernel = ellipse_kernel(config.open_kernel)?;
    let close_kernel = ellipse_kernel(config.close_kernel)?;

    let mut opened = Mat::default();
    morphology_ex_def(&despeckled, &mut opened, MORPH_OPEN, &open_kernel)?;
    let mut closed = Mat::default();
    morphology_ex_def(&opened, &mut closed, MORPH_CLOSE, &close_kernel)?;

    Ok(closed)
}

fn ellipse_kernel(size: i32) -> anyhow::Result<Mat> {
    Ok(get_structuring_element(MORPH_ELLIPSE, Size::new(size, size), Point::new(-1, -1))?)
}
