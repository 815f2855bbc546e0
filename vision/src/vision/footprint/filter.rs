use opencv::core::Size;

use crate::config::FootprintConfig;

/// Inclusive area bounds for print contours; the upper bound defaults to the frame area.
#[inline(always)]
pub fn area_bounds(config: &FootprintConfig, frame: Size) -> (f64, f64) {
    let max_area = config
        .max_area
        .unwrap_or((frame.width as f64) * (frame.height as f64));
    (config.min_area, max_area)
}

#[inline(always)]
pub fn within_bounds(area: f64, (min_area, max_area): (f64, f64)) -> bool {
    area >= min_area && area <= max_area
}
