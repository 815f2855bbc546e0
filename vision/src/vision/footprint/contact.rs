use opencv::{
    core::{Mat, Rect, Vec3b},
    prelude::*,
};

use crate::{config::ContactConfig, utils::count_in_range};

/// Pixel counts inside the tracked print's bounding crop.
pub struct ContactMeasurement {
    /// Untouched copy of the crop.
    pub crop: Mat,
    /// Crop with the boosted green channel, the image the pressure count is taken on.
    pub highlighted: Mat,
    pub contact_pixels: i32,
    pub pressure_pixels: i32,
}

impl ContactMeasurement {
    /// Pressure to contact ratio, `None` when no contact pixel was found.
    pub fn metric(&self) -> Option<f64> {
        if self.contact_pixels == 0 {
            None
        } else {
            Some(self.pressure_pixels as f64 / self.contact_pixels as f64)
        }
    }
}

pub fn measure_contact(frame: &Mat, bbox: Rect, config: &ContactConfig) -> anyhow::Result<ContactMeasurement> {
    let crop = Mat::roi(frame, bbox)?.try_clone()?;
    let contact_pixels = count_in_range(&crop, &config.contact)?;

    let mut highlighted = crop.try_clone()?;
    boost_green(&mut highlighted, config.green_boost)?;
    let pressure_pixels = count_in_range(&highlighted, &config.pressure)?;

    Ok(ContactMeasurement {
        crop,
        highlighted,
        contact_pixels,
        pressure_pixels,
    })
}

/// Adds `amount` to the green channel, wrapping on overflow.
///
/// Bright greens wrap into dark values, which is what lets the pressure range pick them up.
pub fn boost_green(img: &mut Mat, amount: u8) -> anyhow::Result<()> {
    for px in img.data_typed_mut::<Vec3b>()? {
        px[1] = px[1].wrapping_add(amount);
    }
    Ok(())
}
