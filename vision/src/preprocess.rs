use opencv::{
    core::{convert_scale_abs, insert_channel, Mat, Point, Ptr, Scalar, Size, CV_8UC1, CV_8UC3},
    imgproc::{
        get_structuring_element, morphology_ex_def, threshold, MORPH_CLOSE, MORPH_OPEN, MORPH_RECT, THRESH_BINARY,
    },
    prelude::*,
    video::{create_background_subtractor_mog2, BackgroundSubtractorMOG2},
};

use crate::config::MotionConfig;

/// Keeps only the moving pixels of a frame stream.
///
/// Holds the background model, so one isolator must see the frames of a single
/// video in order.
pub struct MotionIsolator {
    subtractor: Ptr<BackgroundSubtractorMOG2>,
    kernel: Mat,
    config: MotionConfig,
}

pub struct IsolatedFrame {
    /// Binary foreground mask (0/255) after cleanup.
    pub mask: Mat,
    /// Input pixels under the mask, black elsewhere.
    pub frame: Mat,
}

impl MotionIsolator {
    pub fn new(config: &MotionConfig) -> anyhow::Result<Self> {
        let subtractor =
            create_background_subtractor_mog2(config.history, config.var_threshold, config.detect_shadows)?;
        let kernel = get_structuring_element(
            MORPH_RECT,
            Size::new(config.kernel_size, config.kernel_size),
            Point::new(-1, -1),
        )?;

        Ok(Self {
            subtractor,
            kernel,
            config: config.clone(),
        })
    }

    pub fn isolate(&mut self, frame: &Mat) -> anyhow::Result<IsolatedFrame> {
        anyhow::ensure!(frame.typ() == CV_8UC3, "Motion isolation expects a BGR frame");

        let adjusted = apply_contrast(frame, self.config.contrast_alpha, self.config.contrast_beta)?;

        let mut raw_mask = Mat::default();
        self.subtractor.apply(&adjusted, &mut raw_mask, -1.0)?;

        let mut opened = Mat::default();
        morphology_ex_def(&raw_mask, &mut opened, MORPH_OPEN, &self.kernel)?;
        let mut closed = Mat::default();
        morphology_ex_def(&opened, &mut closed, MORPH_CLOSE, &self.kernel)?;

        let mut mask = Mat::default();
        threshold(&closed, &mut mask, self.config.binary_threshold, 255.0, THRESH_BINARY)?;

        let mut moving = Mat::new_rows_cols_with_default(frame.rows(), frame.cols(), CV_8UC3, Scalar::all(0.0))?;
        adjusted.copy_to_masked(&mut moving, &mask)?;

        if self.config.drop_red_channel {
            let zeros = Mat::new_rows_cols_with_default(frame.rows(), frame.cols(), CV_8UC1, Scalar::all(0.0))?;
            insert_channel(&zeros, &mut moving, 2)?;
        }

        Ok(IsolatedFrame { mask, frame: moving })
    }
}

/// `saturate(|alpha * px + beta|)` per channel; a no-op copy for `alpha == 1, beta == 0`.
pub fn apply_contrast(frame: &Mat, alpha: f64, beta: f64) -> anyhow::Result<Mat> {
    if alpha == 1.0 && beta == 0.0 {
        return Ok(frame.try_clone()?);
    }

    let mut adjusted = Mat::default();
    convert_scale_abs(frame, &mut adjusted, alpha, beta)?;
    Ok(adjusted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use opencv::{
        core::{count_non_zero, Rect, Vec3b},
        imgproc::{rectangle, LINE_8},
    };

    fn scene(block_x: i32) -> Mat {
        let mut img = Mat::new_rows_cols_with_default(120, 200, CV_8UC3, Scalar::new(40.0, 40.0, 40.0, 0.0)).unwrap();
        rectangle(
            &mut img,
            Rect::new(block_x, 40, 40, 40),
            Scalar::new(60.0, 200.0, 220.0, 0.0),
            -1,
            LINE_8,
            0,
        )
        .unwrap();
        img
    }

    #[test]
    fn test_static_scene_is_empty() {
        let mut isolator = MotionIsolator::new(&MotionConfig::default()).unwrap();
        let background = Mat::new_rows_cols_with_default(120, 200, CV_8UC3, Scalar::new(40.0, 40.0, 40.0, 0.0)).unwrap();

        let mut last = None;
        for _ in 0..20 {
            last = Some(isolator.isolate(&background).unwrap());
        }
        let last = last.unwrap();
        assert_eq!(count_non_zero(&last.mask).unwrap(), 0);
    }

    #[test]
    fn test_moving_block_is_kept_without_red() {
        let mut isolator = MotionIsolator::new(&MotionConfig::default()).unwrap();
        let background = Mat::new_rows_cols_with_default(120, 200, CV_8UC3, Scalar::new(40.0, 40.0, 40.0, 0.0)).unwrap();
        for _ in 0..30 {
            isolator.isolate(&background).unwrap();
        }

        let isolated = isolator.isolate(&scene(100)).unwrap();
        assert!(count_non_zero(&isolated.mask).unwrap() > 1000);

        let px = *isolated.frame.at_2d::<Vec3b>(60, 120).unwrap();
        assert_eq!(px, Vec3b::from([60, 200, 0]));

        let outside = *isolated.frame.at_2d::<Vec3b>(10, 10).unwrap();
        assert_eq!(outside, Vec3b::from([0, 0, 0]));
    }

    #[test]
    fn test_contrast_identity_and_scaling() {
        let img = Mat::new_rows_cols_with_default(2, 2, CV_8UC3, Scalar::new(10.0, 100.0, 200.0, 0.0)).unwrap();

        let same = apply_contrast(&img, 1.0, 0.0).unwrap();
        assert_eq!(same.data_bytes().unwrap(), img.data_bytes().unwrap());

        let scaled = apply_contrast(&img, 2.0, 5.0).unwrap();
        assert_eq!(*scaled.at_2d::<Vec3b>(0, 0).unwrap(), Vec3b::from([25, 205, 255]));
    }
}
