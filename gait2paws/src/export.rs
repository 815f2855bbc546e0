use std::{fs, path::Path};

use anyhow::Context;
use gait_vision::{config::MetricsConfig, MetricPlotter, PawObservation, PawTraces};
use opencv::{
    core::{Size, Vector},
    imgcodecs::imwrite,
    imgproc::{resize, INTER_LINEAR},
    prelude::*,
};

use crate::video::mp4_writer;

pub const METRICS_VIDEO: &str = "paw_metrics_video.mp4";
pub const METRICS_IMAGE: &str = "paw_metrics_final.png";

/// Writes the progressive metric plot video and the final plot image into `out_dir`.
///
/// Nothing is written for an empty observation list.
pub fn export_metrics(observations: &[PawObservation], config: &MetricsConfig, out_dir: &Path) -> anyhow::Result<()> {
    if observations.is_empty() {
        log::info!("No paw observations, nothing to plot");
        return Ok(());
    }

    let traces = PawTraces::from_observations(observations);
    let plotter = MetricPlotter::new(config);
    let size = Size::new(config.plot_width, config.plot_height);

    let video_path = out_dir.join(METRICS_VIDEO);
    let mut writer = mp4_writer(&video_path, config.fps, size)?;
    for frame in plotter.frames(&traces) {
        let frame = fit(frame?, size)?;
        writer.write(&frame)?;
    }
    writer.release()?;
    log::info!("Metric plot video saved to {}", video_path.display());

    let image_path = out_dir.join(METRICS_IMAGE);
    let final_plot = plotter.render_final(&traces)?;
    write_image(&image_path, &final_plot)?;
    log::info!("Final metric plot saved to {}", image_path.display());

    Ok(())
}

/// Saves an observation's crop as `<dir>/<step:03>.png`.
pub fn save_crop(dir: &Path, observation: &PawObservation) -> anyhow::Result<()> {
    if observation.paw.empty() {
        return Ok(());
    }
    let path = dir.join(format!("{:03}.png", observation.step));
    write_image(&path, &observation.paw)
}

pub fn ensure_dir(dir: &Path) -> anyhow::Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("Failed to create directory {}", dir.display()))
}

fn write_image(path: &Path, img: &Mat) -> anyhow::Result<()> {
    let path_str = path.to_string_lossy();
    if !imwrite(&path_str, img, &Vector::new())? {
        anyhow::bail!("Failed to write image {path_str}");
    }
    Ok(())
}

fn fit(frame: Mat, size: Size) -> anyhow::Result<Mat> {
    if frame.size()? == size {
        return Ok(frame);
    }
    let mut resized = Mat::default();
    resize(&frame, &mut resized, size, 0.0, 0.0, INTER_LINEAR)?;
    Ok(resized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gait_vision::PawSide;
    use opencv::{
        core::{Scalar, CV_8UC3},
        imgcodecs::{imread, IMREAD_COLOR},
    };
    use std::env;

    fn scratch_dir(name: &str) -> std::path::PathBuf {
        let dir = env::temp_dir().join(format!("gait2paws-{name}-{}", std::process::id()));
        ensure_dir(&dir).unwrap();
        dir
    }

    fn observation(step: u32) -> PawObservation {
        PawObservation {
            paw: Mat::new_rows_cols_with_default(12, 16, CV_8UC3, Scalar::new(0.0, 160.0, 0.0, 0.0)).unwrap(),
            side: PawSide::BackLeft,
            contact_pixels: 192,
            pressure_pixels: 20,
            metric: Some(20.0 / 192.0),
            step,
            time_ms: step as i64 * 40,
        }
    }

    #[test]
    fn test_empty_list_writes_nothing() {
        let dir = scratch_dir("empty");
        export_metrics(&[], &MetricsConfig::default(), &dir).unwrap();
        assert!(!dir.join(METRICS_VIDEO).exists());
        assert!(!dir.join(METRICS_IMAGE).exists());
    }

    #[test]
    fn test_crop_named_by_step() {
        let dir = scratch_dir("crops");
        save_crop(&dir, &observation(7)).unwrap();

        let img = imread(&dir.join("007.png").to_string_lossy(), IMREAD_COLOR).unwrap();
        assert_eq!(img.size().unwrap(), Size::new(16, 12));
    }

    #[test]
    fn test_final_plot_written() {
        let dir = scratch_dir("plot");
        let observations: Vec<_> = (1..=3).map(observation).collect();
        let config = MetricsConfig {
            plot_width: 320,
            plot_height: 240,
            ..MetricsConfig::default()
        };
        export_metrics(&observations, &config, &dir).unwrap();

        let img = imread(&dir.join(METRICS_IMAGE).to_string_lossy(), IMREAD_COLOR).unwrap();
        assert_eq!(img.size().unwrap(), Size::new(320, 240));
    }
}
