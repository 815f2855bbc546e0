use std::{fs, path::Path};

use anyhow::Context;
use serde::Deserialize;

use crate::vision::footprint::classify::PawSide;

/// HSV bounds in OpenCV 8-bit convention (H: 0-179, S/V: 0-255).
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct HsvRange {
    pub lower: [u8; 3],
    pub upper: [u8; 3],
}

impl HsvRange {
    pub const fn new(lower: [u8; 3], upper: [u8; 3]) -> Self {
        Self { lower, upper }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GaitConfig {
    #[serde(default)]
    pub motion: MotionConfig,
    #[serde(default)]
    pub body: BodyConfig,
    #[serde(default)]
    pub footprint: FootprintConfig,
    #[serde(default)]
    pub contact: ContactConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    /// Region of interest as (x, y, w, h) in source pixels.
    #[serde(default)]
    pub roi: Option<[i32; 4]>,
    #[serde(default = "default_annotate")]
    pub annotate: bool,
}

impl Default for GaitConfig {
    fn default() -> Self {
        Self {
            motion: MotionConfig::default(),
            body: BodyConfig::default(),
            footprint: FootprintConfig::default(),
            contact: ContactConfig::default(),
            metrics: MetricsConfig::default(),
            roi: None,
            annotate: default_annotate(),
        }
    }
}

impl GaitConfig {
    /// Reads a TOML config, falling back to defaults when the file does not exist.
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            log::info!("Config {} not found, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        let config = toml::from_str(content)?;
        Ok(config)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MotionConfig {
    #[serde(default = "default_history")]
    pub history: i32,
    #[serde(default = "default_var_threshold")]
    pub var_threshold: f64,
    #[serde(default)]
    pub detect_shadows: bool,
    #[serde(default = "default_motion_kernel")]
    pub kernel_size: i32,
    #[serde(default = "default_binary_threshold")]
    pub binary_threshold: f64,
    #[serde(default = "default_true")]
    pub drop_red_channel: bool,
    #[serde(default = "default_contrast_alpha")]
    pub contrast_alpha: f64,
    #[serde(default)]
    pub contrast_beta: f64,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            history: default_history(),
            var_threshold: default_var_threshold(),
            detect_shadows: false,
            kernel_size: default_motion_kernel(),
            binary_threshold: default_binary_threshold(),
            drop_red_channel: true,
            contrast_alpha: default_contrast_alpha(),
            contrast_beta: 0.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BodyConfig {
    #[serde(default = "default_min_body_area")]
    pub min_area: f64,
    #[serde(default = "default_body_blur")]
    pub blur_ksize: i32,
}

impl Default for BodyConfig {
    fn default() -> Self {
        Self {
            min_area: default_min_body_area(),
            blur_ksize: default_body_blur(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FootprintConfig {
    #[serde(default = "default_min_print_area")]
    pub min_area: f64,
    /// Upper area bound, the whole frame when unset.
    #[serde(default)]
    pub max_area: Option<f64>,
    #[serde(default = "default_print_hsv")]
    pub hsv: HsvRange,
    /// Lab 'a' values strictly above this are rejected (greener is lower).
    #[serde(default = "default_lab_a_threshold")]
    pub lab_a_threshold: f64,
    #[serde(default = "default_open_kernel")]
    pub open_kernel: i32,
    #[serde(default = "default_close_kernel")]
    pub close_kernel: i32,
    #[serde(default = "default_merge_distance")]
    pub merge_distance: f64,
}

impl Default for FootprintConfig {
    fn default() -> Self {
        Self {
            min_area: default_min_print_area(),
            max_area: None,
            hsv: default_print_hsv(),
            lab_a_threshold: default_lab_a_threshold(),
            open_kernel: default_open_kernel(),
            close_kernel: default_close_kernel(),
            merge_distance: default_merge_distance(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContactConfig {
    #[serde(default = "default_contact_hsv")]
    pub contact: HsvRange,
    #[serde(default = "default_pressure_hsv")]
    pub pressure: HsvRange,
    /// Added (wrapping) to the green channel of the crop before pressure segmentation.
    #[serde(default = "default_green_boost")]
    pub green_boost: u8,
}

impl Default for ContactConfig {
    fn default() -> Self {
        Self {
            contact: default_contact_hsv(),
            pressure: default_pressure_hsv(),
            green_boost: default_green_boost(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_smooth_window")]
    pub smooth_window: usize,
    #[serde(default = "default_plotted_sides")]
    pub plotted_sides: Vec<PawSide>,
    #[serde(default = "default_plot_width")]
    pub plot_width: i32,
    #[serde(default = "default_plot_height")]
    pub plot_height: i32,
    #[serde(default = "default_fps")]
    pub fps: f64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            smooth_window: default_smooth_window(),
            plotted_sides: default_plotted_sides(),
            plot_width: default_plot_width(),
            plot_height: default_plot_height(),
            fps: default_fps(),
        }
    }
}

fn default_true() -> bool { true }
fn default_annotate() -> bool { true }
fn default_history() -> i32 { 500 }
fn default_var_threshold() -> f64 { 50.0 }
fn default_motion_kernel() -> i32 { 5 }
fn default_binary_threshold() -> f64 { 200.0 }
fn default_contrast_alpha() -> f64 { 1.0 }
fn default_min_body_area() -> f64 { 50_000.0 }
fn default_body_blur() -> i32 { 7 }
fn default_min_print_area() -> f64 { 5.0 }
fn default_print_hsv() -> HsvRange { HsvRange::new([30, 40, 25], [90, 255, 255]) }
fn default_lab_a_threshold() -> f64 { 135.0 }
fn default_open_kernel() -> i32 { 3 }
fn default_close_kernel() -> i32 { 6 }
fn default_merge_distance() -> f64 { 80.0 }
fn default_contact_hsv() -> HsvRange { HsvRange::new([35, 40, 40], [90, 255, 255]) }
fn default_pressure_hsv() -> HsvRange { HsvRange::new([100, 150, 0], [130, 255, 120]) }
fn default_green_boost() -> u8 { 100 }
fn default_smooth_window() -> usize { 5 }
fn default_plotted_sides() -> Vec<PawSide> { vec![PawSide::BackLeft, PawSide::BackRight] }
fn default_plot_width() -> i32 { 1080 }
fn default_plot_height() -> i32 { 800 }
fn default_fps() -> f64 { 25.0 }

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = GaitConfig::from_toml("").unwrap();
        assert_eq!(config.body.min_area, 50_000.0);
        assert_eq!(config.footprint.merge_distance, 80.0);
        assert_eq!(config.contact.green_boost, 100);
        assert_eq!(config.metrics.plotted_sides, vec![PawSide::BackLeft, PawSide::BackRight]);
        assert!(config.roi.is_none());
        assert!(config.annotate);
    }

    #[test]
    fn test_partial_sections_override() {
        let config = GaitConfig::from_toml(
            r#"
            roi = [10, 20, 300, 200]

            [footprint]
            merge_distance = 40.0
            hsv = { lower = [35, 60, 40], upper = [85, 255, 255] }

            [metrics]
            smooth_window = 3
            plotted_sides = ["Front_Left", "Back_Right"]
            "#,
        )
        .unwrap();

        assert_eq!(config.roi, Some([10, 20, 300, 200]));
        assert_eq!(config.footprint.merge_distance, 40.0);
        assert_eq!(config.footprint.hsv.lower, [35, 60, 40]);
        assert_eq!(config.footprint.close_kernel, 6);
        assert_eq!(config.metrics.smooth_window, 3);
        assert_eq!(config.metrics.plotted_sides, vec![PawSide::FrontLeft, PawSide::BackRight]);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = GaitConfig::load("/nonexistent/gait.toml").unwrap();
        assert_eq!(config.motion.history, 500);
    }

    #[test]
    fn test_rejects_unknown_paw_side() {
        let res = GaitConfig::from_toml("[metrics]\nplotted_sides = [\"Middle\"]\n");
        assert!(res.is_err());
    }
}
