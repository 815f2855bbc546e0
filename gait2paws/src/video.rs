use std::path::Path;

use anyhow::Context;
use gait_vision::utils::{clamp_roi, resize_with_aspect_ratio};
use opencv::{
    core::{vconcat, Mat, Point, Rect, Scalar, Size, Vector},
    highgui,
    imgproc::{put_text, FONT_HERSHEY_DUPLEX, LINE_8},
    prelude::*,
    videoio::{self, VideoCapture, VideoWriter},
};

const FALLBACK_FPS: f64 = 25.0;
const KEY_ESC: i32 = 27;

pub struct SourceFrame {
    /// ROI crop of the decoded frame.
    pub image: Mat,
    /// 1-based index of the frame in the video.
    pub index: i64,
    pub time_ms: i64,
}

/// Video file reader that hands out ROI crops.
pub struct VideoSource {
    capture: VideoCapture,
    roi: Rect,
    fps: f64,
}

impl VideoSource {
    pub fn open(path: &str, roi: Option<[i32; 4]>) -> anyhow::Result<Self> {
        let capture = VideoCapture::from_file(path, videoio::CAP_ANY)
            .with_context(|| format!("Failed to open video {path}"))?;
        if !capture.is_opened()? {
            anyhow::bail!("Video {path} could not be opened");
        }

        let width = capture.get(videoio::CAP_PROP_FRAME_WIDTH)? as i32;
        let height = capture.get(videoio::CAP_PROP_FRAME_HEIGHT)? as i32;
        let frame = Size::new(width, height);
        let roi = match roi {
            Some(roi) => clamp_roi(roi, frame),
            None => Rect::new(0, 0, width, height),
        };

        let fps = match capture.get(videoio::CAP_PROP_FPS)? {
            fps if fps > 0.0 => fps,
            _ => {
                log::warn!("Video reports no frame rate, assuming {FALLBACK_FPS}");
                FALLBACK_FPS
            }
        };
        let total = capture.get(videoio::CAP_PROP_FRAME_COUNT)?;
        log::info!("Opened {path}: {width}x{height} at {fps:.2} fps, {total} frames, ROI {roi:?}");

        Ok(Self { capture, roi, fps })
    }

    pub fn fps(&self) -> f64 {
        self.fps
    }

    pub fn roi_size(&self) -> Size {
        self.roi.size()
    }

    /// Reads the next frame. `Ok(None)` once the video is exhausted.
    pub fn next_frame(&mut self) -> anyhow::Result<Option<SourceFrame>> {
        let mut frame = Mat::default();
        if !self.capture.read(&mut frame)? || frame.empty() {
            return Ok(None);
        }

        let time_ms = self.capture.get(videoio::CAP_PROP_POS_MSEC)? as i64;
        let index = self.capture.get(videoio::CAP_PROP_POS_FRAMES)? as i64;
        let image = Mat::roi(&frame, self.roi)?.try_clone()?;

        Ok(Some(SourceFrame { image, index, time_ms }))
    }

    pub fn release(mut self) -> anyhow::Result<()> {
        self.capture.release()?;
        Ok(())
    }
}

pub fn mp4_writer(path: &Path, fps: f64, size: Size) -> anyhow::Result<VideoWriter> {
    let fourcc = VideoWriter::fourcc('m', 'p', '4', 'v')?;
    let path_str = path.to_string_lossy();
    let writer = VideoWriter::new(&path_str, fourcc, fps, size, true)
        .with_context(|| format!("Failed to create video writer {path_str}"))?;
    if !writer.is_opened()? {
        anyhow::bail!("Video writer {path_str} could not be opened");
    }
    Ok(writer)
}

/// The four debug views written one above the other.
pub struct DebugViews {
    pub original: Mat,
    pub moving: Mat,
    pub paws: Mat,
    pub details: Mat,
}

impl DebugViews {
    pub fn stack(mut self, frame_index: i64, time_ms: i64) -> anyhow::Result<Mat> {
        let yellow = Scalar::new(0.0, 255.0, 255.0, 0.0);
        let green = Scalar::new(0.0, 255.0, 0.0, 0.0);

        caption(&mut self.original, &format!("ORIGINAL Frame: {frame_index} Time:{time_ms}"), yellow)?;
        caption(&mut self.moving, "WITHOUT RED + ONLY MOVEMENT", yellow)?;
        caption(&mut self.paws, "PAWS", green)?;
        caption(&mut self.details, "DETAILS", green)?;

        let views: Vector<Mat> = Vector::from_iter([self.original, self.moving, self.paws, self.details]);
        let mut stacked = Mat::default();
        vconcat(&views, &mut stacked)?;
        Ok(stacked)
    }
}

fn caption(img: &mut Mat, text: &str, color: Scalar) -> anyhow::Result<()> {
    put_text(img, text, Point::new(50, 100), FONT_HERSHEY_DUPLEX, 1.5, color, 4, LINE_8, false)?;
    Ok(())
}

/// Writer for the stacked debug video, sized for four ROI-high views.
pub struct StackedWriter {
    writer: VideoWriter,
}

impl StackedWriter {
    pub fn create(path: &Path, fps: f64, roi: Size) -> anyhow::Result<Self> {
        let writer = mp4_writer(path, fps, Size::new(roi.width, roi.height * 4))?;
        log::info!("Writing debug video to {}", path.display());
        Ok(Self { writer })
    }

    pub fn write(&mut self, stacked: &Mat) -> anyhow::Result<()> {
        self.writer.write(stacked)?;
        Ok(())
    }

    pub fn release(mut self) -> anyhow::Result<()> {
        self.writer.release()?;
        Ok(())
    }
}

/// On-screen preview, destroyed when dropped so error paths close it too.
pub struct PreviewWindow {
    name: &'static str,
    width: i32,
}

impl PreviewWindow {
    pub fn open(name: &'static str, width: i32) -> anyhow::Result<Self> {
        highgui::named_window(name, highgui::WINDOW_AUTOSIZE)?;
        Ok(Self { name, width })
    }

    /// Shows `img` if given and polls the keyboard. Returns `true` once ESC is pressed.
    pub fn show(&self, img: Option<&Mat>) -> anyhow::Result<bool> {
        if let Some(img) = img {
            highgui::imshow(self.name, &resize_with_aspect_ratio(img, self.width)?)?;
        }
        Ok(highgui::wait_key(10)? & 0xFF == KEY_ESC)
    }
}

impl Drop for PreviewWindow {
    fn drop(&mut self) {
        if let Err(e) = highgui::destroy_window(self.name) {
            log::warn!("Failed to close preview window: {e}");
        }
    }
}

/// Picks the preview image for one frame.
///
/// Annotated runs show the stacked views and leave the previous one up on frames without a body.
/// Runs without annotations show the motion-isolated frame.
pub fn preview_image<'a>(annotate: bool, stacked: Option<&'a Mat>, moving: &'a Mat) -> Option<&'a Mat> {
    match stacked {
        Some(stacked) => Some(stacked),
        None if !annotate => Some(moving),
        None => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opencv::core::CV_8UC3;

    fn view() -> Mat {
        Mat::new_rows_cols_with_default(120, 200, CV_8UC3, Scalar::all(0.0)).unwrap()
    }

    #[test]
    fn test_stack_height() {
        let views = DebugViews {
            original: view(),
            moving: view(),
            paws: view(),
            details: view(),
        };
        let stacked = views.stack(3, 120).unwrap();
        assert_eq!(stacked.size().unwrap(), Size::new(200, 480));
    }

    #[test]
    fn test_preview_without_annotations_shows_moving_frame() {
        let moving = view();
        let shown = preview_image(false, None, &moving).unwrap();
        assert_eq!(shown.size().unwrap(), Size::new(200, 120));
    }

    #[test]
    fn test_preview_prefers_stacked_views() {
        let moving = view();
        let stacked = DebugViews {
            original: view(),
            moving: view(),
            paws: view(),
            details: view(),
        }
        .stack(1, 0)
        .unwrap();

        let shown = preview_image(true, Some(&stacked), &moving).unwrap();
        assert_eq!(shown.size().unwrap(), Size::new(200, 480));
        assert!(preview_image(true, None, &moving).is_none());
    }

    #[test]
    fn test_missing_video_fails() {
        assert!(VideoSource::open("/nonexistent/walk.mp4", None).is_err());
    }
}
