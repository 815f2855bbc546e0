pub mod config;
pub mod preprocess;
pub mod state;
pub mod utils;
pub mod vision;

use opencv::{
    core::{Mat, Scalar, CV_8UC3},
    prelude::*,
};

use vision::{
    body::{annotate_body, detect_body_pose},
    footprint::{classify_paw, detect_footprints, draw_tracked_footprint, measure_contact, select_tracked_footprint},
};

pub use config::GaitConfig;
pub use preprocess::{IsolatedFrame, MotionIsolator};
pub use state::PipelineState;
pub use vision::{
    body::BodySilhouette,
    footprint::{FootprintCandidate, FootprintGroup, PawSide},
    metrics::{MetricPlotter, PawObservation, PawTraces, PlotFrames},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NoBodyDetected,
    NoFootprintDetected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    Observed { step: u32 },
    Skipped(SkipReason),
}

/// Everything the pipeline derived from one frame.
pub struct FrameReport {
    pub outcome: FrameOutcome,
    pub body: Option<BodySilhouette>,
    /// Candidates that passed the area filter, largest first.
    pub footprints: Vec<FootprintCandidate>,
    /// Cleaned print mask, absent when the frame was skipped before segmentation.
    pub mask: Option<Mat>,
    pub tracked: Option<FootprintGroup>,
    /// Frame with the body geometry drawn on it.
    pub details: Option<Mat>,
    /// Black frame holding only the highlighted tracked print.
    pub paws: Option<Mat>,
}

impl FrameReport {
    fn skipped(reason: SkipReason) -> Self {
        Self {
            outcome: FrameOutcome::Skipped(reason),
            body: None,
            footprints: Vec::new(),
            mask: None,
            tracked: None,
            details: None,
            paws: None,
        }
    }
}

/// Per-frame body and footprint analysis.
///
/// Stateless apart from configuration; everything accumulated over a run lives in [`PipelineState`].
pub struct GaitPipeline {
    config: GaitConfig,
}

impl GaitPipeline {
    pub fn new(config: GaitConfig) -> Self {
        Self { config }
    }

    /// Runs body pose, footprint detection and classification on a motion-isolated frame.
    ///
    /// Appends at most one [`PawObservation`] to `state`.
    pub fn process_frame(&self, state: &mut PipelineState, frame: &Mat, time_ms: i64) -> anyhow::Result<FrameReport> {
        let Some(body) = detect_body_pose(frame, &self.config.body)? else {
            log::debug!("No body at {time_ms} ms");
            return Ok(FrameReport::skipped(SkipReason::NoBodyDetected));
        };

        if let Some(previous) = state.update_body_center(body.center) {
            log::debug!(
                "Body moved by ({}, {})",
                body.center.x - previous.x,
                body.center.y - previous.y
            );
        }

        let details = if self.config.annotate {
            let mut details = frame.try_clone()?;
            annotate_body(&mut details, &body)?;
            Some(details)
        } else {
            None
        };
        let mut paws = if self.config.annotate {
            Some(Mat::new_rows_cols_with_default(frame.rows(), frame.cols(), CV_8UC3, Scalar::all(0.0))?)
        } else {
            None
        };

        let detection = detect_footprints(frame, &self.config.footprint)?;
        let tracked = select_tracked_footprint(&detection.candidates, self.config.footprint.merge_distance)?;

        let Some(group) = tracked else {
            log::debug!("Body found but no footprint at {time_ms} ms");
            return Ok(FrameReport {
                outcome: FrameOutcome::Skipped(SkipReason::NoFootprintDetected),
                body: Some(body),
                footprints: detection.candidates,
                mask: Some(detection.mask),
                tracked: None,
                details,
                paws,
            });
        };

        let measurement = measure_contact(frame, group.bbox, &self.config.contact)?;
        let side = classify_paw(group.center, body.center, body.extrema.tail, body.extrema.head);

        if let Some(paws) = paws.as_mut() {
            draw_tracked_footprint(paws, &group, &measurement, side)?;
        }

        let metric = measurement.metric();
        if metric.is_none() {
            log::warn!("Tracked print at {:?} has no contact pixels, metric left undefined", group.center);
        }

        let step = state.record(PawObservation {
            paw: measurement.crop,
            side,
            contact_pixels: measurement.contact_pixels,
            pressure_pixels: measurement.pressure_pixels,
            metric,
            step: 0,
            time_ms,
        });
        log::debug!(
            "Step {step}: {side} contact={} pressure={} metric={metric:?}",
            measurement.contact_pixels,
            measurement.pressure_pixels
        );

        Ok(FrameReport {
            outcome: FrameOutcome::Observed { step },
            body: Some(body),
            footprints: detection.candidates,
            mask: Some(detection.mask),
            tracked: Some(group),
            details,
            paws,
        })
    }
}
