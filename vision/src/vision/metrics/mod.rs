pub mod plot;

use std::collections::BTreeMap;

use itertools::Itertools;
use opencv::core::Mat;

use crate::vision::footprint::PawSide;

pub use plot::{MetricPlotter, PlotFrames};

/// One finalized measurement, created for every frame with both a body and a tracked print.
#[derive(Debug, Clone)]
pub struct PawObservation {
    /// Bounding crop of the tracked print.
    pub paw: Mat,
    pub side: PawSide,
    pub contact_pixels: i32,
    pub pressure_pixels: i32,
    /// Pressure to contact ratio, absent when the contact count was zero.
    pub metric: Option<f64>,
    pub step: u32,
    /// Capture position in milliseconds into the source video.
    pub time_ms: i64,
}

/// Per-side `(step, metric)` series sorted by step.
#[derive(Debug, Clone, Default)]
pub struct PawTraces {
    series: BTreeMap<PawSide, Vec<(u32, f64)>>,
    steps: Vec<u32>,
}

impl PawTraces {
    /// Groups observations by paw side. Observations without a metric are left out of the
    /// series but still count as a step.
    pub fn from_observations(observations: &[PawObservation]) -> Self {
        let series = observations
            .iter()
            .filter_map(|o| o.metric.map(|m| (o.side, (o.step, m))))
            .into_group_map()
            .into_iter()
            .map(|(side, mut points)| {
                points.sort_by_key(|&(step, _)| step);
                (side, points)
            })
            .collect();

        let steps = observations.iter().map(|o| o.step).sorted().dedup().collect();

        Self { series, steps }
    }

    /// Distinct steps in ascending order, one plot frame each.
    pub fn steps(&self) -> &[u32] {
        &self.steps
    }

    pub fn series(&self, side: PawSide) -> &[(u32, f64)] {
        self.series.get(&side).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Smoothed series of `side` restricted to steps up to `step_limit`.
    ///
    /// Smoothing runs on the restricted prefix, so a point's value can change as later steps appear.
    pub fn smoothed(&self, side: PawSide, step_limit: Option<u32>, window: usize) -> Vec<(u32, f64)> {
        let (steps, values): (Vec<u32>, Vec<f64>) = self
            .series(side)
            .iter()
            .filter(|(step, _)| step_limit.map_or(true, |limit| *step <= limit))
            .cloned()
            .unzip();

        steps.into_iter().zip(smooth_series(&values, window)).collect()
    }
}

/// Centered moving average with a same-length convolution convention.
///
/// Output `i` sums the inputs in `[i - W/2, i + (W-1)/2]` that exist and divides by `W`,
/// so edges are pulled toward zero. A window of 0 or 1 is the identity and a window longer
/// than the sequence is clamped to its length.
pub fn smooth_series(values: &[f64], window: usize) -> Vec<f64> {
    let n = values.len();
    if n == 0 || window <= 1 {
        return values.to_vec();
    }

    let window = window.min(n);
    let before = window / 2;
    let after = (window - 1) / 2;

    (0..n)
        .map(|i| {
            let start = i.saturating_sub(before);
            let end = (i + after).min(n - 1);
            values[start..=end].iter().sum::<f64>() / window as f64
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn observation(side: PawSide, step: u32, metric: Option<f64>) -> PawObservation {
        PawObservation {
            paw: Mat::default(),
            side,
            contact_pixels: 100,
            pressure_pixels: 0,
            metric,
            step,
            time_ms: step as i64 * 40,
        }
    }

    fn assert_close(a: &[f64], b: &[f64]) {
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(b) {
            assert!((x - y).abs() < 1e-9, "{a:?} != {b:?}");
        }
    }

    #[test]
    fn test_smoothing_alternating_series() {
        let out = smooth_series(&[0.0, 10.0, 0.0, 10.0, 0.0], 5);
        assert_close(&out, &[2.0, 4.0, 4.0, 4.0, 2.0]);
        assert_eq!(out[2], 4.0);
    }

    #[test]
    fn test_smoothing_preserves_length() {
        let values: Vec<f64> = (0..17).map(|v| (v * v) as f64).collect();
        for window in 0..25 {
            assert_eq!(smooth_series(&values, window).len(), values.len());
        }
    }

    #[test]
    fn test_window_one_is_identity() {
        let values = [3.0, 1.5, 7.25, 0.0];
        assert_eq!(smooth_series(&values, 1), values.to_vec());
        assert_eq!(smooth_series(&values, 0), values.to_vec());
    }

    #[test]
    fn test_even_window_leans_backward() {
        // Window 4 covers [i-2, i+1].
        let out = smooth_series(&[4.0, 8.0, 12.0, 16.0, 20.0], 4);
        assert_close(&out, &[3.0, 6.0, 10.0, 14.0, 12.0]);
    }

    #[test]
    fn test_window_clamped_to_length() {
        let out = smooth_series(&[3.0, 6.0], 10);
        assert_close(&out, &[1.5, 4.5]);
    }

    #[test]
    fn test_smoothing_empty() {
        assert!(smooth_series(&[], 5).is_empty());
    }

    #[test]
    fn test_traces_group_and_sort() {
        let observations = vec![
            observation(PawSide::BackLeft, 3, Some(0.3)),
            observation(PawSide::BackRight, 2, Some(0.2)),
            observation(PawSide::BackLeft, 1, Some(0.1)),
            observation(PawSide::FrontLeft, 4, None),
        ];
        let traces = PawTraces::from_observations(&observations);

        assert_eq!(traces.series(PawSide::BackLeft), &[(1, 0.1), (3, 0.3)]);
        assert_eq!(traces.series(PawSide::BackRight), &[(2, 0.2)]);
        assert!(traces.series(PawSide::FrontLeft).is_empty());
        assert_eq!(traces.steps(), &[1, 2, 3, 4]);
    }

    #[test]
    fn test_smoothed_respects_step_limit() {
        let observations: Vec<_> = [0.0, 10.0, 0.0, 10.0, 0.0]
            .iter()
            .enumerate()
            .map(|(i, &m)| observation(PawSide::BackLeft, i as u32 + 1, Some(m)))
            .collect();
        let traces = PawTraces::from_observations(&observations);

        let full = traces.smoothed(PawSide::BackLeft, None, 5);
        assert_eq!(full.iter().map(|(s, _)| *s).collect::<Vec<_>>(), vec![1, 2, 3, 4, 5]);
        assert_close(&full.iter().map(|(_, m)| *m).collect::<Vec<_>>(), &[2.0, 4.0, 4.0, 4.0, 2.0]);

        // Prefix of two: window clamped to 2 over [0, 10].
        let prefix = traces.smoothed(PawSide::BackLeft, Some(2), 5);
        assert_close(&prefix.iter().map(|(_, m)| *m).collect::<Vec<_>>(), &[0.0, 5.0]);
    }
}
