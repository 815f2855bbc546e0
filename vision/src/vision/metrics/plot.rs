use opencv::{
    core::{Mat, Point, Rect, Scalar, Vector, CV_8UC3},
    imgproc::{
        circle, get_text_size, line, polylines, put_text, rectangle, FONT_HERSHEY_SIMPLEX, LINE_8, LINE_AA,
    },
};

use crate::{config::MetricsConfig, vision::footprint::PawSide};

use super::PawTraces;

const MARGIN_LEFT: i32 = 90;
const MARGIN_RIGHT: i32 = 190;
const MARGIN_TOP: i32 = 60;
const MARGIN_BOTTOM: i32 = 70;
const Y_TICKS: i32 = 5;
const MAX_X_TICKS: u32 = 10;

fn side_color(side: PawSide) -> Scalar {
    match side {
        PawSide::BackLeft => Scalar::new(180.0, 119.0, 31.0, 0.0),
        PawSide::BackRight => Scalar::new(14.0, 127.0, 255.0, 0.0),
        PawSide::FrontLeft => Scalar::new(44.0, 160.0, 44.0, 0.0),
        PawSide::FrontRight => Scalar::new(40.0, 39.0, 214.0, 0.0),
    }
}

/// Renders smoothed per-side metric curves into BGR images.
///
/// Rendering is a pure function of the traces and the step limit.
#[derive(Debug, Clone)]
pub struct MetricPlotter {
    sides: Vec<PawSide>,
    width: i32,
    height: i32,
    smooth_window: usize,
}

impl MetricPlotter {
    pub fn new(config: &MetricsConfig) -> Self {
        Self {
            sides: config.plotted_sides.clone(),
            width: config.plot_width,
            height: config.plot_height,
            smooth_window: config.smooth_window,
        }
    }

    /// One frame per distinct step, each covering the series up to that step.
    pub fn frames<'a>(&'a self, traces: &'a PawTraces) -> PlotFrames<'a> {
        PlotFrames {
            plotter: self,
            traces,
            next: 0,
        }
    }

    pub fn render_final(&self, traces: &PawTraces) -> anyhow::Result<Mat> {
        self.render(traces, None)
    }

    pub fn render(&self, traces: &PawTraces, step_limit: Option<u32>) -> anyhow::Result<Mat> {
        let mut img = Mat::new_rows_cols_with_default(self.height, self.width, CV_8UC3, Scalar::all(255.0))?;

        let curves: Vec<(PawSide, Vec<(u32, f64)>)> = self
            .sides
            .iter()
            .map(|&side| (side, traces.smoothed(side, step_limit, self.smooth_window)))
            .filter(|(_, points)| !points.is_empty())
            .collect();

        let x_min = traces.steps().first().copied().unwrap_or(0);
        let x_max = step_limit
            .or_else(|| traces.steps().last().copied())
            .unwrap_or(x_min)
            .max(x_min + 1);
        let y_max = curves
            .iter()
            .flat_map(|(_, points)| points.iter().map(|&(_, m)| m))
            .fold(0.0_f64, f64::max)
            .max(1e-6);

        let area = Rect::new(
            MARGIN_LEFT,
            MARGIN_TOP,
            (self.width - MARGIN_LEFT - MARGIN_RIGHT).max(1),
            (self.height - MARGIN_TOP - MARGIN_BOTTOM).max(1),
        );
        let axes = Axes { area, x_min, x_max, y_max };

        self.draw_grid(&mut img, &axes)?;
        self.draw_labels(&mut img, &axes)?;

        for (side, points) in &curves {
            let color = side_color(*side);
            let pixels: Vector<Point> = points.iter().map(|&(step, m)| axes.to_pixel(step, m)).collect();
            if pixels.len() == 1 {
                circle(&mut img, pixels.get(0)?, 3, color, -1, LINE_AA, 0)?;
            } else {
                let lines: Vector<Vector<Point>> = Vector::from_iter([pixels]);
                polylines(&mut img, &lines, false, color, 2, LINE_AA, 0)?;
            }
        }

        self.draw_legend(&mut img, &axes, &curves)?;

        Ok(img)
    }

    fn draw_grid(&self, img: &mut Mat, axes: &Axes) -> anyhow::Result<()> {
        let grid = Scalar::new(225.0, 225.0, 225.0, 0.0);
        let black = Scalar::all(0.0);
        let area = axes.area;

        for i in 0..=Y_TICKS {
            let value = axes.y_max * i as f64 / Y_TICKS as f64;
            let y = axes.y_pixel(value);
            dashed_hline(img, area.x, area.x + area.width, y, grid)?;
            put_text(
                img,
                &format!("{value:.2}"),
                Point::new(area.x - 60, y + 5),
                FONT_HERSHEY_SIMPLEX,
                0.45,
                black,
                1,
                LINE_AA,
                false,
            )?;
        }

        let span = axes.x_max - axes.x_min;
        let stride = span.div_ceil(MAX_X_TICKS).max(1);
        let mut step = axes.x_min;
        while step <= axes.x_max {
            let x = axes.x_pixel(step);
            dashed_vline(img, x, area.y, area.y + area.height, grid)?;
            put_text(
                img,
                &step.to_string(),
                Point::new(x - 6, area.y + area.height + 22),
                FONT_HERSHEY_SIMPLEX,
                0.45,
                black,
                1,
                LINE_AA,
                false,
            )?;
            step += stride;
        }

        rectangle(img, area, black, 1, LINE_8, 0)?;
        Ok(())
    }

    fn draw_labels(&self, img: &mut Mat, axes: &Axes) -> anyhow::Result<()> {
        let black = Scalar::all(0.0);
        let area = axes.area;

        let title = "Paw contact metric over steps";
        let mut baseline = 0;
        let title_size = get_text_size(title, FONT_HERSHEY_SIMPLEX, 0.8, 2, &mut baseline)?;
        put_text(
            img,
            title,
            Point::new(area.x + (area.width - title_size.width) / 2, MARGIN_TOP / 2 + 5),
            FONT_HERSHEY_SIMPLEX,
            0.8,
            black,
            2,
            LINE_AA,
            false,
        )?;

        put_text(
            img,
            "Step index",
            Point::new(area.x + area.width / 2 - 45, self.height - 15),
            FONT_HERSHEY_SIMPLEX,
            0.6,
            black,
            1,
            LINE_AA,
            false,
        )?;
        put_text(
            img,
            "metric = blue/green",
            Point::new(10, area.y - 10),
            FONT_HERSHEY_SIMPLEX,
            0.5,
            black,
            1,
            LINE_AA,
            false,
        )?;

        Ok(())
    }

    fn draw_legend(&self, img: &mut Mat, axes: &Axes, curves: &[(PawSide, Vec<(u32, f64)>)]) -> anyhow::Result<()> {
        if curves.is_empty() {
            return Ok(());
        }

        let area = axes.area;
        let x = area.x + area.width + 15;
        let row_height = 26;
        let top = area.y + area.height / 2 - row_height * curves.len() as i32 / 2;

        for (i, (side, _)) in curves.iter().enumerate() {
            let y = top + i as i32 * row_height + row_height / 2;
            line(img, Point::new(x, y), Point::new(x + 30, y), side_color(*side), 2, LINE_8, 0)?;
            put_text(
                img,
                side.as_str(),
                Point::new(x + 38, y + 5),
                FONT_HERSHEY_SIMPLEX,
                0.5,
                Scalar::all(0.0),
                1,
                LINE_AA,
                false,
            )?;
        }

        Ok(())
    }
}

struct Axes {
    area: Rect,
    x_min: u32,
    x_max: u32,
    y_max: f64,
}

impl Axes {
    fn x_pixel(&self, step: u32) -> i32 {
        let t = (step - self.x_min) as f64 / (self.x_max - self.x_min) as f64;
        self.area.x + (t * (self.area.width - 1) as f64).round() as i32
    }

    fn y_pixel(&self, value: f64) -> i32 {
        let t = (value / self.y_max).clamp(0.0, 1.0);
        self.area.y + self.area.height - 1 - (t * (self.area.height - 1) as f64).round() as i32
    }

    fn to_pixel(&self, step: u32, value: f64) -> Point {
        Point::new(self.x_pixel(step), self.y_pixel(value))
    }
}

fn dashed_hline(img: &mut Mat, x0: i32, x1: i32, y: i32, color: Scalar) -> anyhow::Result<()> {
    for x in (x0..x1).step_by(8) {
        line(img, Point::new(x, y), Point::new((x + 4).min(x1), y), color, 1, LINE_8, 0)?;
    }
    Ok(())
}

fn dashed_vline(img: &mut Mat, x: i32, y0: i32, y1: i32, color: Scalar) -> anyhow::Result<()> {
    for y in (y0..y1).step_by(8) {
        line(img, Point::new(x, y), Point::new(x, (y + 4).min(y1)), color, 1, LINE_8, 0)?;
    }
    Ok(())
}

/// Lazy sequence of progressively longer plots. Calling [`MetricPlotter::frames`] again starts over.
pub struct PlotFrames<'a> {
    plotter: &'a MetricPlotter,
    traces: &'a PawTraces,
    next: usize,
}

impl Iterator for PlotFrames<'_> {
    type Item = anyhow::Result<Mat>;

    fn next(&mut self) -> Option<Self::Item> {
        let step = *self.traces.steps().get(self.next)?;
        self.next += 1;
        Some(self.plotter.render(self.traces, Some(step)))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.traces.steps().len() - self.next;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for PlotFrames<'_> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vision::metrics::PawObservation;
    use opencv::{
        core::{Size, Vec3b},
        prelude::*,
    };

    fn traces(points: &[(PawSide, u32, Option<f64>)]) -> PawTraces {
        let observations: Vec<PawObservation> = points
            .iter()
            .map(|&(side, step, metric)| PawObservation {
                paw: Mat::default(),
                side,
                contact_pixels: 10,
                pressure_pixels: 1,
                metric,
                step,
                time_ms: 0,
            })
            .collect();
        PawTraces::from_observations(&observations)
    }

    fn count_color(img: &Mat, color: Scalar) -> usize {
        let target = Vec3b::from([color[0] as u8, color[1] as u8, color[2] as u8]);
        img.data_typed::<Vec3b>().unwrap().iter().filter(|&&px| px == target).count()
    }

    fn sample() -> PawTraces {
        traces(&[
            (PawSide::BackLeft, 1, Some(0.2)),
            (PawSide::BackRight, 2, Some(0.4)),
            (PawSide::BackLeft, 3, Some(0.6)),
            (PawSide::FrontLeft, 4, Some(0.9)),
            (PawSide::BackRight, 5, None),
        ])
    }

    #[test]
    fn test_render_canvas() {
        let plotter = MetricPlotter::new(&MetricsConfig::default());
        let img = plotter.render_final(&sample()).unwrap();

        assert_eq!(img.size().unwrap(), Size::new(1080, 800));
        assert_eq!(img.typ(), CV_8UC3);
        assert_eq!(*img.at_2d::<Vec3b>(2, 2).unwrap(), Vec3b::from([255, 255, 255]));
    }

    #[test]
    fn test_plotted_sides_only() {
        let plotter = MetricPlotter::new(&MetricsConfig::default());
        let img = plotter.render_final(&sample()).unwrap();

        assert!(count_color(&img, side_color(PawSide::BackLeft)) > 0);
        assert!(count_color(&img, side_color(PawSide::BackRight)) > 0);
        assert_eq!(count_color(&img, side_color(PawSide::FrontLeft)), 0);
    }

    #[test]
    fn test_one_frame_per_distinct_step() {
        let plotter = MetricPlotter::new(&MetricsConfig::default());
        let traces = traces(&[
            (PawSide::BackLeft, 1, Some(0.2)),
            (PawSide::BackLeft, 1, Some(0.3)),
            (PawSide::BackRight, 4, Some(0.1)),
            (PawSide::BackLeft, 9, Some(0.5)),
        ]);

        let frames = plotter.frames(&traces);
        assert_eq!(frames.len(), 3);
        assert_eq!(frames.collect::<anyhow::Result<Vec<_>>>().unwrap().len(), 3);
    }

    #[test]
    fn test_frames_are_restartable() {
        let plotter = MetricPlotter::new(&MetricsConfig {
            plot_width: 400,
            plot_height: 300,
            ..MetricsConfig::default()
        });
        let traces = sample();

        let first: Vec<Mat> = plotter.frames(&traces).collect::<anyhow::Result<_>>().unwrap();
        let second: Vec<Mat> = plotter.frames(&traces).collect::<anyhow::Result<_>>().unwrap();

        assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(&second) {
            assert_eq!(a.data_bytes().unwrap(), b.data_bytes().unwrap());
        }

        let last = first.last().unwrap();
        let full = plotter.render_final(&traces).unwrap();
        assert_eq!(last.data_bytes().unwrap(), full.data_bytes().unwrap());
    }

    #[test]
    fn test_empty_traces() {
        let plotter = MetricPlotter::new(&MetricsConfig::default());
        let traces = PawTraces::default();

        assert_eq!(plotter.frames(&traces).count(), 0);
        let img = plotter.render_final(&traces).unwrap();
        assert_eq!(img.size().unwrap(), Size::new(1080, 800));
    }
}
