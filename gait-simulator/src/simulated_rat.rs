use nalgebra::Vector2;
use opencv::{
    core::{Mat, Point, Scalar, Size, CV_8UC3},
    imgproc::{ellipse, LINE_8},
};
use rand::Rng;

const BACKGROUND: f64 = 30.0;
// Red dominant so the body survives as a blue/green tone once red is dropped.
const BODY_COLOR: (f64, f64, f64) = (90.0, 40.0, 200.0);
const PRINT_COLOR: (f64, f64, f64) = (0.0, 170.0, 0.0);
const PRESSURE_COLOR: (f64, f64, f64) = (110.0, 220.0, 0.0);

/// Fraction of a gait cycle a paw spends on the ground.
const STANCE: f64 = 0.45;

#[derive(Debug, Clone, Copy)]
struct Paw {
    /// Offset from the body center as fractions of (length, width).
    offset: Vector2<f64>,
    /// Phase shift within the gait cycle.
    phase: f64,
}

const PAWS: [Paw; 4] = [
    // Back left / front right and back right / front left move together.
    Paw { offset: Vector2::new(-0.3, 0.3), phase: 0.0 },
    Paw { offset: Vector2::new(0.3, -0.3), phase: 0.0 },
    Paw { offset: Vector2::new(-0.3, -0.3), phase: 0.5 },
    Paw { offset: Vector2::new(0.3, 0.3), phase: 0.5 },
];

/// A body walking left to right along a corridor.
pub struct SimRat {
    pub pos: Vector2<f64>,
    pub velocity: f64,
    pub length: f64,
    pub width: f64,
    /// Frames per gait cycle.
    pub cycle: f64,
    frame: u64,
    /// Ground position of each paw while it is in stance.
    planted: [Option<Vector2<f64>>; 4],
}

impl SimRat {
    pub fn new(start: Vector2<f64>, velocity: f64) -> Self {
        Self {
            pos: start,
            velocity,
            length: 260.0,
            width: 110.0,
            cycle: 16.0,
            frame: 0,
            planted: [None; 4],
        }
    }

    pub fn advance<R: Rng>(&mut self, rng: &mut R) {
        self.frame += 1;
        self.pos.x += self.velocity + rng.gen_range(-1.0..1.0);
        self.pos.y += rng.gen_range(-0.5..0.5);

        for (i, paw) in PAWS.iter().enumerate() {
            if self.in_stance(paw) {
                if self.planted[i].is_none() {
                    let jitter = Vector2::new(rng.gen_range(-4.0..4.0), rng.gen_range(-3.0..3.0));
                    self.planted[i] = Some(self.paw_position(paw) + jitter);
                }
            } else {
                self.planted[i] = None;
            }
        }
    }

    fn in_stance(&self, paw: &Paw) -> bool {
        let t = (self.frame as f64 / self.cycle + paw.phase).fract();
        t < STANCE
    }

    fn paw_position(&self, paw: &Paw) -> Vector2<f64> {
        self.pos + Vector2::new(paw.offset.x * self.length, paw.offset.y * self.width)
    }

    pub fn render(&self, size: Size) -> anyhow::Result<Mat> {
        let mut frame = empty_corridor(size)?;

        filled_ellipse(
            &mut frame,
            self.pos,
            Size::new((self.length / 2.0) as i32, (self.width / 2.0) as i32),
            BODY_COLOR,
        )?;

        for print in self.planted.iter().flatten() {
            filled_ellipse(&mut frame, *print, Size::new(14, 9), PRINT_COLOR)?;
            filled_ellipse(&mut frame, *print, Size::new(6, 4), PRESSURE_COLOR)?;
        }

        Ok(frame)
    }

    pub fn visible(&self, size: Size) -> bool {
        self.pos.x - self.length / 2.0 < size.width as f64
    }
}

pub fn empty_corridor(size: Size) -> anyhow::Result<Mat> {
    Ok(Mat::new_size_with_default(size, CV_8UC3, Scalar::all(BACKGROUND))?)
}

fn filled_ellipse(img: &mut Mat, center: Vector2<f64>, axes: Size, bgr: (f64, f64, f64)) -> anyhow::Result<()> {
    ellipse(
        img,
        Point::new(center.x as i32, center.y as i32),
        axes,
        0.0,
        0.0,
        360.0,
        Scalar::new(bgr.0, bgr.1, bgr.2, 0.0),
        -1,
        LINE_8,
        0,
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use opencv::{core::Vec3b, prelude::*};
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn test_moves_forward() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut rat = SimRat::new(Vector2::new(0.0, 240.0), 8.0);
        for _ in 0..10 {
            rat.advance(&mut rng);
        }
        assert!(rat.pos.x > 60.0);
    }

    #[test]
    fn test_diagonal_pairs_alternate() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut rat = SimRat::new(Vector2::new(300.0, 240.0), 8.0);
        rat.advance(&mut rng);

        let planted: Vec<bool> = rat.planted.iter().map(Option::is_some).collect();
        assert_eq!(planted[0], planted[1]);
        assert_eq!(planted[2], planted[3]);
        assert_ne!(planted[0], planted[2]);
    }

    #[test]
    fn test_render_draws_body() {
        let rat = SimRat::new(Vector2::new(300.0, 240.0), 8.0);
        let frame = rat.render(Size::new(640, 480)).unwrap();

        let px = *frame.at_2d::<Vec3b>(240, 300).unwrap();
        assert_eq!(px, Vec3b::from([90, 40, 200]));
        let corner = *frame.at_2d::<Vec3b>(5, 5).unwrap();
        assert_eq!(corner, Vec3b::from([30, 30, 30]));
    }
}
