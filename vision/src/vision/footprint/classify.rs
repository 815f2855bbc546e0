use std::fmt;

use opencv::core::Point;
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
pub enum PawSide {
    #[serde(rename = "Front_Left")]
    FrontLeft,
    #[serde(rename = "Front_Right")]
    FrontRight,
    #[serde(rename = "Back_Left")]
    BackLeft,
    #[serde(rename = "Back_Right")]
    BackRight,
}

impl PawSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            PawSide::FrontLeft => "Front_Left",
            PawSide::FrontRight => "Front_Right",
            PawSide::BackLeft => "Back_Left",
            PawSide::BackRight => "Back_Right",
        }
    }
}

impl fmt::Display for PawSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Quadrant heuristic against two body landmarks.
///
/// Assumes the animal walks along the frame's horizontal axis; the body's
/// instantaneous heading is not taken into account.
pub fn classify_paw(print_center: Point, body_center: Point, tail: Point, head: Point) -> PawSide {
    let back = tail.x < print_center.x && print_center.x < body_center.x;
    let left = print_center.y > head.y || print_center.y > body_center.y;

    match (back, left) {
        (true, true) => PawSide::BackLeft,
        (true, false) => PawSide::BackRight,
        (false, true) => PawSide::FrontLeft,
        (false, false) => PawSide::FrontRight,
    }
}
