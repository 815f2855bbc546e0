use opencv::core::Point;

use crate::vision::{footprint::PawSide, metrics::PawObservation};

/// Run-scoped state threaded through every processed frame.
#[derive(Debug)]
pub struct PipelineState {
    observations: Vec<PawObservation>,
    next_step: u32,
    last_paw: Option<PawSide>,
    last_body_center: Option<Point>,
}

impl Default for PipelineState {
    fn default() -> Self {
        Self {
            observations: Vec::new(),
            next_step: 1,
            last_paw: None,
            last_body_center: None,
        }
    }
}

impl PipelineState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Step index the next observation will receive. Starts at 1.
    pub fn next_step(&self) -> u32 {
        self.next_step
    }

    pub fn last_paw(&self) -> Option<PawSide> {
        self.last_paw
    }

    pub fn last_body_center(&self) -> Option<Point> {
        self.last_body_center
    }

    pub fn observations(&self) -> &[PawObservation] {
        &self.observations
    }

    pub fn into_observations(self) -> Vec<PawObservation> {
        self.observations
    }

    /// Stores the body center and returns the previous one.
    pub(crate) fn update_body_center(&mut self, center: Point) -> Option<Point> {
        self.last_body_center.replace(center)
    }

    /// Appends an observation, stamping it with the next step index.
    pub(crate) fn record(&mut self, mut observation: PawObservation) -> u32 {
        let step = self.next_step;
        observation.step = step;
        self.last_paw = Some(observation.side);
        self.observations.push(observation);
        self.next_step += 1;
        step
    }
}
