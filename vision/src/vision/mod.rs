pub mod body;
pub mod footprint;
pub mod geometry;
pub mod metrics;
