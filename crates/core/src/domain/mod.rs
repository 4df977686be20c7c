pub mod chart;
pub mod sample;
