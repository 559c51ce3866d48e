pub mod camera;
pub mod config;
pub mod landmark;
pub mod model;
pub mod placer;
pub mod recording;
pub mod smooth;
