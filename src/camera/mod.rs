pub mod projector;

pub use projector::{CameraProjector, PerspectiveCamera};
