pub mod keypoint;
pub mod skeleton;
pub mod snapshot;

pub use keypoint::{Landmark, LandmarkIndex};
pub use skeleton::{ArmSegment, SEGMENT_CONNECTIONS};
pub use snapshot::{LandmarkSnapshot, TrackedRegion};
