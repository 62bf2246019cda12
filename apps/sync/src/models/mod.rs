pub mod activity;
pub mod application;
pub mod goal;
pub mod resume;
pub mod stats;

pub use activity::{ActivityKind, ActivityRecord};
pub use application::JobApplication;
pub use goal::Goal;
pub use resume::Resume;
pub use stats::UserStats;
