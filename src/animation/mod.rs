pub mod ease;
pub mod player;
pub mod timeline;

pub use ease::Ease;
pub use player::{PlayState, TimelinePlayer};
pub use timeline::{
    Offset, PropRange, Schedule, ScheduledStep, StepKind, Timeline, TimelineStep, Tween,
};
