#![forbid(unsafe_code)]

pub mod animation;
pub mod audio;
pub mod config;
pub mod foundation;
pub mod invitation;
pub mod phase;
pub mod reveal;
pub mod schedule;
pub mod stage;
pub mod tracker;

pub use animation::{Ease, Offset, PlayState, Timeline, TimelinePlayer, Tween};
pub use audio::{AudioControl, AudioOutput, AudioPlayer, FadeSettings, MemoryOutput, Playback};
pub use config::{InvitationConfig, SectionReveal};
pub use foundation::core::{Millis, Point, Vec2, ms};
pub use foundation::error::{InvitaError, InvitaResult};
pub use invitation::{EntryState, GateState, Invitation, InvitationEvent, Section};
pub use phase::{ActivePhase, PhaseController, PhasePlan};
pub use reveal::Revealer;
pub use schedule::{Disposables, Scheduler, SchedulerHandle};
pub use stage::{SharedStage, Stage};
pub use tracker::{Countdown, CursorTrail, Remaining, SimulatedClock, SystemClock, WallClock};
