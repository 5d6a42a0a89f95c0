//! Host event loop stand-in: a single-threaded virtual clock with timers and per-frame
//! subscriptions, plus the disposable bundles components use to release them.

pub mod disposables;
pub mod scheduler;

pub use disposables::Disposables;
pub use scheduler::{FrameId, Scheduler, SchedulerHandle, TimerId};
