//! Continuous value trackers recomputed outside any timeline: the countdown clock and the
//! trailing cursor ring.

pub mod countdown;
pub mod cursor;

pub use countdown::{Countdown, CountdownSettings, Remaining, SimulatedClock, SystemClock, WallClock};
pub use cursor::{CursorSettings, CursorSnapshot, CursorTrail, CursorTracker, smooth};
