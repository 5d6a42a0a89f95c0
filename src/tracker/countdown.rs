use std::cell::RefCell;
use std::rc::Rc;

use chrono::{DateTime, FixedOffset, Utc};

use crate::{
    foundation::core::{Millis, ms},
    foundation::error::{InvitaError, InvitaResult},
    schedule::{Disposables, Scheduler, SchedulerHandle},
};

pub const DAY_MS: u64 = 86_400_000;
pub const HOUR_MS: u64 = 3_600_000;
pub const MINUTE_MS: u64 = 60_000;
pub const SECOND_MS: u64 = 1_000;

const DEFAULT_TARGET: &str = "2026-06-20T08:00:00+07:00";

/// Time left until the target, truncated to whole seconds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct Remaining {
    pub days: u64,
    pub hours: u64,
    pub minutes: u64,
    pub seconds: u64,
}

impl Remaining {
    pub fn is_zero(&self) -> bool {
        *self == Self::default()
    }
}

/// Decompose `max(0, target - now)` into days, hours, minutes and seconds.
pub fn remaining(target_ms: i64, now_ms: i64) -> Remaining {
    let diff = target_ms.saturating_sub(now_ms);
    if diff <= 0 {
        return Remaining::default();
    }
    let diff = diff as u64;
    Remaining {
        days: diff / DAY_MS,
        hours: (diff % DAY_MS) / HOUR_MS,
        minutes: (diff % HOUR_MS) / MINUTE_MS,
        seconds: (diff % MINUTE_MS) / SECOND_MS,
    }
}

/// Source of wall-clock time in Unix milliseconds.
pub trait WallClock {
    fn now_ms(&self) -> i64;
}

pub struct SystemClock;

impl WallClock for SystemClock {
    fn now_ms(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// Wall clock pinned to `epoch_ms` when the scheduler reads zero.
pub struct SimulatedClock {
    epoch_ms: i64,
    scheduler: SchedulerHandle,
}

impl SimulatedClock {
    pub fn new(scheduler: &Scheduler, epoch_ms: i64) -> Self {
        Self {
            epoch_ms,
            scheduler: scheduler.handle(),
        }
    }
}

impl WallClock for SimulatedClock {
    fn now_ms(&self) -> i64 {
        let elapsed = self.scheduler.upgrade().map_or(0, |s| s.now().0);
        self.epoch_ms
            .saturating_add(i64::try_from(elapsed).unwrap_or(i64::MAX))
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct CountdownSettings {
    pub target: DateTime<FixedOffset>,
    pub interval_ms: Millis,
}

impl Default for CountdownSettings {
    fn default() -> Self {
        let target = DateTime::parse_from_rfc3339(DEFAULT_TARGET)
            .unwrap_or_else(|_| DateTime::<Utc>::UNIX_EPOCH.fixed_offset());
        Self {
            target,
            interval_ms: ms(1000),
        }
    }
}

impl CountdownSettings {
    pub fn validate(&self) -> InvitaResult<()> {
        if self.interval_ms.0 == 0 {
            return Err(InvitaError::validation(
                "countdown.interval_ms must be > 0",
            ));
        }
        Ok(())
    }
}

struct CountdownState {
    target_ms: i64,
    clock: Rc<dyn WallClock>,
    remaining: Remaining,
    samples: u64,
}

impl CountdownState {
    fn sample(&mut self) {
        self.remaining = remaining(self.target_ms, self.clock.now_ms());
        self.samples += 1;
    }
}

/// Polls the wall clock on a fixed interval and keeps the latest [`Remaining`].
pub struct Countdown {
    state: Rc<RefCell<CountdownState>>,
    scheduler: Scheduler,
    interval: Millis,
    subs: Disposables,
}

impl Countdown {
    pub fn new(scheduler: &Scheduler, clock: Rc<dyn WallClock>, settings: &CountdownSettings) -> Self {
        Self {
            state: Rc::new(RefCell::new(CountdownState {
                target_ms: settings.target.timestamp_millis(),
                clock,
                remaining: Remaining::default(),
                samples: 0,
            })),
            scheduler: scheduler.clone(),
            interval: settings.interval_ms,
            subs: Disposables::new(scheduler),
        }
    }

    /// Sample now, then on every interval until stopped.
    pub fn start(&mut self) {
        if !self.subs.is_empty() {
            return;
        }
        self.state.borrow_mut().sample();
        let weak = Rc::downgrade(&self.state);
        let id = self.scheduler.set_interval(self.interval, move || {
            if let Some(state) = weak.upgrade() {
                state.borrow_mut().sample();
            }
        });
        self.subs.track_timer(id);
    }

    pub fn stop(&mut self) {
        self.subs.dispose();
    }

    pub fn remaining(&self) -> Remaining {
        self.state.borrow().remaining
    }

    pub fn samples(&self) -> u64 {
        self.state.borrow().samples
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decomposes_each_unit_with_truncation() {
        let now = 1_700_000_000_000;
        assert_eq!(
            remaining(now + 90_061_001, now),
            Remaining {
                days: 1,
                hours: 1,
                minutes: 1,
                seconds: 1
            }
        );
        assert_eq!(remaining(now + 999, now), Remaining::default());
    }

    #[test]
    fn clamps_to_zero_after_target() {
        let now = 1_700_000_000_000;
        assert!(remaining(now - 5000, now).is_zero());
        assert!(remaining(now, now).is_zero());
        assert!(remaining(i64::MIN, i64::MAX).is_zero());
    }

    #[test]
    fn default_target_is_the_ceremony_morning() {
        let s = CountdownSettings::default();
        assert_eq!(s.target.to_rfc3339(), "2026-06-20T08:00:00+07:00");
    }

    #[test]
    fn polls_every_interval() {
        let s = Scheduler::new();
        let target = CountdownSettings::default();
        let epoch = target.target.timestamp_millis() - 3_000;
        let clock: Rc<dyn WallClock> = Rc::new(SimulatedClock::new(&s, epoch));
        let mut c = Countdown::new(&s, clock, &target);
        c.start();
        c.start();
        assert_eq!(c.remaining().seconds, 3);
        s.advance(ms(1000));
        assert_eq!(c.remaining().seconds, 2);
        s.advance(ms(5000));
        assert!(c.remaining().is_zero());
        assert_eq!(c.samples(), 7);
        c.stop();
        assert_eq!(s.pending_timers(), 0);
    }
}
