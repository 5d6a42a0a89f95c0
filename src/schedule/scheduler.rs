use std::cell::RefCell;
use std::rc::{Rc, Weak};

use slotmap::{SlotMap, new_key_type};

use crate::foundation::core::Millis;

new_key_type! {
    /// Handle to a pending one-shot or repeating timer.
    pub struct TimerId;
    /// Handle to a per-frame subscription.
    pub struct FrameId;
}

type TimerFn = Box<dyn FnMut()>;
type FrameFn = Box<dyn FnMut(Millis)>;

struct Timer {
    due: Millis,
    seq: u64,
    period: Option<Millis>,
    // `None` while the callback is executing.
    callback: Option<TimerFn>,
}

struct FrameSub {
    seq: u64,
    callback: Option<FrameFn>,
}

struct SchedulerInner {
    now: Millis,
    next_seq: u64,
    frames_run: u64,
    timers: SlotMap<TimerId, Timer>,
    frames: SlotMap<FrameId, FrameSub>,
}

impl SchedulerInner {
    fn seq(&mut self) -> u64 {
        let s = self.next_seq;
        self.next_seq += 1;
        s
    }

    fn next_due(&self, limit: Millis) -> Option<(TimerId, Millis)> {
        self.timers
            .iter()
            .filter(|(_, t)| t.callback.is_some() && t.due <= limit)
            .min_by_key(|(_, t)| (t.due, t.seq))
            .map(|(id, t)| (id, t.due))
    }
}

/// Cooperative scheduler driving every timer and frame callback of the page.
///
/// Time only moves when the host calls [`Scheduler::advance`] or
/// [`Scheduler::tick_frame`], which makes every choreography reproducible. No borrow of the
/// scheduler is held while a callback runs, so callbacks may freely schedule or cancel,
/// including cancelling themselves.
#[derive(Clone)]
pub struct Scheduler {
    inner: Rc<RefCell<SchedulerInner>>,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(SchedulerInner {
                now: Millis::ZERO,
                next_seq: 0,
                frames_run: 0,
                timers: SlotMap::with_key(),
                frames: SlotMap::with_key(),
            })),
        }
    }

    /// Weak handle for capture inside scheduled closures.
    pub fn handle(&self) -> SchedulerHandle {
        SchedulerHandle {
            inner: Rc::downgrade(&self.inner),
        }
    }

    pub fn now(&self) -> Millis {
        self.inner.borrow().now
    }

    /// Number of display frames delivered so far.
    pub fn frames_run(&self) -> u64 {
        self.inner.borrow().frames_run
    }

    /// Run `f` once the clock reaches `now + delay`.
    pub fn set_timeout<F>(&self, delay: Millis, f: F) -> TimerId
    where
        F: FnOnce() + 'static,
    {
        let mut once = Some(f);
        self.insert_timer(delay, None, move || {
            if let Some(f) = once.take() {
                f();
            }
        })
    }

    /// Run `f` every `period`, first at `now + period`. A zero period is raised to 1 ms.
    pub fn set_interval<F>(&self, period: Millis, f: F) -> TimerId
    where
        F: FnMut() + 'static,
    {
        let period = if period.0 == 0 {
            tracing::debug!("zero interval period raised to 1ms");
            Millis(1)
        } else {
            period
        };
        self.insert_timer(period, Some(period), f)
    }

    fn insert_timer<F>(&self, delay: Millis, period: Option<Millis>, f: F) -> TimerId
    where
        F: FnMut() + 'static,
    {
        let mut inner = self.inner.borrow_mut();
        let due = inner.now + delay;
        let seq = inner.seq();
        inner.timers.insert(Timer {
            due,
            seq,
            period,
            callback: Some(Box::new(f)),
        })
    }

    /// Returns `true` when the timer was still pending.
    pub fn cancel_timer(&self, id: TimerId) -> bool {
        self.inner.borrow_mut().timers.remove(id).is_some()
    }

    pub fn is_pending(&self, id: TimerId) -> bool {
        self.inner.borrow().timers.contains_key(id)
    }

    pub fn pending_timers(&self) -> usize {
        self.inner.borrow().timers.len()
    }

    /// Subscribe `f` to every subsequent display frame.
    pub fn request_frames<F>(&self, f: F) -> FrameId
    where
        F: FnMut(Millis) + 'static,
    {
        let mut inner = self.inner.borrow_mut();
        let seq = inner.seq();
        inner.frames.insert(FrameSub {
            seq,
            callback: Some(Box::new(f)),
        })
    }

    pub fn cancel_frames(&self, id: FrameId) -> bool {
        self.inner.borrow_mut().frames.remove(id).is_some()
    }

    pub fn frame_subscribers(&self) -> usize {
        self.inner.borrow().frames.len()
    }

    /// Move the clock forward by `by`, firing due timers without delivering a frame.
    pub fn advance(&self, by: Millis) {
        let target = self.now() + by;
        self.advance_to(target);
    }

    /// Move the clock to `target`, firing every timer due at or before it in
    /// `(due, registration)` order. The clock reads each timer's due time while it runs.
    pub fn advance_to(&self, target: Millis) {
        loop {
            let (id, callback, repeating) = {
                let mut guard = self.inner.borrow_mut();
                let inner = &mut *guard;
                let Some((id, due)) = inner.next_due(target) else {
                    break;
                };
                inner.now = inner.now.max(due);
                let seq = inner.seq();
                let period = inner.timers.get(id).and_then(|t| t.period);
                match period {
                    Some(period) => {
                        let Some(timer) = inner.timers.get_mut(id) else {
                            break;
                        };
                        timer.due = due + period;
                        timer.seq = seq;
                        (id, timer.callback.take(), true)
                    }
                    None => {
                        let callback = inner.timers.remove(id).and_then(|t| t.callback);
                        (id, callback, false)
                    }
                }
            };

            let Some(mut callback) = callback else {
                continue;
            };
            callback();

            if repeating {
                let mut inner = self.inner.borrow_mut();
                if let Some(timer) = inner.timers.get_mut(id)
                    && timer.callback.is_none()
                {
                    timer.callback = Some(callback);
                }
            }
        }

        let mut inner = self.inner.borrow_mut();
        inner.now = inner.now.max(target);
    }

    /// One display refresh: advance by `dt`, then call every frame subscriber once with the
    /// new time. Subscribers added during the frame first run on the next one.
    pub fn tick_frame(&self, dt: Millis) {
        self.advance(dt);

        let (now, mut ids) = {
            let mut inner = self.inner.borrow_mut();
            inner.frames_run += 1;
            let ids: Vec<(u64, FrameId)> =
                inner.frames.iter().map(|(id, f)| (f.seq, id)).collect();
            (inner.now, ids)
        };
        ids.sort_unstable();

        for (_, id) in ids {
            let callback = {
                let mut inner = self.inner.borrow_mut();
                inner.frames.get_mut(id).and_then(|f| f.callback.take())
            };
            let Some(mut callback) = callback else {
                continue;
            };
            callback(now);

            let mut inner = self.inner.borrow_mut();
            if let Some(sub) = inner.frames.get_mut(id)
                && sub.callback.is_none()
            {
                sub.callback = Some(callback);
            }
        }
    }

    /// Deliver frames of `frame` length until at least `duration` has elapsed.
    pub fn run_frames(&self, duration: Millis, frame: Millis) {
        let frame = if frame.0 == 0 { Millis(1) } else { frame };
        let end = self.now() + duration;
        while self.now() < end {
            let step = frame.min(end - self.now());
            self.tick_frame(step);
        }
    }
}

/// Weak counterpart of [`Scheduler`]. Every operation is a no-op once the scheduler is gone.
#[derive(Clone, Default)]
pub struct SchedulerHandle {
    inner: Weak<RefCell<SchedulerInner>>,
}

impl SchedulerHandle {
    pub fn upgrade(&self) -> Option<Scheduler> {
        self.inner.upgrade().map(|inner| Scheduler { inner })
    }

    pub fn cancel_timer(&self, id: TimerId) -> bool {
        self.upgrade().is_some_and(|s| s.cancel_timer(id))
    }

    pub fn cancel_frames(&self, id: FrameId) -> bool {
        self.upgrade().is_some_and(|s| s.cancel_frames(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::core::ms;
    use std::cell::Cell;

    #[test]
    fn timers_fire_in_due_then_registration_order() {
        let s = Scheduler::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        for (delay, tag) in [(30, "c"), (10, "a"), (10, "b")] {
            let log = Rc::clone(&log);
            s.set_timeout(ms(delay), move || log.borrow_mut().push(tag));
        }
        s.advance(ms(30));
        assert_eq!(*log.borrow(), vec!["a", "b", "c"]);
    }

    #[test]
    fn timer_fires_exactly_at_due_time() {
        let s = Scheduler::new();
        let fired = Rc::new(Cell::new(None));
        let seen = Rc::clone(&fired);
        let h = s.handle();
        s.set_timeout(ms(1800), move || {
            seen.set(h.upgrade().map(|s| s.now()));
        });
        s.advance(ms(1799));
        assert_eq!(fired.get(), None);
        s.advance(ms(1));
        assert_eq!(fired.get(), Some(ms(1800)));
    }

    #[test]
    fn cancelled_timer_never_fires() {
        let s = Scheduler::new();
        let fired = Rc::new(Cell::new(false));
        let f = Rc::clone(&fired);
        let id = s.set_timeout(ms(5), move || f.set(true));
        assert!(s.cancel_timer(id));
        assert!(!s.cancel_timer(id));
        s.advance(ms(50));
        assert!(!fired.get());
    }

    #[test]
    fn interval_repeats_and_can_cancel_itself() {
        let s = Scheduler::new();
        let count = Rc::new(Cell::new(0));
        let slot: Rc<Cell<Option<TimerId>>> = Rc::new(Cell::new(None));
        let (c, sl, h) = (Rc::clone(&count), Rc::clone(&slot), s.handle());
        let id = s.set_interval(ms(80), move || {
            c.set(c.get() + 1);
            if c.get() == 3
                && let Some(id) = sl.get()
            {
                h.cancel_timer(id);
            }
        });
        slot.set(Some(id));
        s.advance(ms(1000));
        assert_eq!(count.get(), 3);
        assert_eq!(s.pending_timers(), 0);
    }

    #[test]
    fn frame_subscribers_see_new_time_once_per_tick() {
        let s = Scheduler::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let v = Rc::clone(&seen);
        let id = s.request_frames(move |now| v.borrow_mut().push(now));
        s.tick_frame(ms(16));
        s.tick_frame(ms(16));
        s.cancel_frames(id);
        s.tick_frame(ms(16));
        assert_eq!(*seen.borrow(), vec![ms(16), ms(32)]);
        assert_eq!(s.frames_run(), 3);
    }

    #[test]
    fn handle_is_inert_after_scheduler_drop() {
        let s = Scheduler::new();
        let h = s.handle();
        let id = s.set_timeout(ms(1), || {});
        drop(s);
        assert!(h.upgrade().is_none());
        assert!(!h.cancel_timer(id));
    }
}
