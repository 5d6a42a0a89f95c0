use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::{
    animation::timeline::{Schedule, Timeline},
    foundation::core::Millis,
    foundation::error::InvitaResult,
    schedule::{Disposables, FrameId, Scheduler, SchedulerHandle},
    stage::SharedStage,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayState {
    Idle,
    Playing,
    Completed,
    Cancelled,
}

type CueFn = Box<dyn FnMut(&str)>;
type DoneFn = Box<dyn FnOnce()>;

struct PlayerState {
    schedule: Schedule,
    cues: Vec<(Millis, String)>,
    stage: SharedStage,
    scheduler: SchedulerHandle,
    state: PlayState,
    started_at: Millis,
    next_cue: usize,
    frame: Option<FrameId>,
    on_cue: Option<CueFn>,
    on_complete: Option<DoneFn>,
}

/// One playback of a [`Timeline`], driven by the scheduler's display frames.
///
/// A player plays at most once. Dropping it cancels playback.
pub struct TimelinePlayer {
    inner: Rc<RefCell<PlayerState>>,
    scheduler: Scheduler,
    subs: Disposables,
}

impl TimelinePlayer {
    pub fn new(scheduler: &Scheduler, timeline: &Timeline, stage: SharedStage) -> InvitaResult<Self> {
        Ok(Self::from_schedule(scheduler, timeline.schedule()?, stage))
    }

    pub fn from_schedule(scheduler: &Scheduler, schedule: Schedule, stage: SharedStage) -> Self {
        let cues = schedule.cues();
        Self {
            inner: Rc::new(RefCell::new(PlayerState {
                schedule,
                cues,
                stage,
                scheduler: scheduler.handle(),
                state: PlayState::Idle,
                started_at: Millis::ZERO,
                next_cue: 0,
                frame: None,
                on_cue: None,
                on_complete: None,
            })),
            scheduler: scheduler.clone(),
            subs: Disposables::new(scheduler),
        }
    }

    /// Listener for cue steps, called in schedule order.
    pub fn on_cue<F>(&self, f: F)
    where
        F: FnMut(&str) + 'static,
    {
        self.inner.borrow_mut().on_cue = Some(Box::new(f));
    }

    /// Called exactly once after the last step settles. Never called after `cancel`.
    pub fn on_complete<F>(&self, f: F)
    where
        F: FnOnce() + 'static,
    {
        self.inner.borrow_mut().on_complete = Some(Box::new(f));
    }

    /// Write the initial state and start following display frames. No-op unless idle.
    pub fn play(&mut self) {
        {
            let mut guard = self.inner.borrow_mut();
            let st = &mut *guard;
            if st.state != PlayState::Idle {
                tracing::debug!(state = ?st.state, "play ignored");
                return;
            }
            st.state = PlayState::Playing;
            st.started_at = self.scheduler.now();
            st.schedule
                .sample_into(Millis::ZERO, &mut st.stage.borrow_mut());
        }

        let weak = Rc::downgrade(&self.inner);
        let id = self
            .scheduler
            .request_frames(move |now| advance_player(&weak, now));
        self.inner.borrow_mut().frame = Some(id);
        self.subs.track_frames(id);
    }

    /// Stop interpolation where it is. The completion callback is dropped uncalled.
    pub fn cancel(&mut self) {
        {
            let mut st = self.inner.borrow_mut();
            if matches!(st.state, PlayState::Idle | PlayState::Playing) {
                st.state = PlayState::Cancelled;
            }
            st.on_complete = None;
            st.on_cue = None;
            st.frame = None;
        }
        self.subs.dispose();
    }

    pub fn state(&self) -> PlayState {
        self.inner.borrow().state
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.state(), PlayState::Completed | PlayState::Cancelled)
    }

    /// Time since `play`, including the leading delay.
    pub fn elapsed(&self) -> Millis {
        let st = self.inner.borrow();
        match st.state {
            PlayState::Idle => Millis::ZERO,
            _ => self.scheduler.now() - st.started_at,
        }
    }

    pub fn span(&self) -> Millis {
        self.inner.borrow().schedule.span()
    }
}

fn advance_player(weak: &Weak<RefCell<PlayerState>>, now: Millis) {
    let Some(inner) = weak.upgrade() else {
        return;
    };

    let (fired, on_cue, done) = {
        let mut guard = inner.borrow_mut();
        let st = &mut *guard;
        if st.state != PlayState::Playing {
            return;
        }

        let elapsed = now - st.started_at;
        let local = elapsed.saturating_sub(st.schedule.delay);
        let running = elapsed >= st.schedule.delay;
        st.schedule.sample_into(local, &mut st.stage.borrow_mut());

        let mut fired = Vec::new();
        while running && st.next_cue < st.cues.len() && st.cues[st.next_cue].0 <= local {
            fired.push(st.cues[st.next_cue].1.clone());
            st.next_cue += 1;
        }

        let mut done = None;
        if running && local >= st.schedule.total {
            st.state = PlayState::Completed;
            done = st.on_complete.take();
            if let Some(id) = st.frame.take() {
                st.scheduler.cancel_frames(id);
            }
            tracing::debug!(elapsed = elapsed.0, "timeline completed");
        }

        let on_cue = if fired.is_empty() {
            None
        } else {
            st.on_cue.take()
        };
        (fired, on_cue, done)
    };

    if let Some(mut f) = on_cue {
        for name in &fired {
            f(name);
        }
        let mut st = inner.borrow_mut();
        if st.on_cue.is_none() && st.state != PlayState::Cancelled {
            st.on_cue = Some(f);
        }
    }

    if let Some(done) = done {
        done();
    }
}
