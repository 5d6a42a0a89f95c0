use super::scheduler::{FrameId, Scheduler, SchedulerHandle, TimerId};

/// Timers and frame subscriptions owned by one component, released together on
/// [`Disposables::dispose`] or drop.
#[derive(Default)]
pub struct Disposables {
    scheduler: SchedulerHandle,
    timers: Vec<TimerId>,
    frames: Vec<FrameId>,
}

impl Disposables {
    pub fn new(scheduler: &Scheduler) -> Self {
        Self {
            scheduler: scheduler.handle(),
            timers: Vec::new(),
            frames: Vec::new(),
        }
    }

    pub fn track_timer(&mut self, id: TimerId) -> TimerId {
        if let Some(s) = self.scheduler.upgrade() {
            self.timers.retain(|t| s.is_pending(*t));
        }
        self.timers.push(id);
        id
    }

    pub fn track_frames(&mut self, id: FrameId) -> FrameId {
        self.frames.push(id);
        id
    }

    /// Release one frame subscription early.
    pub fn release_frames(&mut self, id: FrameId) {
        self.frames.retain(|f| *f != id);
        self.scheduler.cancel_frames(id);
    }

    pub fn release_timer(&mut self, id: TimerId) {
        self.timers.retain(|t| *t != id);
        self.scheduler.cancel_timer(id);
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty() && self.frames.is_empty()
    }

    pub fn dispose(&mut self) {
        let timers = std::mem::take(&mut self.timers);
        let frames = std::mem::take(&mut self.frames);
        let Some(s) = self.scheduler.upgrade() else {
            return;
        };
        for id in timers {
            s.cancel_timer(id);
        }
        for id in frames {
            s.cancel_frames(id);
        }
    }
}

impl Drop for Disposables {
    fn drop(&mut self) {
        self.dispose();
    }
}
