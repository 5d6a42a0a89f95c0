use std::rc::Rc;

use crate::{
    animation::{PlayState, Timeline, TimelinePlayer},
    foundation::core::Millis,
    foundation::error::InvitaResult,
    schedule::Scheduler,
    stage::SharedStage,
};

/// The couple's names, hidden until the gate gesture starts their entrance.
pub struct CoupleReveal {
    player: TimelinePlayer,
}

impl CoupleReveal {
    pub fn new(scheduler: &Scheduler, stage: SharedStage, timeline: &Timeline) -> InvitaResult<Self> {
        let schedule = timeline.schedule()?;
        schedule.sample_into(Millis::ZERO, &mut stage.borrow_mut());
        Ok(Self {
            player: TimelinePlayer::from_schedule(scheduler, schedule, stage),
        })
    }

    /// Start the entrance. Returns `false` when it was already started.
    pub fn trigger<F>(&mut self, on_done: F) -> bool
    where
        F: FnOnce() + 'static,
    {
        if self.player.state() != PlayState::Idle {
            return false;
        }
        self.player.on_complete(on_done);
        self.player.play();
        true
    }

    pub fn state(&self) -> PlayState {
        self.player.state()
    }
}
