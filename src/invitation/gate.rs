//! The two-panel gate guarding the main page.

use std::cell::Cell;
use std::rc::Rc;

use crate::{
    animation::{PlayState, Timeline, TimelinePlayer},
    foundation::core::Millis,
    foundation::error::InvitaResult,
    invitation::choreography::{CUE_CLEAR_FX, CUE_REVEAL_FX},
    schedule::Scheduler,
    stage::SharedStage,
};

/// Decorative layers toggled by the gate timeline's cues.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct GateFx {
    pub rays: bool,
    pub smoke: bool,
}

pub struct GrandGate {
    targets: Vec<String>,
    player: TimelinePlayer,
    fx: Rc<Cell<GateFx>>,
    stage: SharedStage,
}

impl GrandGate {
    /// Mount the gate closed. The timeline is resolved now so a bad choreography fails at
    /// mount rather than at the gesture.
    pub fn new(scheduler: &Scheduler, stage: SharedStage, timeline: &Timeline) -> InvitaResult<Self> {
        let schedule = timeline.schedule()?;
        schedule.sample_into(Millis::ZERO, &mut stage.borrow_mut());
        Ok(Self {
            targets: timeline.targets().into_iter().map(str::to_owned).collect(),
            player: TimelinePlayer::from_schedule(scheduler, schedule, Rc::clone(&stage)),
            fx: Rc::new(Cell::new(GateFx::default())),
            stage,
        })
    }

    /// Play the opening timeline. Only the first call does anything; later gestures while
    /// opening or after completion return `false`.
    ///
    /// `on_cue` sees every cue after the gate has applied it, `on_done` runs once the
    /// timeline completes.
    pub fn open<C, D>(&mut self, mut on_cue: C, on_done: D) -> bool
    where
        C: FnMut(&str) + 'static,
        D: FnOnce() + 'static,
    {
        if self.player.state() != PlayState::Idle {
            tracing::debug!(state = ?self.player.state(), "gate already opened");
            return false;
        }

        let fx = Rc::clone(&self.fx);
        self.player.on_cue(move |name| {
            match name {
                CUE_REVEAL_FX => fx.set(GateFx {
                    rays: true,
                    smoke: true,
                }),
                CUE_CLEAR_FX => fx.set(GateFx::default()),
                _ => {}
            }
            on_cue(name);
        });
        self.player.on_complete(on_done);
        self.player.play();
        true
    }

    pub fn state(&self) -> PlayState {
        self.player.state()
    }

    pub fn fx(&self) -> GateFx {
        self.fx.get()
    }

    pub fn span(&self) -> Millis {
        self.player.span()
    }
}

impl Drop for GrandGate {
    fn drop(&mut self) {
        self.player.cancel();
        if let Ok(mut stage) = self.stage.try_borrow_mut() {
            for target in &self.targets {
                stage.clear_target(target);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::core::ms;
    use crate::invitation::choreography::{self, GATE, GATE_LEFT};
    use crate::stage::Stage;

    fn mounted(s: &Scheduler) -> (GrandGate, SharedStage) {
        let stage = Stage::shared();
        let gate = GrandGate::new(s, Rc::clone(&stage), &choreography::gate()).unwrap();
        (gate, stage)
    }

    #[test]
    fn mounts_closed_and_visible() {
        let s = Scheduler::new();
        let (gate, stage) = mounted(&s);
        assert_eq!(gate.state(), PlayState::Idle);
        assert_eq!(stage.borrow().get(GATE, "opacity"), Some(1.0));
        assert_eq!(stage.borrow().get(GATE_LEFT, "x_percent"), Some(0.0));
    }

    #[test]
    fn repeated_gestures_play_one_timeline() {
        let s = Scheduler::new();
        let (mut gate, _stage) = mounted(&s);
        let done = Rc::new(Cell::new(0));
        let d = Rc::clone(&done);
        assert!(gate.open(|_| {}, move || d.set(d.get() + 1)));
        for _ in 0..3 {
            let d = Rc::clone(&done);
            assert!(!gate.open(|_| {}, move || d.set(d.get() + 100)));
        }
        assert_eq!(s.frame_subscribers(), 1);
        s.run_frames(ms(5000), ms(16));
        assert_eq!(done.get(), 1);
        assert!(!gate.open(|_| {}, || {}));
    }

    #[test]
    fn cues_toggle_the_effects() {
        let s = Scheduler::new();
        let (mut gate, stage) = mounted(&s);
        gate.open(|_| {}, || {});
        s.run_frames(ms(592), ms(16));
        assert_eq!(gate.fx(), GateFx::default());
        s.run_frames(ms(16), ms(16));
        assert!(gate.fx().rays && gate.fx().smoke);
        s.run_frames(ms(4000), ms(16));
        assert_eq!(gate.fx(), GateFx::default());
        assert_eq!(stage.borrow().get(GATE_LEFT, "x_percent"), Some(-102.0));
        assert_eq!(stage.borrow().get(GATE, "opacity"), Some(0.0));
    }

    #[test]
    fn unmount_mid_open_is_silent() {
        let s = Scheduler::new();
        let (mut gate, stage) = mounted(&s);
        let done = Rc::new(Cell::new(false));
        let d = Rc::clone(&done);
        gate.open(|_| {}, move || d.set(true));
        s.run_frames(ms(1000), ms(16));
        drop(gate);
        s.run_frames(ms(5000), ms(16));
        assert!(!done.get());
        assert_eq!(s.frame_subscribers(), 0);
        assert_eq!(stage.borrow().get(GATE, "scale"), None);
    }
}
