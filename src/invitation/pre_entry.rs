//! The sealed envelope shown before the guest enters.

use std::rc::Rc;

use crate::{
    animation::{PlayState, TimelinePlayer},
    audio::AudioControl,
    foundation::core::{Millis, ms},
    foundation::error::{InvitaError, InvitaResult},
    invitation::choreography,
    phase::{ActivePhase, PhaseController, PhasePlan},
    schedule::Scheduler,
    stage::SharedStage,
};

pub const CONFIRM: &str = "confirm";

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SealPhase {
    Seal,
    Text,
    Exiting,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticlePhase {
    Hidden,
    Bursting,
    Spent,
}

/// How the music reacted to the confirm gesture.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "result", content = "reason", rename_all = "snake_case")]
pub enum AudioStart {
    Started,
    Unavailable,
    Failed(String),
}

/// Times are measured from mount.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct PreEntrySettings {
    pub seal_to_text_ms: Millis,
    pub particles_in_ms: Millis,
    pub particles_out_ms: Millis,
    pub exit_fade_ms: Millis,
}

impl Default for PreEntrySettings {
    fn default() -> Self {
        Self {
            seal_to_text_ms: ms(1800),
            particles_in_ms: ms(400),
            particles_out_ms: ms(2200),
            exit_fade_ms: ms(1600),
        }
    }
}

impl PreEntrySettings {
    pub fn validate(&self) -> InvitaResult<()> {
        if self.particles_out_ms < self.particles_in_ms {
            return Err(InvitaError::validation(format!(
                "pre_entry.particles_out_ms ({}) must not precede particles_in_ms ({})",
                self.particles_out_ms, self.particles_in_ms
            )));
        }
        Ok(())
    }

    fn seal_plan(&self) -> PhasePlan<SealPhase> {
        PhasePlan::new(SealPhase::Seal)
            .after(SealPhase::Seal, self.seal_to_text_ms, SealPhase::Text)
            .on(SealPhase::Seal, CONFIRM, SealPhase::Exiting)
            .on(SealPhase::Text, CONFIRM, SealPhase::Exiting)
    }

    fn particle_plan(&self) -> PhasePlan<ParticlePhase> {
        PhasePlan::new(ParticlePhase::Hidden)
            .after(ParticlePhase::Hidden, self.particles_in_ms, ParticlePhase::Bursting)
            .after(
                ParticlePhase::Bursting,
                self.particles_out_ms - self.particles_in_ms,
                ParticlePhase::Spent,
            )
    }
}

pub struct PreEntry {
    scheduler: Scheduler,
    stage: SharedStage,
    settings: PreEntrySettings,
    seal: PhaseController<SealPhase>,
    particles: PhaseController<ParticlePhase>,
    audio: Option<Rc<dyn AudioControl>>,
    exit: Option<TimelinePlayer>,
}

impl PreEntry {
    pub fn new(
        scheduler: &Scheduler,
        stage: SharedStage,
        settings: &PreEntrySettings,
        audio: Option<Rc<dyn AudioControl>>,
    ) -> InvitaResult<Self> {
        settings.validate()?;
        Ok(Self {
            scheduler: scheduler.clone(),
            stage,
            settings: settings.clone(),
            seal: PhaseController::new(scheduler, "seal", settings.seal_plan())?,
            particles: PhaseController::new(scheduler, "particles", settings.particle_plan())?,
            audio,
            exit: None,
        })
    }

    pub fn on_seal<F>(&self, f: F)
    where
        F: FnMut(ActivePhase<SealPhase>) + 'static,
    {
        self.seal.on_enter(f);
    }

    pub fn on_particles<F>(&self, f: F)
    where
        F: FnMut(ActivePhase<ParticlePhase>) + 'static,
    {
        self.particles.on_enter(f);
    }

    /// Mount: start both phase sequences and show the screen.
    pub fn start(&self) {
        self.stage
            .borrow_mut()
            .set(choreography::PRE_ENTRY, "opacity", 1.0);
        self.seal.start();
        self.particles.start();
    }

    /// The guest's confirm gesture. Returns `None` when the screen is already exiting.
    ///
    /// `on_exited` runs once the exit fade has finished.
    pub fn confirm<F>(&mut self, on_exited: F) -> InvitaResult<Option<AudioStart>>
    where
        F: FnOnce() + 'static,
    {
        if !self.seal.trigger(CONFIRM) {
            return Ok(None);
        }

        let audio = match &self.audio {
            Some(audio) if audio.is_available() => match audio.play() {
                Ok(()) => AudioStart::Started,
                Err(e) => {
                    tracing::warn!(error = %e, "music did not start");
                    AudioStart::Failed(e.to_string())
                }
            },
            _ => AudioStart::Unavailable,
        };

        let mut exit = TimelinePlayer::new(
            &self.scheduler,
            &choreography::pre_entry_exit(self.settings.exit_fade_ms),
            Rc::clone(&self.stage),
        )?;
        exit.on_complete(on_exited);
        exit.play();
        self.exit = Some(exit);
        Ok(Some(audio))
    }

    pub fn seal_phase(&self) -> SealPhase {
        self.seal.phase()
    }

    pub fn particle_phase(&self) -> ParticlePhase {
        self.particles.phase()
    }

    pub fn is_exiting(&self) -> bool {
        self.seal.phase() == SealPhase::Exiting
    }

    pub fn exit_state(&self) -> Option<PlayState> {
        self.exit.as_ref().map(TimelinePlayer::state)
    }
}

impl Drop for PreEntry {
    fn drop(&mut self) {
        if let Ok(mut stage) = self.stage.try_borrow_mut() {
            stage.clear_target(choreography::PRE_ENTRY);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::Stage;
    use std::cell::{Cell, RefCell};

    struct FakeAudio {
        available: bool,
        fail: bool,
        plays: Cell<u32>,
    }

    impl AudioControl for FakeAudio {
        fn is_available(&self) -> bool {
            self.available
        }

        fn play(&self) -> InvitaResult<()> {
            self.plays.set(self.plays.get() + 1);
            if self.fail {
                Err(InvitaError::audio("blocked"))
            } else {
                Ok(())
            }
        }
    }

    fn audio(available: bool, fail: bool) -> Rc<FakeAudio> {
        Rc::new(FakeAudio {
            available,
            fail,
            plays: Cell::new(0),
        })
    }

    fn mounted(s: &Scheduler, audio: Option<Rc<dyn AudioControl>>) -> PreEntry {
        let pre = PreEntry::new(s, Stage::shared(), &PreEntrySettings::default(), audio).unwrap();
        pre.start();
        pre
    }

    #[test]
    fn seal_turns_to_text_after_its_delay() {
        let s = Scheduler::new();
        let pre = mounted(&s, None);
        s.advance(ms(1799));
        assert_eq!(pre.seal_phase(), SealPhase::Seal);
        s.advance(ms(1));
        assert_eq!(pre.seal_phase(), SealPhase::Text);
    }

    #[test]
    fn particles_burst_then_clear() {
        let s = Scheduler::new();
        let pre = mounted(&s, None);
        s.advance(ms(400));
        assert_eq!(pre.particle_phase(), ParticlePhase::Bursting);
        s.advance(ms(1799));
        assert_eq!(pre.particle_phase(), ParticlePhase::Bursting);
        s.advance(ms(1));
        assert_eq!(pre.particle_phase(), ParticlePhase::Spent);
    }

    #[test]
    fn confirm_before_text_skips_the_pending_phase() {
        let s = Scheduler::new();
        let a = audio(true, false);
        let mut pre = mounted(&s, Some(a.clone()));
        let seen = Rc::new(RefCell::new(Vec::new()));
        let v = Rc::clone(&seen);
        pre.on_seal(move |p| v.borrow_mut().push(p.phase));

        assert_eq!(pre.confirm(|| {}).unwrap(), Some(AudioStart::Started));
        s.advance(ms(5000));
        assert_eq!(*seen.borrow(), vec![SealPhase::Exiting]);
        assert_eq!(a.plays.get(), 1);
    }

    #[test]
    fn second_confirm_is_ignored() {
        let s = Scheduler::new();
        let mut pre = mounted(&s, None);
        assert!(pre.confirm(|| {}).unwrap().is_some());
        assert_eq!(pre.confirm(|| {}).unwrap(), None);
    }

    #[test]
    fn exit_fade_completes_once() {
        let s = Scheduler::new();
        let mut pre = mounted(&s, None);
        let exited = Rc::new(Cell::new(0));
        let e = Rc::clone(&exited);
        pre.confirm(move || e.set(e.get() + 1)).unwrap();
        s.run_frames(ms(1584), ms(16));
        assert_eq!(exited.get(), 0);
        s.run_frames(ms(200), ms(16));
        assert_eq!(exited.get(), 1);
        assert_eq!(pre.exit_state(), Some(PlayState::Completed));
    }

    #[test]
    fn audio_failure_does_not_block_entry() {
        let s = Scheduler::new();
        let mut pre = mounted(&s, Some(audio(true, true)));
        let outcome = pre.confirm(|| {}).unwrap();
        assert!(matches!(outcome, Some(AudioStart::Failed(_))));
        assert!(pre.is_exiting());
    }

    #[test]
    fn unavailable_audio_is_not_played() {
        let s = Scheduler::new();
        let a = audio(false, false);
        let mut pre = mounted(&s, Some(a.clone()));
        assert_eq!(pre.confirm(|| {}).unwrap(), Some(AudioStart::Unavailable));
        assert_eq!(a.plays.get(), 0);
    }

    #[test]
    fn particle_window_must_be_ordered() {
        let settings = PreEntrySettings {
            particles_out_ms: ms(100),
            ..PreEntrySettings::default()
        };
        assert!(settings.validate().is_err());
    }
}
