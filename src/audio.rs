//! Background music: the one process-wide player and its step-wise volume fades.
//!
//! Components that need to start the music receive an [`AudioControl`] handle from their
//! owner; nothing reaches for a global.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::{
    foundation::core::{Millis, ms},
    foundation::error::{InvitaError, InvitaResult},
    schedule::{Scheduler, SchedulerHandle, TimerId},
};

/// The host's audio element.
pub trait AudioOutput {
    /// Begin playback. Hosts may refuse (autoplay policies).
    fn play(&mut self) -> InvitaResult<()>;
    fn pause(&mut self);
    fn set_volume(&mut self, volume: f64);
    fn volume(&self) -> f64;

    fn is_available(&self) -> bool {
        true
    }
}

/// What a component may do with the shared player.
pub trait AudioControl {
    fn is_available(&self) -> bool;
    fn play(&self) -> InvitaResult<()>;
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct FadeSettings {
    pub step: f64,
    pub interval_ms: Millis,
    pub max_volume: f64,
    /// Fade-in stops once the volume reaches this level.
    pub fade_in_ceiling: f64,
    /// Fade-out pauses once the volume drops to this level.
    pub fade_out_floor: f64,
}

impl Default for FadeSettings {
    fn default() -> Self {
        Self {
            step: 0.03,
            interval_ms: ms(80),
            max_volume: 0.4,
            fade_in_ceiling: 0.38,
            fade_out_floor: 0.03,
        }
    }
}

impl FadeSettings {
    pub fn validate(&self) -> InvitaResult<()> {
        let levels = [
            self.step,
            self.max_volume,
            self.fade_in_ceiling,
            self.fade_out_floor,
        ];
        if levels.iter().any(|v| !v.is_finite()) {
            return Err(InvitaError::validation("audio fade levels must be finite"));
        }
        if !(self.step > 0.0) || self.interval_ms.0 == 0 {
            return Err(InvitaError::validation(
                "audio fade step and interval must be > 0",
            ));
        }
        if !(0.0..=1.0).contains(&self.max_volume) {
            return Err(InvitaError::validation(
                "audio.max_volume must be within [0, 1]",
            ));
        }
        // Fade-in clamps at max_volume and fade-out at 0; a ceiling or floor past those
        // bounds is never reached.
        if !(0.0..=self.max_volume).contains(&self.fade_in_ceiling) {
            return Err(InvitaError::validation(
                "audio.fade_in_ceiling must be within [0, max_volume]",
            ));
        }
        if !(0.0..=self.max_volume).contains(&self.fade_out_floor) {
            return Err(InvitaError::validation(
                "audio.fade_out_floor must be within [0, max_volume]",
            ));
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Playback {
    Paused,
    Playing,
    FadingOut,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Fade {
    In,
    Out,
}

struct AudioState {
    output: Box<dyn AudioOutput>,
    settings: FadeSettings,
    playback: Playback,
    fade: Option<(Fade, TimerId)>,
}

/// Process-wide music player. Clones share one underlying output.
#[derive(Clone)]
pub struct AudioPlayer {
    state: Rc<RefCell<AudioState>>,
    scheduler: Scheduler,
}

impl AudioPlayer {
    pub fn new(
        scheduler: &Scheduler,
        mut output: Box<dyn AudioOutput>,
        settings: FadeSettings,
    ) -> Self {
        output.set_volume(0.0);
        Self {
            state: Rc::new(RefCell::new(AudioState {
                output,
                settings,
                playback: Playback::Paused,
                fade: None,
            })),
            scheduler: scheduler.clone(),
        }
    }

    pub fn playback(&self) -> Playback {
        self.state.borrow().playback
    }

    pub fn volume(&self) -> f64 {
        self.state.borrow().output.volume()
    }

    pub fn is_fading(&self) -> bool {
        self.state.borrow().fade.is_some()
    }

    /// The player button: fade out when playing, otherwise start (or resume) playing.
    pub fn toggle(&self) -> InvitaResult<()> {
        match self.playback() {
            Playback::Playing => {
                self.fade_out();
                Ok(())
            }
            Playback::Paused | Playback::FadingOut => self.start(),
        }
    }

    fn start(&self) -> InvitaResult<()> {
        {
            let mut st = self.state.borrow_mut();
            match st.playback {
                Playback::Playing => return Ok(()),
                Playback::FadingOut => {}
                Playback::Paused => st.output.play()?,
            }
            st.playback = Playback::Playing;
        }
        tracing::info!("music playing");
        self.fade_in();
        Ok(())
    }

    fn fade_in(&self) {
        begin_fade(&self.state, &self.scheduler, Fade::In);
    }

    /// Cancel any running fade and silence the output.
    pub fn dispose(&self) {
        let mut st = self.state.borrow_mut();
        if let Some((_, id)) = st.fade.take() {
            self.scheduler.cancel_timer(id);
        }
        if st.playback != Playback::Paused {
            st.output.pause();
            st.playback = Playback::Paused;
            tracing::info!("music stopped");
        }
        st.output.set_volume(0.0);
    }

    fn fade_out(&self) {
        self.state.borrow_mut().playback = Playback::FadingOut;
        begin_fade(&self.state, &self.scheduler, Fade::Out);
    }
}

impl AudioControl for AudioPlayer {
    fn is_available(&self) -> bool {
        self.state.borrow().output.is_available()
    }

    fn play(&self) -> InvitaResult<()> {
        if !self.is_available() {
            return Err(InvitaError::audio("no audio output"));
        }
        self.start()
    }
}

// Replaces whichever fade is running.
fn begin_fade(state: &Rc<RefCell<AudioState>>, scheduler: &Scheduler, fade: Fade) {
    let mut st = state.borrow_mut();
    if let Some((_, id)) = st.fade.take() {
        scheduler.cancel_timer(id);
    }
    let id = schedule_step(state, scheduler, st.settings.interval_ms, fade);
    st.fade = Some((fade, id));
}

fn schedule_step(
    state: &Rc<RefCell<AudioState>>,
    scheduler: &Scheduler,
    after: Millis,
    fade: Fade,
) -> TimerId {
    let weak = Rc::downgrade(state);
    let handle = scheduler.handle();
    scheduler.set_timeout(after, move || fade_step(&weak, &handle, fade))
}

fn fade_step(weak: &Weak<RefCell<AudioState>>, handle: &SchedulerHandle, fade: Fade) {
    let (Some(state), Some(scheduler)) = (weak.upgrade(), handle.upgrade()) else {
        return;
    };
    let mut guard = state.borrow_mut();
    let st = &mut *guard;
    if st.fade.map(|(f, _)| f) != Some(fade) {
        return;
    }

    let v = st.output.volume();
    let s = &st.settings;
    let more = match fade {
        Fade::In if v < s.fade_in_ceiling => {
            st.output.set_volume((v + s.step).min(s.max_volume));
            true
        }
        Fade::Out if v > s.fade_out_floor => {
            st.output.set_volume((v - s.step).max(0.0));
            true
        }
        Fade::In => false,
        Fade::Out => {
            st.output.pause();
            st.output.set_volume(0.0);
            st.playback = Playback::Paused;
            tracing::info!("music paused");
            false
        }
    };

    st.fade = if more {
        let interval = st.settings.interval_ms;
        Some((fade, schedule_step(&state, &scheduler, interval, fade)))
    } else {
        None
    };
}

/// In-memory output for headless hosts and tests.
#[derive(Debug, Default)]
pub struct MemoryOutput {
    volume: f64,
    playing: bool,
    reject_play: bool,
    unavailable: bool,
}

impl MemoryOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// An output whose host refuses to start playback.
    pub fn rejecting() -> Self {
        Self {
            reject_play: true,
            ..Self::default()
        }
    }

    /// A host without any audio element.
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }
}

impl AudioOutput for MemoryOutput {
    fn play(&mut self) -> InvitaResult<()> {
        if self.reject_play {
            return Err(InvitaError::audio("playback rejected by host"));
        }
        self.playing = true;
        Ok(())
    }

    fn pause(&mut self) {
        self.playing = false;
    }

    fn set_volume(&mut self, volume: f64) {
        self.volume = volume.clamp(0.0, 1.0);
    }

    fn volume(&self) -> f64 {
        self.volume
    }

    fn is_available(&self) -> bool {
        !self.unavailable
    }
}
