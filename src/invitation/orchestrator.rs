use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::{
    audio::{AudioControl, AudioOutput, AudioPlayer, Playback},
    config::InvitationConfig,
    foundation::core::{Millis, Point},
    foundation::error::InvitaResult,
    invitation::{
        couple::CoupleReveal,
        gallery::Lightbox,
        gate::{GateFx, GrandGate},
        pre_entry::{AudioStart, ParticlePhase, PreEntry, SealPhase},
    },
    reveal::Revealer,
    schedule::Scheduler,
    stage::{SharedStage, Stage},
    tracker::{Countdown, CursorSnapshot, CursorTrail, Remaining, WallClock},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GateState {
    Closed,
    Open,
}

/// Where the guest is on the page. Both transitions are one-way.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "entry", content = "gate", rename_all = "snake_case")]
pub enum EntryState {
    NotEntered,
    Entered(GateState),
}

/// Mounted subtrees, in paint order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    Cursor,
    AudioButton,
    PreEntry,
    CoupleReveal,
    Content,
    Gate,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum InvitationEvent {
    Mounted { at: Millis },
    SealPhase { at: Millis, phase: SealPhase },
    ParticlePhase { at: Millis, phase: ParticlePhase },
    EntryConfirmed { at: Millis, audio: AudioStart },
    Entered { at: Millis },
    GateOpening { at: Millis },
    GateCue { at: Millis, cue: String },
    GateUnmounted { at: Millis },
    CoupleRevealStarted { at: Millis },
    CoupleRevealed { at: Millis },
    SectionRevealed { at: Millis, id: String },
    AudioToggled { at: Millis, playback: Playback },
    AudioFailed { at: Millis, reason: String },
    /// The lightbox now shows `photo`, or closed when `None`.
    LightboxChanged { at: Millis, photo: Option<usize> },
}

type EventLog = Rc<RefCell<Vec<InvitationEvent>>>;

#[derive(Default)]
struct Page {
    state: Option<EntryState>,
    pre_entry: Option<PreEntry>,
    gate: Option<GrandGate>,
    couple: Option<CoupleReveal>,
    revealer: Option<Revealer>,
    lightbox: Option<Lightbox>,
    countdown: Option<Countdown>,
}

/// Page-wide handles cloned into component callbacks.
#[derive(Clone)]
struct Shared {
    scheduler: Scheduler,
    stage: SharedStage,
    config: Rc<InvitationConfig>,
    clock: Rc<dyn WallClock>,
    events: EventLog,
}

impl Shared {
    fn emit(&self, event: InvitationEvent) {
        self.events.borrow_mut().push(event);
    }

    fn now(&self) -> Millis {
        self.scheduler.now()
    }
}

/// The invitation page: pre-entry screen, gate, couple reveal and the scrolling content,
/// with the music player and cursor living across all of them.
///
/// Host gestures come in through the methods below; animation callbacks and timers only ever
/// hold weak references, so dropping the `Invitation` silences everything it started.
pub struct Invitation {
    shared: Shared,
    page: Rc<RefCell<Page>>,
    audio: AudioPlayer,
    cursor: Option<CursorTrail>,
}

impl Invitation {
    pub fn new(
        scheduler: &Scheduler,
        config: InvitationConfig,
        output: Box<dyn AudioOutput>,
        clock: Rc<dyn WallClock>,
    ) -> InvitaResult<Self> {
        config.validate()?;
        let audio = AudioPlayer::new(scheduler, output, config.audio.clone());
        let cursor = if config.cursor.enabled {
            Some(CursorTrail::new(scheduler, &config.cursor)?)
        } else {
            None
        };
        Ok(Self {
            shared: Shared {
                scheduler: scheduler.clone(),
                stage: Stage::shared(),
                config: Rc::new(config),
                clock,
                events: Rc::default(),
            },
            page: Rc::default(),
            audio,
            cursor,
        })
    }

    /// Mount the pre-entry screen. Calling it again is a no-op.
    #[tracing::instrument(skip(self))]
    pub fn start(&mut self) -> InvitaResult<()> {
        if self.page.borrow().state.is_some() {
            return Ok(());
        }

        let shared = &self.shared;
        let audio: Rc<dyn AudioControl> = Rc::new(self.audio.clone());
        let pre = PreEntry::new(
            &shared.scheduler,
            Rc::clone(&shared.stage),
            &shared.config.pre_entry,
            Some(audio),
        )?;

        let s = shared.clone();
        pre.on_seal(move |p| {
            s.emit(InvitationEvent::SealPhase {
                at: s.now(),
                phase: p.phase,
            });
        });
        let s = shared.clone();
        pre.on_particles(move |p| {
            s.emit(InvitationEvent::ParticlePhase {
                at: s.now(),
                phase: p.phase,
            });
        });
        shared.emit(InvitationEvent::Mounted { at: shared.now() });
        pre.start();

        let mut page = self.page.borrow_mut();
        page.state = Some(EntryState::NotEntered);
        page.pre_entry = Some(pre);
        tracing::info!("pre-entry mounted");
        Ok(())
    }

    /// The guest taps "open invitation". Starts the music, fades the pre-entry screen out and
    /// then mounts the gate, couple reveal and content. Returns `false` when ignored.
    #[tracing::instrument(skip(self))]
    pub fn confirm_entry(&mut self) -> InvitaResult<bool> {
        let weak = Rc::downgrade(&self.page);
        let shared = self.shared.clone();

        let mut page = self.page.borrow_mut();
        if page.state != Some(EntryState::NotEntered) {
            return Ok(false);
        }
        let Some(pre) = page.pre_entry.as_mut() else {
            return Ok(false);
        };
        let Some(audio) = pre.confirm(move || enter_main(&weak, &shared))? else {
            return Ok(false);
        };
        drop(page);

        tracing::info!(?audio, "entry confirmed");
        self.shared.emit(InvitationEvent::EntryConfirmed {
            at: self.shared.now(),
            audio,
        });
        Ok(true)
    }

    /// The guest opens the gate. The state flips to open immediately and the couple's
    /// entrance starts with it; the gate unmounts once its own timeline completes.
    #[tracing::instrument(skip(self))]
    pub fn open_gate(&mut self) -> bool {
        let mut page = self.page.borrow_mut();
        if page.state != Some(EntryState::Entered(GateState::Closed)) {
            return false;
        }
        let Some(gate) = page.gate.as_mut() else {
            return false;
        };

        let cue_log = self.shared.clone();
        let done_weak = Rc::downgrade(&self.page);
        let done_log = self.shared.clone();
        let opened = gate.open(
            move |cue| {
                cue_log.emit(InvitationEvent::GateCue {
                    at: cue_log.now(),
                    cue: cue.to_owned(),
                });
            },
            move || unmount_gate(&done_weak, &done_log),
        );
        if !opened {
            return false;
        }
        page.state = Some(EntryState::Entered(GateState::Open));

        let now = self.shared.now();
        self.shared.emit(InvitationEvent::GateOpening { at: now });
        if let Some(couple) = page.couple.as_mut() {
            let log = self.shared.clone();
            if couple.trigger(move || log.emit(InvitationEvent::CoupleRevealed { at: log.now() })) {
                self.shared
                    .emit(InvitationEvent::CoupleRevealStarted { at: now });
            }
        }
        tracing::info!("gate opening");
        true
    }

    /// Visibility update for a scroll-revealed element. Returns `true` when it fired.
    pub fn intersect(&mut self, id: &str, fraction: f64) -> bool {
        let fired = self
            .page
            .borrow_mut()
            .revealer
            .as_mut()
            .is_some_and(|r| r.intersect(id, fraction));
        if fired {
            self.shared.emit(InvitationEvent::SectionRevealed {
                at: self.shared.now(),
                id: id.to_owned(),
            });
        }
        fired
    }

    pub fn pointer_move(&self, at: Point) {
        if let Some(cursor) = &self.cursor {
            cursor.pointer_move(at);
        }
    }

    pub fn pointer_down(&self) {
        if let Some(cursor) = &self.cursor {
            cursor.pointer_down();
        }
    }

    pub fn pointer_up(&self) {
        if let Some(cursor) = &self.cursor {
            cursor.pointer_up();
        }
    }

    pub fn hover(&self, interactive: bool) {
        if let Some(cursor) = &self.cursor {
            cursor.hover(interactive);
        }
    }

    /// The floating music button. Failures are reported, never raised.
    pub fn toggle_audio(&self) -> Playback {
        let at = self.shared.now();
        if let Err(e) = self.audio.toggle() {
            tracing::warn!(error = %e, "music toggle failed");
            self.shared.emit(InvitationEvent::AudioFailed {
                at,
                reason: e.to_string(),
            });
        }
        let playback = self.audio.playback();
        self.shared
            .emit(InvitationEvent::AudioToggled { at, playback });
        playback
    }

    /// Show gallery photo `index` full-screen. Ignored before entry or out of range.
    pub fn open_photo(&mut self, index: usize) -> bool {
        self.with_lightbox(|lb| lb.open(index)).unwrap_or(false)
    }

    pub fn close_photo(&mut self) {
        self.with_lightbox(Lightbox::close);
    }

    pub fn next_photo(&mut self) -> Option<usize> {
        self.with_lightbox(Lightbox::next).flatten()
    }

    pub fn prev_photo(&mut self) -> Option<usize> {
        self.with_lightbox(Lightbox::prev).flatten()
    }

    /// The photo the lightbox shows, if open.
    pub fn photo(&self) -> Option<usize> {
        self.page.borrow().lightbox.as_ref().and_then(Lightbox::selected)
    }

    fn with_lightbox<R>(&mut self, f: impl FnOnce(&mut Lightbox) -> R) -> Option<R> {
        let (out, before, after) = {
            let mut page = self.page.borrow_mut();
            let lb = page.lightbox.as_mut()?;
            let before = lb.selected();
            let out = f(lb);
            (out, before, lb.selected())
        };
        if before != after {
            self.shared.emit(InvitationEvent::LightboxChanged {
                at: self.shared.now(),
                photo: after,
            });
        }
        Some(out)
    }

    /// `None` before [`Invitation::start`].
    pub fn state(&self) -> Option<EntryState> {
        self.page.borrow().state
    }

    pub fn mounted(&self) -> Vec<Section> {
        let page = self.page.borrow();
        let mut out = Vec::new();
        if self.cursor.is_some() {
            out.push(Section::Cursor);
        }
        if matches!(page.state, Some(EntryState::Entered(_))) {
            out.push(Section::AudioButton);
        }
        if page.pre_entry.is_some() {
            out.push(Section::PreEntry);
        }
        if page.couple.is_some() {
            out.push(Section::CoupleReveal);
        }
        if page.revealer.is_some() {
            out.push(Section::Content);
        }
        if page.gate.is_some() {
            out.push(Section::Gate);
        }
        out
    }

    /// Drain the notifications produced since the last call.
    pub fn take_events(&self) -> Vec<InvitationEvent> {
        std::mem::take(&mut *self.shared.events.borrow_mut())
    }

    pub fn stage(&self) -> SharedStage {
        Rc::clone(&self.shared.stage)
    }

    pub fn audio(&self) -> &AudioPlayer {
        &self.audio
    }

    pub fn countdown(&self) -> Option<Remaining> {
        self.page.borrow().countdown.as_ref().map(Countdown::remaining)
    }

    pub fn cursor(&self) -> Option<CursorSnapshot> {
        self.cursor.as_ref().map(CursorTrail::snapshot)
    }

    pub fn seal_phase(&self) -> Option<SealPhase> {
        self.page.borrow().pre_entry.as_ref().map(PreEntry::seal_phase)
    }

    pub fn particle_phase(&self) -> Option<ParticlePhase> {
        self.page
            .borrow()
            .pre_entry
            .as_ref()
            .map(PreEntry::particle_phase)
    }

    pub fn gate_fx(&self) -> Option<GateFx> {
        self.page.borrow().gate.as_ref().map(GrandGate::fx)
    }

    pub fn config(&self) -> &InvitationConfig {
        &self.shared.config
    }

    /// Unmount everything and stop the music. Pending timers and frame subscriptions are
    /// released.
    pub fn dispose(&mut self) {
        let old = std::mem::take(&mut *self.page.borrow_mut());
        drop(old);
        self.cursor = None;
        self.audio.dispose();
        tracing::info!("invitation disposed");
    }
}

// Exit fade finished: swap the pre-entry screen for the main experience.
fn enter_main(page: &Weak<RefCell<Page>>, shared: &Shared) {
    let Some(page) = page.upgrade() else {
        return;
    };
    let (gate, couple, revealer) = match mount_main(shared) {
        Ok(parts) => parts,
        Err(e) => {
            tracing::error!(error = %e, "main page failed to mount");
            return;
        }
    };
    let mut countdown = Countdown::new(
        &shared.scheduler,
        Rc::clone(&shared.clock),
        &shared.config.countdown,
    );
    countdown.start();

    let old = {
        let mut page = page.borrow_mut();
        page.state = Some(EntryState::Entered(GateState::Closed));
        page.gate = Some(gate);
        page.couple = Some(couple);
        page.revealer = Some(revealer);
        page.lightbox = Some(Lightbox::new(shared.config.gallery_photos));
        page.countdown = Some(countdown);
        page.pre_entry.take()
    };
    drop(old);

    shared.emit(InvitationEvent::Entered { at: shared.now() });
    tracing::info!("entered");
}

fn mount_main(shared: &Shared) -> InvitaResult<(GrandGate, CoupleReveal, Revealer)> {
    let cfg = &shared.config;
    let gate = GrandGate::new(&shared.scheduler, Rc::clone(&shared.stage), &cfg.gate)?;
    let couple =
        CoupleReveal::new(&shared.scheduler, Rc::clone(&shared.stage), &cfg.couple_reveal)?;
    let mut revealer = Revealer::new(&shared.scheduler, Rc::clone(&shared.stage));
    for section in &cfg.sections {
        revealer.observe(section.id.clone(), section.threshold, section.timeline.clone())?;
    }
    Ok((gate, couple, revealer))
}

fn unmount_gate(page: &Weak<RefCell<Page>>, shared: &Shared) {
    let Some(page) = page.upgrade() else {
        return;
    };
    let old = page.borrow_mut().gate.take();
    if old.is_none() {
        return;
    }
    drop(old);
    shared.emit(InvitationEvent::GateUnmounted { at: shared.now() });
    tracing::info!("gate unmounted");
}
