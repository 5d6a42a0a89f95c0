use std::rc::Rc;

use invita::{
    EntryState, GateState, Invitation, InvitationConfig, InvitationEvent, MemoryOutput, Playback,
    Point, Scheduler, Section, SimulatedClock, ms,
    invitation::{AudioStart, SealPhase, choreography},
};

// 2026-06-19T07:00:00+07:00, one day and one hour before the default wedding time.
const EVE_MS: i64 = 1_781_827_200_000;

fn page(s: &Scheduler, out: MemoryOutput) -> Invitation {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let clock = Rc::new(SimulatedClock::new(s, EVE_MS));
    let mut inv = Invitation::new(s, InvitationConfig::default(), Box::new(out), clock).unwrap();
    inv.start().unwrap();
    inv
}

fn kinds(events: &[InvitationEvent]) -> Vec<&'static str> {
    events
        .iter()
        .map(|e| match e {
            InvitationEvent::Mounted { .. } => "mounted",
            InvitationEvent::SealPhase { .. } => "seal",
            InvitationEvent::ParticlePhase { .. } => "particles",
            InvitationEvent::EntryConfirmed { .. } => "confirmed",
            InvitationEvent::Entered { .. } => "entered",
            InvitationEvent::GateOpening { .. } => "gate_opening",
            InvitationEvent::GateCue { .. } => "gate_cue",
            InvitationEvent::GateUnmounted { .. } => "gate_unmounted",
            InvitationEvent::CoupleRevealStarted { .. } => "couple_started",
            InvitationEvent::CoupleRevealed { .. } => "couple_revealed",
            InvitationEvent::SectionRevealed { .. } => "section",
            InvitationEvent::AudioToggled { .. } => "audio_toggled",
            InvitationEvent::AudioFailed { .. } => "audio_failed",
            InvitationEvent::LightboxChanged { .. } => "lightbox",
        })
        .collect()
}

#[test]
fn guest_walks_through_the_whole_page() {
    let s = Scheduler::new();
    let mut inv = page(&s, MemoryOutput::new());

    s.run_frames(ms(2000), ms(16));
    assert_eq!(inv.seal_phase(), Some(SealPhase::Text));

    assert!(inv.confirm_entry().unwrap());
    s.run_frames(ms(1700), ms(16));
    assert_eq!(inv.state(), Some(EntryState::Entered(GateState::Closed)));
    assert_eq!(
        inv.mounted(),
        vec![
            Section::Cursor,
            Section::AudioButton,
            Section::CoupleReveal,
            Section::Content,
            Section::Gate
        ]
    );

    let countdown = inv.countdown().unwrap();
    assert_eq!((countdown.days, countdown.hours), (1, 0));

    assert!(inv.open_gate());
    s.run_frames(ms(6000), ms(16));
    assert_eq!(inv.state(), Some(EntryState::Entered(GateState::Open)));
    assert!(!inv.mounted().contains(&Section::Gate));
    assert_eq!(
        inv.stage().borrow().get(choreography::GROOM, "opacity"),
        Some(1.0)
    );

    assert!(inv.intersect("ceremony", 0.4));
    assert!(!inv.intersect("ceremony", 0.9));

    let k = kinds(&inv.take_events());
    let pos = |name: &str| k.iter().position(|e| *e == name).unwrap();
    assert!(pos("mounted") < pos("confirmed"));
    assert!(pos("confirmed") < pos("entered"));
    assert!(pos("entered") < pos("gate_opening"));
    assert!(pos("gate_opening") <= pos("couple_started"));
    assert!(pos("couple_started") < pos("gate_unmounted"));
    assert_eq!(k.iter().filter(|e| **e == "section").count(), 1);
}

#[test]
fn entry_waits_exactly_for_the_exit_fade() {
    let s = Scheduler::new();
    let mut inv = page(&s, MemoryOutput::new());
    inv.confirm_entry().unwrap();
    s.run_frames(ms(1599), ms(1));
    assert_eq!(inv.state(), Some(EntryState::NotEntered));
    s.tick_frame(ms(1));
    assert_eq!(inv.state(), Some(EntryState::Entered(GateState::Closed)));
}

#[test]
fn repeated_gate_gestures_start_one_animation() {
    let s = Scheduler::new();
    let mut inv = page(&s, MemoryOutput::new());
    inv.confirm_entry().unwrap();
    s.run_frames(ms(1700), ms(16));
    inv.take_events();

    let opened: Vec<bool> = (0..5)
        .map(|_| {
            let o = inv.open_gate();
            s.tick_frame(ms(16));
            o
        })
        .collect();
    assert_eq!(opened, vec![true, false, false, false, false]);

    s.run_frames(ms(6000), ms(16));
    let k = kinds(&inv.take_events());
    assert_eq!(k.iter().filter(|e| **e == "gate_opening").count(), 1);
    assert_eq!(k.iter().filter(|e| **e == "gate_unmounted").count(), 1);
    assert_eq!(k.iter().filter(|e| **e == "couple_revealed").count(), 1);
}

#[test]
fn host_without_audio_still_enters() {
    let s = Scheduler::new();
    let mut inv = page(&s, MemoryOutput::unavailable());
    inv.confirm_entry().unwrap();
    s.run_frames(ms(1700), ms(16));
    assert_eq!(inv.state(), Some(EntryState::Entered(GateState::Closed)));
    assert_eq!(inv.audio().playback(), Playback::Paused);

    let audio = inv.take_events().into_iter().find_map(|e| match e {
        InvitationEvent::EntryConfirmed { audio, .. } => Some(audio),
        _ => None,
    });
    assert_eq!(audio, Some(AudioStart::Unavailable));
}

#[test]
fn audio_button_fades_out_and_back_in() {
    let s = Scheduler::new();
    let mut inv = page(&s, MemoryOutput::new());
    inv.confirm_entry().unwrap();
    s.advance(ms(2000));
    assert!(inv.audio().volume() > 0.3);

    assert_eq!(inv.toggle_audio(), Playback::FadingOut);
    s.advance(ms(2000));
    assert_eq!(inv.audio().playback(), Playback::Paused);
    assert_eq!(inv.toggle_audio(), Playback::Playing);
}

#[test]
fn cursor_ring_trails_the_pointer() {
    let s = Scheduler::new();
    let inv = page(&s, MemoryOutput::new());
    inv.pointer_move(Point::new(300.0, 200.0));
    let first = inv.cursor().unwrap();
    assert_eq!(first.dot, Point::new(300.0, 200.0));
    assert_eq!(first.ring, Point::new(-200.0, -200.0));

    s.run_frames(ms(160), ms(16));
    let later = inv.cursor().unwrap();
    assert!(later.ring.distance(later.dot) < first.ring.distance(first.dot));

    inv.hover(true);
    inv.pointer_down();
    let pressed = inv.cursor().unwrap();
    assert_eq!(pressed.ring_size, 50.0);
    assert_eq!(pressed.dot_scale, 0.65);
}

#[test]
fn dropping_the_page_mid_animation_is_silent() {
    let s = Scheduler::new();
    let mut inv = page(&s, MemoryOutput::new());
    inv.confirm_entry().unwrap();
    s.run_frames(ms(800), ms(16));
    drop(inv);
    s.run_frames(ms(10_000), ms(16));
    assert_eq!(s.frame_subscribers(), 0);
    assert_eq!(s.pending_timers(), 0);
}

#[test]
fn dispose_after_gate_leaves_nothing_scheduled() {
    let s = Scheduler::new();
    let mut inv = page(&s, MemoryOutput::new());
    inv.confirm_entry().unwrap();
    s.run_frames(ms(1700), ms(16));
    inv.open_gate();
    s.run_frames(ms(1000), ms(16));
    inv.dispose();
    assert_eq!(s.frame_subscribers(), 0);
    assert_eq!(s.pending_timers(), 0);
    assert!(inv.mounted().is_empty());
}
