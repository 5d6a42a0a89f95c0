//! Built-in choreography of the invitation page.
//!
//! Every timeline here is only a default; [`crate::config::InvitationConfig`] may replace any
//! of them from JSON.

use crate::{
    animation::{Ease, Offset, Timeline, Tween},
    foundation::core::{Millis, ms},
};

pub const PRE_ENTRY: &str = "pre_entry";

pub const GATE: &str = "gate";
pub const GATE_LEFT: &str = "gate_left";
pub const GATE_RIGHT: &str = "gate_right";
/// Light rays and smoke behind the panels come on.
pub const CUE_REVEAL_FX: &str = "reveal_fx";
/// ... and go off once the gate has faded.
pub const CUE_CLEAR_FX: &str = "clear_fx";

pub const SUBTITLE: &str = "couple_subtitle";
pub const GROOM: &str = "groom_name";
pub const BRIDE: &str = "bride_name";
pub const AMPERSAND: &str = "ampersand";

pub const GALLERY_PHOTOS: usize = 6;

/// Fade of the whole pre-entry screen after the guest confirms.
pub fn pre_entry_exit(fade: Millis) -> Timeline {
    Timeline::new().tween(Tween::new(PRE_ENTRY, fade, Ease::InOutQuad).prop("opacity", 1.0, 0.0))
}

/// Breathing pulse, panels sliding apart, then the whole gate fading out.
pub fn gate() -> Timeline {
    Timeline::new()
        .tween(Tween::new(GATE, ms(900), Ease::InOutQuad).prop("scale", 1.0, 1.035))
        .cue_at(Offset::Overlap(ms(300)), CUE_REVEAL_FX)
        .tween_at(
            Offset::Overlap(ms(100)),
            Tween::new(GATE_LEFT, ms(2400), Ease::InOutQuart).prop("x_percent", 0.0, -102.0),
        )
        .tween_at(
            Offset::WithPrevious,
            Tween::new(GATE_RIGHT, ms(2400), Ease::InOutQuart).prop("x_percent", 0.0, 102.0),
        )
        .tween_at(
            Offset::Overlap(ms(200)),
            Tween::new(GATE, ms(900), Ease::InCubic).prop("opacity", 1.0, 0.0),
        )
        .cue(CUE_CLEAR_FX)
}

/// Staggered entrance of the couple's names, started while the gate is still opening.
pub fn couple_reveal() -> Timeline {
    Timeline::new()
        .delay(ms(500))
        .tween(
            Tween::new(SUBTITLE, ms(1000), Ease::OutCubic)
                .prop("opacity", 0.0, 1.0)
                .prop("y", 14.0, 0.0),
        )
        .tween_at(
            Offset::Overlap(ms(400)),
            Tween::new(GROOM, ms(1600), Ease::OutQuart)
                .prop("opacity", 0.0, 1.0)
                .prop("x", -60.0, 0.0),
        )
        .tween_at(
            Offset::WithPrevious,
            Tween::new(BRIDE, ms(1600), Ease::OutQuart)
                .prop("opacity", 0.0, 1.0)
                .prop("x", 60.0, 0.0),
        )
        .tween_at(
            Offset::Overlap(ms(1200)),
            Tween::new(AMPERSAND, ms(1400), Ease::OutCubic)
                .prop("opacity", 0.0, 1.0)
                .prop("scale", 0.85, 1.0),
        )
}

/// The common fade-and-rise used by content sections.
pub fn fade_up(target: &str, duration: Millis, rise: f64) -> Timeline {
    Timeline::new().tween(
        Tween::new(target, duration, Ease::OutCubic)
            .prop("opacity", 0.0, 1.0)
            .prop("y", rise, 0.0),
    )
}

fn fade_in(target: &str, duration: Millis) -> Timeline {
    Timeline::new().tween(Tween::new(target, duration, Ease::OutCubic).prop("opacity", 0.0, 1.0))
}

/// `(id, threshold, timeline)` for every scroll-revealed element, in page order.
///
/// A threshold of 0 fires as soon as any part of the element is visible.
pub fn sections() -> Vec<(String, f64, Timeline)> {
    let mut out = vec![
        ("heritage".to_owned(), 0.35, fade_up("heritage", ms(1200), 20.0)),
        ("ceremony".to_owned(), 0.0, fade_up("ceremony", ms(900), 50.0)),
        ("countdown".to_owned(), 0.0, fade_up("countdown", ms(1000), 24.0)),
        ("gallery".to_owned(), 0.0, fade_up("gallery", ms(1000), 20.0)),
    ];

    for i in 0..GALLERY_PHOTOS {
        let id = format!("gallery_item_{i}");
        let tl = fade_up(&id, ms(800), 30.0).delay(ms(i as u64 * 80));
        out.push((id, 0.0, tl));
    }

    out.push(("rsvp".to_owned(), 0.0, fade_up("rsvp", ms(800), 16.0)));
    out.push(("digital_gift".to_owned(), 0.0, fade_up("digital_gift", ms(900), 16.0)));
    out.push(("closing".to_owned(), 0.0, fade_in("closing", ms(1200))));
    out
}
