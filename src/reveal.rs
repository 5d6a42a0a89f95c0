//! Scroll-triggered one-shot entrance animations.

use std::collections::BTreeMap;
use std::rc::Rc;

use crate::{
    animation::{Timeline, TimelinePlayer},
    foundation::core::Millis,
    foundation::error::{InvitaError, InvitaResult},
    schedule::Scheduler,
    stage::SharedStage,
};

/// One-shot state of an observed element.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub struct RevealRecord {
    pub threshold: f64,
    pub fired: bool,
}

impl RevealRecord {
    /// `fraction` crosses the threshold when some of the element is visible and at least
    /// `threshold` of it is.
    pub fn crosses(&self, fraction: f64) -> bool {
        fraction > 0.0 && fraction >= self.threshold
    }
}

struct Observed {
    record: RevealRecord,
    timeline: Timeline,
    player: Option<TimelinePlayer>,
}

/// Fires each observed element's entrance timeline the first time it becomes visible
/// enough, and never again for that element.
pub struct Revealer {
    scheduler: Scheduler,
    stage: SharedStage,
    elements: BTreeMap<String, Observed>,
}

impl Revealer {
    pub fn new(scheduler: &Scheduler, stage: SharedStage) -> Self {
        Self {
            scheduler: scheduler.clone(),
            stage,
            elements: BTreeMap::new(),
        }
    }

    /// Start observing `id`. Observing an id again starts a fresh instance.
    pub fn observe(
        &mut self,
        id: impl Into<String>,
        threshold: f64,
        timeline: Timeline,
    ) -> InvitaResult<()> {
        let id = id.into();
        if !(0.0..=1.0).contains(&threshold) {
            return Err(InvitaError::validation(format!(
                "reveal threshold for '{id}' must be within [0, 1], got {threshold}"
            )));
        }
        // Entrance targets start hidden until they fire.
        timeline
            .schedule()?
            .sample_into(Millis::ZERO, &mut self.stage.borrow_mut());

        self.elements.insert(
            id,
            Observed {
                record: RevealRecord {
                    threshold,
                    fired: false,
                },
                timeline,
                player: None,
            },
        );
        Ok(())
    }

    /// Deliver a visibility update. Returns `true` when this update fired the reveal.
    pub fn intersect(&mut self, id: &str, fraction: f64) -> bool {
        let Some(el) = self.elements.get_mut(id) else {
            tracing::debug!(element = id, "intersection for unobserved element");
            return false;
        };
        if el.record.fired || !el.record.crosses(fraction) {
            return false;
        }

        el.record.fired = true;
        match TimelinePlayer::new(&self.scheduler, &el.timeline, Rc::clone(&self.stage)) {
            Ok(mut player) => {
                player.play();
                el.player = Some(player);
            }
            Err(e) => tracing::warn!(element = id, error = %e, "reveal timeline rejected"),
        }
        tracing::debug!(element = id, fraction, "reveal fired");
        true
    }

    /// Stop observing `id`, cancelling its entrance if it is still playing.
    pub fn unobserve(&mut self, id: &str) -> bool {
        self.elements.remove(id).is_some()
    }

    pub fn record(&self, id: &str) -> Option<RevealRecord> {
        self.elements.get(id).map(|el| el.record)
    }

    pub fn fired_count(&self) -> usize {
        self.elements.values().filter(|e| e.record.fired).count()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.elements.keys().map(String::as_str)
    }
}
