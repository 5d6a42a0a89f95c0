//! Page configuration, loadable from JSON. Every field has a default, so `{}` is a valid
//! configuration.

use std::path::Path;

use crate::{
    animation::Timeline,
    audio::FadeSettings,
    foundation::core::{Millis, ms},
    foundation::error::{InvitaError, InvitaResult},
    invitation::{PreEntrySettings, choreography},
    tracker::{CountdownSettings, CursorSettings},
};

/// One scroll-revealed element.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SectionReveal {
    pub id: String,
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    pub timeline: Timeline,
}

// Any visible part.
fn default_threshold() -> f64 {
    0.0
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct InvitationConfig {
    pub pre_entry: PreEntrySettings,
    pub gate: Timeline,
    pub couple_reveal: Timeline,
    pub sections: Vec<SectionReveal>,
    pub countdown: CountdownSettings,
    pub cursor: CursorSettings,
    pub audio: FadeSettings,
    /// Photos in the gallery lightbox.
    pub gallery_photos: usize,
    /// Display refresh used by the simulator.
    pub frame_ms: Millis,
}

impl Default for InvitationConfig {
    fn default() -> Self {
        Self {
            pre_entry: PreEntrySettings::default(),
            gate: choreography::gate(),
            couple_reveal: choreography::couple_reveal(),
            sections: choreography::sections()
                .into_iter()
                .map(|(id, threshold, timeline)| SectionReveal {
                    id,
                    threshold,
                    timeline,
                })
                .collect(),
            countdown: CountdownSettings::default(),
            cursor: CursorSettings::default(),
            audio: FadeSettings::default(),
            gallery_photos: choreography::GALLERY_PHOTOS,
            frame_ms: ms(16),
        }
    }
}

impl InvitationConfig {
    pub fn from_json(json: &str) -> InvitaResult<Self> {
        let cfg: Self = serde_json::from_str(json)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_path(path: &Path) -> InvitaResult<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            InvitaError::config(format!("read config '{}': {e}", path.display()))
        })?;
        Self::from_json(&json)
    }

    pub fn validate(&self) -> InvitaResult<()> {
        if self.frame_ms.0 == 0 {
            return Err(InvitaError::validation("frame_ms must be > 0"));
        }
        self.pre_entry.validate()?;
        self.gate.schedule()?;
        self.couple_reveal.schedule()?;

        let mut seen = std::collections::BTreeSet::new();
        for section in &self.sections {
            if section.id.trim().is_empty() {
                return Err(InvitaError::validation("section id must be non-empty"));
            }
            if !seen.insert(section.id.as_str()) {
                return Err(InvitaError::validation(format!(
                    "duplicate section id '{}'",
                    section.id
                )));
            }
            if !(0.0..=1.0).contains(&section.threshold) {
                return Err(InvitaError::validation(format!(
                    "section '{}' threshold must be within [0, 1]",
                    section.id
                )));
            }
            section.timeline.schedule()?;
        }

        self.countdown.validate()?;
        self.cursor.validate()?;
        self.audio.validate()?;
        Ok(())
    }
}
