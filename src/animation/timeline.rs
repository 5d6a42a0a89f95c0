use std::collections::{BTreeMap, BTreeSet};

use crate::{
    animation::ease::Ease,
    foundation::core::Millis,
    foundation::error::{InvitaError, InvitaResult},
    stage::Stage,
};

/// Start and end value of one animated property.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PropRange {
    pub from: f64,
    pub to: f64,
}

/// Interpolation of one or more properties of a single target.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Tween {
    pub target: String,
    pub props: BTreeMap<String, PropRange>,
    #[serde(rename = "duration_ms")]
    pub duration: Millis,
    #[serde(default)]
    pub ease: Ease,
}

impl Tween {
    pub fn new(target: impl Into<String>, duration: Millis, ease: Ease) -> Self {
        Self {
            target: target.into(),
            props: BTreeMap::new(),
            duration,
            ease,
        }
    }

    pub fn prop(mut self, name: impl Into<String>, from: f64, to: f64) -> Self {
        self.props.insert(name.into(), PropRange { from, to });
        self
    }

    /// Eased progress in `[0, 1]` after `elapsed` time inside the tween.
    pub fn progress(&self, elapsed: Millis) -> f64 {
        if self.duration.0 == 0 {
            return 1.0;
        }
        self.ease.apply(elapsed.as_f64() / self.duration.as_f64())
    }

    fn validate(&self) -> InvitaResult<()> {
        if self.target.trim().is_empty() {
            return Err(InvitaError::timeline("tween target must be non-empty"));
        }
        if self.props.is_empty() {
            return Err(InvitaError::timeline(format!(
                "tween on '{}' must animate at least one property",
                self.target
            )));
        }
        for (name, range) in &self.props {
            if name.trim().is_empty() {
                return Err(InvitaError::timeline(format!(
                    "tween on '{}' has an empty property name",
                    self.target
                )));
            }
            if !range.from.is_finite() || !range.to.is_finite() {
                return Err(InvitaError::timeline(format!(
                    "tween '{}.{name}' values must be finite",
                    self.target
                )));
            }
        }
        Ok(())
    }
}

/// What a step does once its start time is reached.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    Tween(Tween),
    /// Zero-duration named action, delivered to the player's cue listener.
    Cue(String),
}

/// Where a step starts relative to the steps placed before it.
///
/// The tail is the latest end of any step placed so far.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Offset {
    #[default]
    AfterEnd,
    Gap(Millis),
    /// Start this long before the tail, never before zero.
    Overlap(Millis),
    /// Start together with the previous step.
    WithPrevious,
    /// Absolute time from the start of the timeline.
    At(Millis),
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TimelineStep {
    #[serde(default)]
    pub offset: Offset,
    #[serde(flatten)]
    pub kind: StepKind,
}

/// Ordered, offset-scheduled list of steps. Built per gesture and resolved into a
/// [`Schedule`] before playing.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Timeline {
    #[serde(default, rename = "delay_ms")]
    pub delay: Millis,
    #[serde(default)]
    pub steps: Vec<TimelineStep>,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delay(mut self, delay: Millis) -> Self {
        self.delay = delay;
        self
    }

    pub fn step(mut self, offset: Offset, kind: StepKind) -> Self {
        self.steps.push(TimelineStep { offset, kind });
        self
    }

    pub fn tween(self, tween: Tween) -> Self {
        self.step(Offset::AfterEnd, StepKind::Tween(tween))
    }

    pub fn tween_at(self, offset: Offset, tween: Tween) -> Self {
        self.step(offset, StepKind::Tween(tween))
    }

    pub fn cue(self, name: impl Into<String>) -> Self {
        self.step(Offset::AfterEnd, StepKind::Cue(name.into()))
    }

    pub fn cue_at(self, offset: Offset, name: impl Into<String>) -> Self {
        self.step(offset, StepKind::Cue(name.into()))
    }

    /// Every target any tween of this timeline writes.
    pub fn targets(&self) -> BTreeSet<&str> {
        self.steps
            .iter()
            .filter_map(|s| match &s.kind {
                StepKind::Tween(t) => Some(t.target.as_str()),
                StepKind::Cue(_) => None,
            })
            .collect()
    }

    /// Resolve every step's start and end time.
    ///
    /// A tween that would overlap an earlier tween on the same target property is deferred
    /// until that tween ends.
    pub fn schedule(&self) -> InvitaResult<Schedule> {
        let mut steps = Vec::with_capacity(self.steps.len());
        let mut busy: BTreeMap<(&str, &str), Millis> = BTreeMap::new();
        let mut tail = Millis::ZERO;
        let mut prev_start = Millis::ZERO;

        for (index, step) in self.steps.iter().enumerate() {
            let mut start = match step.offset {
                Offset::AfterEnd => tail,
                Offset::Gap(gap) => tail + gap,
                Offset::Overlap(by) => tail.saturating_sub(by),
                Offset::WithPrevious => prev_start,
                Offset::At(at) => at,
            };

            let end = match &step.kind {
                StepKind::Cue(name) => {
                    if name.trim().is_empty() {
                        return Err(InvitaError::timeline(format!(
                            "cue at step {index} must be named"
                        )));
                    }
                    start
                }
                StepKind::Tween(tween) => {
                    tween.validate()?;
                    for prop in tween.props.keys() {
                        if let Some(&until) = busy.get(&(tween.target.as_str(), prop.as_str()))
                            && until > start
                        {
                            tracing::debug!(
                                step = index,
                                target = %tween.target,
                                prop = %prop,
                                from = start.0,
                                to = until.0,
                                "deferring tween behind an earlier one on the same property"
                            );
                            start = until;
                        }
                    }
                    let end = start + tween.duration;
                    for prop in tween.props.keys() {
                        busy.insert((tween.target.as_str(), prop.as_str()), end);
                    }
                    end
                }
            };

            tail = tail.max(end);
            prev_start = start;
            steps.push(ScheduledStep {
                index,
                start,
                end,
                kind: step.kind.clone(),
            });
        }

        Ok(Schedule {
            delay: self.delay,
            steps,
            total: tail,
        })
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct ScheduledStep {
    pub index: usize,
    #[serde(rename = "start_ms")]
    pub start: Millis,
    #[serde(rename = "end_ms")]
    pub end: Millis,
    pub kind: StepKind,
}

/// A timeline with every step placed on its local time axis.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct Schedule {
    #[serde(rename = "delay_ms")]
    pub delay: Millis,
    pub steps: Vec<ScheduledStep>,
    #[serde(rename = "total_ms")]
    pub total: Millis,
}

impl Schedule {
    /// Leading delay plus step time.
    pub fn span(&self) -> Millis {
        self.delay + self.total
    }

    /// Cues ordered by firing time, declaration order breaking ties.
    pub fn cues(&self) -> Vec<(Millis, String)> {
        let mut cues: Vec<(Millis, usize, String)> = self
            .steps
            .iter()
            .filter_map(|s| match &s.kind {
                StepKind::Cue(name) => Some((s.start, s.index, name.clone())),
                StepKind::Tween(_) => None,
            })
            .collect();
        cues.sort_by_key(|(at, index, _)| (*at, *index));
        cues.into_iter().map(|(at, _, name)| (at, name)).collect()
    }

    /// Steps whose start time is exactly `at`.
    pub fn starting_at(&self, at: Millis) -> impl Iterator<Item = &ScheduledStep> {
        self.steps.iter().filter(move |s| s.start == at)
    }

    /// Write the state of every animated property at local time `t`.
    ///
    /// A property takes the value of the latest tween started at or before `t`; before its
    /// first tween starts it holds that tween's `from` value.
    pub fn sample_into(&self, t: Millis, stage: &mut Stage) {
        let mut seen: BTreeSet<(&str, &str)> = BTreeSet::new();
        for step in &self.steps {
            let StepKind::Tween(tween) = &step.kind else {
                continue;
            };
            for (prop, range) in &tween.props {
                let key = (tween.target.as_str(), prop.as_str());
                if t >= step.start {
                    let p = tween.progress(t - step.start);
                    stage.set(key.0, key.1, lerp(range.from, range.to, p));
                    seen.insert(key);
                } else if seen.insert(key) {
                    stage.set(key.0, key.1, range.from);
                }
            }
        }
    }

    /// Value of one property at local time `t`, if any tween animates it.
    pub fn value_at(&self, target: &str, prop: &str, t: Millis) -> Option<f64> {
        let mut stage = Stage::new();
        self.sample_into(t, &mut stage);
        stage.get(target, prop)
    }
}

fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::core::ms;

    fn fade(target: &str, duration: u64) -> Tween {
        Tween::new(target, ms(duration), Ease::Linear).prop("opacity", 0.0, 1.0)
    }

    #[test]
    fn offsets_resolve_against_tail_and_previous_start() {
        let tl = Timeline::new()
            .tween(fade("a", 900))
            .cue_at(Offset::Overlap(ms(300)), "fx")
            .tween_at(Offset::Overlap(ms(100)), fade("b", 2400))
            .tween_at(Offset::WithPrevious, fade("c", 2400))
            .tween_at(Offset::Gap(ms(50)), fade("d", 100))
            .tween_at(Offset::At(ms(10)), fade("e", 10));
        let s = tl.schedule().unwrap();
        let starts: Vec<u64> = s.steps.iter().map(|st| st.start.0).collect();
        assert_eq!(starts, vec![0, 600, 800, 800, 3250, 10]);
        assert_eq!(s.total, ms(3350));
    }

    #[test]
    fn overlap_never_starts_before_zero() {
        let s = Timeline::new()
            .tween_at(Offset::Overlap(ms(500)), fade("a", 100))
            .schedule()
            .unwrap();
        assert_eq!(s.steps[0].start, Millis::ZERO);
    }

    #[test]
    fn same_property_tweens_are_sequenced() {
        let s = Timeline::new()
            .tween(fade("a", 1000))
            .tween_at(
                Offset::WithPrevious,
                Tween::new("a", ms(500), Ease::Linear).prop("opacity", 1.0, 0.0),
            )
            .schedule()
            .unwrap();
        assert_eq!(s.steps[1].start, ms(1000));
        assert_eq!(s.total, ms(1500));
    }

    #[test]
    fn different_properties_on_one_target_may_overlap() {
        let s = Timeline::new()
            .tween(Tween::new("gate", ms(900), Ease::Linear).prop("scale", 1.0, 1.035))
            .tween_at(
                Offset::WithPrevious,
                Tween::new("gate", ms(900), Ease::Linear).prop("opacity", 1.0, 0.0),
            )
            .schedule()
            .unwrap();
        assert_eq!(s.steps[1].start, Millis::ZERO);
    }

    #[test]
    fn sampling_holds_from_before_start_and_to_after_end() {
        let s = Timeline::new()
            .tween(fade("a", 100))
            .tween(fade("b", 100))
            .schedule()
            .unwrap();
        assert_eq!(s.value_at("b", "opacity", ms(50)), Some(0.0));
        assert_eq!(s.value_at("a", "opacity", ms(50)), Some(0.5));
        assert_eq!(s.value_at("a", "opacity", ms(150)), Some(1.0));
        assert_eq!(s.value_at("b", "opacity", ms(150)), Some(0.5));
        assert_eq!(s.value_at("b", "opacity", ms(500)), Some(1.0));
    }

    #[test]
    fn chained_tweens_on_one_property_hand_over() {
        let s = Timeline::new()
            .tween(fade("a", 100))
            .tween(Tween::new("a", ms(100), Ease::Linear).prop("opacity", 1.0, 0.0))
            .schedule()
            .unwrap();
        assert_eq!(s.value_at("a", "opacity", ms(0)), Some(0.0));
        assert_eq!(s.value_at("a", "opacity", ms(100)), Some(1.0));
        assert_eq!(s.value_at("a", "opacity", ms(150)), Some(0.5));
    }

    #[test]
    fn invalid_tweens_are_rejected() {
        let empty = Timeline::new().tween(Tween::new("a", ms(10), Ease::Linear));
        assert!(matches!(empty.schedule(), Err(InvitaError::Timeline(_))));

        let nan = Timeline::new()
            .tween(Tween::new("a", ms(10), Ease::Linear).prop("x", f64::NAN, 1.0));
        assert!(nan.schedule().is_err());

        let unnamed = Timeline::new().cue(" ");
        assert!(unnamed.schedule().is_err());
    }

    #[test]
    fn cues_are_ordered_by_time() {
        let s = Timeline::new()
            .tween(fade("a", 100))
            .cue("late")
            .cue_at(Offset::At(ms(20)), "early")
            .schedule()
            .unwrap();
        assert_eq!(
            s.cues(),
            vec![(ms(20), "early".to_owned()), (ms(100), "late".to_owned())]
        );
    }

    #[test]
    fn timeline_json_shape() {
        let json = r#"{
            "delay_ms": 500,
            "steps": [
                { "tween": { "target": "subtitle", "props": { "opacity": { "from": 0, "to": 1 } },
                             "duration_ms": 1000, "ease": "power2.out" } },
                { "offset": { "overlap": 400 }, "cue": "names" },
                { "offset": "with_previous",
                  "tween": { "target": "groom", "props": { "x": { "from": -60, "to": 0 } },
                             "duration_ms": 1600 } }
            ]
        }"#;
        let tl: Timeline = serde_json::from_str(json).unwrap();
        assert_eq!(tl.delay, ms(500));
        assert_eq!(tl.steps[1].offset, Offset::Overlap(ms(400)));
        assert_eq!(tl.steps[1].kind, StepKind::Cue("names".to_owned()));
        let s = tl.schedule().unwrap();
        assert_eq!(s.steps[2].start, ms(600));
        assert_eq!(s.span(), ms(2700));
    }
}
