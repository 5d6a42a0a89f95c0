use std::cell::RefCell;
use std::rc::Rc;

use crate::{
    foundation::core::Point,
    foundation::error::{InvitaError, InvitaResult},
    schedule::{Disposables, Scheduler},
};

/// One smoothing tick: move `prev` toward `target` by the fraction `k`.
///
/// For `0 < k < 1` the result lies strictly between the two, so repeated steps converge
/// without overshooting.
pub fn smooth(prev: f64, target: f64, k: f64) -> f64 {
    prev + (target - prev) * k
}

/// Lagging 2-D follower.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub struct CursorTracker {
    position: Point,
    target: Point,
    k: f64,
}

impl CursorTracker {
    pub fn new(start: Point, k: f64) -> InvitaResult<Self> {
        if !(k > 0.0 && k <= 1.0) {
            return Err(InvitaError::validation(format!(
                "smoothing factor must be in (0, 1], got {k}"
            )));
        }
        Ok(Self {
            position: start,
            target: start,
            k,
        })
    }

    pub fn set_target(&mut self, target: Point) {
        self.target = target;
    }

    pub fn step(&mut self) -> Point {
        self.position = Point::new(
            smooth(self.position.x, self.target.x, self.k),
            smooth(self.position.y, self.target.y, self.k),
        );
        self.position
    }

    pub fn position(&self) -> Point {
        self.position
    }

    pub fn target(&self) -> Point {
        self.target
    }

    pub fn distance(&self) -> f64 {
        self.position.distance(self.target)
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct CursorSettings {
    /// Fine-pointer hosts only; coarse pointers get no custom cursor.
    pub enabled: bool,
    pub smoothing: f64,
    /// Off-screen park position before the first pointer move.
    pub start: Point,
    pub ring_size: f64,
    pub ring_size_hover: f64,
    pub pressed_scale: f64,
}

impl Default for CursorSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            smoothing: 0.12,
            start: Point::new(-200.0, -200.0),
            ring_size: 34.0,
            ring_size_hover: 50.0,
            pressed_scale: 0.65,
        }
    }
}

impl CursorSettings {
    pub fn validate(&self) -> InvitaResult<()> {
        CursorTracker::new(self.start, self.smoothing)?;
        if !(self.pressed_scale > 0.0) || !(self.ring_size > 0.0) || !(self.ring_size_hover > 0.0) {
            return Err(InvitaError::validation("cursor sizes must be > 0"));
        }
        Ok(())
    }
}

/// What the host draws for the cursor this frame.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub struct CursorSnapshot {
    pub dot: Point,
    pub ring: Point,
    pub dot_scale: f64,
    pub ring_size: f64,
    pub hovering: bool,
    pub pressed: bool,
}

struct TrailState {
    settings: CursorSettings,
    dot: Point,
    ring: CursorTracker,
    pressed: bool,
    hovering: bool,
}

/// Precise dot plus a ring that trails it every display frame.
pub struct CursorTrail {
    state: Rc<RefCell<TrailState>>,
    _subs: Disposables,
}

impl CursorTrail {
    pub fn new(scheduler: &Scheduler, settings: &CursorSettings) -> InvitaResult<Self> {
        let ring = CursorTracker::new(settings.start, settings.smoothing)?;
        let state = Rc::new(RefCell::new(TrailState {
            settings: settings.clone(),
            dot: settings.start,
            ring,
            pressed: false,
            hovering: false,
        }));

        let mut subs = Disposables::new(scheduler);
        let weak = Rc::downgrade(&state);
        subs.track_frames(scheduler.request_frames(move |_| {
            if let Some(state) = weak.upgrade() {
                state.borrow_mut().ring.step();
            }
        }));

        Ok(Self {
            state,
            _subs: subs,
        })
    }

    pub fn pointer_move(&self, at: Point) {
        let mut st = self.state.borrow_mut();
        st.dot = at;
        st.ring.set_target(at);
    }

    pub fn pointer_down(&self) {
        self.state.borrow_mut().pressed = true;
    }

    pub fn pointer_up(&self) {
        self.state.borrow_mut().pressed = false;
    }

    /// Whether the pointer is over a link, button or other interactive element.
    pub fn hover(&self, interactive: bool) {
        self.state.borrow_mut().hovering = interactive;
    }

    pub fn snapshot(&self) -> CursorSnapshot {
        let st = self.state.borrow();
        CursorSnapshot {
            dot: st.dot,
            ring: st.ring.position(),
            dot_scale: if st.pressed {
                st.settings.pressed_scale
            } else {
                1.0
            },
            ring_size: if st.hovering {
                st.settings.ring_size_hover
            } else {
                st.settings.ring_size
            },
            hovering: st.hovering,
            pressed: st.pressed,
        }
    }
}
