use std::cell::RefCell;
use std::fmt::Debug;
use std::rc::{Rc, Weak};

use crate::{
    foundation::core::Millis,
    foundation::error::{InvitaError, InvitaResult},
    schedule::{Disposables, Scheduler, SchedulerHandle},
};

/// The phase a controller is in, and when it was entered. `entered_at` is `None` until the
/// controller starts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
pub struct ActivePhase<P> {
    pub phase: P,
    pub entered_at: Option<Millis>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PhaseRule<P> {
    /// Move from `from` to `to` once `delay` has passed since entering `from`.
    After { from: P, delay: Millis, to: P },
    /// Move from `from` to `to` when the host fires `trigger`.
    On {
        from: P,
        trigger: &'static str,
        to: P,
    },
}

impl<P: Copy> PhaseRule<P> {
    fn edge(&self) -> (P, P) {
        match *self {
            Self::After { from, to, .. } | Self::On { from, to, .. } => (from, to),
        }
    }
}

/// Declared phases of one decorative sequence.
#[derive(Clone, Debug)]
pub struct PhasePlan<P> {
    initial: P,
    rules: Vec<PhaseRule<P>>,
}

impl<P> PhasePlan<P>
where
    P: Copy + Eq + Debug,
{
    pub fn new(initial: P) -> Self {
        Self {
            initial,
            rules: Vec::new(),
        }
    }

    pub fn after(mut self, from: P, delay: Millis, to: P) -> Self {
        self.rules.push(PhaseRule::After { from, delay, to });
        self
    }

    pub fn on(mut self, from: P, trigger: &'static str, to: P) -> Self {
        self.rules.push(PhaseRule::On { from, trigger, to });
        self
    }

    pub fn initial(&self) -> P {
        self.initial
    }

    pub fn rules(&self) -> &[PhaseRule<P>] {
        &self.rules
    }

    /// Phases never repeat, so the transition graph must be acyclic.
    pub fn validate(&self) -> InvitaResult<()> {
        for rule in &self.rules {
            let (from, to) = rule.edge();
            if from == to || self.reachable(to, from) {
                return Err(InvitaError::phase(format!(
                    "transition {from:?} -> {to:?} would revisit a phase"
                )));
            }
        }
        Ok(())
    }

    fn reachable(&self, start: P, goal: P) -> bool {
        let mut stack = vec![start];
        let mut seen = Vec::new();
        while let Some(p) = stack.pop() {
            if p == goal {
                return true;
            }
            if seen.contains(&p) {
                continue;
            }
            seen.push(p);
            stack.extend(
                self.rules
                    .iter()
                    .map(PhaseRule::edge)
                    .filter(|(f, _)| *f == p)
                    .map(|(_, t)| t),
            );
        }
        false
    }

    fn delayed_from(&self, phase: P) -> Vec<(Millis, P)> {
        self.rules
            .iter()
            .filter_map(|r| match *r {
                PhaseRule::After { from, delay, to } if from == phase => Some((delay, to)),
                _ => None,
            })
            .collect()
    }

    fn triggered_from(&self, phase: P, trigger: &str) -> Option<P> {
        self.rules.iter().find_map(|r| match *r {
            PhaseRule::On { from, trigger: t, to } if from == phase && t == trigger => Some(to),
            _ => None,
        })
    }
}

type EnterFn<P> = Box<dyn FnMut(ActivePhase<P>)>;

struct ControllerState<P> {
    label: &'static str,
    plan: PhasePlan<P>,
    active: ActivePhase<P>,
    history: Vec<ActivePhase<P>>,
    started: bool,
    disposed: bool,
    // timers of the current phase only
    pending: Disposables,
    listeners: Vec<EnterFn<P>>,
}

/// Runs a [`PhasePlan`] on the scheduler.
///
/// Exactly one phase is active at any time. Cancelling (or dropping) the controller
/// invalidates every pending transition; late timer callbacks are ignored.
pub struct PhaseController<P> {
    inner: Rc<RefCell<ControllerState<P>>>,
    scheduler: Scheduler,
}

impl<P> PhaseController<P>
where
    P: Copy + Eq + Debug + 'static,
{
    pub fn new(scheduler: &Scheduler, label: &'static str, plan: PhasePlan<P>) -> InvitaResult<Self> {
        plan.validate()?;
        let active = ActivePhase {
            phase: plan.initial(),
            entered_at: None,
        };
        Ok(Self {
            inner: Rc::new(RefCell::new(ControllerState {
                label,
                plan,
                active,
                history: Vec::new(),
                started: false,
                disposed: false,
                pending: Disposables::new(scheduler),
                listeners: Vec::new(),
            })),
            scheduler: scheduler.clone(),
        })
    }

    /// Enter the initial phase and schedule its delayed transitions. Repeated calls are
    /// no-ops.
    pub fn start(&self) {
        let initial = {
            let mut st = self.inner.borrow_mut();
            if st.started || st.disposed {
                return;
            }
            st.started = true;
            st.plan.initial()
        };
        enter(&self.inner, &self.scheduler, initial);
    }

    /// Apply the external transition named `trigger` from the current phase. Returns `true`
    /// when the phase changed.
    pub fn trigger(&self, trigger: &str) -> bool {
        let next = {
            let st = self.inner.borrow();
            if !st.started || st.disposed {
                return false;
            }
            st.plan.triggered_from(st.active.phase, trigger)
        };
        match next {
            Some(to) => enter(&self.inner, &self.scheduler, to),
            None => false,
        }
    }

    pub fn phase(&self) -> P {
        self.inner.borrow().active.phase
    }

    pub fn active(&self) -> ActivePhase<P> {
        self.inner.borrow().active
    }

    /// Every phase entered so far, oldest first.
    pub fn history(&self) -> Vec<ActivePhase<P>> {
        self.inner.borrow().history.clone()
    }

    pub fn is_started(&self) -> bool {
        self.inner.borrow().started
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.borrow().disposed
    }

    /// Observe phase entries, including the initial one.
    pub fn on_enter<F>(&self, f: F)
    where
        F: FnMut(ActivePhase<P>) + 'static,
    {
        self.inner.borrow_mut().listeners.push(Box::new(f));
    }

    pub fn cancel(&self) {
        let mut st = self.inner.borrow_mut();
        if st.disposed {
            return;
        }
        st.disposed = true;
        st.pending.dispose();
        st.listeners.clear();
        tracing::debug!(controller = st.label, phase = ?st.active.phase, "phase controller cancelled");
    }
}

impl<P> Drop for PhaseController<P> {
    fn drop(&mut self) {
        if let Ok(mut st) = self.inner.try_borrow_mut() {
            st.disposed = true;
            st.pending.dispose();
        }
    }
}

fn enter<P>(inner: &Rc<RefCell<ControllerState<P>>>, scheduler: &Scheduler, to: P) -> bool
where
    P: Copy + Eq + Debug + 'static,
{
    let (entered, mut listeners) = {
        let mut guard = inner.borrow_mut();
        let st = &mut *guard;
        if st.disposed {
            return false;
        }
        if st.history.iter().any(|h| h.phase == to) {
            tracing::warn!(controller = st.label, phase = ?to, "refusing to revisit phase");
            return false;
        }

        st.pending.dispose();
        let entered = ActivePhase {
            phase: to,
            entered_at: Some(scheduler.now()),
        };
        st.active = entered;
        st.history.push(entered);
        tracing::debug!(controller = st.label, phase = ?to, at = scheduler.now().0, "phase entered");

        for (delay, next) in st.plan.delayed_from(to) {
            let weak = Rc::downgrade(inner);
            let handle = scheduler.handle();
            let id = scheduler.set_timeout(delay, move || fire_delayed(&weak, &handle, to, next));
            st.pending.track_timer(id);
        }
        (entered, std::mem::take(&mut st.listeners))
    };

    for listener in &mut listeners {
        listener(entered);
    }

    let mut st = inner.borrow_mut();
    if !st.disposed {
        let added = std::mem::take(&mut st.listeners);
        st.listeners = listeners;
        st.listeners.extend(added);
    }
    true
}

fn fire_delayed<P>(
    weak: &Weak<RefCell<ControllerState<P>>>,
    handle: &SchedulerHandle,
    from: P,
    to: P,
) where
    P: Copy + Eq + Debug + 'static,
{
    let (Some(inner), Some(scheduler)) = (weak.upgrade(), handle.upgrade()) else {
        return;
    };
    {
        let st = inner.borrow();
        if st.disposed || st.active.phase != from {
            return;
        }
    }
    enter(&inner, &scheduler, to);
}
