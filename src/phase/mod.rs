//! Timed phase controllers: one-directional named stages advanced by timers or triggers.

pub mod controller;

pub use controller::{ActivePhase, PhaseController, PhasePlan, PhaseRule};
