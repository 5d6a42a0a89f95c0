//! The invitation page and its gesture-driven components.

pub mod choreography;
pub mod couple;
pub mod gallery;
pub mod gate;
pub mod orchestrator;
pub mod pre_entry;

pub use couple::CoupleReveal;
pub use gallery::Lightbox;
pub use gate::{GateFx, GrandGate};
pub use orchestrator::{EntryState, GateState, Invitation, InvitationEvent, Section};
pub use pre_entry::{AudioStart, ParticlePhase, PreEntry, PreEntrySettings, SealPhase};
