//! Ambimix Mixer - Playback modes and the mixing session.
//!
//! The [`ModeController`] runs the Normal / Solo / Quick Mix / Vehicle Quick
//! Mix state machine on top of snapshot and restore. [`MixSession`] owns the
//! catalog, engine, presets and controller and is the single serialized
//! entry point for every mutation.

pub mod controller;
pub mod mode;
pub mod quick_mix;
pub mod session;
pub mod snapshot;

pub use controller::{MixContext, ModeController, TransitionReport, DEFAULT_SETTLE_DELAY};
pub use mode::{ModeKind, PlaybackMode};
pub use quick_mix::QuickMixConfig;
pub use session::{MixSession, Notice, PlaybackFailures, SessionOptions, FALLBACK_TITLE};
pub use snapshot::{capture, restore, RestoreReport, SoundSnapshot};
