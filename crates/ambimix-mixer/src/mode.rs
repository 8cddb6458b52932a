//! Playback mode state.

use ambimix_core::{PresetId, SoundId};
use std::fmt;

use crate::snapshot::SoundSnapshot;

/// The active playback mode and whatever it must restore on exit.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum PlaybackMode {
    #[default]
    Normal,
    /// One sound at full volume; only that sound's prior state is saved.
    Solo { sound: SoundId, saved: SoundSnapshot },
    QuickMix {
        saved: Vec<SoundSnapshot>,
        preceding_preset: Option<PresetId>,
    },
    VehicleQuickMix { saved: Vec<SoundSnapshot> },
}

impl PlaybackMode {
    pub fn kind(&self) -> ModeKind {
        match self {
            Self::Normal => ModeKind::Normal,
            Self::Solo { .. } => ModeKind::Solo,
            Self::QuickMix { .. } => ModeKind::QuickMix,
            Self::VehicleQuickMix { .. } => ModeKind::VehicleQuickMix,
        }
    }

    pub fn is_normal(&self) -> bool {
        matches!(self, Self::Normal)
    }

    pub fn solo_sound(&self) -> Option<SoundId> {
        match self {
            Self::Solo { sound, .. } => Some(*sound),
            _ => None,
        }
    }

    /// Quick Mix of either flavor.
    pub fn is_quick_mix(&self) -> bool {
        matches!(self, Self::QuickMix { .. } | Self::VehicleQuickMix { .. })
    }
}

/// Mode discriminant without payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModeKind {
    Normal,
    Solo,
    QuickMix,
    VehicleQuickMix,
}

impl ModeKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::Normal => "Normal",
            Self::Solo => "Solo",
            Self::QuickMix => "Quick Mix",
            Self::VehicleQuickMix => "Vehicle Quick Mix",
        }
    }
}

impl fmt::Display for ModeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
