//! Media player capability bitmask

use serde::{Serialize, Serializer};
use std::ops::BitOr;

/// Media player capability bits. Values match the Home Assistant media
/// player feature flags so the raw mask can be handed to it unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MediaPlayerFeatures(u32);

impl MediaPlayerFeatures {
    pub const PAUSE: Self = Self(1);
    pub const SEEK: Self = Self(2);
    pub const VOLUME_SET: Self = Self(4);
    pub const VOLUME_MUTE: Self = Self(8);
    pub const PREVIOUS_TRACK: Self = Self(16);
    pub const NEXT_TRACK: Self = Self(32);
    pub const TURN_ON: Self = Self(128);
    pub const TURN_OFF: Self = Self(256);
    pub const PLAY_MEDIA: Self = Self(512);
    pub const VOLUME_STEP: Self = Self(1024);
    pub const SELECT_SOURCE: Self = Self(2048);
    pub const STOP: Self = Self(4096);
    pub const PLAY: Self = Self(16384);

    /// Everything the console can do with IR volume controls attached.
    pub const SUPPORT_XBOXONE: Self = Self(
        Self::PAUSE.0
            | Self::TURN_ON.0
            | Self::TURN_OFF.0
            | Self::PREVIOUS_TRACK.0
            | Self::NEXT_TRACK.0
            | Self::SELECT_SOURCE.0
            | Self::PLAY.0
            | Self::VOLUME_STEP.0
            | Self::VOLUME_MUTE.0,
    );

    const NAMED: [(Self, &'static str); 13] = [
        (Self::PAUSE, "pause"),
        (Self::SEEK, "seek"),
        (Self::VOLUME_SET, "volume_set"),
        (Self::VOLUME_MUTE, "volume_mute"),
        (Self::PREVIOUS_TRACK, "previous_track"),
        (Self::NEXT_TRACK, "next_track"),
        (Self::TURN_ON, "turn_on"),
        (Self::TURN_OFF, "turn_off"),
        (Self::PLAY_MEDIA, "play_media"),
        (Self::VOLUME_STEP, "volume_step"),
        (Self::SELECT_SOURCE, "select_source"),
        (Self::STOP, "stop"),
        (Self::PLAY, "play"),
    ];

    pub const fn bits(&self) -> u32 {
        self.0
    }

    pub const fn contains(&self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn remove(&mut self, other: Self) {
        self.0 &= !other.0;
    }

    pub fn names(&self) -> Vec<&'static str> {
        Self::NAMED
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect()
    }
}

impl BitOr for MediaPlayerFeatures {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl Serialize for MediaPlayerFeatures {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u32(self.0)
    }
}
