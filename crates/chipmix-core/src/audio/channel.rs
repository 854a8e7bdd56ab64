use crate::audio::{LEVEL_FALL_OFF_DELAY, LEVEL_FALL_OFF_RATE};
use crate::error::MixerError;

/// Voices the mixer keeps a state slot for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AudioChannel {
    Square1 = 0,
    Square2 = 1,
    Square3 = 2,
    Noise = 3,
}

impl AudioChannel {
    pub const COUNT: usize = 4;
    pub const ALL: [Self; Self::COUNT] = [Self::Square1, Self::Square2, Self::Square3, Self::Noise];

    pub fn idx(self) -> usize {
        self as usize
    }
}

impl TryFrom<u8> for AudioChannel {
    type Error = MixerError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::ALL
            .get(usize::from(value))
            .copied()
            .ok_or(MixerError::UnknownChannel(value))
    }
}

/// Sound chip a channel value comes from.
///
/// `Default` is the on-board PSG; expansion chips get their own variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChipId {
    Default = 0,
}

impl ChipId {
    pub const COUNT: usize = 1;
    pub const ALL: [Self; Self::COUNT] = [Self::Default];

    pub fn idx(self) -> usize {
        self as usize
    }
}

impl TryFrom<u8> for ChipId {
    type Error = MixerError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::ALL
            .get(usize::from(value))
            .copied()
            .ok_or(MixerError::UnknownChip(value))
    }
}

/// Mixer-side state of one voice.
///
/// `last_left`/`last_right` are the amplitudes most recently written to the
/// stereo buffers and are what the next delta is computed against.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ChannelState {
    pub(crate) last_left: i32,
    pub(crate) last_right: i32,
    pub(crate) level: f32,
    pub(crate) hold: u32,
}

impl ChannelState {
    pub fn last_left(&self) -> i32 {
        self.last_left
    }

    pub fn last_right(&self) -> i32 {
        self.last_right
    }

    /// Current metered level.
    pub fn level(&self) -> f32 {
        self.level
    }

    /// Frames left before the meter starts to fall.
    pub fn hold(&self) -> u32 {
        self.hold
    }

    /// Raise the meter to `level` unless it already reads higher.
    pub(crate) fn raise(&mut self, level: f32) {
        if level >= self.level {
            self.level = level;
            self.hold = LEVEL_FALL_OFF_DELAY;
        }
    }

    /// Once-per-frame meter decay.
    pub(crate) fn fall_off(&mut self) {
        if self.hold > 0 {
            self.hold -= 1;
        } else if self.level > 0.0 {
            self.level = (self.level - LEVEL_FALL_OFF_RATE).max(0.0);
        }
    }

    pub(crate) fn clear_level(&mut self) {
        self.level = 0.0;
        self.hold = 0;
    }
}
