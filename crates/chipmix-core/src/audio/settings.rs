use crate::audio::{BusId, CLOCK_NTSC, ChipSet};

/// Low-cut, treble damping and overall volume pushed by
/// [`Mixer::update_filter_settings`](crate::audio::Mixer::update_filter_settings).
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FilterSettings {
    /// Bass (low-cut) corner in Hz. `0` disables the low cut.
    pub low_cut_hz: u32,
    /// Corner above which treble damping applies, in Hz.
    pub high_cut_hz: u32,
    /// Treble damping in dB.
    pub high_damp_db: u32,
    /// Linear master volume (1.0 = unity).
    pub overall_volume: f32,
}

impl Default for FilterSettings {
    fn default() -> Self {
        Self {
            low_cut_hz: 16,
            high_cut_hz: 12_000,
            high_damp_db: 24,
            overall_volume: 1.0,
        }
    }
}

/// Left/right level and separation of one bus, each expected in `[0.0, 1.0]`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StereoLevels {
    pub left: f32,
    pub right: f32,
    pub separation: f32,
}

impl Default for StereoLevels {
    fn default() -> Self {
        Self {
            left: 1.0,
            right: 1.0,
            separation: 1.0,
        }
    }
}

/// Everything a frontend configures on a mixer, applied in one go by
/// [`Mixer::apply_settings`](crate::audio::Mixer::apply_settings).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MixerSettings {
    /// Host output rate in Hz.
    pub sample_rate: u32,
    /// Longest stretch of audio the buffers hold between drains.
    pub buffer_length_ms: u32,
    /// 1 for mono output, 2 for interleaved stereo.
    pub channel_count: u8,
    /// Emulated chip clock in Hz.
    pub clock_rate: u32,
    pub filter: FilterSettings,
    pub enabled_chips: ChipSet,
    /// Indexed by [`BusId::idx`].
    pub stereo: [StereoLevels; BusId::COUNT],
}

impl Default for MixerSettings {
    fn default() -> Self {
        Self {
            sample_rate: 44_100,
            buffer_length_ms: 100,
            channel_count: 2,
            clock_rate: CLOCK_NTSC,
            filter: FilterSettings::default(),
            enabled_chips: ChipSet::default(),
            stereo: [StereoLevels::default(); BusId::COUNT],
        }
    }
}
