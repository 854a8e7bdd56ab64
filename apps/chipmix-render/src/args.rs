use std::path::PathBuf;

use chipmix_core::audio::{CLOCK_NTSC, CLOCK_PAL};
use chipmix_core::{BusId, FilterSettings, MixerSettings, StereoLevels};
use clap::Parser;
use tracing::Level;

/// Render the built-in SN76489 demo pattern to a WAV file
#[derive(Parser, Debug)]
#[command(name = "chipmix-render")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Output WAV path
    #[arg(required = true)]
    pub output: PathBuf,

    /// Length of the render in seconds
    #[arg(short, long, default_value_t = 8.0)]
    pub seconds: f32,

    /// Output sample rate in Hz
    #[arg(long, default_value_t = 44_100)]
    pub sample_rate: u32,

    /// Audio buffer length in milliseconds
    #[arg(long, default_value_t = 100)]
    pub buffer_ms: u32,

    /// Write a single channel instead of interleaved stereo
    #[arg(long)]
    pub mono: bool,

    /// Use the PAL chip clock and 50 Hz frames
    #[arg(long)]
    pub pal: bool,

    /// Bass cut-off in Hz (0 disables)
    #[arg(long, default_value_t = 16)]
    pub low_cut: u32,

    /// Treble damping corner in Hz
    #[arg(long, default_value_t = 12_000)]
    pub high_cut: u32,

    /// Treble damping in dB
    #[arg(long, default_value_t = 24)]
    pub high_damp: u32,

    /// Overall volume (1.0 = unity)
    #[arg(long, default_value_t = 1.0)]
    pub volume: f32,

    /// Stereo separation from 0.0 (mono) to 1.0 (full)
    #[arg(long, default_value_t = 1.0)]
    pub separation: f32,

    /// Also write per-frame channel meter levels as CSV
    #[arg(long)]
    pub meter_trace: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); RUST_LOG overrides it
    #[arg(short, long, default_value = "info")]
    pub log_level: Level,
}

impl Args {
    pub fn clock_rate(&self) -> u32 {
        if self.pal { CLOCK_PAL } else { CLOCK_NTSC }
    }

    pub fn frame_rate(&self) -> u32 {
        if self.pal { 50 } else { 60 }
    }

    pub fn mixer_settings(&self) -> MixerSettings {
        MixerSettings {
            sample_rate: self.sample_rate,
            buffer_length_ms: self.buffer_ms,
            channel_count: if self.mono { 1 } else { 2 },
            clock_rate: self.clock_rate(),
            filter: FilterSettings {
                low_cut_hz: self.low_cut,
                high_cut_hz: self.high_cut,
                high_damp_db: self.high_damp,
                overall_volume: self.volume,
            },
            stereo: [StereoLevels {
                separation: self.separation.clamp(0.0, 1.0),
                ..StereoLevels::default()
            }; BusId::COUNT],
            ..MixerSettings::default()
        }
    }
}
