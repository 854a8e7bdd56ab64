//! Stereo mixdown stage for a chiptune tracker's sound chip emulation.
//!
//! Chip voices report their instantaneous amplitude through
//! [`Mixer::add_value`]; the mixer turns amplitude *changes* into
//! band-limited impulses on a pair of accumulation buffers, closes frames,
//! and hands interleaved 16-bit PCM back to the audio device. Every voice
//! also drives a decaying peak meter for the tracker UI.
//!
//! ```
//! use chipmix_core::{AudioChannel, ChipId, Mixer};
//!
//! let mut mixer = Mixer::new();
//! mixer.allocate_buffers(100, 44_100, 2)?;
//! mixer.add_value(AudioChannel::Square1, ChipId::Default, 4_000, 4_000, 0);
//! mixer.add_value(AudioChannel::Square1, ChipId::Default, 0, 0, 2_000);
//! let ready = mixer.finish_buffer(4_000);
//!
//! let mut pcm = vec![0i16; ready * 2];
//! assert_eq!(mixer.read_buffer(ready, &mut pcm, true), ready * 2);
//! # Ok::<(), chipmix_core::MixerError>(())
//! ```

pub mod audio;
pub mod error;

pub use audio::{
    AccumulationBuffer, AudioChannel, BusId, ChipId, ChipSet, FilterSettings, LevelLaw,
    LevelTable, Mixer, MixerSettings, RoutingTable, StereoLevel, StereoLevels,
};
pub use chipmix_blip::{BlipBuf, TrebleEq};
pub use error::MixerError;
