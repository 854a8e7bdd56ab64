use chipmix_blip::BlipError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, MixerError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum MixerError {
    /// A stereo buffer could not be sized for the requested output.
    #[error("cannot allocate {length_ms} ms of audio at {sample_rate} Hz")]
    Allocation {
        sample_rate: u32,
        length_ms: u32,
        #[source]
        source: BlipError,
    },
    #[error("unsupported output channel count {0} (expected 1 or 2)")]
    InvalidChannelCount(u8),
    #[error("unknown channel id {0}")]
    UnknownChannel(u8),
    #[error("unknown chip id {0}")]
    UnknownChip(u8),
    #[error("level table entry {index} is louder than the entry before it")]
    UnsortedLevelTable { index: usize },
}
