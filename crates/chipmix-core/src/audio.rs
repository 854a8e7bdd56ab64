pub mod buffer;
pub mod bus;
pub mod channel;
pub mod level_table;
pub mod mixer;
pub mod routing;
pub mod settings;

pub use buffer::AccumulationBuffer;
pub use bus::{BusProfile, MixBus, Side, StereoLevel};
pub use channel::{AudioChannel, ChannelState, ChipId};
pub use level_table::LevelTable;
pub use mixer::Mixer;
pub use routing::{BusId, ChipSet, LevelLaw, RoutingTable};
pub use settings::{FilterSettings, MixerSettings, StereoLevels};

/// Per-channel array covering every voice the mixer tracks.
pub type ChannelArray<T> = [T; AudioChannel::COUNT];

/// SN76489 master clock on NTSC machines.
pub const CLOCK_NTSC: u32 = 3_579_545;
/// SN76489 master clock on PAL machines.
pub const CLOCK_PAL: u32 = 3_546_893;

/// Metered level lost per frame once the hold period has elapsed.
pub const LEVEL_FALL_OFF_RATE: f32 = 0.6;
/// Frames a freshly raised meter holds before it starts to fall.
pub const LEVEL_FALL_OFF_DELAY: u32 = 3;
