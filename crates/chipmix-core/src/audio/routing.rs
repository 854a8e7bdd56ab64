//! Data-driven routing from `(chip, channel)` to the bus that renders it.
//!
//! Adding a chip family means adding a [`BusId`], a [`ChipSet`] flag and the
//! table entries for its channels; the mixer itself does not branch on chips.

use bitflags::bitflags;

use crate::audio::{AudioChannel, ChannelArray, ChipId};

bitflags! {
    /// Chip families whose buses are enabled.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct ChipSet: u8 {
        const SN76489 = 1 << 0;
    }
}

impl Default for ChipSet {
    fn default() -> Self {
        Self::all()
    }
}

/// Stereo buses, one per chip family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BusId {
    Sn76489 = 0,
}

impl BusId {
    pub const COUNT: usize = 1;
    pub const ALL: [Self; Self::COUNT] = [Self::Sn76489];

    pub fn idx(self) -> usize {
        self as usize
    }

    /// Enable flag for this bus.
    pub fn flag(self) -> ChipSet {
        match self {
            Self::Sn76489 => ChipSet::SN76489,
        }
    }
}

/// How a channel's raw amplitude becomes a metered level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LevelLaw {
    /// Reverse lookup through the mixer's [`LevelTable`](crate::audio::LevelTable).
    Quantized,
    /// The magnitude itself.
    Linear,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingTable {
    routes: [ChannelArray<Option<BusId>>; ChipId::COUNT],
    laws: ChannelArray<LevelLaw>,
}

impl RoutingTable {
    /// Table that routes nothing and meters every channel linearly.
    pub fn empty() -> Self {
        Self {
            routes: [[None; AudioChannel::COUNT]; ChipId::COUNT],
            laws: [LevelLaw::Linear; AudioChannel::COUNT],
        }
    }

    pub fn route(&self, chip: ChipId, channel: AudioChannel) -> Option<BusId> {
        self.routes[chip.idx()][channel.idx()]
    }

    pub fn set_route(&mut self, chip: ChipId, channel: AudioChannel, bus: Option<BusId>) {
        self.routes[chip.idx()][channel.idx()] = bus;
    }

    pub fn level_law(&self, channel: AudioChannel) -> LevelLaw {
        self.laws[channel.idx()]
    }

    pub fn set_level_law(&mut self, channel: AudioChannel, law: LevelLaw) {
        self.laws[channel.idx()] = law;
    }
}

impl Default for RoutingTable {
    /// The on-board PSG's squares and noise feed the SN76489 bus and are
    /// metered through its volume table.
    fn default() -> Self {
        let mut table = Self::empty();
        for channel in AudioChannel::ALL {
            table.set_route(ChipId::Default, channel, Some(BusId::Sn76489));
            table.set_level_law(channel, LevelLaw::Quantized);
        }
        table
    }
}
