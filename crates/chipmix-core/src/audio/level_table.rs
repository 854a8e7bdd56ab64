use crate::error::{MixerError, Result};

/// Output magnitude of a chip family's 4-bit volume law.
///
/// Entry `i` is the amplitude at attenuation step `i`: entries never rise
/// and the last one is silence. The mixer only uses the table in reverse,
/// to turn a raw amplitude back into the volume step a meter shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelTable([i32; LevelTable::LEN]);

impl LevelTable {
    pub const LEN: usize = 16;
    /// Loudest step [`level_for`](Self::level_for) returns.
    pub const MAX_LEVEL: u8 = 15;

    /// SN76489 volume law, 2 dB per attenuation step.
    pub const SN76489: Self = Self([
        16383, 13013, 10337, 8211, 6522, 5181, 4115, 3269, 2597, 2062, 1638, 1301, 1034, 821, 652,
        0,
    ]);

    pub fn new(entries: [i32; Self::LEN]) -> Result<Self> {
        if let Some(index) = entries
            .windows(2)
            .position(|pair| pair[1] > pair[0])
        {
            return Err(MixerError::UnsortedLevelTable { index: index + 1 });
        }
        Ok(Self(entries))
    }

    pub fn entries(&self) -> &[i32; Self::LEN] {
        &self.0
    }

    /// Volume step (`0..=15`) whose amplitude `magnitude` reaches.
    pub fn level_for(&self, magnitude: i32) -> u8 {
        let mut level = 0;
        while level < Self::MAX_LEVEL && magnitude >= self.0[usize::from(14 - level)] {
            level += 1;
        }
        level
    }
}

impl Default for LevelTable {
    fn default() -> Self {
        Self::SN76489
    }
}
