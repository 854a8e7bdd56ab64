use std::f32::consts::PI;

/// Treble equalization for a [`BlipBuf`](crate::BlipBuf).
///
/// Mirrors the `(treble, cutoff)` pair of Blargg's `blip_eq_t`: content
/// above `cutoff_hz` is scaled by `treble_db`. Only damping is supported,
/// so a non-negative `treble_db` leaves the buffer output untouched.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrebleEq {
    /// Gain above the corner frequency in dB. Negative values damp.
    pub treble_db: f64,
    /// Shelf corner in Hz. `0` disables the shelf.
    pub cutoff_hz: u32,
}

impl TrebleEq {
    pub const FLAT: Self = Self {
        treble_db: 0.0,
        cutoff_hz: 0,
    };

    pub fn new(treble_db: f64, cutoff_hz: u32) -> Self {
        Self {
            treble_db,
            cutoff_hz,
        }
    }

    /// Whether this curve is a no-op at `sample_rate`.
    pub fn is_flat(&self, sample_rate: u32) -> bool {
        self.treble_db >= 0.0
            || self.cutoff_hz == 0
            || sample_rate == 0
            || u64::from(self.cutoff_hz) * 2 >= u64::from(sample_rate)
    }
}

impl Default for TrebleEq {
    fn default() -> Self {
        Self::FLAT
    }
}

/// One-pole high-shelf run on the integrated output samples.
#[derive(Debug, Clone, Default)]
pub(crate) struct TrebleShelf {
    enabled: bool,
    alpha: f32,
    gain: f32,
    low: f32,
}

impl TrebleShelf {
    pub(crate) fn configure(&mut self, eq: TrebleEq, sample_rate: u32) {
        if eq.is_flat(sample_rate) {
            self.enabled = false;
            self.low = 0.0;
            return;
        }

        if !self.enabled {
            self.low = 0.0;
        }
        self.enabled = true;
        self.alpha = 1.0 - (-2.0 * PI * eq.cutoff_hz as f32 / sample_rate as f32).exp();
        self.gain = 10.0_f32.powf(eq.treble_db as f32 / 20.0);
    }

    pub(crate) fn reset(&mut self) {
        self.low = 0.0;
    }

    #[inline]
    pub(crate) fn process(&mut self, sample: i32) -> i32 {
        if !self.enabled {
            return sample;
        }
        let x = sample as f32;
        self.low += (x - self.low) * self.alpha;
        let y = self.low + (x - self.low) * self.gain;
        y.round().clamp(i16::MIN as f32, i16::MAX as f32) as i32
    }
}
