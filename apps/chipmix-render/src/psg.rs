//! Minimal SN76489 model: three square tone generators and a noise channel,
//! with Game Gear style per-voice stereo enables.
//!
//! It only has to produce realistic amplitude edges for the mixer, so it
//! keeps no register interface and skips the periodic-noise mode.

use chipmix_core::{AudioChannel, ChipId, LevelTable, Mixer};

/// Tone/noise counters advance once every 16 master clocks.
const CLOCK_DIVIDER: u32 = 16;
const SILENT: u8 = 15;

/// White-noise shift register width and seed on the SMS/GG variant.
const LFSR_SEED: u16 = 1 << 15;
const LFSR_TAPS: u16 = 0b1001;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pan {
    pub left: bool,
    pub right: bool,
}

impl Pan {
    pub const CENTER: Self = Self {
        left: true,
        right: true,
    };
    pub const LEFT: Self = Self {
        left: true,
        right: false,
    };
    pub const RIGHT: Self = Self {
        left: false,
        right: true,
    };
}

#[derive(Debug, Clone, Copy)]
struct Voice {
    channel: AudioChannel,
    /// 10-bit tone period, or the noise rate divider.
    period: u16,
    attenuation: u8,
    pan: Pan,
    counter: u32,
    high: bool,
}

impl Voice {
    fn new(channel: AudioChannel) -> Self {
        Self {
            channel,
            period: 0,
            attenuation: SILENT,
            pan: Pan::CENTER,
            counter: 0,
            high: false,
        }
    }

    /// Master clocks between two output edges.
    fn half_period(&self) -> u32 {
        u32::from(self.period.max(1)) * CLOCK_DIVIDER
    }
}

#[derive(Debug)]
pub struct Psg {
    voices: [Voice; AudioChannel::COUNT],
    levels: LevelTable,
    lfsr: u16,
}

impl Psg {
    pub fn new() -> Self {
        Self {
            voices: AudioChannel::ALL.map(Voice::new),
            levels: LevelTable::SN76489,
            lfsr: LFSR_SEED,
        }
    }

    /// Tone period register value for `hz` at `clock` master clocks.
    pub fn period_for(clock: u32, hz: f32) -> u16 {
        if hz <= 0.0 {
            return 0;
        }
        (clock as f32 / (32.0 * hz)).round().clamp(1.0, 1023.0) as u16
    }

    pub fn set_tone(&mut self, channel: AudioChannel, period: u16, attenuation: u8) {
        let voice = &mut self.voices[channel.idx()];
        voice.period = period;
        voice.attenuation = attenuation.min(SILENT);
    }

    /// Noise rate as the shift-register clock divider (0x10, 0x20 or 0x40).
    pub fn set_noise(&mut self, rate: u16, attenuation: u8) {
        self.set_tone(AudioChannel::Noise, rate, attenuation);
    }

    pub fn set_pan(&mut self, channel: AudioChannel, pan: Pan) {
        self.voices[channel.idx()].pan = pan;
    }

    /// Step every voice through one frame, reporting each edge to `mixer` in
    /// clock order.
    pub fn run_frame(&mut self, mixer: &mut Mixer, frame_cycles: u32) {
        for index in 0..self.voices.len() {
            self.report(mixer, index, 0);
        }

        let mut clock = 0;
        while let Some((step, index)) = self.next_edge() {
            let step = step.min(frame_cycles - clock);
            self.advance(step);
            clock += step;
            if clock >= frame_cycles {
                break;
            }
            self.voices[index].counter = 0;
            self.toggle(index);
            self.report(mixer, index, clock);
        }
    }

    /// Clocks until the soonest edge, and the voice it belongs to.
    fn next_edge(&self) -> Option<(u32, usize)> {
        self.voices
            .iter()
            .enumerate()
            .filter(|(_, voice)| voice.period > 0)
            .map(|(index, voice)| (voice.half_period().saturating_sub(voice.counter), index))
            .min()
    }

    fn advance(&mut self, clocks: u32) {
        for voice in self.voices.iter_mut().filter(|voice| voice.period > 0) {
            voice.counter += clocks;
        }
    }

    fn toggle(&mut self, index: usize) {
        let voice = &mut self.voices[index];
        if voice.channel != AudioChannel::Noise {
            voice.high = !voice.high;
            return;
        }

        let feedback = (self.lfsr & LFSR_TAPS).count_ones() as u16 & 1;
        self.lfsr = (self.lfsr >> 1) | (feedback << 15);
        voice.high = self.lfsr & 1 != 0;
    }

    fn report(&self, mixer: &mut Mixer, index: usize, clock: u32) {
        let voice = &self.voices[index];
        let amplitude = if voice.high && voice.period > 0 {
            self.levels.entries()[usize::from(voice.attenuation)]
        } else {
            0
        };
        let left = if voice.pan.left { amplitude } else { 0 };
        let right = if voice.pan.right { amplitude } else { 0 };
        mixer.add_value(voice.channel, ChipId::Default, left, right, clock);
    }
}

impl Default for Psg {
    fn default() -> Self {
        Self::new()
    }
}
