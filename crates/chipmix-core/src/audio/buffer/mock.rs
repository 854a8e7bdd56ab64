use chipmix_blip::{BlipError, TrebleEq};

use crate::audio::AccumulationBuffer;

/// Records every call and models output as a plain sum of deltas.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct MockBuffer {
    pub(crate) impulses: Vec<(u32, f32)>,
    pub(crate) sample_rate: u32,
    pub(crate) length_ms: u32,
    pub(crate) clock_rate: u32,
    pub(crate) bass_freq: Option<u32>,
    pub(crate) eq: TrebleEq,
    pub(crate) frames: Vec<u32>,
    pub(crate) avail: usize,
    pub(crate) reject_sample_rate: bool,
    level: f32,
}

impl MockBuffer {
    /// A buffer whose sizing always fails.
    pub(crate) fn rejecting() -> Self {
        Self {
            reject_sample_rate: true,
            ..Self::default()
        }
    }

    fn size(&self) -> usize {
        (u64::from(self.sample_rate) * (u64::from(self.length_ms) + 1)).div_ceil(1000) as usize
    }

    fn samples_for(&self, clock_duration: u32) -> usize {
        if self.clock_rate == 0 {
            return 0;
        }
        (u64::from(clock_duration) * u64::from(self.sample_rate) / u64::from(self.clock_rate))
            as usize
    }
}

impl AccumulationBuffer for MockBuffer {
    fn set_sample_rate(&mut self, sample_rate: u32, length_ms: u32) -> Result<(), BlipError> {
        if self.reject_sample_rate {
            return Err(BlipError::ZeroSampleRate);
        }
        self.sample_rate = sample_rate;
        self.length_ms = length_ms;
        Ok(())
    }

    fn set_clock_rate(&mut self, clock_rate: u32) -> Result<(), BlipError> {
        if clock_rate == 0 {
            return Err(BlipError::InvalidClockRate(0.0));
        }
        if self.sample_rate != 0 && u64::from(clock_rate) > u64::from(self.sample_rate) << 20 {
            return Err(BlipError::RatioTooHigh {
                clock_rate: f64::from(clock_rate),
                sample_rate: self.sample_rate,
            });
        }
        self.clock_rate = clock_rate;
        Ok(())
    }

    fn set_bass_freq(&mut self, freq: u32) {
        self.bass_freq = Some(freq);
    }

    fn set_treble_eq(&mut self, eq: TrebleEq) {
        self.eq = eq;
    }

    fn add_delta(&mut self, clock_time: u32, delta: f32) {
        self.impulses.push((clock_time, delta));
        self.level += delta;
    }

    fn end_frame(&mut self, clock_duration: u32) -> usize {
        self.frames.push(clock_duration);
        let pending = self.avail + self.samples_for(clock_duration);
        let dropped = pending.saturating_sub(self.size());
        self.avail = pending - dropped;
        dropped
    }

    fn samples_avail(&self) -> usize {
        self.avail
    }

    fn capacity(&self) -> usize {
        self.size()
    }

    fn count_samples(&self, clock_duration: u32) -> usize {
        self.samples_for(clock_duration)
    }

    fn resampled_duration(&self, clock_duration: u32) -> usize {
        self.samples_for(clock_duration)
    }

    fn read_samples(&mut self, out: &mut [i16], stereo: bool) -> usize {
        let step = if stereo { 2 } else { 1 };
        let usable = out.len().div_ceil(step);
        let count = usable.min(self.avail);
        let sample = self.level.round().clamp(i16::MIN as f32, i16::MAX as f32) as i16;
        for dst in out.iter_mut().step_by(step).take(count) {
            *dst = sample;
        }
        self.avail -= count;
        count
    }

    fn discard_samples(&mut self, count: usize) -> usize {
        let count = count.min(self.avail);
        self.avail -= count;
        count
    }

    fn clear(&mut self) {
        self.avail = 0;
        self.level = 0.0;
    }
}
