//! Fixed-point band-limited step synthesis after Shay Green's blip_buf 1.1.0
//! (<http://www.slack.net/~ant/blip_buf.html>).
//!
//! Deltas land on a 16-tap windowed-sinc step selected by sub-sample phase;
//! reading runs a leaky integrator over the accumulated steps. Timing,
//! kernel and clamping are bit-compatible with the C library, while the
//! leak strength and a treble shelf can be tuned per buffer.

use std::cmp::min;

use thiserror::Error;

use crate::eq::{TrebleEq, TrebleShelf};

// Time is tracked in 1/2^52 of an output sample; the low 32 bits only
// matter for long-run accuracy and are dropped when a delta is placed.
const PRE_SHIFT: usize = 32;
const TIME_BITS: usize = PRE_SHIFT + 20;
const TIME_UNIT: u64 = 1u64 << TIME_BITS;
const FRAC_BITS: usize = TIME_BITS - PRE_SHIFT;
const BLIP_MAX_RATIO: u64 = 1 << 20;

const PHASE_BITS: usize = 5;
const PHASE_COUNT: usize = 1 << PHASE_BITS;
const DELTA_BITS: usize = 15;
const DELTA_UNIT: u64 = 1 << DELTA_BITS;

const HALF_WIDTH: usize = 8;
const END_FRAME_EXTRA: usize = 2;
/// Samples past the readable region a step may spill into.
const BUF_EXTRA: usize = HALF_WIDTH * 2 + END_FRAME_EXTRA;

const BASS_SHIFT: u32 = 9;
const BASS_SHIFT_OFF: u32 = 31;
const BASS_SHIFT_MAX: f64 = 24.0;

/// Largest buffer [`BlipBuf::set_sample_rate`] will allocate, in samples.
pub const MAX_BUFFER_SAMPLES: usize = 1 << 19;

/// Largest step, in output units, a single [`BlipBuf::add_delta`] places.
/// Larger steps are clamped to it.
pub const MAX_DELTA: i32 = 32_767;

/// First half of the step kernel for each phase, `Sinc_Generator(0.9, 0.55, 4.5)`.
/// The second half is the mirrored opposite phase.
const STEP_KERNEL: [[i16; HALF_WIDTH]; PHASE_COUNT + 1] = [
    [43, -115, 350, -488, 1136, -914, 5861, 21022],
    [44, -118, 348, -473, 1076, -799, 5274, 21001],
    [45, -121, 344, -454, 1011, -677, 4706, 20936],
    [46, -122, 336, -431, 942, -549, 4156, 20829],
    [47, -123, 327, -404, 868, -418, 3629, 20679],
    [47, -122, 316, -375, 792, -285, 3124, 20488],
    [47, -120, 303, -344, 714, -151, 2644, 20256],
    [46, -117, 289, -310, 634, -17, 2188, 19985],
    [46, -114, 273, -275, 553, 117, 1758, 19675],
    [44, -108, 255, -237, 471, 247, 1356, 19327],
    [43, -103, 237, -199, 390, 373, 981, 18944],
    [42, -98, 218, -160, 310, 495, 633, 18527],
    [40, -91, 198, -121, 231, 611, 314, 18078],
    [38, -84, 178, -81, 153, 722, 22, 17599],
    [36, -76, 157, -43, 80, 824, -241, 17092],
    [34, -68, 135, -3, 8, 919, -476, 16558],
    [32, -61, 115, 34, -60, 1006, -683, 16001],
    [29, -52, 94, 70, -123, 1083, -862, 15422],
    [27, -44, 73, 106, -184, 1152, -1015, 14824],
    [25, -36, 53, 139, -239, 1211, -1142, 14210],
    [22, -27, 34, 170, -290, 1261, -1244, 13582],
    [20, -20, 16, 199, -335, 1301, -1322, 12942],
    [18, -12, -3, 226, -375, 1331, -1376, 12293],
    [15, -4, -19, 250, -410, 1351, -1408, 11638],
    [13, 3, -35, 272, -439, 1361, -1419, 10979],
    [11, 9, -49, 292, -464, 1362, -1410, 10319],
    [9, 16, -63, 309, -483, 1354, -1383, 9660],
    [7, 22, -75, 322, -496, 1337, -1339, 9005],
    [6, 26, -85, 333, -504, 1312, -1280, 8355],
    [4, 31, -94, 341, -507, 1278, -1205, 7713],
    [3, 35, -102, 347, -506, 1238, -1119, 7082],
    [1, 40, -110, 350, -499, 1190, -1021, 6464],
    [0, 43, -115, 350, -488, 1136, -914, 5861],
];

/// Reasons a buffer cannot be sized.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BlipError {
    #[error("sample rate must be non-zero")]
    ZeroSampleRate,
    #[error("buffer length must be non-zero")]
    ZeroLength,
    #[error("buffer of {requested} samples exceeds the {max} sample limit")]
    TooLarge { requested: u64, max: usize },
    #[error("clock rate must be positive, got {0}")]
    InvalidClockRate(f64),
    #[error("clock rate {clock_rate} Hz is too high for a {sample_rate} Hz output")]
    RatioTooHigh { clock_rate: f64, sample_rate: u32 },
}

/// Clock-domain delta accumulator producing 16-bit PCM.
///
/// `Default` gives an empty buffer; size it with
/// [`set_sample_rate`](Self::set_sample_rate) and give it a clock with
/// [`set_clock_rate`](Self::set_clock_rate) before adding deltas.
#[derive(Debug, Clone)]
pub struct BlipBuf {
    /// Output samples per clock, in `TIME_UNIT`s.
    factor: u64,
    /// Fractional start of the current frame, in `TIME_UNIT`s.
    offset: u64,
    avail: usize,
    size: usize,
    integrator: i32,
    samples: Vec<i32>,
    clock_rate: f64,
    sample_rate: u32,
    bass_freq: Option<u32>,
    bass_shift: u32,
    eq: TrebleEq,
    shelf: TrebleShelf,
}

impl Default for BlipBuf {
    fn default() -> Self {
        let factor = TIME_UNIT / BLIP_MAX_RATIO;
        Self {
            factor,
            offset: factor / 2,
            avail: 0,
            size: 0,
            integrator: 0,
            samples: Vec::new(),
            clock_rate: 0.0,
            sample_rate: 0,
            bass_freq: None,
            bass_shift: BASS_SHIFT,
            eq: TrebleEq::FLAT,
            shelf: TrebleShelf::default(),
        }
    }
}

impl BlipBuf {
    /// Resize for `sample_rate` Hz output holding `length_ms` milliseconds
    /// of audio. Pending samples are dropped; on error nothing changes.
    pub fn set_sample_rate(&mut self, sample_rate: u32, length_ms: u32) -> Result<(), BlipError> {
        if sample_rate == 0 {
            return Err(BlipError::ZeroSampleRate);
        }
        if length_ms == 0 {
            return Err(BlipError::ZeroLength);
        }
        let requested = (u64::from(sample_rate) * (u64::from(length_ms) + 1)).div_ceil(1000);
        if requested > MAX_BUFFER_SAMPLES as u64 {
            return Err(BlipError::TooLarge {
                requested,
                max: MAX_BUFFER_SAMPLES,
            });
        }
        if self.clock_rate > f64::from(sample_rate) * BLIP_MAX_RATIO as f64 {
            return Err(BlipError::RatioTooHigh {
                clock_rate: self.clock_rate,
                sample_rate,
            });
        }

        self.size = requested as usize;
        self.samples = vec![0; self.size + BUF_EXTRA];
        self.sample_rate = sample_rate;
        self.update_factor();
        self.update_bass_shift();
        self.shelf.configure(self.eq, sample_rate);
        self.clear();
        Ok(())
    }

    /// Change the input clock. Buffered samples are kept, and so is the
    /// current frame offset, as `blip_set_rates` does. On error nothing
    /// changes.
    pub fn set_clock_rate(&mut self, clock_rate: f64) -> Result<(), BlipError> {
        if clock_rate.is_nan() || clock_rate <= 0.0 {
            return Err(BlipError::InvalidClockRate(clock_rate));
        }
        if self.sample_rate != 0 && clock_rate > f64::from(self.sample_rate) * BLIP_MAX_RATIO as f64
        {
            return Err(BlipError::RatioTooHigh {
                clock_rate,
                sample_rate: self.sample_rate,
            });
        }
        self.clock_rate = clock_rate;
        self.update_factor();
        Ok(())
    }

    /// Low-cut corner in Hz; `0` turns the integrator leak off.
    pub fn set_bass_freq(&mut self, freq: u32) {
        self.bass_freq = Some(freq);
        self.update_bass_shift();
    }

    pub fn set_treble_eq(&mut self, eq: TrebleEq) {
        self.eq = eq;
        self.shelf.configure(eq, self.sample_rate);
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn clock_rate(&self) -> f64 {
        self.clock_rate
    }

    pub fn bass_shift(&self) -> u32 {
        self.bass_shift
    }

    pub fn treble_eq(&self) -> TrebleEq {
        self.eq
    }

    /// Capacity in samples; zero until sized.
    pub fn capacity(&self) -> usize {
        self.size
    }

    /// Drop every pending sample and restart the frame.
    pub fn clear(&mut self) {
        self.offset = self.factor / 2;
        self.avail = 0;
        self.integrator = 0;
        self.samples.fill(0);
        self.shelf.reset();
    }

    pub fn samples_avail(&self) -> usize {
        self.avail
    }

    /// Samples `end_frame(clock_duration)` would make readable.
    pub fn count_samples(&self, clock_duration: i64) -> usize {
        (self.frame_end(clock_duration) >> TIME_BITS) as usize
    }

    /// Output samples spanned by `clock_duration` clocks, ignoring where
    /// inside a sample the current frame starts.
    pub fn resampled_duration(&self, clock_duration: i64) -> usize {
        (clamp_clocks(clock_duration).saturating_mul(self.factor) >> TIME_BITS) as usize
    }

    /// Shortest frame, in clocks, that makes `sample_count` more samples
    /// readable.
    ///
    /// # Panics
    ///
    /// If the buffer cannot hold that many more samples.
    pub fn clocks_needed(&self, sample_count: usize) -> i64 {
        assert!(
            self.avail + sample_count <= self.size,
            "{sample_count} more samples do not fit"
        );
        let target = sample_count as u64 * TIME_UNIT;
        target.saturating_sub(self.offset).div_ceil(self.factor) as i64
    }

    /// Add a step of `delta` output units at `clock_time` clocks into the
    /// current frame.
    ///
    /// `delta` is clamped to [`MAX_DELTA`]. A step landing past the end of
    /// the buffer is dropped.
    ///
    /// # Panics
    ///
    /// If `clock_time` is negative.
    pub fn add_delta(&mut self, clock_time: i64, delta: f32) {
        let limit = MAX_DELTA as f32;
        let delta = delta.round().clamp(-limit, limit) as i32;
        if delta == 0 {
            return;
        }
        assert!(clock_time >= 0, "negative clock time {clock_time}");

        let fixed = (clock_time as u64)
            .saturating_mul(self.factor)
            .saturating_add(self.offset)
            >> PRE_SHIFT;
        let start = self.avail.saturating_add((fixed >> FRAC_BITS) as usize);
        if start.saturating_add(2 * HALF_WIDTH) > self.samples.len() {
            return;
        }

        let phase_shift = FRAC_BITS - PHASE_BITS;
        let phase = (fixed >> phase_shift) as usize & (PHASE_COUNT - 1);
        let interp = ((fixed >> (phase_shift - DELTA_BITS)) & (DELTA_UNIT - 1)) as i32;
        let late = (delta * interp) >> DELTA_BITS;
        let early = delta - late;

        let (head, tail) =
            self.samples[start..start + 2 * HALF_WIDTH].split_at_mut(HALF_WIDTH);

        let (a, b) = (&STEP_KERNEL[phase], &STEP_KERNEL[phase + 1]);
        for (k, out) in head.iter_mut().enumerate() {
            let inc = i32::from(a[k]) * early + i32::from(b[k]) * late;
            *out = out.wrapping_add(inc);
        }

        // Second half: the mirror phase, read back to front.
        let (a, b) = (
            &STEP_KERNEL[PHASE_COUNT - phase],
            &STEP_KERNEL[PHASE_COUNT - phase - 1],
        );
        for (k, out) in tail.iter_mut().enumerate() {
            let tap = HALF_WIDTH - 1 - k;
            let inc = i32::from(a[tap]) * early + i32::from(b[tap]) * late;
            *out = out.wrapping_add(inc);
        }
    }

    /// Close the frame after `clock_duration` clocks, making the samples
    /// before it readable.
    ///
    /// When the pending samples no longer fit, the oldest ones are dropped
    /// until they do; the number dropped is returned.
    ///
    /// # Panics
    ///
    /// If `clock_duration` is negative.
    pub fn end_frame(&mut self, clock_duration: i64) -> usize {
        assert!(clock_duration >= 0, "negative frame length {clock_duration}");
        let end = self.frame_end(clock_duration);
        self.offset = end & (TIME_UNIT - 1);
        let pending = self.avail.saturating_add((end >> TIME_BITS) as usize);
        let dropped = pending.saturating_sub(self.size);
        self.avail = pending - dropped;
        self.drop_front(dropped);
        dropped
    }

    /// Read up to `out.len()` samples.
    pub fn read_samples_i16(&mut self, out: &mut [i16]) -> usize {
        let count = min(out.len(), self.avail);
        let mut dst = out.iter_mut();
        self.integrate(count, |s| {
            if let Some(slot) = dst.next() {
                *slot = s;
            }
        });
        count
    }

    /// Read samples into every other slot of `out` (indices 0, 2, 4, ...).
    ///
    /// Odd-length slices are accepted so a caller can fill the right side of
    /// an interleaved buffer through `&mut out[1..]`.
    pub fn read_samples_i16_stereo(&mut self, out: &mut [i16]) -> usize {
        let count = min(out.len().div_ceil(2), self.avail);
        let mut dst = out.iter_mut().step_by(2);
        self.integrate(count, |s| {
            if let Some(slot) = dst.next() {
                *slot = s;
            }
        });
        count
    }

    /// Drop up to `count` samples, advancing the integrator exactly as a
    /// read would so later reads stay continuous.
    pub fn discard_samples(&mut self, count: usize) -> usize {
        let count = min(count, self.avail);
        self.integrate(count, |_| {});
        count
    }

    fn integrate(&mut self, count: usize, sink: impl FnMut(i16)) {
        if count == 0 {
            return;
        }
        self.run_integrator(count, sink);

        // Shift the unread samples and any spilled kernel tails down.
        let keep = self.avail + BUF_EXTRA - count;
        self.shift_out(count, keep);
        self.avail -= count;
    }

    /// Integrate away the first `count` slots of the whole buffer, the
    /// current frame's pending steps included. `avail` is left to the caller.
    fn drop_front(&mut self, count: usize) {
        let count = min(count, self.samples.len());
        if count == 0 {
            return;
        }
        self.run_integrator(count, |_| {});
        let keep = self.samples.len() - count;
        self.shift_out(count, keep);
    }

    fn run_integrator(&mut self, count: usize, mut sink: impl FnMut(i16)) {
        let mut sum = self.integrator;
        for &step in &self.samples[..count] {
            let s = wrap_clamp(sum >> DELTA_BITS);
            sum = sum
                .wrapping_add(step)
                .wrapping_sub(bass_leak(s, self.bass_shift));
            sink(self.shelf.process(s) as i16);
        }
        self.integrator = sum;
    }

    fn shift_out(&mut self, count: usize, keep: usize) {
        self.samples.copy_within(count..count + keep, 0);
        self.samples[keep..keep + count].fill(0);
    }

    fn frame_end(&self, clock_duration: i64) -> u64 {
        clamp_clocks(clock_duration)
            .saturating_mul(self.factor)
            .saturating_add(self.offset)
    }

    fn update_factor(&mut self) {
        if self.clock_rate <= 0.0 || self.sample_rate == 0 {
            return;
        }
        // Round up so a frame never yields fewer samples than it should.
        let exact = TIME_UNIT as f64 * f64::from(self.sample_rate) / self.clock_rate;
        let factor = exact as u64;
        self.factor = if (factor as f64) < exact { factor + 1 } else { factor };
    }

    fn update_bass_shift(&mut self) {
        self.bass_shift = match self.bass_freq {
            None => BASS_SHIFT,
            Some(0) => BASS_SHIFT_OFF,
            Some(_) if self.sample_rate == 0 => BASS_SHIFT,
            Some(freq) => {
                let ratio = 0.124 * f64::from(self.sample_rate) / f64::from(freq);
                (1.0 + ratio.log2().floor()).clamp(0.0, BASS_SHIFT_MAX) as u32
            }
        };
    }
}

fn clamp_clocks(clock_duration: i64) -> u64 {
    clock_duration.max(0) as u64
}

/// Integrator leak per sample. At the default shift of 9 this equals
/// blip_buf's `s << (delta_bits - bass_shift)`.
#[inline]
fn bass_leak(s: i32, shift: u32) -> i32 {
    ((i64::from(s) << DELTA_BITS) >> shift) as i32
}

/// blip_buf's `CLAMP`: out-of-range values fold to `(s >> 16) ^ 0x7FFF`
/// rather than saturating.
#[inline]
fn wrap_clamp(s: i32) -> i32 {
    if i32::from(s as i16) == s {
        s
    } else {
        (s >> 16) ^ 0x7FFF
    }
}
