//! The band-limited accumulation buffer as seen by the mixer.
//!
//! The mixer drives two of these (left and right). [`BlipBuf`] is the real
//! implementation; tests swap in a recording mock.

use chipmix_blip::{BlipBuf, BlipError, TrebleEq};

#[cfg(test)]
pub(crate) mod mock;

pub trait AccumulationBuffer {
    /// Size the buffer for `sample_rate` Hz output holding `length_ms` of audio.
    fn set_sample_rate(&mut self, sample_rate: u32, length_ms: u32) -> Result<(), BlipError>;
    /// Change the input clock; a rate the buffer cannot resample leaves it
    /// untouched.
    fn set_clock_rate(&mut self, clock_rate: u32) -> Result<(), BlipError>;
    fn set_bass_freq(&mut self, freq: u32);
    fn set_treble_eq(&mut self, eq: TrebleEq);

    /// Add a step of `delta` output units at frame-relative `clock_time`.
    fn add_delta(&mut self, clock_time: u32, delta: f32);
    /// Close the current frame after `clock_duration` clocks, returning how
    /// many of the oldest samples were dropped to make it fit.
    fn end_frame(&mut self, clock_duration: u32) -> usize;

    fn samples_avail(&self) -> usize;
    /// Most samples the buffer holds at once.
    fn capacity(&self) -> usize;
    /// Samples `end_frame(clock_duration)` would add.
    fn count_samples(&self, clock_duration: u32) -> usize;
    /// Output samples spanned by `clock_duration` clocks.
    fn resampled_duration(&self, clock_duration: u32) -> usize;

    /// Drain samples into `out`. With `stereo` set only every other slot,
    /// starting at index 0, is written.
    fn read_samples(&mut self, out: &mut [i16], stereo: bool) -> usize;
    /// Drop up to `count` samples without producing output.
    fn discard_samples(&mut self, count: usize) -> usize;
    fn clear(&mut self);
}

impl AccumulationBuffer for BlipBuf {
    fn set_sample_rate(&mut self, sample_rate: u32, length_ms: u32) -> Result<(), BlipError> {
        BlipBuf::set_sample_rate(self, sample_rate, length_ms)
    }

    fn set_clock_rate(&mut self, clock_rate: u32) -> Result<(), BlipError> {
        BlipBuf::set_clock_rate(self, f64::from(clock_rate))
    }

    fn set_bass_freq(&mut self, freq: u32) {
        BlipBuf::set_bass_freq(self, freq);
    }

    fn set_treble_eq(&mut self, eq: TrebleEq) {
        BlipBuf::set_treble_eq(self, eq);
    }

    fn add_delta(&mut self, clock_time: u32, delta: f32) {
        BlipBuf::add_delta(self, i64::from(clock_time), delta);
    }

    fn end_frame(&mut self, clock_duration: u32) -> usize {
        BlipBuf::end_frame(self, i64::from(clock_duration))
    }

    fn samples_avail(&self) -> usize {
        BlipBuf::samples_avail(self)
    }

    fn capacity(&self) -> usize {
        BlipBuf::capacity(self)
    }

    fn count_samples(&self, clock_duration: u32) -> usize {
        BlipBuf::count_samples(self, i64::from(clock_duration))
    }

    fn resampled_duration(&self, clock_duration: u32) -> usize {
        BlipBuf::resampled_duration(self, i64::from(clock_duration))
    }

    fn read_samples(&mut self, out: &mut [i16], stereo: bool) -> usize {
        if stereo {
            self.read_samples_i16_stereo(out)
        } else {
            self.read_samples_i16(out)
        }
    }

    fn discard_samples(&mut self, count: usize) -> usize {
        BlipBuf::discard_samples(self, count)
    }

    fn clear(&mut self) {
        BlipBuf::clear(self);
    }
}
