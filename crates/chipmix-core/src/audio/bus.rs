//! Per chip-family synthesis adapter.
//!
//! A [`MixBus`] plays the role of a pair of Blip_Synth objects: it turns a
//! chip's raw amplitude deltas into output units for the left and right
//! buffers, applying calibrated gain, per-side level and stereo separation.

use chipmix_blip::{MAX_DELTA, TrebleEq};
use tracing::debug;

use crate::audio::{AccumulationBuffer, BusId};

/// Output units of a full-scale step.
const FULL_SCALE: f32 = 32_767.0;

/// Calibration of one chip family against the shared output scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BusProfile {
    /// Fraction of full scale one voice reaches at unity volume.
    pub gain: f32,
    /// Amplitude of a voice at its loudest.
    pub amplitude_range: i32,
}

impl BusProfile {
    pub const SN76489: Self = Self {
        gain: 0.2,
        amplitude_range: 16_383,
    };
}

impl BusId {
    pub fn profile(self) -> BusProfile {
        match self {
            Self::Sn76489 => BusProfile::SN76489,
        }
    }
}

/// Stereo parameter adjusted by [`MixBus::set_level`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StereoLevel {
    Left,
    Right,
    /// `0.0` plays both sides in both speakers, `1.0` keeps them apart.
    Separation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Left,
    Right,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MixBus {
    id: BusId,
    profile: BusProfile,
    level_left: f32,
    level_right: f32,
    sep_high: f32,
    sep_low: f32,
    volume: f32,
    eq: TrebleEq,
    unit_left: f32,
    unit_right: f32,
}

impl MixBus {
    pub fn new(id: BusId) -> Self {
        let mut bus = Self {
            id,
            profile: id.profile(),
            level_left: 1.0,
            level_right: 1.0,
            sep_high: 1.0,
            sep_low: 0.0,
            volume: 1.0,
            eq: TrebleEq::FLAT,
            unit_left: 0.0,
            unit_right: 0.0,
        };
        bus.update_units();
        bus
    }

    pub fn id(&self) -> BusId {
        self.id
    }

    pub fn profile(&self) -> BusProfile {
        self.profile
    }

    /// `(sep_high, sep_low)`: share of a side kept on its own speaker and
    /// share bled into the other one.
    pub fn separation(&self) -> (f32, f32) {
        (self.sep_high, self.sep_low)
    }

    /// Effective linear gain of the left and right outputs.
    pub fn gain(&self) -> (f32, f32) {
        let base = self.volume * self.profile.gain;
        (base * self.level_left, base * self.level_right)
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn treble_eq(&self) -> TrebleEq {
        self.eq
    }

    pub fn set_level(&mut self, which: StereoLevel, level: f32) {
        match which {
            StereoLevel::Left => self.level_left = level,
            StereoLevel::Right => self.level_right = level,
            StereoLevel::Separation => {
                self.sep_high = 0.5 + level / 2.0;
                self.sep_low = 0.5 - level / 2.0;
            }
        }
        self.update_units();
        debug!(bus = ?self.id, ?which, level, "stereo level updated");
    }

    /// Apply the mixer-wide volume and record the treble curve the mixer
    /// pushed into the buffers.
    pub(crate) fn configure(&mut self, volume: f32, eq: TrebleEq) {
        self.volume = volume;
        self.eq = eq;
        self.update_units();
    }

    /// Emit an amplitude change on one side of a channel.
    ///
    /// The side's own speaker receives `delta * sep_high` and the opposite
    /// one `delta * sep_low`; shares that truncate to zero emit nothing.
    pub(crate) fn add_delta<B: AccumulationBuffer>(
        &self,
        side: Side,
        clock_time: u32,
        delta: i64,
        left: &mut B,
        right: &mut B,
    ) {
        let (to_left, to_right) = match side {
            Side::Left => (self.sep_high, self.sep_low),
            Side::Right => (self.sep_low, self.sep_high),
        };
        self.offset(Side::Left, clock_time, (delta as f32 * to_left) as i64, left);
        self.offset(Side::Right, clock_time, (delta as f32 * to_right) as i64, right);
    }

    /// Steps beyond what one buffer delta can carry are clamped to it.
    fn offset<B: AccumulationBuffer>(
        &self,
        speaker: Side,
        clock_time: u32,
        delta: i64,
        buf: &mut B,
    ) {
        if delta == 0 {
            return;
        }
        let unit = match speaker {
            Side::Left => self.unit_left,
            Side::Right => self.unit_right,
        };
        let limit = MAX_DELTA as f32;
        buf.add_delta(clock_time, (delta as f32 * unit).clamp(-limit, limit));
    }

    fn update_units(&mut self) {
        let (left, right) = self.gain();
        let per_step = FULL_SCALE / self.profile.amplitude_range as f32;
        self.unit_left = left * per_step;
        self.unit_right = right * per_step;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::buffer::mock::MockBuffer;
    use proptest::prelude::*;

    #[test]
    fn separation_extremes() {
        let mut bus = MixBus::new(BusId::Sn76489);
        assert_eq!(bus.separation(), (1.0, 0.0));

        bus.set_level(StereoLevel::Separation, 0.0);
        assert_eq!(bus.separation(), (0.5, 0.5));

        bus.set_level(StereoLevel::Separation, 1.0);
        assert_eq!(bus.separation(), (1.0, 0.0));
    }

    #[test]
    fn full_separation_keeps_sides_apart() {
        let bus = MixBus::new(BusId::Sn76489);
        let mut left = MockBuffer::default();
        let mut right = MockBuffer::default();

        bus.add_delta(Side::Left, 12, 1_000, &mut left, &mut right);
        assert_eq!(left.impulses.len(), 1);
        assert!(right.impulses.is_empty());

        bus.add_delta(Side::Right, 20, -1_000, &mut left, &mut right);
        assert_eq!(left.impulses.len(), 1);
        assert_eq!(right.impulses.len(), 1);
        assert_eq!(right.impulses[0].0, 20);
        assert!(right.impulses[0].1 < 0.0);
    }

    #[test]
    fn no_separation_splits_evenly() {
        let mut bus = MixBus::new(BusId::Sn76489);
        bus.set_level(StereoLevel::Separation, 0.0);
        let mut left = MockBuffer::default();
        let mut right = MockBuffer::default();

        bus.add_delta(Side::Left, 0, 1_000, &mut left, &mut right);
        assert_eq!(left.impulses, right.impulses);
    }

    #[test]
    fn full_range_step_reaches_calibrated_gain() {
        let bus = MixBus::new(BusId::Sn76489);
        let mut left = MockBuffer::default();
        let mut right = MockBuffer::default();
        let range = BusProfile::SN76489.amplitude_range;

        bus.add_delta(Side::Left, 0, i64::from(range), &mut left, &mut right);
        let out = left.impulses[0].1;
        assert!((out - 0.2 * FULL_SCALE).abs() < 1.0, "got {out}");
    }

    #[test]
    fn per_side_levels_scale_independently() {
        let mut bus = MixBus::new(BusId::Sn76489);
        bus.set_level(StereoLevel::Left, 0.5);
        bus.set_level(StereoLevel::Right, 0.25);
        let (l, r) = bus.gain();
        assert!((l - 0.1).abs() < 1e-6);
        assert!((r - 0.05).abs() < 1e-6);
    }

    #[test]
    fn configure_sets_volume_and_eq() {
        let mut bus = MixBus::new(BusId::Sn76489);
        let eq = TrebleEq::new(-24.0, 12_000);

        bus.configure(0.5, eq);
        assert_eq!(bus.treble_eq(), eq);
        assert_eq!(bus.volume(), 0.5);
        assert!((bus.gain().0 - 0.1).abs() < 1e-6);
    }

    #[test]
    fn extreme_steps_are_clamped_per_buffer() {
        let mut bus = MixBus::new(BusId::Sn76489);
        bus.set_level(StereoLevel::Separation, 0.0);
        let mut left = MockBuffer::default();
        let mut right = MockBuffer::default();
        let swing = i64::from(i32::MAX) - i64::from(i32::MIN);

        bus.add_delta(Side::Left, 0, swing, &mut left, &mut right);
        bus.add_delta(Side::Right, 4, -swing, &mut left, &mut right);
        let limit = MAX_DELTA as f32;
        assert_eq!(left.impulses, [(0, limit), (4, -limit)]);
        assert_eq!(right.impulses, left.impulses);
    }

    proptest! {
        #[test]
        fn separation_shares_sum_to_one(level in 0.0f32..=1.0) {
            let mut bus = MixBus::new(BusId::Sn76489);
            bus.set_level(StereoLevel::Separation, level);
            let (high, low) = bus.separation();
            prop_assert!((high + low - 1.0).abs() <= f32::EPSILON);
            prop_assert!(high >= low);
        }
    }
}
