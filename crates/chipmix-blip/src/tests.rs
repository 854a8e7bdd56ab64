use crate::{BlipBuf, BlipError, MAX_BUFFER_SAMPLES, MAX_DELTA, TrebleEq};
use proptest::prelude::*;

const CLOCK_RATE: f64 = 3_579_545.0;
const SAMPLE_RATE: u32 = 44_100;

fn sized_buf(length_ms: u32) -> BlipBuf {
    let mut buf = BlipBuf::default();
    buf.set_clock_rate(CLOCK_RATE).expect("NTSC clock");
    buf.set_sample_rate(SAMPLE_RATE, length_ms)
        .expect("44.1 kHz buffer should size");
    buf
}

#[derive(Clone, Debug)]
struct Op {
    at: u32,
    delta: i32,
}

#[derive(Clone, Debug)]
struct Frame {
    samples: usize,
    ops: Vec<Op>,
}

fn frame_strategy() -> impl Strategy<Value = Frame> {
    (
        1usize..=600,
        prop::collection::vec((0u32..=5_000, -8_000i32..=8_000i32), 0..10),
    )
        .prop_map(|(samples, ops)| Frame {
            samples,
            ops: ops
                .into_iter()
                .map(|(at, delta)| Op { at, delta })
                .collect(),
        })
}

#[test]
fn default_buffer_is_unsized() {
    let buf = BlipBuf::default();
    assert_eq!(buf.capacity(), 0);
    assert_eq!(buf.samples_avail(), 0);
    assert_eq!(buf.sample_rate(), 0);
}

#[test]
fn sizing_rounds_up_one_extra_millisecond() {
    let buf = sized_buf(100);
    // ceil(44_100 * 101 / 1000)
    assert_eq!(buf.capacity(), 4_455);
}

#[test]
fn sizing_failures_leave_buffer_untouched() {
    let mut buf = sized_buf(40);
    let before = buf.capacity();

    assert_eq!(buf.set_sample_rate(0, 40), Err(BlipError::ZeroSampleRate));
    assert_eq!(buf.set_sample_rate(SAMPLE_RATE, 0), Err(BlipError::ZeroLength));
    assert!(matches!(
        buf.set_sample_rate(SAMPLE_RATE, 60_000),
        Err(BlipError::TooLarge { max, .. }) if max == MAX_BUFFER_SAMPLES
    ));

    assert_eq!(buf.capacity(), before);
    assert_eq!(buf.sample_rate(), SAMPLE_RATE);
}

#[test]
fn clock_rate_too_high_for_sample_rate_is_rejected() {
    let mut buf = BlipBuf::default();
    buf.set_clock_rate(4_000_000.0).expect("unsized buffer takes any clock");
    assert!(matches!(
        buf.set_sample_rate(1, 100),
        Err(BlipError::RatioTooHigh { sample_rate: 1, .. })
    ));
}

#[test]
fn bass_shift_follows_low_cut_frequency() {
    let mut buf = sized_buf(100);
    assert_eq!(buf.bass_shift(), 9);

    buf.set_bass_freq(16);
    assert_eq!(buf.bass_shift(), 9);

    buf.set_bass_freq(90);
    assert_eq!(buf.bass_shift(), 6);

    buf.set_bass_freq(0);
    assert_eq!(buf.bass_shift(), 31);
}

#[test]
fn bass_shift_is_recomputed_on_resize() {
    let mut buf = sized_buf(100);
    buf.set_bass_freq(90);
    buf.set_sample_rate(11_025, 100).expect("resize");
    // 0.124 * 11025 / 90 = 15.19 -> 1 + floor(log2) = 4
    assert_eq!(buf.bass_shift(), 4);
}

#[test]
fn step_rises_then_leaks_back_towards_zero() {
    let mut buf = sized_buf(1_000);
    buf.set_bass_freq(90);
    buf.add_delta(0, 10_000.0);
    let clocks = buf.clocks_needed(2_000);
    buf.end_frame(clocks);

    let mut out = vec![0i16; buf.samples_avail()];
    let got = buf.read_samples_i16(&mut out);
    assert_eq!(got, out.len());

    let peak = *out.iter().max().expect("samples");
    assert!(peak > 6_000, "step did not reach its level: {peak}");
    let tail = out[got - 1];
    assert!(tail.abs() < peak / 4, "bass leak missing, tail {tail}");
}

#[test]
fn flat_eq_is_bit_exact() {
    let mut plain = sized_buf(100);
    let mut eq = sized_buf(100);
    eq.set_treble_eq(TrebleEq::new(-24.0, 0));

    for buf in [&mut plain, &mut eq] {
        buf.add_delta(10, 6_000.0);
        buf.add_delta(900, -3_000.0);
        buf.end_frame(2_000);
    }

    let mut a = vec![0i16; plain.samples_avail()];
    let mut b = vec![0i16; eq.samples_avail()];
    plain.read_samples_i16(&mut a);
    eq.read_samples_i16(&mut b);
    assert_eq!(a, b);
}

#[test]
fn clear_discards_pending_samples() {
    let mut buf = sized_buf(100);
    buf.add_delta(0, 5_000.0);
    buf.end_frame(1_000);
    assert!(buf.samples_avail() > 0);

    buf.clear();
    assert_eq!(buf.samples_avail(), 0);

    buf.end_frame(1_000);
    let mut out = vec![0i16; buf.samples_avail()];
    buf.read_samples_i16(&mut out);
    assert!(out.iter().all(|&s| s == 0));
}

#[test]
fn stereo_read_fills_odd_length_tail() {
    let mut buf = sized_buf(100);
    buf.end_frame(buf.clocks_needed(4));
    let mut out = vec![i16::MIN; 7];
    let got = buf.read_samples_i16_stereo(&mut out);
    assert_eq!(got, 4);
    assert_eq!(out, [0, i16::MIN, 0, i16::MIN, 0, i16::MIN, 0]);
}

#[test]
fn discard_keeps_the_integrator_continuous() {
    let mut read = sized_buf(100);
    let mut skipped = sized_buf(100);
    for buf in [&mut read, &mut skipped] {
        buf.add_delta(0, 7_000.0);
        buf.add_delta(3_000, -2_000.0);
        buf.end_frame(6_000);
    }

    let mut head = vec![0i16; 20];
    read.read_samples_i16(&mut head);
    assert_eq!(skipped.discard_samples(20), 20);
    assert_eq!(skipped.samples_avail(), read.samples_avail());

    let mut a = vec![0i16; read.samples_avail()];
    let mut b = vec![0i16; skipped.samples_avail()];
    read.read_samples_i16(&mut a);
    skipped.read_samples_i16(&mut b);
    assert_eq!(a, b);
    assert_eq!(skipped.discard_samples(10), 0);
}

#[test]
fn clock_rate_is_validated_without_side_effects() {
    let mut buf = sized_buf(100);
    assert_eq!(
        buf.set_clock_rate(0.0),
        Err(BlipError::InvalidClockRate(0.0))
    );
    assert!(matches!(
        buf.set_clock_rate(f64::from(SAMPLE_RATE) * f64::from(1u32 << 21)),
        Err(BlipError::RatioTooHigh {
            sample_rate: SAMPLE_RATE,
            ..
        })
    ));
    assert_eq!(buf.clock_rate(), CLOCK_RATE);
}

#[test]
fn oversized_steps_are_clamped() {
    let mut huge = sized_buf(100);
    let mut limit = sized_buf(100);
    huge.add_delta(7, 1.0e9);
    huge.add_delta(500, -1.0e9);
    limit.add_delta(7, MAX_DELTA as f32);
    limit.add_delta(500, -(MAX_DELTA as f32));
    huge.end_frame(2_000);
    limit.end_frame(2_000);

    let mut a = vec![0i16; huge.samples_avail()];
    let mut b = vec![0i16; limit.samples_avail()];
    huge.read_samples_i16(&mut a);
    limit.read_samples_i16(&mut b);
    assert_eq!(a, b);
}

#[test]
fn steps_past_the_end_are_dropped() {
    let mut unsized_buf = BlipBuf::default();
    unsized_buf.add_delta(0, 1_000.0);
    assert_eq!(unsized_buf.samples_avail(), 0);

    let mut buf = sized_buf(10);
    buf.add_delta(10_000_000, 1_000.0);
    buf.end_frame(1_000);
    let mut out = vec![0i16; buf.samples_avail()];
    buf.read_samples_i16(&mut out);
    assert!(out.iter().all(|&s| s == 0));
}

#[test]
fn undrained_frames_drop_the_oldest_samples() {
    let mut buf = sized_buf(100);
    let mut dropped = 0;
    for frame in 0..20 {
        buf.add_delta(0, if frame % 2 == 0 { 4_000.0 } else { -4_000.0 });
        dropped += buf.end_frame(59_659);
        assert!(buf.samples_avail() <= buf.capacity());
    }
    assert!(dropped > 0);
    assert_eq!(buf.samples_avail(), buf.capacity());

    let mut out = vec![0i16; buf.samples_avail()];
    assert_eq!(buf.read_samples_i16(&mut out), out.len());
    assert!(out.iter().any(|&s| s != 0));
}

proptest! {
    #[test]
    fn count_samples_predicts_end_frame(frames in prop::collection::vec(frame_strategy(), 1..6)) {
        let mut buf = sized_buf(250);

        for frame in frames {
            let samples = frame.samples.min(buf.capacity() - buf.samples_avail()).max(1);
            let clock_duration = buf.clocks_needed(samples).max(1);

            for op in &frame.ops {
                let t = op.at % (clock_duration as u32);
                buf.add_delta(i64::from(t), op.delta as f32);
            }

            let predicted = buf.count_samples(clock_duration);
            let before = buf.samples_avail();
            buf.end_frame(clock_duration);
            prop_assert_eq!(buf.samples_avail() - before, predicted);

            let mut out = vec![0i16; buf.samples_avail()];
            buf.read_samples_i16(&mut out);
            prop_assert_eq!(buf.samples_avail(), 0);
        }
    }

    #[test]
    fn stereo_and_mono_reads_agree(frame in frame_strategy()) {
        let mut mono = sized_buf(250);
        let mut stereo = sized_buf(250);
        let clock_duration = mono.clocks_needed(frame.samples).max(1);

        for buf in [&mut mono, &mut stereo] {
            for op in &frame.ops {
                let t = op.at % (clock_duration as u32);
                buf.add_delta(i64::from(t), op.delta as f32);
            }
            buf.end_frame(clock_duration);
        }

        let mut m = vec![0i16; mono.samples_avail()];
        let mut s = vec![0i16; stereo.samples_avail() * 2];
        let got_m = mono.read_samples_i16(&mut m);
        let got_s = stereo.read_samples_i16_stereo(&mut s);

        prop_assert_eq!(got_m, got_s);
        for (i, sample) in m.iter().enumerate() {
            prop_assert_eq!(*sample, s[i * 2]);
        }
    }

    #[test]
    fn resampled_duration_tracks_rate_ratio(clocks in 0i64..2_000_000) {
        let buf = sized_buf(100);
        let expected = clocks as f64 * f64::from(SAMPLE_RATE) / CLOCK_RATE;
        let got = buf.resampled_duration(clocks) as f64;
        prop_assert!((got - expected).abs() <= 1.0, "got {got}, expected {expected}");
    }
}
