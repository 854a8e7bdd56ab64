//! Frame loop: song → PSG → mixer → WAV.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result, bail};
use chipmix_core::{AudioChannel, Mixer};
use hound::{SampleFormat, WavSpec, WavWriter};
use tracing::{debug, info};

use crate::args::Args;
use crate::psg::Psg;
use crate::song::Song;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RenderSummary {
    pub frames: u32,
    /// Sample frames written (one per output slot in mono, one per L/R pair
    /// in stereo).
    pub samples: u64,
    pub peak: u16,
}

/// Splits the chip clock into whole-cycle frames without drifting.
#[derive(Debug)]
struct FrameClock {
    clock_rate: u32,
    frame_rate: u32,
    remainder: u32,
}

impl FrameClock {
    fn next_frame(&mut self) -> u32 {
        let total = self.clock_rate + self.remainder;
        self.remainder = total % self.frame_rate;
        total / self.frame_rate
    }
}

pub fn render(args: &Args) -> Result<RenderSummary> {
    if !args.seconds.is_finite() || args.seconds <= 0.0 {
        bail!("render length must be a positive number of seconds");
    }

    let settings = args.mixer_settings();
    let mut mixer = Mixer::new();
    mixer
        .apply_settings(&settings)
        .context("failed to configure the mixer")?;

    let longest_frame = settings.clock_rate.div_ceil(args.frame_rate());
    let frame_samples = mixer.count_samples(longest_frame);
    if frame_samples >= mixer.buffer_capacity() {
        bail!(
            "a {} ms buffer cannot hold one {} Hz frame ({frame_samples} samples)",
            args.buffer_ms,
            args.frame_rate()
        );
    }

    let stereo = settings.channel_count == 2;
    let spec = WavSpec {
        channels: u16::from(settings.channel_count),
        sample_rate: settings.sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut wav = WavWriter::create(&args.output, spec)
        .with_context(|| format!("failed to create {}", args.output.display()))?;
    let mut trace = args
        .meter_trace
        .as_deref()
        .map(MeterTrace::create)
        .transpose()?;

    let mut psg = Psg::new();
    let mut song = Song::new(settings.clock_rate, &mut psg);
    let mut clock = FrameClock {
        clock_rate: settings.clock_rate,
        frame_rate: args.frame_rate(),
        remainder: 0,
    };

    let frames = (args.seconds * args.frame_rate() as f32).ceil() as u32;
    let slots = if stereo { 2 } else { 1 };
    let mut pcm = vec![0i16; settings.sample_rate as usize * slots];
    let mut summary = RenderSummary::default();

    info!(
        output = %args.output.display(),
        frames,
        sample_rate = settings.sample_rate,
        stereo,
        "rendering"
    );

    for frame in 0..frames {
        let frame_cycles = clock.next_frame();
        song.tick(&mut psg);
        psg.run_frame(&mut mixer, frame_cycles);

        let ready = mixer.finish_buffer(frame_cycles);
        let read = mixer.read_buffer(ready, &mut pcm, stereo);
        for &sample in &pcm[..read] {
            wav.write_sample(sample)
                .context("failed to write WAV sample")?;
            summary.peak = summary.peak.max(sample.unsigned_abs());
        }
        summary.samples += (read / slots) as u64;
        summary.frames += 1;

        if let Some(trace) = trace.as_mut() {
            trace.record(frame, song.row(), &mixer)?;
        }
        debug!(frame, frame_cycles, ready, read, "frame mixed");
    }

    wav.finalize().context("failed to finalize WAV file")?;
    if let Some(trace) = trace {
        trace.finish()?;
    }
    Ok(summary)
}

/// CSV of every channel's metered level, one line per frame.
struct MeterTrace {
    out: BufWriter<File>,
}

impl MeterTrace {
    fn create(path: &Path) -> Result<Self> {
        let file = File::create(path)
            .with_context(|| format!("failed to create meter trace {}", path.display()))?;
        let mut out = BufWriter::new(file);
        writeln!(out, "frame,row,square1,square2,square3,noise")?;
        Ok(Self { out })
    }

    fn record(&mut self, frame: u32, row: usize, mixer: &Mixer) -> Result<()> {
        write!(self.out, "{frame},{row}")?;
        for channel in AudioChannel::ALL {
            write!(self.out, ",{}", mixer.channel_output(channel))?;
        }
        writeln!(self.out)?;
        Ok(())
    }

    fn finish(mut self) -> Result<()> {
        self.out.flush().context("failed to flush meter trace")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn frame_clock_keeps_the_remainder() {
        let mut clock = FrameClock {
            clock_rate: 3_579_545,
            frame_rate: 60,
            remainder: 0,
        };
        let total: u32 = (0..60).map(|_| clock.next_frame()).sum();
        assert_eq!(total, 3_579_545);
    }

    #[test]
    fn buffer_shorter_than_a_frame_is_refused() {
        let output = std::env::temp_dir().join("chipmix-render-short-buffer.wav");
        let args = Args::parse_from([
            "chipmix-render",
            output.to_str().expect("utf-8 temp path"),
            "--buffer-ms",
            "10",
        ]);

        let err = render(&args).expect_err("10 ms cannot hold a 60 Hz frame");
        assert!(err.to_string().contains("10 ms buffer"), "{err}");
        assert!(!output.exists());
    }
}
