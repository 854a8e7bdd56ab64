use chipmix_blip::{BlipBuf, TrebleEq};
use tracing::{debug, warn};

use crate::audio::{
    AccumulationBuffer, AudioChannel, BusId, CLOCK_NTSC, ChannelArray, ChannelState, ChipId,
    ChipSet, FilterSettings, LevelLaw, LevelTable, MixBus, MixerSettings, RoutingTable, Side,
    StereoLevel,
};
use crate::error::{MixerError, Result};

/// Band-limited stereo mixdown of per-channel chip amplitudes.
///
/// Producers call [`add_value`](Self::add_value) whenever a channel's output
/// may have changed, close each frame with
/// [`finish_buffer`](Self::finish_buffer) and then drain PCM through
/// [`read_buffer`](Self::read_buffer). Only amplitude *changes* reach the
/// buffers; an unchanged value never emits an impulse.
///
/// Alongside the audio path every channel carries a decaying peak meter
/// that a UI can poll through [`channel_output`](Self::channel_output).
#[derive(Debug)]
pub struct Mixer<B: AccumulationBuffer = BlipBuf> {
    left: B,
    right: B,
    channels: ChannelArray<ChannelState>,
    buses: [MixBus; BusId::COUNT],
    routing: RoutingTable,
    levels: LevelTable,
    enabled_chips: ChipSet,
    filter: FilterSettings,
    clock_rate: u32,
    sample_rate: u32,
    output_channels: u8,
    allocated: bool,
}

impl Mixer<BlipBuf> {
    /// SN76489 mixer on [`BlipBuf`] buffers with the default routing.
    pub fn new() -> Self {
        Self::with_buffers(
            BlipBuf::default(),
            BlipBuf::default(),
            LevelTable::SN76489,
            RoutingTable::default(),
        )
    }
}

impl Default for Mixer<BlipBuf> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: AccumulationBuffer> Mixer<B> {
    pub fn with_buffers(left: B, right: B, levels: LevelTable, routing: RoutingTable) -> Self {
        Self {
            left,
            right,
            channels: [ChannelState::default(); AudioChannel::COUNT],
            buses: BusId::ALL.map(MixBus::new),
            routing,
            levels,
            enabled_chips: ChipSet::default(),
            filter: FilterSettings::default(),
            clock_rate: CLOCK_NTSC,
            sample_rate: 0,
            output_channels: 2,
            allocated: false,
        }
    }

    /// Size both buffers for `sample_rate` Hz output holding `length_ms` of
    /// audio, then push the current clock rate and filters into them.
    ///
    /// On failure the mixer stays unallocated and ignores
    /// [`add_value`](Self::add_value) / [`finish_buffer`](Self::finish_buffer)
    /// until a later call succeeds.
    pub fn allocate_buffers(
        &mut self,
        length_ms: u32,
        sample_rate: u32,
        channel_count: u8,
    ) -> Result<()> {
        if !(1..=2).contains(&channel_count) {
            return Err(MixerError::InvalidChannelCount(channel_count));
        }

        self.allocated = false;
        let clock_rate = self.clock_rate;
        let sized = self
            .left
            .set_clock_rate(clock_rate)
            .and_then(|()| self.right.set_clock_rate(clock_rate))
            .and_then(|()| self.left.set_sample_rate(sample_rate, length_ms))
            .and_then(|()| self.right.set_sample_rate(sample_rate, length_ms));
        if let Err(source) = sized {
            warn!(sample_rate, length_ms, %source, "audio buffer allocation failed");
            return Err(MixerError::Allocation {
                sample_rate,
                length_ms,
                source,
            });
        }

        self.sample_rate = sample_rate;
        self.output_channels = channel_count;
        self.allocated = true;
        debug!(sample_rate, length_ms, channel_count, "audio buffers allocated");

        self.push_filter_settings();
        Ok(())
    }

    /// Propagate the emulated chip clock (e.g. NTSC vs PAL) to both buffers.
    ///
    /// A rate the buffers cannot resample (zero, or more than 2^20 clocks
    /// per output sample) is ignored with a warning.
    pub fn set_clock_rate(&mut self, clock_rate: u32) {
        let applied = self
            .left
            .set_clock_rate(clock_rate)
            .and_then(|()| self.right.set_clock_rate(clock_rate));
        if let Err(source) = applied {
            warn!(clock_rate, %source, "ignoring unusable clock rate");
            return;
        }
        self.clock_rate = clock_rate;
        debug!(clock_rate, "clock rate updated");
    }

    /// Recompute attenuation and push bass, treble and volume into every
    /// enabled bus and the buffers behind it. Repeating a call with the same
    /// arguments reproduces the same configuration.
    pub fn update_filter_settings(
        &mut self,
        low_cut_hz: u32,
        high_cut_hz: u32,
        high_damp_db: u32,
        overall_volume: f32,
    ) {
        self.filter = FilterSettings {
            low_cut_hz,
            high_cut_hz,
            high_damp_db,
            overall_volume,
        };
        self.push_filter_settings();
    }

    /// Replace the set of enabled chip families and refresh the filters so
    /// attenuation follows the new count.
    pub fn set_enabled_chips(&mut self, chips: ChipSet) {
        self.enabled_chips = chips;
        debug!(?chips, "enabled chips changed");
        self.push_filter_settings();
    }

    /// Headroom factor shared by every enabled bus.
    ///
    /// Each bus peaks below full scale on its own, so dividing by the number
    /// of enabled buses keeps their sum from clipping.
    pub fn attenuation(&self) -> f32 {
        let active = BusId::ALL
            .iter()
            .filter(|bus| self.enabled_chips.contains(bus.flag()))
            .count();
        1.0 / active.max(1) as f32
    }

    pub fn set_chip_level(&mut self, bus: BusId, which: StereoLevel, level: f32) {
        self.buses[bus.idx()].set_level(which, level);
    }

    /// Allocate, clock and filter in one step.
    pub fn apply_settings(&mut self, settings: &MixerSettings) -> Result<()> {
        self.set_clock_rate(settings.clock_rate);
        self.enabled_chips = settings.enabled_chips;
        self.filter = settings.filter;
        for bus in BusId::ALL {
            let levels = settings.stereo[bus.idx()];
            let mixbus = &mut self.buses[bus.idx()];
            mixbus.set_level(StereoLevel::Left, levels.left);
            mixbus.set_level(StereoLevel::Right, levels.right);
            mixbus.set_level(StereoLevel::Separation, levels.separation);
        }
        self.allocate_buffers(
            settings.buffer_length_ms,
            settings.sample_rate,
            settings.channel_count,
        )
    }

    /// Feed one channel's amplitude at `cycle` clocks into the current frame.
    ///
    /// `cycle` must not decrease between calls within a frame.
    pub fn add_value(
        &mut self,
        channel: AudioChannel,
        chip: ChipId,
        left: i32,
        right: i32,
        cycle: u32,
    ) {
        if !self.allocated {
            warn!(?channel, "add_value on unallocated mixer ignored");
            return;
        }

        let (l, r) = (f64::from(left), f64::from(right));
        let magnitude = ((l * l + r * r) / 2.0).sqrt() as i32;
        self.store_channel_level(channel, magnitude);

        let bus = self
            .routing
            .route(chip, channel)
            .filter(|bus| self.enabled_chips.contains(bus.flag()))
            .map(|bus| &self.buses[bus.idx()]);
        let state = &mut self.channels[channel.idx()];

        let delta = i64::from(left) - i64::from(state.last_left);
        if delta != 0 {
            state.last_left = left;
            if let Some(bus) = bus {
                bus.add_delta(Side::Left, cycle, delta, &mut self.left, &mut self.right);
            }
        }

        let delta = i64::from(right) - i64::from(state.last_right);
        if delta != 0 {
            state.last_right = right;
            if let Some(bus) = bus {
                bus.add_delta(Side::Right, cycle, delta, &mut self.left, &mut self.right);
            }
        }
    }

    /// Raise a channel's meter from a raw amplitude.
    pub fn store_channel_level(&mut self, channel: AudioChannel, value: i32) {
        let magnitude = i32::try_from(value.unsigned_abs()).unwrap_or(i32::MAX);
        let level = match self.routing.level_law(channel) {
            LevelLaw::Quantized => f32::from(self.levels.level_for(magnitude)),
            LevelLaw::Linear => magnitude as f32,
        };
        self.channels[channel.idx()].raise(level);
    }

    /// Close the frame after `frame_cycles` clocks, advance every meter by
    /// one frame, and return the stereo sample pairs now available.
    ///
    /// Undrained audio is bounded: once the buffers could not take another
    /// frame of the same length, the oldest samples are dropped from both
    /// sides alike.
    pub fn finish_buffer(&mut self, frame_cycles: u32) -> usize {
        if !self.allocated {
            warn!(frame_cycles, "finish_buffer on unallocated mixer ignored");
            return 0;
        }

        let mut dropped = self
            .left
            .end_frame(frame_cycles)
            .max(self.right.end_frame(frame_cycles));

        let frame = self.count_samples(frame_cycles);
        let capacity = self.buffer_capacity();
        if frame < capacity {
            let room = capacity - frame;
            let excess = self.samples_available().saturating_sub(room);
            self.left.discard_samples(excess);
            self.right.discard_samples(excess);
            dropped += excess;
        }
        if dropped > 0 {
            warn!(dropped, capacity, "audio buffers full, oldest samples dropped");
        }

        for state in &mut self.channels {
            state.fall_off();
        }

        self.samples_available()
    }

    /// Drain up to `max_samples` samples per side into `out`.
    ///
    /// Stereo output is interleaved left/right and the returned count covers
    /// both sides. Mono output carries the left buffer; the right one is
    /// drained in step so both stay aligned. Never waits for more data.
    pub fn read_buffer(&mut self, max_samples: usize, out: &mut [i16], stereo: bool) -> usize {
        if stereo {
            let frames = max_samples
                .min(out.len() / 2)
                .min(self.samples_available());
            if frames == 0 {
                return 0;
            }
            let out = &mut out[..frames * 2];
            let left = self.left.read_samples(out, true);
            let right = self.right.read_samples(&mut out[1..], true);
            left + right
        } else {
            let count = max_samples.min(out.len());
            let read = self.left.read_samples(&mut out[..count], false);
            self.right.discard_samples(read);
            read
        }
    }

    /// Stereo pairs ready to read.
    pub fn samples_available(&self) -> usize {
        self.left.samples_avail().min(self.right.samples_avail())
    }

    /// Samples each side holds at most.
    pub fn buffer_capacity(&self) -> usize {
        self.left.capacity().min(self.right.capacity())
    }

    /// Samples a frame of `time` clocks would produce.
    pub fn count_samples(&self, time: u32) -> usize {
        self.left.count_samples(time)
    }

    /// Output samples spanned by `time` chip clocks.
    pub fn resample_duration(&self, time: u32) -> usize {
        self.left.resampled_duration(time)
    }

    /// Silence both buffers (transport stop or seek).
    ///
    /// Every channel's last amplitudes return to zero with them, so the next
    /// value a channel reports is emitted as a full step from silence.
    pub fn clear_buffers(&mut self) {
        self.left.clear();
        self.right.clear();
        for state in &mut self.channels {
            state.last_left = 0;
            state.last_right = 0;
        }
        debug!("audio buffers cleared");
    }

    pub fn clear_channel_levels(&mut self) {
        for state in &mut self.channels {
            state.clear_level();
        }
    }

    /// Clear buffers and meters, returning every channel to its initial state.
    pub fn reset(&mut self) {
        self.clear_buffers();
        self.clear_channel_levels();
    }

    /// Metered level of `channel`, truncated.
    pub fn channel_output(&self, channel: AudioChannel) -> i32 {
        self.channels[channel.idx()].level() as i32
    }

    pub fn channel_state(&self, channel: AudioChannel) -> &ChannelState {
        &self.channels[channel.idx()]
    }

    pub fn bus(&self, bus: BusId) -> &MixBus {
        &self.buses[bus.idx()]
    }

    pub fn routing(&self) -> &RoutingTable {
        &self.routing
    }

    pub fn filter_settings(&self) -> FilterSettings {
        self.filter
    }

    pub fn enabled_chips(&self) -> ChipSet {
        self.enabled_chips
    }

    pub fn clock_rate(&self) -> u32 {
        self.clock_rate
    }

    /// Output rate, or zero before the first successful allocation.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn output_channels(&self) -> u8 {
        self.output_channels
    }

    pub fn is_allocated(&self) -> bool {
        self.allocated
    }

    fn push_filter_settings(&mut self) {
        let FilterSettings {
            low_cut_hz,
            high_cut_hz,
            high_damp_db,
            overall_volume,
        } = self.filter;
        let volume = overall_volume * self.attenuation();
        let eq = TrebleEq::new(-f64::from(high_damp_db), high_cut_hz);

        self.left.set_bass_freq(low_cut_hz);
        self.right.set_bass_freq(low_cut_hz);
        self.left.set_treble_eq(eq);
        self.right.set_treble_eq(eq);

        for bus in &mut self.buses {
            if self.enabled_chips.contains(bus.id().flag()) {
                bus.configure(volume, eq);
            }
        }

        debug!(
            low_cut_hz,
            high_cut_hz,
            high_damp_db,
            overall_volume,
            volume,
            "filter settings pushed"
        );
    }
}
