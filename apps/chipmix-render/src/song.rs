//! Built-in demo pattern: a looping 16-row phrase with lead, harmony, bass
//! and a noise hi-hat.

use chipmix_core::AudioChannel;

use crate::psg::{Pan, Psg};

/// Frames each row plays for.
pub const FRAMES_PER_ROW: u32 = 7;

/// Equal-tempered pitch of a MIDI note number.
fn note_hz(note: u8) -> f32 {
    440.0 * 2f32.powf((f32::from(note) - 69.0) / 12.0)
}

#[derive(Debug, Clone, Copy)]
struct Row {
    lead: Option<u8>,
    harmony: Option<u8>,
    bass: Option<u8>,
    hat: bool,
}

const fn row(lead: u8, harmony: u8, bass: u8, hat: bool) -> Row {
    Row {
        lead: if lead == 0 { None } else { Some(lead) },
        harmony: if harmony == 0 { None } else { Some(harmony) },
        bass: if bass == 0 { None } else { Some(bass) },
        hat,
    }
}

/// Zero leaves the voice silent for the row.
const PATTERN: [Row; 16] = [
    row(76, 64, 45, true),
    row(0, 0, 0, false),
    row(79, 67, 45, true),
    row(76, 64, 0, false),
    row(74, 65, 50, true),
    row(0, 0, 0, false),
    row(72, 64, 50, true),
    row(74, 65, 0, true),
    row(76, 67, 48, true),
    row(0, 0, 0, false),
    row(79, 71, 48, true),
    row(81, 72, 0, false),
    row(79, 71, 43, true),
    row(76, 67, 0, true),
    row(74, 65, 43, true),
    row(0, 0, 0, true),
];

#[derive(Debug)]
pub struct Song {
    clock_rate: u32,
    row: usize,
    frame_in_row: u32,
}

impl Song {
    pub fn new(clock_rate: u32, psg: &mut Psg) -> Self {
        psg.set_pan(AudioChannel::Square1, Pan::CENTER);
        psg.set_pan(AudioChannel::Square2, Pan::LEFT);
        psg.set_pan(AudioChannel::Square3, Pan::CENTER);
        psg.set_pan(AudioChannel::Noise, Pan::RIGHT);
        Self {
            clock_rate,
            row: 0,
            frame_in_row: 0,
        }
    }

    /// Program `psg` for the next frame.
    pub fn tick(&mut self, psg: &mut Psg) {
        let current = PATTERN[self.row];
        let decay = u8::try_from(self.frame_in_row).unwrap_or(u8::MAX);

        if self.frame_in_row == 0 {
            self.trigger(psg, AudioChannel::Square1, current.lead, 2);
            self.trigger(psg, AudioChannel::Square2, current.harmony, 5);
            self.trigger(psg, AudioChannel::Square3, current.bass, 3);
        }

        if current.hat {
            psg.set_noise(0x10, decay.saturating_mul(3).saturating_add(4));
        } else {
            psg.set_noise(0, 15);
        }

        self.frame_in_row += 1;
        if self.frame_in_row == FRAMES_PER_ROW {
            self.frame_in_row = 0;
            self.row = (self.row + 1) % PATTERN.len();
        }
    }

    /// Row currently playing.
    pub fn row(&self) -> usize {
        self.row
    }

    fn trigger(&self, psg: &mut Psg, channel: AudioChannel, note: Option<u8>, attenuation: u8) {
        match note {
            Some(note) => psg.set_tone(
                channel,
                Psg::period_for(self.clock_rate, note_hz(note)),
                attenuation,
            ),
            None => psg.set_tone(channel, 0, 15),
        }
    }
}
