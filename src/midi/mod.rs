use std::fmt;

use crate::error::PitchError;

const MIDI_NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

const REF_NOTE: f64 = 69.0;
const REF_FREQ: f64 = 440.0;

/// 2^31, the scale of `pitch_fraction` before the half-semitone factor.
const FRACTION_BASE: f64 = 2_147_483_648.0;
/// 2^32, one full semitone in `pitch_fraction` units.
const FRACTION_SCALE: f64 = 4_294_967_296.0;

/// Root note and fine tune as stored in a `smpl` chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DevicePitch {
    pub unity_note: u32,
    pub pitch_fraction: u32,
}

impl DevicePitch {
    pub fn new(unity_note: u32, pitch_fraction: u32) -> Self {
        Self {
            unity_note,
            pitch_fraction,
        }
    }
}

impl fmt::Display for DevicePitch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.unity_note, self.pitch_fraction)
    }
}

pub fn note_to_freq(note: f64) -> f64 {
    REF_FREQ * 2f64.powf((note - REF_NOTE) / 12.0)
}

pub fn freq_to_note(freq: f64) -> Result<f64, PitchError> {
    if freq <= 0.0 || !freq.is_finite() {
        return Err(PitchError::Domain(freq));
    }
    Ok(REF_NOTE + 12.0 * (freq / REF_FREQ).log2())
}

pub fn device_to_note(pitch: DevicePitch) -> f64 {
    pitch.unity_note as f64 + pitch.pitch_fraction as f64 / FRACTION_BASE * 0.5
}

/// Splits a note number into unity note and fraction.
///
/// A fraction that rounds up to a whole semitone carries into the unity
/// note. Notes below zero or beyond `u32::MAX` are rejected.
pub fn note_to_device(note: f64) -> Result<DevicePitch, PitchError> {
    if !note.is_finite() || note < 0.0 {
        return Err(PitchError::OutOfRange(note));
    }

    let mut unity = note.floor();
    let mut fraction = ((note - unity) * FRACTION_SCALE).round();
    if fraction >= FRACTION_SCALE {
        unity += 1.0;
        fraction = 0.0;
    }

    if unity > u32::MAX as f64 {
        return Err(PitchError::OutOfRange(note));
    }

    Ok(DevicePitch::new(unity as u32, fraction as u32))
}

/// Nearest 12-TET note name, e.g. `A4` for 69.0.
pub fn note_name(note: f64) -> String {
    let midi_number = note.round() as i64;
    let note_index = midi_number.rem_euclid(12);
    let octave = midi_number.div_euclid(12) - 1;
    format!("{}{}", MIDI_NOTE_NAMES[note_index as usize], octave)
}
