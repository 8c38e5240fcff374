//! Pitch values as given on the command line.
//!
//! A pitch can be written four ways:
//!
//! - a 12-TET note with optional cents: `C3`, `A#4`, `Db2+25`
//! - a frequency: `654.32Hz`
//! - a raw `smpl` unity note / pitch fraction pair: `60,134217728`
//! - `crepe`: detect the pitch from the audio itself
//!
//! All of them resolve to a note number, a frequency and a [`DevicePitch`].

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;

use crate::analyzer::{weighted_median, PitchEstimator};
use crate::error::PitchError;
use crate::midi::{
    device_to_note, freq_to_note, note_name, note_to_device, note_to_freq, DevicePitch,
};

const NOTE_NAME_PATTERN: &str = r"^([A-Ga-g])([#b]?)(-?\d+)(?:([+-])(\d+))?$";
const HERTZ_PATTERN: &str = r"(?i)^((?:\d*\.)?\d+)hz$";
const DEVICE_PATTERN: &str = r"^(\d+),(\d+)$";
const DETECT_KEYWORD: &str = "crepe";

static NOTE_NAME_REGEX: OnceLock<Regex> = OnceLock::new();
static HERTZ_REGEX: OnceLock<Regex> = OnceLock::new();
static DEVICE_REGEX: OnceLock<Regex> = OnceLock::new();

fn note_name_regex() -> &'static Regex {
    NOTE_NAME_REGEX.get_or_init(|| Regex::new(NOTE_NAME_PATTERN).expect("invalid regex pattern"))
}

fn hertz_regex() -> &'static Regex {
    HERTZ_REGEX.get_or_init(|| Regex::new(HERTZ_PATTERN).expect("invalid regex pattern"))
}

fn device_regex() -> &'static Regex {
    DEVICE_REGEX.get_or_init(|| Regex::new(DEVICE_PATTERN).expect("invalid regex pattern"))
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Pitch {
    /// Note number from a note name
    Note(f64),
    /// Frequency in Hz
    Hertz(f64),
    /// Raw `smpl` pair
    Device(DevicePitch),
    /// Detected frequency, `None` until [`Pitch::detect`] has run
    Detected(Option<f64>),
}

impl Pitch {
    /// Try each notation in turn: note name, Hz, device pair, detection.
    pub fn parse(text: &str) -> Result<Self, PitchError> {
        let parsers: [fn(&str) -> Option<Self>; 4] = [
            Self::parse_note_name,
            Self::parse_hertz,
            Self::parse_device,
            Self::parse_detected,
        ];
        parsers
            .iter()
            .find_map(|parse| parse(text))
            .ok_or_else(|| PitchError::InvalidPitchSpec(text.to_string()))
    }

    fn parse_note_name(text: &str) -> Option<Self> {
        let caps = note_name_regex().captures(text)?;

        let base = match caps[1].to_ascii_uppercase().as_str() {
            "C" => 0,
            "D" => 2,
            "E" => 4,
            "F" => 5,
            "G" => 7,
            "A" => 9,
            "B" => 11,
            _ => return None,
        };
        let accidental = match &caps[2] {
            "#" => 1,
            "b" => -1,
            _ => 0,
        };
        let octave: i64 = caps[3].parse().ok()?;
        let cents = match (caps.get(4), caps.get(5)) {
            (Some(sign), Some(amount)) => {
                let amount: f64 = amount.as_str().parse::<u32>().ok()? as f64;
                if sign.as_str() == "-" {
                    -amount
                } else {
                    amount
                }
            }
            _ => 0.0,
        };

        let semitone = base + accidental + (octave.checked_add(1)?).checked_mul(12)?;
        Some(Self::Note(semitone as f64 + cents * 0.01))
    }

    fn parse_hertz(text: &str) -> Option<Self> {
        let caps = hertz_regex().captures(text)?;
        caps[1].parse().ok().map(Self::Hertz)
    }

    fn parse_device(text: &str) -> Option<Self> {
        let caps = device_regex().captures(text)?;
        let unity_note = caps[1].parse().ok()?;
        let pitch_fraction = caps[2].parse().ok()?;
        Some(Self::Device(DevicePitch::new(unity_note, pitch_fraction)))
    }

    fn parse_detected(text: &str) -> Option<Self> {
        text.eq_ignore_ascii_case(DETECT_KEYWORD)
            .then_some(Self::Detected(None))
    }

    pub fn note(&self) -> Result<f64, PitchError> {
        match *self {
            Self::Note(note) => Ok(note),
            Self::Hertz(freq) | Self::Detected(Some(freq)) => freq_to_note(freq),
            Self::Device(pitch) => Ok(device_to_note(pitch)),
            Self::Detected(None) => Err(PitchError::DetectionPrecondition),
        }
    }

    pub fn freq(&self) -> Result<f64, PitchError> {
        match *self {
            Self::Hertz(freq) | Self::Detected(Some(freq)) => Ok(freq),
            Self::Detected(None) => Err(PitchError::DetectionPrecondition),
            _ => self.note().map(note_to_freq),
        }
    }

    pub fn device_pitch(&self) -> Result<DevicePitch, PitchError> {
        match *self {
            Self::Device(pitch) => Ok(pitch),
            _ => note_to_device(self.note()?),
        }
    }

    /// Whether this pitch still has to be detected from audio.
    pub fn needs_detection(&self) -> bool {
        matches!(self, Self::Detected(None))
    }

    /// Resolve a detection request against mono `samples`.
    ///
    /// Every frame is converted to a note number and the confidence-weighted
    /// median of those notes becomes the pitch. Other variants are returned
    /// unchanged.
    pub fn detect(
        &self,
        estimator: &dyn PitchEstimator,
        samples: &[f32],
        sample_rate: u32,
    ) -> Result<Self, PitchError> {
        if !matches!(self, Self::Detected(_)) {
            return Ok(*self);
        }

        let frames = estimator.predict(samples, sample_rate)?;
        let (notes, weights): (Vec<f64>, Vec<f64>) = frames
            .iter()
            .filter_map(|frame| {
                let note = freq_to_note(frame.frequency as f64).ok()?;
                Some((note, frame.confidence as f64))
            })
            .unzip();

        let note = weighted_median(&notes, &weights).ok_or(PitchError::NoPitchDetected)?;
        Ok(Self::Detected(Some(note_to_freq(note))))
    }
}

impl FromStr for Pitch {
    type Err = PitchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Pitch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Pitch::Detected(None) = self {
            return write!(f, "detect (unresolved)");
        }
        let (note, freq) = match (self.note(), self.freq()) {
            (Ok(note), Ok(freq)) => (note, freq),
            (Err(e), _) | (_, Err(e)) => return write!(f, "{e}"),
        };
        write!(
            f,
            "note: {note:.3} ({}) / freq: {freq:.3}Hz / smpl: ",
            note_name(note)
        )?;
        match self.device_pitch() {
            Ok(pitch) => write!(f, "{pitch}"),
            Err(_) => write!(f, "out of range"),
        }
    }
}
