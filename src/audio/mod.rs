use std::io::Cursor;

use hound::{SampleFormat, WavReader};

/// Decode WAV bytes into mono samples in `[-1, 1]`.
///
/// Returns the sample rate alongside the samples. Multichannel audio is
/// averaged down to one channel.
pub fn read_samples(bytes: &[u8]) -> Result<(u32, Vec<f32>), hound::Error> {
    let reader = WavReader::new(Cursor::new(bytes))?;
    let spec = reader.spec();

    let interleaved: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader.into_samples::<f32>().collect::<Result<_, _>>()?,
        SampleFormat::Int => {
            let scale = 1.0 / (1u64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|s| s as f32 * scale))
                .collect::<Result<_, _>>()?
        }
    };

    let channels = spec.channels.max(1) as usize;
    let samples = if channels == 1 {
        interleaved
    } else {
        interleaved
            .chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
            .collect()
    };

    Ok((spec.sample_rate, samples))
}
