//! Pitch estimation over a whole recording.
//!
//! The estimator produces one `(time, frequency, confidence)` frame per hop.
//! [`YinEstimator`] evaluates the YIN difference function, with the
//! correlation term computed through a real FFT.

use std::cmp::Ordering;

use log::debug;
use realfft::RealFftPlanner;
use rustfft::num_complex::Complex;

use crate::error::PitchError;

/// One analysis frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PitchFrame {
    /// Frame start in seconds
    pub time: f32,
    /// Estimated fundamental in Hz
    pub frequency: f32,
    /// 0.0 (unvoiced) to 1.0 (clean periodic signal)
    pub confidence: f32,
}

/// Produces a pitch track from mono samples.
pub trait PitchEstimator {
    fn predict(&self, samples: &[f32], sample_rate: u32) -> Result<Vec<PitchFrame>, PitchError>;
}

/// YIN tuning
#[derive(Debug, Clone)]
pub struct YinConfig {
    /// Frame length; the integration window is half of it
    pub frame_size: usize,
    pub hop_size: usize,
    pub min_freq: f32,
    pub max_freq: f32,
    /// Absolute threshold on the normalized difference
    pub threshold: f32,
}

impl Default for YinConfig {
    fn default() -> Self {
        Self {
            frame_size: 2048 * 2,
            hop_size: 512,
            min_freq: 32.70,
            max_freq: 1975.5,
            threshold: 0.15,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct YinEstimator {
    config: YinConfig,
}

impl YinEstimator {
    pub fn new(config: YinConfig) -> Self {
        Self { config }
    }

    /// Best lag and its normalized difference, if any lag is in range.
    fn best_lag(&self, cmnd: &[f32], min_tau: usize, max_tau: usize) -> Option<(f32, f32)> {
        if min_tau >= max_tau {
            return None;
        }

        let mut best = None;
        let mut tau = min_tau;
        while tau < max_tau {
            if cmnd[tau] < self.config.threshold {
                // Walk down to the bottom of this dip
                while tau + 1 < max_tau && cmnd[tau + 1] < cmnd[tau] {
                    tau += 1;
                }
                best = Some(tau);
                break;
            }
            tau += 1;
        }

        let best = best.or_else(|| {
            (min_tau..max_tau).min_by(|&a, &b| {
                cmnd[a].partial_cmp(&cmnd[b]).unwrap_or(Ordering::Equal)
            })
        })?;

        Some((parabolic_interpolation(cmnd, best), cmnd[best]))
    }
}

impl PitchEstimator for YinEstimator {
    fn predict(&self, samples: &[f32], sample_rate: u32) -> Result<Vec<PitchFrame>, PitchError> {
        if sample_rate == 0 {
            return Err(PitchError::InvalidSampleRate(sample_rate));
        }

        let frame_size = self.config.frame_size;
        let window = frame_size / 2;
        let rate = sample_rate as f32;
        let min_tau = ((rate / self.config.max_freq) as usize).max(2);
        let max_tau = ((rate / self.config.min_freq) as usize).min(window - 1);

        let mut planner = RealFftPlanner::<f32>::new();
        let forward = planner.plan_fft_forward(frame_size);
        let inverse = planner.plan_fft_inverse(frame_size);

        let mut frame_spectrum: Vec<Complex<f32>> = forward.make_output_vec();
        let mut head_spectrum: Vec<Complex<f32>> = forward.make_output_vec();
        let mut correlation = inverse.make_output_vec();
        let mut head = forward.make_input_vec();
        let mut buffer = forward.make_input_vec();
        let mut diff = vec![0.0f32; window];
        let mut cmnd = vec![0.0f32; window];

        let mut frames = Vec::new();
        let mut start = 0;
        loop {
            // Short input is zero-padded into a single frame
            let end = (start + frame_size).min(samples.len());
            buffer.fill(0.0);
            buffer[..end - start].copy_from_slice(&samples[start..end]);
            let frame = buffer.clone();

            // Cross-correlation of the first half against the whole frame
            head.fill(0.0);
            head[..window].copy_from_slice(&frame[..window]);
            forward
                .process(&mut buffer, &mut frame_spectrum)
                .map_err(|e| PitchError::Fft(e.to_string()))?;
            forward
                .process(&mut head, &mut head_spectrum)
                .map_err(|e| PitchError::Fft(e.to_string()))?;
            for (x, h) in frame_spectrum.iter_mut().zip(head_spectrum.iter()) {
                *x *= h.conj();
            }
            if let Some(first) = frame_spectrum.first_mut() {
                first.im = 0.0;
            }
            if let Some(last) = frame_spectrum.last_mut() {
                last.im = 0.0;
            }
            inverse
                .process(&mut frame_spectrum, &mut correlation)
                .map_err(|e| PitchError::Fft(e.to_string()))?;

            difference_function(&frame, &correlation, window, &mut diff);
            cumulative_mean_normalized_difference(&diff, &mut cmnd);

            if let Some((tau, value)) = self.best_lag(&cmnd, min_tau, max_tau) {
                frames.push(PitchFrame {
                    time: start as f32 / rate,
                    frequency: rate / tau,
                    confidence: (1.0 - value).clamp(0.0, 1.0),
                });
            }

            start += self.config.hop_size;
            if start + frame_size > samples.len() {
                break;
            }
        }

        debug!("yin: {} frames at {} Hz", frames.len(), sample_rate);
        Ok(frames)
    }
}

/// `d(tau) = sum (x[j] - x[j + tau])^2` over the first `window` samples,
/// expanded as `e(0) + e(tau) - 2 r(tau)`.
fn difference_function(frame: &[f32], correlation: &[f32], window: usize, diff: &mut [f32]) {
    let scale = 1.0 / frame.len() as f32;

    let mut prefix = vec![0.0f32; frame.len() + 1];
    for (i, x) in frame.iter().enumerate() {
        prefix[i + 1] = prefix[i] + x * x;
    }

    let head_energy = prefix[window];
    for (tau, d) in diff.iter_mut().enumerate() {
        let shifted_energy = prefix[tau + window] - prefix[tau];
        let r = correlation[tau] * scale;
        *d = (head_energy + shifted_energy - 2.0 * r).max(0.0);
    }
}

fn cumulative_mean_normalized_difference(diff: &[f32], cmnd: &mut [f32]) {
    cmnd[0] = 1.0;
    let mut running_sum = 0.0f32;

    for tau in 1..diff.len() {
        running_sum += diff[tau];
        cmnd[tau] = if running_sum > 0.0 {
            diff[tau] * tau as f32 / running_sum
        } else {
            1.0
        };
    }
}

/// Parabolic interpolation for sub-sample accuracy
fn parabolic_interpolation(cmnd: &[f32], tau: usize) -> f32 {
    if tau == 0 || tau + 1 >= cmnd.len() {
        return tau as f32;
    }

    let s0 = cmnd[tau - 1];
    let s1 = cmnd[tau];
    let s2 = cmnd[tau + 1];
    let adjustment = (s0 - s2) / (2.0 * (s0 - 2.0 * s1 + s2));

    if adjustment.is_finite() && adjustment.abs() < 1.0 {
        tau as f32 + adjustment
    } else {
        tau as f32
    }
}

/// Weighted median with linear interpolation between neighbouring values.
///
/// Each sorted value sits at position `(S_i - w_i / 2) / S` on the cumulative
/// weight axis; the result is read off at 0.5. Returns `None` when the total
/// weight is not positive.
pub fn weighted_median(values: &[f64], weights: &[f64]) -> Option<f64> {
    let mut pairs: Vec<(f64, f64)> = values
        .iter()
        .copied()
        .zip(weights.iter().copied())
        .filter(|(v, w)| v.is_finite() && w.is_finite() && *w > 0.0)
        .collect();
    if pairs.is_empty() {
        return None;
    }
    pairs.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));

    let total: f64 = pairs.iter().map(|(_, w)| w).sum();
    let mut cumulative = 0.0;
    let positions: Vec<f64> = pairs
        .iter()
        .map(|(_, w)| {
            cumulative += w;
            (cumulative - 0.5 * w) / total
        })
        .collect();

    if 0.5 <= positions[0] {
        return Some(pairs[0].0);
    }
    for i in 1..pairs.len() {
        if 0.5 <= positions[i] {
            let (p0, p1) = (positions[i - 1], positions[i]);
            let (v0, v1) = (pairs[i - 1].0, pairs[i].0);
            if p1 - p0 <= f64::EPSILON {
                return Some(v1);
            }
            return Some(v0 + (v1 - v0) * (0.5 - p0) / (p1 - p0));
        }
    }
    pairs.last().map(|(v, _)| *v)
}
