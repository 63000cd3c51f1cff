//! Envelope estimation for the tremor component
//!
//! Two strategies exist and are not interchangeable: batch analysis uses
//! the moving-RMS envelope, live sessions use the Hilbert (analytic
//! signal) magnitude. Their numeric outputs diverge, so the caller picks
//! one explicitly.

use rustfft::{num_complex::Complex, FftPlanner};
use serde::{Deserialize, Serialize};
use tremor_core::{TremorError, TremorResult};

/// Envelope estimation strategy, selected per call site
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum EnvelopeMethod {
    /// Centered moving RMS with the window given in milliseconds
    MovingRms { window_ms: f64 },
    /// Analytic-signal magnitude via the Hilbert transform
    Hilbert,
}

impl EnvelopeMethod {
    /// Apply the strategy to a tremor component
    pub fn apply(&self, signal: &[f64], fs: f64) -> TremorResult<Vec<f64>> {
        match self {
            EnvelopeMethod::MovingRms { window_ms } => {
                Ok(moving_rms(signal, window_samples_from_ms(*window_ms, fs)))
            }
            EnvelopeMethod::Hilbert => hilbert_envelope(signal),
        }
    }
}

/// Convert a window duration in milliseconds to a sample count, truncated
/// and clamped to at least one sample.
pub fn window_samples_from_ms(window_ms: f64, fs: f64) -> usize {
    ((window_ms / 1000.0 * fs) as usize).max(1)
}

/// Moving RMS envelope: square, centered uniform convolution, square root.
///
/// The convolution is same-length with the averaging window centered on
/// each output sample, matching a `mode='same'` uniform-kernel convolve.
/// Edges are zero-padded, so the divisor stays the full window length.
pub fn moving_rms(signal: &[f64], window_samples: usize) -> Vec<f64> {
    let n = signal.len();
    let w = window_samples.max(1);
    if n == 0 {
        return Vec::new();
    }

    // Prefix sums of the squared signal
    let mut cumulative = Vec::with_capacity(n + 1);
    cumulative.push(0.0);
    for &x in signal {
        cumulative.push(cumulative.last().unwrap() + x * x);
    }

    let offset = (w - 1) / 2;
    (0..n)
        .map(|i| {
            let hi = (i + offset + 1).min(n);
            let lo = (i + offset + 1).saturating_sub(w);
            let sum = cumulative[hi] - cumulative[lo];
            (sum / w as f64).sqrt()
        })
        .collect()
}

/// Instantaneous amplitude via the analytic signal.
///
/// The analytic signal is built in the frequency domain: negative
/// frequencies are zeroed, positive frequencies doubled, then the inverse
/// FFT magnitude gives the envelope.
pub fn hilbert_envelope(signal: &[f64]) -> TremorResult<Vec<f64>> {
    let n = signal.len();
    if n == 0 {
        return Ok(Vec::new());
    }

    let mut planner = FftPlanner::<f64>::new();
    let forward = planner.plan_fft_forward(n);
    let inverse = planner.plan_fft_inverse(n);

    let mut buffer: Vec<Complex<f64>> = signal.iter().map(|&x| Complex::new(x, 0.0)).collect();
    forward.process(&mut buffer);

    // Analytic-signal multiplier: keep DC (and Nyquist for even n),
    // double the positive band, zero the negative band.
    if n % 2 == 0 {
        for value in buffer.iter_mut().take(n / 2).skip(1) {
            *value *= 2.0;
        }
        for value in buffer.iter_mut().skip(n / 2 + 1) {
            *value = Complex::new(0.0, 0.0);
        }
    } else {
        for value in buffer.iter_mut().take(n / 2 + 1).skip(1) {
            *value *= 2.0;
        }
        for value in buffer.iter_mut().skip(n / 2 + 1) {
            *value = Complex::new(0.0, 0.0);
        }
    }

    inverse.process(&mut buffer);

    let scale = 1.0 / n as f64;
    let envelope: Vec<f64> = buffer.iter().map(|c| (c * scale).norm()).collect();

    if envelope.iter().any(|v| !v.is_finite()) {
        return Err(TremorError::NonFiniteOutput {
            stage: "hilbert envelope",
        });
    }

    Ok(envelope)
}
