//! Zero-phase Butterworth filtering
//!
//! Filters are designed as cascaded biquad sections and applied
//! forward-backward, so the output carries no phase distortion. The
//! pipeline depends on this: carrier, tremor, and envelope must stay
//! time-aligned for the torque synthesis and velocity-error stages.

use serde::{Deserialize, Serialize};
use tremor_core::{TremorError, TremorResult};

/// Filter response type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterKind {
    /// Butterworth lowpass
    Low,
    /// Butterworth highpass
    High,
}

/// Zero-phase Butterworth design parameters
///
/// Constructed per call and immutable; designs are cheap enough that no
/// caching is warranted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FilterSpec {
    /// Cutoff frequency in Hz
    pub cutoff_hz: f64,
    /// Response type
    pub kind: FilterKind,
    /// Filter order
    pub order: usize,
}

impl FilterSpec {
    /// Lowpass spec with the default 4th order
    pub fn lowpass(cutoff_hz: f64) -> Self {
        Self {
            cutoff_hz,
            kind: FilterKind::Low,
            order: 4,
        }
    }

    /// Highpass spec with the default 4th order
    pub fn highpass(cutoff_hz: f64) -> Self {
        Self {
            cutoff_hz,
            kind: FilterKind::High,
            order: 4,
        }
    }

    /// Override the filter order
    pub fn with_order(mut self, order: usize) -> Self {
        self.order = order.max(1);
        self
    }

    /// Minimum signal length accepted by [`filtfilt`] for this spec.
    ///
    /// The forward-backward pass reflects `3 * (order + 1)` samples at
    /// each edge; shorter inputs cannot absorb the filter transient.
    pub fn pad_len(&self) -> usize {
        3 * (self.order + 1)
    }
}

/// Single second-order section in direct form II transposed
#[derive(Debug, Clone, Copy)]
struct Biquad {
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,
}

impl Biquad {
    /// Steady-state filter state for a unit-step input.
    ///
    /// Scaling this by the first sample removes the startup transient,
    /// matching the conventional filtfilt initialization.
    fn steady_state(&self) -> (f64, f64) {
        let gain = (self.b0 + self.b1 + self.b2) / (1.0 + self.a1 + self.a2);
        (gain - self.b0, self.b2 - self.a2 * gain)
    }

    /// Filter `data` in place with initial state scaled to `data[0]`
    fn apply(&self, data: &mut [f64]) {
        let (zi1, zi2) = self.steady_state();
        let x0 = data.first().copied().unwrap_or(0.0);
        let mut z1 = zi1 * x0;
        let mut z2 = zi2 * x0;

        for x in data.iter_mut() {
            let input = *x;
            let y = self.b0 * input + z1;
            z1 = self.b1 * input - self.a1 * y + z2;
            z2 = self.b2 * input - self.a2 * y;
            *x = y;
        }
    }
}

/// Design the biquad cascade for a Butterworth filter.
///
/// Analog prototype poles are paired into second-order sections (plus one
/// first-order section for odd orders) and mapped through the bilinear
/// transform with the cutoff pre-warped to `tan(pi * fc / fs)`.
fn design_sections(spec: &FilterSpec, fs: f64) -> TremorResult<Vec<Biquad>> {
    let nyquist = 0.5 * fs;
    if spec.cutoff_hz <= 0.0 || spec.cutoff_hz >= nyquist {
        return Err(TremorError::InvalidCutoff {
            cutoff_hz: spec.cutoff_hz,
            nyquist_hz: nyquist,
        });
    }

    let order = spec.order;
    let k = (std::f64::consts::PI * spec.cutoff_hz / fs).tan();
    let k2 = k * k;

    let mut sections = Vec::with_capacity(order / 2 + 1);

    for pair in 0..order / 2 {
        // Conjugate pole pair: s^2 + 2*sin(angle)*s + 1
        let two_c = 2.0 * (std::f64::consts::PI * (2 * pair + 1) as f64 / (2 * order) as f64).sin();
        let norm = 1.0 + two_c * k + k2;

        let (b0, b1, b2) = match spec.kind {
            FilterKind::Low => (k2 / norm, 2.0 * k2 / norm, k2 / norm),
            FilterKind::High => (1.0 / norm, -2.0 / norm, 1.0 / norm),
        };

        sections.push(Biquad {
            b0,
            b1,
            b2,
            a1: 2.0 * (k2 - 1.0) / norm,
            a2: (1.0 - two_c * k + k2) / norm,
        });
    }

    if order % 2 == 1 {
        // Remaining real pole: first-order section
        let norm = k + 1.0;
        let (b0, b1) = match spec.kind {
            FilterKind::Low => (k / norm, k / norm),
            FilterKind::High => (1.0 / norm, -1.0 / norm),
        };

        sections.push(Biquad {
            b0,
            b1,
            b2: 0.0,
            a1: (k - 1.0) / norm,
            a2: 0.0,
        });
    }

    Ok(sections)
}

/// Apply a Butterworth filter forward and backward (zero phase).
///
/// The input is extended at both ends with odd reflections before
/// filtering, then the extension is stripped, so the output has exactly
/// the input length.
pub fn filtfilt(spec: &FilterSpec, signal: &[f64], fs: f64) -> TremorResult<Vec<f64>> {
    let sections = design_sections(spec, fs)?;

    let pad = spec.pad_len();
    if signal.len() <= pad {
        return Err(TremorError::SignalTooShort {
            len: signal.len(),
            min_len: pad,
        });
    }

    let n = signal.len();
    let first = signal[0];
    let last = signal[n - 1];

    // Odd reflection: 2*x[edge] - x[mirrored]
    let mut extended = Vec::with_capacity(n + 2 * pad);
    for i in (1..=pad).rev() {
        extended.push(2.0 * first - signal[i]);
    }
    extended.extend_from_slice(signal);
    for i in (1..=pad).rev() {
        extended.push(2.0 * last - signal[n - 1 - i]);
    }

    for section in &sections {
        section.apply(&mut extended);
    }
    extended.reverse();
    for section in &sections {
        section.apply(&mut extended);
    }
    extended.reverse();

    let filtered: Vec<f64> = extended[pad..pad + n].to_vec();

    if filtered.iter().any(|v| !v.is_finite()) {
        return Err(TremorError::NonFiniteOutput {
            stage: "zero-phase filter",
        });
    }

    Ok(filtered)
}

/// Zero-phase band-pass as a highpass/lowpass cascade
pub fn band_pass(
    signal: &[f64],
    low_hz: f64,
    high_hz: f64,
    fs: f64,
    order: usize,
) -> TremorResult<Vec<f64>> {
    if low_hz >= high_hz {
        return Err(TremorError::InvalidCutoff {
            cutoff_hz: low_hz,
            nyquist_hz: high_hz,
        });
    }

    let highpassed = filtfilt(&FilterSpec::highpass(low_hz).with_order(order), signal, fs)?;
    filtfilt(
        &FilterSpec::lowpass(high_hz).with_order(order),
        &highpassed,
        fs,
    )
}
