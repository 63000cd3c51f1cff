//! Carrier/tremor decomposition and hybrid-replay torque synthesis

use crate::envelope::{moving_rms, window_samples_from_ms};
use crate::filter::{filtfilt, FilterSpec};
use serde::{Deserialize, Serialize};
use tremor_core::{Recording, TremorError, TremorResult};

/// Decomposition and torque-synthesis parameters
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DecomposeParams {
    /// Carrier lowpass cutoff in Hz
    pub low_cut_hz: f64,
    /// Tremor highpass cutoff in Hz
    pub high_cut_hz: f64,
    /// RMS envelope window in milliseconds
    pub envelope_window_ms: f64,
    /// Tremor re-injection gain
    pub alpha: f64,
    /// Global torque gain
    pub gain: f64,
}

impl Default for DecomposeParams {
    fn default() -> Self {
        Self {
            low_cut_hz: 1.5,
            high_cut_hz: 3.0,
            envelope_window_ms: 200.0,
            alpha: 1.0,
            gain: 1.0,
        }
    }
}

/// Derived signal bundle, every series aligned sample-for-sample with the
/// input angle.
///
/// Raw-domain and centered-domain variants are both retained: the
/// centered view feeds normalized visualization and model input, the raw
/// view keeps physical scaling for hardware output. They are computed
/// independently because mean subtraction and the filter's edge handling
/// do not commute.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decomposition {
    /// Mean-centered angle
    #[serde(rename = "centeredAngle")]
    pub centered: Vec<f64>,
    /// Low-frequency carrier of the raw angle
    #[serde(rename = "baseAngle")]
    pub carrier: Vec<f64>,
    /// Low-frequency carrier of the centered angle
    #[serde(rename = "centeredBaseAngle")]
    pub carrier_centered: Vec<f64>,
    /// High-frequency tremor component of the raw angle
    pub tremor: Vec<f64>,
    /// High-frequency tremor component of the centered angle
    #[serde(rename = "centeredTremor")]
    pub tremor_centered: Vec<f64>,
    /// Moving-RMS envelope of the raw tremor
    pub envelope: Vec<f64>,
    /// Moving-RMS envelope of the centered tremor
    #[serde(rename = "centeredEnvelope")]
    pub envelope_centered: Vec<f64>,
    /// Composite torque, raw domain
    pub torque: Vec<f64>,
    /// Composite torque, centered domain
    #[serde(rename = "centeredTorque")]
    pub torque_centered: Vec<f64>,
    /// Unscaled hybrid replay signal (torque without the global gain)
    #[serde(rename = "hybridReplay")]
    pub replay: Vec<f64>,
    /// Unscaled hybrid replay, centered domain
    #[serde(rename = "hybridReplayCentered")]
    pub replay_centered: Vec<f64>,
    /// Angular velocity of the raw angle
    pub velocity: Vec<f64>,
    /// Angular velocity of the centered carrier
    #[serde(rename = "carrierVelocity")]
    pub carrier_velocity: Vec<f64>,
    /// velocity - carrier_velocity
    #[serde(rename = "vel_err")]
    pub velocity_error: Vec<f64>,
    /// carrier_centered - centered
    #[serde(rename = "position_error")]
    pub position_error: Vec<f64>,
    /// Envelope-modulated centered tremor
    #[serde(rename = "env_tremor")]
    pub env_tremor: Vec<f64>,
}

/// Central-difference derivative with one-sided differences at the ends
pub fn gradient(signal: &[f64], dx: f64) -> Vec<f64> {
    let n = signal.len();
    if n < 2 {
        return vec![0.0; n];
    }

    let mut out = Vec::with_capacity(n);
    out.push((signal[1] - signal[0]) / dx);
    for i in 1..n - 1 {
        out.push((signal[i + 1] - signal[i - 1]) / (2.0 * dx));
    }
    out.push((signal[n - 1] - signal[n - 2]) / dx);
    out
}

fn ensure_finite(series: &[f64], stage: &'static str) -> TremorResult<()> {
    if series.iter().any(|v| !v.is_finite()) {
        Err(TremorError::NonFiniteOutput { stage })
    } else {
        Ok(())
    }
}

/// Decompose an angle time series into carrier, tremor, envelope, and
/// composite torque, in both raw and centered domains.
pub fn decompose(theta: &[f64], fs: f64, params: &DecomposeParams) -> TremorResult<Decomposition> {
    ensure_finite(theta, "input angle")?;

    let n = theta.len();
    let mean = theta.iter().sum::<f64>() / n.max(1) as f64;
    let centered: Vec<f64> = theta.iter().map(|v| v - mean).collect();

    let lowpass = FilterSpec::lowpass(params.low_cut_hz);
    let highpass = FilterSpec::highpass(params.high_cut_hz);

    // Raw and centered carriers are filtered independently; the filter's
    // edge handling interacts with the constant offset, so one cannot be
    // reconstructed from the other.
    let carrier = filtfilt(&lowpass, theta, fs)?;
    let carrier_centered = filtfilt(&lowpass, &centered, fs)?;
    let tremor = filtfilt(&highpass, theta, fs)?;
    let tremor_centered = filtfilt(&highpass, &centered, fs)?;

    let window = window_samples_from_ms(params.envelope_window_ms, fs);
    let envelope = moving_rms(&tremor, window);
    let envelope_centered = moving_rms(&tremor_centered, window);

    let dt = 1.0 / fs;
    let velocity = gradient(theta, dt);
    let carrier_velocity = gradient(&carrier_centered, dt);
    let velocity_error: Vec<f64> = velocity
        .iter()
        .zip(&carrier_velocity)
        .map(|(v, c)| v - c)
        .collect();
    let position_error: Vec<f64> = carrier_centered
        .iter()
        .zip(&centered)
        .map(|(c, x)| c - x)
        .collect();

    let env_tremor: Vec<f64> = envelope_centered
        .iter()
        .zip(&tremor_centered)
        .map(|(e, t)| e * t)
        .collect();

    // tau = G * (carrier + alpha * envelope * tremor)
    let replay: Vec<f64> = (0..n)
        .map(|i| carrier[i] + params.alpha * envelope[i] * tremor[i])
        .collect();
    let replay_centered: Vec<f64> = (0..n)
        .map(|i| carrier_centered[i] + params.alpha * envelope_centered[i] * tremor_centered[i])
        .collect();
    let torque: Vec<f64> = replay.iter().map(|v| params.gain * v).collect();
    let torque_centered: Vec<f64> = replay_centered.iter().map(|v| params.gain * v).collect();

    ensure_finite(&torque, "torque synthesis")?;
    ensure_finite(&torque_centered, "torque synthesis")?;

    Ok(Decomposition {
        centered,
        carrier,
        carrier_centered,
        tremor,
        tremor_centered,
        envelope,
        envelope_centered,
        torque,
        torque_centered,
        replay,
        replay_centered,
        velocity,
        carrier_velocity,
        velocity_error,
        position_error,
        env_tremor,
    })
}

/// Decompose a loaded recording using its estimated sampling rate
pub fn decompose_recording(
    recording: &Recording,
    params: &DecomposeParams,
) -> TremorResult<Decomposition> {
    decompose(&recording.angle, recording.fs, params)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FS: f64 = 100.0;

    /// 0.5 Hz carrier plus a tremor sinusoid with a known slow envelope
    fn synthetic_recording(
        seconds: f64,
        tremor_hz: f64,
    ) -> (Vec<f64>, Vec<f64>, Vec<f64>, Vec<f64>) {
        let n = (seconds * FS) as usize;
        let mut theta = Vec::with_capacity(n);
        let mut carrier_truth = Vec::with_capacity(n);
        let mut tremor_truth = Vec::with_capacity(n);
        let mut burst_truth = Vec::with_capacity(n);

        for i in 0..n {
            let t = i as f64 / FS;
            let carrier = 2.0 * (2.0 * std::f64::consts::PI * 0.5 * t).sin();
            let burst = 0.5 + 0.3 * (2.0 * std::f64::consts::PI * 0.1 * t).sin();
            let tremor = burst * (2.0 * std::f64::consts::PI * tremor_hz * t).sin();
            carrier_truth.push(carrier);
            tremor_truth.push(tremor);
            burst_truth.push(burst);
            theta.push(10.0 + carrier + tremor);
        }

        (theta, carrier_truth, tremor_truth, burst_truth)
    }

    fn rms(data: &[f64]) -> f64 {
        (data.iter().map(|v| v * v).sum::<f64>() / data.len() as f64).sqrt()
    }

    #[test]
    fn test_centered_has_zero_mean() {
        let (theta, _, _, _) = synthetic_recording(10.0, 5.0);
        let result = decompose(&theta, FS, &DecomposeParams::default()).unwrap();

        let mean = result.centered.iter().sum::<f64>() / result.centered.len() as f64;
        assert!(mean.abs() < 1e-9);
    }

    #[test]
    fn test_all_outputs_aligned_with_input() {
        let (theta, _, _, _) = synthetic_recording(5.0, 5.0);
        let result = decompose(&theta, FS, &DecomposeParams::default()).unwrap();

        let n = theta.len();
        for series in [
            &result.centered,
            &result.carrier,
            &result.carrier_centered,
            &result.tremor,
            &result.tremor_centered,
            &result.envelope,
            &result.envelope_centered,
            &result.torque,
            &result.torque_centered,
            &result.replay,
            &result.replay_centered,
            &result.velocity,
            &result.carrier_velocity,
            &result.velocity_error,
            &result.position_error,
            &result.env_tremor,
        ] {
            assert_eq!(series.len(), n);
            assert!(series.iter().all(|v| v.is_finite()));
        }
    }

    #[test]
    fn test_band_recovery_with_default_cutoffs() {
        // 5 Hz tremor sits well inside the 3 Hz highpass passband
        let (theta, carrier_truth, tremor_truth, _) = synthetic_recording(10.0, 5.0);
        let result = decompose(&theta, FS, &DecomposeParams::default()).unwrap();

        // Interior samples, away from filter edge effects
        let lo = 100;
        let hi = theta.len() - 100;

        let carrier_rms_err =
            (rms(&result.carrier_centered[lo..hi]) - rms(&carrier_truth[lo..hi])).abs()
                / rms(&carrier_truth[lo..hi]);
        assert!(carrier_rms_err < 0.05, "carrier rms error {}", carrier_rms_err);

        let tremor_rms_err = (rms(&result.tremor[lo..hi]) - rms(&tremor_truth[lo..hi])).abs()
            / rms(&tremor_truth[lo..hi]);
        assert!(tremor_rms_err < 0.05, "tremor rms error {}", tremor_rms_err);

        // carrier + tremor ~ centered: residual energy small relative to
        // signal energy (the bands overlap slightly, never exactly)
        let residual: Vec<f64> = (lo..hi)
            .map(|i| result.centered[i] - result.carrier_centered[i] - result.tremor_centered[i])
            .collect();
        let ratio = rms(&residual) / rms(&result.centered[lo..hi]);
        assert!(ratio < 0.1, "residual energy ratio {}", ratio);
    }

    #[test]
    fn test_end_to_end_slow_tremor_recovery() {
        // 10 s at 100 Hz: 0.5 Hz carrier plus a 2.5 Hz tremor burst with a
        // known envelope. The band split sits at 1.5 Hz so both components
        // are deep in their respective passbands.
        let (theta, carrier_truth, tremor_truth, burst_truth) = synthetic_recording(10.0, 2.5);
        let params = DecomposeParams {
            low_cut_hz: 1.5,
            high_cut_hz: 1.5,
            // One full tremor period, so the moving RMS is steady
            envelope_window_ms: 400.0,
            ..Default::default()
        };
        let result = decompose(&theta, FS, &params).unwrap();

        let lo = 100;
        let hi = theta.len() - 100;

        let carrier_rms_err =
            (rms(&result.carrier_centered[lo..hi]) - rms(&carrier_truth[lo..hi])).abs()
                / rms(&carrier_truth[lo..hi]);
        assert!(carrier_rms_err < 0.05, "carrier rms error {}", carrier_rms_err);

        let tremor_rms_err = (rms(&result.tremor[lo..hi]) - rms(&tremor_truth[lo..hi])).abs()
            / rms(&tremor_truth[lo..hi]);
        assert!(tremor_rms_err < 0.05, "tremor rms error {}", tremor_rms_err);

        // The moving-RMS envelope tracks burst / sqrt(2)
        for i in (lo..hi).step_by(50) {
            let expected = burst_truth[i] * std::f64::consts::FRAC_1_SQRT_2;
            assert!(
                (result.envelope[i] - expected).abs() < 0.1 * expected.max(0.1),
                "envelope at {}: {} vs {}",
                i,
                result.envelope[i],
                expected
            );
        }
    }

    #[test]
    fn test_torque_with_zero_alpha_is_scaled_carrier() {
        let (theta, _, _, _) = synthetic_recording(5.0, 5.0);
        let params = DecomposeParams {
            alpha: 0.0,
            gain: 2.5,
            ..Default::default()
        };
        let result = decompose(&theta, FS, &params).unwrap();

        for (torque, carrier) in result.torque.iter().zip(&result.carrier) {
            assert_eq!(*torque, 2.5 * carrier);
        }
        for (torque, carrier) in result.torque_centered.iter().zip(&result.carrier_centered) {
            assert_eq!(*torque, 2.5 * carrier);
        }
    }

    #[test]
    fn test_velocity_error_convention() {
        let (theta, _, _, _) = synthetic_recording(5.0, 5.0);
        let result = decompose(&theta, FS, &DecomposeParams::default()).unwrap();

        for i in 0..theta.len() {
            let expected = result.velocity[i] - result.carrier_velocity[i];
            assert!((result.velocity_error[i] - expected).abs() < 1e-12);
        }
    }

    #[test]
    fn test_gradient_of_linear_ramp() {
        let signal: Vec<f64> = (0..100).map(|i| 3.0 * i as f64).collect();
        let derivative = gradient(&signal, 0.5);

        // Slope 3 per sample at dx = 0.5 -> 6.0 everywhere, edges included
        for v in derivative {
            assert!((v - 6.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_raw_and_centered_carriers_differ_by_offset() {
        let (theta, _, _, _) = synthetic_recording(10.0, 5.0);
        let result = decompose(&theta, FS, &DecomposeParams::default()).unwrap();

        // Interior: raw carrier tracks the centered carrier plus the mean
        let mean = theta.iter().sum::<f64>() / theta.len() as f64;
        for i in 200..theta.len() - 200 {
            let diff = result.carrier[i] - result.carrier_centered[i];
            assert!((diff - mean).abs() < 0.05, "index {}: {}", i, diff - mean);
        }
    }

    #[test]
    fn test_serialized_field_names() {
        // The JSON keys are a wire contract with downstream consumers
        let (theta, _, _, _) = synthetic_recording(5.0, 5.0);
        let result = decompose(&theta, FS, &DecomposeParams::default()).unwrap();

        let json = serde_json::to_value(&result).unwrap();
        for key in [
            "centeredAngle",
            "baseAngle",
            "centeredBaseAngle",
            "tremor",
            "centeredTremor",
            "envelope",
            "centeredEnvelope",
            "torque",
            "centeredTorque",
            "hybridReplay",
            "hybridReplayCentered",
            "velocity",
            "carrierVelocity",
            "vel_err",
            "position_error",
            "env_tremor",
        ] {
            assert!(json.get(key).is_some(), "missing key {}", key);
        }
    }

    #[test]
    fn test_non_finite_input_rejected() {
        let mut theta: Vec<f64> = (0..500).map(|i| (i as f64 * 0.05).sin()).collect();
        theta[250] = f64::NAN;

        let result = decompose(&theta, FS, &DecomposeParams::default());
        assert!(matches!(result, Err(TremorError::NonFiniteOutput { .. })));
    }

    #[test]
    fn test_short_signal_rejected() {
        let theta = vec![1.0; 10];
        let result = decompose(&theta, FS, &DecomposeParams::default());
        assert!(matches!(result, Err(TremorError::SignalTooShort { .. })));
    }
}
