//! Live decomposition around the measured tremor peak
//!
//! Unlike the batch pipeline, which splits at fixed cutoffs, the live
//! path measures the dominant tremor frequency first and isolates a
//! narrow band around it. The envelope comes from the analytic signal,
//! and angular velocity is read from the recording rather than derived.

use serde::{Deserialize, Serialize};
use tracing::info;
use tremor_core::{Recording, SampleRecord, TremorError, TremorResult};
use tremor_dsp::filter::{filtfilt, FilterSpec};
use tremor_dsp::{band_pass, dominant_frequency, hilbert_envelope};

/// Parameters for a live decomposition
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LiveParams {
    /// Half-width of the tremor isolation band around the detected peak, Hz
    pub band_halfwidth_hz: f64,
    /// Carrier low-pass cutoff in Hz
    pub carrier_cutoff_hz: f64,
    /// Tremor emphasis weight
    pub alpha: f64,
    /// Output torque gain
    pub gain: f64,
}

impl Default for LiveParams {
    fn default() -> Self {
        Self {
            band_halfwidth_hz: 0.5,
            carrier_cutoff_hz: 1.0,
            alpha: 1.0,
            gain: 1.0,
        }
    }
}

/// A fully prepared live session: decomposed samples plus the pacing rate
#[derive(Debug, Clone)]
pub struct LiveSession {
    samples: Vec<SampleRecord>,
    fs: f64,
    peak_hz: f64,
}

impl LiveSession {
    /// Decompose a recording slice for live replay.
    ///
    /// The tremor band is centered on the dominant frequency of the
    /// angle signal, measured with a Welch estimate that skips the DC
    /// bin. The recording must carry its angular velocity column.
    pub fn prepare(recording: &Recording, params: &LiveParams) -> TremorResult<Self> {
        let velocity = recording
            .angular_velocity
            .as_ref()
            .ok_or_else(|| TremorError::MissingColumns {
                file: String::new(),
                column: "theta_dot".to_string(),
            })?;

        let theta = &recording.angle;
        let fs = recording.fs;

        let peak_hz =
            dominant_frequency(theta, fs).ok_or(TremorError::SignalTooShort {
                len: theta.len(),
                min_len: 2,
            })?;

        let tremor = band_pass(
            theta,
            peak_hz - params.band_halfwidth_hz,
            peak_hz + params.band_halfwidth_hz,
            fs,
            4,
        )?;
        let envelope = hilbert_envelope(&tremor)?;
        let filtered = filtfilt(&FilterSpec::lowpass(params.carrier_cutoff_hz), theta, fs)?;

        let samples = recording
            .time
            .iter()
            .enumerate()
            .map(|(i, &t)| SampleRecord {
                time: t,
                raw_angle: theta[i],
                filtered_angle: filtered[i],
                angular_velocity: velocity[i],
                torque: params.gain * (filtered[i] + params.alpha * envelope[i] * tremor[i]),
                tremor: tremor[i],
                envelope: envelope[i],
            })
            .collect();

        info!(peak_hz, fs, samples = recording.len(), "live session prepared");

        Ok(LiveSession {
            samples,
            fs,
            peak_hz,
        })
    }

    /// Decomposed samples in replay order
    pub fn samples(&self) -> &[SampleRecord] {
        &self.samples
    }

    /// Pacing rate for replay, Hz
    pub fn sampling_rate(&self) -> f64 {
        self.fs
    }

    /// Detected dominant tremor frequency, Hz
    pub fn peak_frequency(&self) -> f64 {
        self.peak_hz
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn live_recording(seconds: f64, tremor_hz: f64) -> Recording {
        let fs = 100.0;
        let n = (seconds * fs) as usize;
        let time: Vec<f64> = (0..n).map(|i| i as f64 / fs).collect();
        let angle: Vec<f64> = time
            .iter()
            .map(|&t| {
                12.0 + 0.3 * (2.0 * std::f64::consts::PI * 0.4 * t).sin()
                    + 2.0 * (2.0 * std::f64::consts::PI * tremor_hz * t).sin()
            })
            .collect();
        let velocity: Vec<f64> = time.iter().map(|&t| t.cos()).collect();
        Recording::from_columns(time, angle)
            .unwrap()
            .with_angular_velocity(velocity)
    }

    #[test]
    fn test_prepare_detects_tremor_peak() {
        let recording = live_recording(40.0, 5.0);
        let session = LiveSession::prepare(&recording, &LiveParams::default()).unwrap();

        assert!(
            (session.peak_frequency() - 5.0).abs() < 0.2,
            "detected {}",
            session.peak_frequency()
        );
        assert_eq!(session.len(), recording.len());
        assert!(session
            .samples()
            .iter()
            .all(|s| s.torque.is_finite() && s.envelope >= 0.0));
    }

    #[test]
    fn test_prepare_isolates_tremor_band() {
        let recording = live_recording(40.0, 5.0);
        let session = LiveSession::prepare(&recording, &LiveParams::default()).unwrap();

        // The narrow band attenuates even the 5 Hz component itself, but
        // the offset and the 0.4 Hz carrier must be gone while the tremor
        // frequency survives as the dominant content
        let interior = &session.samples()[200..session.len() - 200];
        let tremor: Vec<f64> = interior.iter().map(|s| s.tremor).collect();

        let mean = tremor.iter().sum::<f64>() / tremor.len() as f64;
        assert!(mean.abs() < 0.01, "offset leaked: mean {}", mean);

        let rms = (tremor.iter().map(|v| v * v).sum::<f64>() / tremor.len() as f64).sqrt();
        assert!(rms > 0.4 && rms < 1.3, "tremor rms {}", rms);

        let peak = tremor_dsp::dominant_frequency(&tremor, 100.0).unwrap();
        assert!((peak - 5.0).abs() < 0.2, "band content peaks at {}", peak);
    }

    #[test]
    fn test_alpha_zero_reduces_to_carrier() {
        let recording = live_recording(20.0, 4.0);
        let params = LiveParams {
            alpha: 0.0,
            gain: 3.0,
            ..Default::default()
        };
        let session = LiveSession::prepare(&recording, &params).unwrap();

        for sample in session.samples() {
            assert_eq!(sample.torque, 3.0 * sample.filtered_angle);
        }
    }

    #[test]
    fn test_prepare_requires_velocity_column() {
        let fs = 100.0;
        let time: Vec<f64> = (0..2000).map(|i| i as f64 / fs).collect();
        let angle: Vec<f64> = time
            .iter()
            .map(|&t| (2.0 * std::f64::consts::PI * 5.0 * t).sin())
            .collect();
        let recording = Recording::from_columns(time, angle).unwrap();

        assert!(matches!(
            LiveSession::prepare(&recording, &LiveParams::default()),
            Err(TremorError::MissingColumns { .. })
        ));
    }

    #[test]
    fn test_prepare_on_time_slice() {
        let recording = live_recording(60.0, 5.0);
        let slice = recording.slice_time(10.0, 50.0).unwrap();
        let session = LiveSession::prepare(&slice, &LiveParams::default()).unwrap();

        assert_eq!(session.len(), slice.len());
        assert!((session.samples()[0].time - 10.0).abs() < 1e-9);
        assert!((session.sampling_rate() - 100.0).abs() < 1e-6);
    }
}
