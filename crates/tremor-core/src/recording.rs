//! Recording: core container for angle time series

use crate::error::{TremorError, TremorResult};
use serde::{Deserialize, Serialize};

/// A uniformly (or near-uniformly) sampled angle recording.
///
/// The sampling rate is always estimated from the time vector, never
/// stored in the source file.
#[derive(Debug, Clone)]
pub struct Recording {
    /// Time vector in seconds, assumed strictly increasing
    pub time: Vec<f64>,
    /// Wrist flexion/extension angle in degrees
    pub angle: Vec<f64>,
    /// Optional displacement channel
    pub displacement: Option<Vec<f64>>,
    /// Optional pre-computed angular velocity channel (live recordings)
    pub angular_velocity: Option<Vec<f64>>,
    /// Estimated sampling rate in Hz
    pub fs: f64,
}

impl Recording {
    /// Build a recording from raw columns, estimating `fs` from the mean
    /// time delta.
    pub fn from_columns(time: Vec<f64>, angle: Vec<f64>) -> TremorResult<Self> {
        let fs = estimate_sampling_rate(&time)?;

        if angle.len() != time.len() {
            return Err(TremorError::Malformed {
                file: String::new(),
                reason: format!(
                    "angle column has {} samples, time column has {}",
                    angle.len(),
                    time.len()
                ),
            });
        }

        Ok(Recording {
            time,
            angle,
            displacement: None,
            angular_velocity: None,
            fs,
        })
    }

    /// Attach a displacement channel
    pub fn with_displacement(mut self, displacement: Vec<f64>) -> Self {
        self.displacement = Some(displacement);
        self
    }

    /// Attach a pre-computed angular velocity channel
    pub fn with_angular_velocity(mut self, velocity: Vec<f64>) -> Self {
        self.angular_velocity = Some(velocity);
        self
    }

    /// Number of samples in the recording
    pub fn len(&self) -> usize {
        self.time.len()
    }

    /// Check if the recording holds no samples
    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    /// Recording duration in seconds
    pub fn duration(&self) -> f64 {
        match (self.time.first(), self.time.last()) {
            (Some(first), Some(last)) => last - first,
            _ => 0.0,
        }
    }

    /// Slice the recording to the half-open time window `[start, end)`.
    ///
    /// Indices are resolved by binary search on the time vector, so the
    /// window bounds need not land on exact sample times.
    pub fn slice_time(&self, start: f64, end: f64) -> TremorResult<Recording> {
        if start >= end {
            return Err(TremorError::InvalidTimeRange {
                start,
                end,
                duration: self.duration(),
            });
        }

        let start_idx = search_sorted(&self.time, start);
        let end_idx = search_sorted(&self.time, end);

        if start_idx >= end_idx {
            return Err(TremorError::InvalidTimeRange {
                start,
                end,
                duration: self.duration(),
            });
        }

        Ok(Recording {
            time: self.time[start_idx..end_idx].to_vec(),
            angle: self.angle[start_idx..end_idx].to_vec(),
            displacement: self
                .displacement
                .as_ref()
                .map(|d| d[start_idx..end_idx].to_vec()),
            angular_velocity: self
                .angular_velocity
                .as_ref()
                .map(|v| v[start_idx..end_idx].to_vec()),
            fs: self.fs,
        })
    }
}

/// Estimate the sampling rate as the reciprocal of the mean time delta
pub fn estimate_sampling_rate(time: &[f64]) -> TremorResult<f64> {
    if time.len() < 2 {
        return Err(TremorError::InvalidSamplingRate { fs: 0.0 });
    }

    let span = time[time.len() - 1] - time[0];
    let mean_dt = span / (time.len() - 1) as f64;
    let fs = 1.0 / mean_dt;

    if !fs.is_finite() || fs <= 0.0 {
        return Err(TremorError::InvalidSamplingRate { fs });
    }

    Ok(fs)
}

/// Index of the first element in `sorted` that is >= `value`
fn search_sorted(sorted: &[f64], value: f64) -> usize {
    sorted.partition_point(|&t| t < value)
}

/// A single labeled sample emitted by a live session and accepted back by
/// the recorder sink.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SampleRecord {
    pub time: f64,
    #[serde(rename = "rawAngle")]
    pub raw_angle: f64,
    #[serde(rename = "filteredAngle")]
    pub filtered_angle: f64,
    #[serde(rename = "angularVelocity")]
    pub angular_velocity: f64,
    pub torque: f64,
    pub tremor: f64,
    pub envelope: f64,
}

/// Basic statistics for a signal channel
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalStats {
    pub mean: f64,
    pub rms: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    pub peak_to_peak: f64,
}

impl SignalStats {
    pub fn calculate(data: &[f64]) -> Self {
        if data.is_empty() {
            return Self {
                mean: 0.0,
                rms: 0.0,
                std_dev: 0.0,
                min: 0.0,
                max: 0.0,
                peak_to_peak: 0.0,
            };
        }

        let n = data.len() as f64;
        let mean = data.iter().sum::<f64>() / n;
        let rms = (data.iter().map(|x| x * x).sum::<f64>() / n).sqrt();
        let variance = data.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;

        let min = data.iter().fold(f64::INFINITY, |a, &b| a.min(b));
        let max = data.iter().fold(f64::NEG_INFINITY, |a, &b| a.max(b));

        Self {
            mean,
            rms,
            std_dev: variance.sqrt(),
            min,
            max,
            peak_to_peak: max - min,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recording_100hz(seconds: f64) -> Recording {
        let n = (seconds * 100.0) as usize;
        let time: Vec<f64> = (0..n).map(|i| i as f64 / 100.0).collect();
        let angle: Vec<f64> = (0..n).map(|i| (i as f64 * 0.05).sin()).collect();
        Recording::from_columns(time, angle).unwrap()
    }

    #[test]
    fn test_sampling_rate_estimation() {
        let rec = recording_100hz(2.0);
        assert!((rec.fs - 100.0).abs() < 1e-6);
    }

    #[test]
    fn test_sampling_rate_rejects_degenerate_time() {
        assert!(estimate_sampling_rate(&[0.0]).is_err());
        assert!(estimate_sampling_rate(&[0.0, 0.0]).is_err());
    }

    #[test]
    fn test_length_mismatch_rejected() {
        let time: Vec<f64> = (0..10).map(|i| i as f64 * 0.01).collect();
        let angle = vec![0.0; 5];
        assert!(Recording::from_columns(time, angle).is_err());
    }

    #[test]
    fn test_slice_time() {
        let rec = recording_100hz(10.0);
        let slice = rec.slice_time(2.0, 4.0).unwrap();

        assert_eq!(slice.len(), 200);
        assert!((slice.time[0] - 2.0).abs() < 1e-9);
        assert!(*slice.time.last().unwrap() < 4.0);
        assert_eq!(slice.fs, rec.fs);
    }

    #[test]
    fn test_slice_time_invalid_range() {
        let rec = recording_100hz(10.0);
        assert!(rec.slice_time(4.0, 2.0).is_err());
        assert!(rec.slice_time(20.0, 30.0).is_err());
    }

    #[test]
    fn test_signal_stats() {
        let data = vec![1.0, -1.0, 1.0, -1.0];
        let stats = SignalStats::calculate(&data);

        assert!((stats.mean).abs() < 1e-12);
        assert!((stats.rms - 1.0).abs() < 1e-12);
        assert_eq!(stats.peak_to_peak, 2.0);
    }
}
