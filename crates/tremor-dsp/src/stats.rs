//! Corpus-wide feature statistics
//!
//! Aggregates decomposition outputs across a directory of recordings into
//! global normalization bounds: plain min/max, and IQR-based robust
//! bounds that rare outliers cannot dominate.

use crate::decompose::{decompose_recording, DecomposeParams};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tremor_core::{Recording, TremorError, TremorResult};

/// Features tracked by the batch statistics, all in the centered domain
/// except the displacement channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FeatureKind {
    /// Mean-centered angle
    Angle,
    /// Displacement channel
    Disp,
    /// Low-frequency carrier
    Carrier,
    /// Velocity error
    VelErr,
    /// Envelope-modulated tremor
    EnvTremor,
    /// Tremor component
    Tremor,
    /// Tremor envelope
    Envelope,
}

impl FeatureKind {
    pub fn all() -> &'static [FeatureKind] {
        &[
            FeatureKind::Angle,
            FeatureKind::Disp,
            FeatureKind::Carrier,
            FeatureKind::VelErr,
            FeatureKind::EnvTremor,
            FeatureKind::Tremor,
            FeatureKind::Envelope,
        ]
    }

    /// Key used in the emitted JSON stats map
    pub fn as_str(&self) -> &'static str {
        match self {
            FeatureKind::Angle => "angle",
            FeatureKind::Disp => "disp",
            FeatureKind::Carrier => "carrier",
            FeatureKind::VelErr => "vel_err",
            FeatureKind::EnvTremor => "env_tremor",
            FeatureKind::Tremor => "tremor",
            FeatureKind::Envelope => "envelope",
        }
    }
}

/// Plain min/max bounds for a feature
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RangeStats {
    pub min: f64,
    pub max: f64,
}

impl RangeStats {
    pub fn new() -> Self {
        Self {
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }

    /// Widen the bounds to cover `value`
    pub fn update(&mut self, value: f64) {
        if value < self.min {
            self.min = value;
        }
        if value > self.max {
            self.max = value;
        }
    }

    fn from_samples(samples: &[f64]) -> Self {
        let mut range = Self::new();
        for &v in samples {
            range.update(v);
        }
        range
    }
}

impl Default for RangeStats {
    fn default() -> Self {
        Self::new()
    }
}

/// IQR multiplier for the robust bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IqrMultiplier {
    /// Conventional 1.5x fence
    Standard,
    /// 3.0x fence for extreme outliers only
    Extreme,
}

impl IqrMultiplier {
    pub fn value(&self) -> f64 {
        match self {
            IqrMultiplier::Standard => 1.5,
            IqrMultiplier::Extreme => 3.0,
        }
    }
}

/// Outlier-resistant bounds for a feature across the whole corpus
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RobustStats {
    pub q1: f64,
    pub q3: f64,
    pub iqr: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub robust_range: f64,
    pub min: f64,
    pub max: f64,
    pub total_samples: usize,
    pub iqr_multiplier: f64,
}

/// Percentile with linear interpolation between closest ranks
fn percentile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let rank = q / 100.0 * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    if lo == hi {
        sorted[lo]
    } else {
        let frac = rank - lo as f64;
        sorted[lo] * (1.0 - frac) + sorted[hi] * frac
    }
}

impl RobustStats {
    /// Compute robust bounds from raw samples; NaN values are dropped
    /// before ranking.
    pub fn from_samples(samples: &[f64], multiplier: IqrMultiplier) -> Option<Self> {
        let mut finite: Vec<f64> = samples.iter().copied().filter(|v| !v.is_nan()).collect();
        if finite.is_empty() {
            return None;
        }
        finite.sort_by(|a, b| a.partial_cmp(b).unwrap());

        let q1 = percentile(&finite, 25.0);
        let q3 = percentile(&finite, 75.0);
        let iqr = q3 - q1;
        let k = multiplier.value();
        let lower_bound = q1 - k * iqr;
        let upper_bound = q3 + k * iqr;
        let range = RangeStats::from_samples(&finite);

        Some(Self {
            q1,
            q3,
            iqr,
            lower_bound,
            upper_bound,
            robust_range: upper_bound - lower_bound,
            min: range.min,
            max: range.max,
            total_samples: finite.len(),
            iqr_multiplier: k,
        })
    }

    /// Whether a value falls inside the robust fence
    pub fn contains(&self, value: f64) -> bool {
        value >= self.lower_bound && value <= self.upper_bound
    }
}

/// Accumulates decomposition features across a corpus of recordings
pub struct CorpusAggregator {
    params: DecomposeParams,
    collected: BTreeMap<FeatureKind, Vec<f64>>,
    recordings: usize,
}

impl CorpusAggregator {
    pub fn new(params: DecomposeParams) -> Self {
        let collected = FeatureKind::all()
            .iter()
            .map(|&kind| (kind, Vec::new()))
            .collect();
        Self {
            params,
            collected,
            recordings: 0,
        }
    }

    /// Number of recordings accumulated so far
    pub fn recordings(&self) -> usize {
        self.recordings
    }

    /// Decompose one recording and fold its features into the corpus.
    ///
    /// Requires the displacement channel; recordings without one are
    /// structurally incompatible with the feature set and should be
    /// skipped by the caller.
    pub fn add_recording(&mut self, recording: &Recording) -> TremorResult<()> {
        let displacement =
            recording
                .displacement
                .as_ref()
                .ok_or_else(|| TremorError::MissingColumns {
                    file: String::new(),
                    column: "WFE_disp".to_string(),
                })?;

        let result = decompose_recording(recording, &self.params)?;

        let arrays: [(FeatureKind, &[f64]); 7] = [
            (FeatureKind::Angle, &result.centered),
            (FeatureKind::Disp, displacement),
            (FeatureKind::Carrier, &result.carrier_centered),
            (FeatureKind::VelErr, &result.velocity_error),
            (FeatureKind::EnvTremor, &result.env_tremor),
            (FeatureKind::Tremor, &result.tremor_centered),
            (FeatureKind::Envelope, &result.envelope_centered),
        ];

        for (kind, values) in arrays {
            self.collected
                .get_mut(&kind)
                .expect("all feature kinds preallocated")
                .extend_from_slice(values);
        }
        self.recordings += 1;
        Ok(())
    }

    /// Global min/max per feature
    pub fn min_max(&self) -> BTreeMap<String, RangeStats> {
        self.collected
            .iter()
            .filter(|(_, samples)| !samples.is_empty())
            .map(|(kind, samples)| (kind.as_str().to_string(), RangeStats::from_samples(samples)))
            .collect()
    }

    /// Robust IQR bounds per feature
    pub fn robust(&self, multiplier: IqrMultiplier) -> BTreeMap<String, RobustStats> {
        self.collected
            .iter()
            .filter_map(|(kind, samples)| {
                RobustStats::from_samples(samples, multiplier)
                    .map(|stats| (kind.as_str().to_string(), stats))
            })
            .collect()
    }
}
