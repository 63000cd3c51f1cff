//! Tremor-DSP: signal decomposition engine for tremor recordings
//!
//! Zero-phase filtering, envelope estimation, carrier/tremor
//! decomposition with torque synthesis, frequency-domain analysis, and
//! corpus-wide feature statistics.

pub mod decompose;
pub mod envelope;
pub mod filter;
pub mod spectrum;
pub mod stats;

pub use decompose::{decompose, decompose_recording, DecomposeParams, Decomposition};
pub use envelope::{hilbert_envelope, moving_rms, window_samples_from_ms, EnvelopeMethod};
pub use filter::{band_pass, filtfilt, FilterKind, FilterSpec};
pub use spectrum::{dominant_frequency, spectrum, welch, Spectrum};
pub use stats::{CorpusAggregator, FeatureKind, IqrMultiplier, RangeStats, RobustStats};
