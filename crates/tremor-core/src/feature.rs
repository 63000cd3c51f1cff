//! Processed-feature schema mapping
//!
//! Processed recordings have accumulated several header spellings over
//! time. The alias tables here are resolved once when a file is loaded,
//! replacing repeated runtime string matching.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Features stored in processed recording files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProcessedFeature {
    /// Centered composite torque signal
    CenteredTorque,
    /// Centered high-frequency tremor component
    CenteredTremor,
    /// Centered tremor envelope
    CenteredEnvelope,
    /// Mean-centered angle
    CenteredAngle,
    /// Centered low-frequency carrier
    CenteredCarrier,
    /// Normalized displacement channel
    NormalizedDisplacement,
}

/// Header spellings accepted for the time column
pub const TIME_ALIASES: &[&str] = &["Time", "time", "Time (s)"];

impl ProcessedFeature {
    /// All features, in the order they are reported
    pub fn all() -> &'static [ProcessedFeature] {
        &[
            ProcessedFeature::CenteredTorque,
            ProcessedFeature::CenteredTremor,
            ProcessedFeature::CenteredEnvelope,
            ProcessedFeature::CenteredAngle,
            ProcessedFeature::CenteredCarrier,
            ProcessedFeature::NormalizedDisplacement,
        ]
    }

    /// Canonical name used in requests and JSON payloads
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessedFeature::CenteredTorque => "centeredTorque",
            ProcessedFeature::CenteredTremor => "centeredTremor",
            ProcessedFeature::CenteredEnvelope => "centeredEnvelope",
            ProcessedFeature::CenteredAngle => "centeredAngle",
            ProcessedFeature::CenteredCarrier => "Centered Low Frequency Carrier",
            ProcessedFeature::NormalizedDisplacement => "Normalized WFE Displacement",
        }
    }

    /// Column headers this feature may appear under in processed files
    pub fn column_aliases(&self) -> &'static [&'static str] {
        match self {
            ProcessedFeature::CenteredTorque => &["centeredTorque", "Centered Torque"],
            ProcessedFeature::CenteredTremor => &["centeredTremor", "Centered Tremor"],
            ProcessedFeature::CenteredEnvelope => &["centeredEnvelope", "Centered Envelope"],
            ProcessedFeature::CenteredAngle => &["centeredAngle", "Centered Angle"],
            ProcessedFeature::CenteredCarrier => &["Centered Low Frequency Carrier"],
            ProcessedFeature::NormalizedDisplacement => &["Normalized WFE Displacement"],
        }
    }

    /// Resolve this feature against a header row, returning the column
    /// index if any alias matches.
    pub fn resolve(&self, headers: &[String]) -> Option<usize> {
        self.column_aliases()
            .iter()
            .find_map(|alias| headers.iter().position(|h| h == alias))
    }
}

impl FromStr for ProcessedFeature {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProcessedFeature::all()
            .iter()
            .copied()
            .find(|f| f.as_str() == s || f.column_aliases().contains(&s))
            .ok_or_else(|| format!("unknown feature '{}'", s))
    }
}

/// Resolve the time column index in a header row
pub fn resolve_time_column(headers: &[String]) -> Option<usize> {
    TIME_ALIASES
        .iter()
        .find_map(|alias| headers.iter().position(|h| h == alias))
}
