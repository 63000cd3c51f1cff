//! File-backed stores for recordings, processed features, and config
//!
//! These are the in-process contracts the HTTP layer delegates to. All
//! operations take an explicit file name; nothing falls back to "first
//! file in the directory".

use crate::error::{TremorError, TremorResult};
use crate::feature::{resolve_time_column, ProcessedFeature};
use crate::recording::{Recording, SampleRecord};
use std::path::{Path, PathBuf};

/// Header spellings accepted for the raw angle column
const ANGLE_ALIASES: &[&str] = &["WFE_angle", "theta"];
/// Header spellings accepted for the displacement column
const DISP_ALIASES: &[&str] = &["WFE_disp"];
/// Header spellings accepted for the angular velocity column
const VELOCITY_ALIASES: &[&str] = &["theta_dot", "angularVelocity"];

fn resolve_column(headers: &[String], aliases: &[&str]) -> Option<usize> {
    aliases
        .iter()
        .find_map(|alias| headers.iter().position(|h| h == alias))
}

fn read_csv_columns(path: &Path) -> TremorResult<(Vec<String>, Vec<Vec<f64>>)> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut reader = csv::Reader::from_path(path)?;
    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut columns: Vec<Vec<f64>> = vec![Vec::new(); headers.len()];
    for record in reader.records() {
        let record = record?;
        for (idx, field) in record.iter().enumerate() {
            if idx >= columns.len() {
                break;
            }
            let value = field.trim().parse::<f64>().map_err(|_| TremorError::Malformed {
                file: file_name.clone(),
                reason: format!("non-numeric value '{}' in column '{}'", field, headers[idx]),
            })?;
            columns[idx].push(value);
        }
    }

    Ok((headers, columns))
}

fn list_csv_files(dir: &Path) -> TremorResult<Vec<String>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) == Some("csv") {
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                files.push(name.to_string());
            }
        }
    }
    files.sort();
    Ok(files)
}

/// Source of raw recordings: a directory of CSV files
#[derive(Debug, Clone)]
pub struct RecordingStore {
    dir: PathBuf,
}

impl RecordingStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// List available recording files, sorted by name
    pub fn list(&self) -> TremorResult<Vec<String>> {
        list_csv_files(&self.dir)
    }

    /// Load a recording, resolving both raw-capture and live-recording
    /// header conventions through the alias tables.
    pub fn load(&self, file_name: &str) -> TremorResult<Recording> {
        if file_name.is_empty() {
            return Err(TremorError::MissingParameter {
                name: "file_name".to_string(),
            });
        }

        let path = self.dir.join(file_name);
        if !path.exists() {
            return Err(TremorError::FileNotFound {
                path: path.to_string_lossy().into_owned(),
            });
        }

        let (headers, columns) = read_csv_columns(&path)?;

        let time_idx = resolve_time_column(&headers).ok_or_else(|| TremorError::MissingColumns {
            file: file_name.to_string(),
            column: "Time (s)".to_string(),
        })?;
        let angle_idx =
            resolve_column(&headers, ANGLE_ALIASES).ok_or_else(|| TremorError::MissingColumns {
                file: file_name.to_string(),
                column: "WFE_angle".to_string(),
            })?;

        let mut recording =
            Recording::from_columns(columns[time_idx].clone(), columns[angle_idx].clone())
                .map_err(|e| match e {
                    TremorError::Malformed { reason, .. } => TremorError::Malformed {
                        file: file_name.to_string(),
                        reason,
                    },
                    other => other,
                })?;

        if let Some(disp_idx) = resolve_column(&headers, DISP_ALIASES) {
            recording = recording.with_displacement(columns[disp_idx].clone());
        }
        if let Some(vel_idx) = resolve_column(&headers, VELOCITY_ALIASES) {
            recording = recording.with_angular_velocity(columns[vel_idx].clone());
        }

        Ok(recording)
    }
}

/// Store of processed per-feature series
#[derive(Debug, Clone)]
pub struct ProcessedStore {
    dir: PathBuf,
}

impl ProcessedStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// List available processed files, sorted by name
    pub fn list(&self) -> TremorResult<Vec<String>> {
        list_csv_files(&self.dir)
    }

    /// Load a time-aligned feature series from a processed file
    pub fn load(
        &self,
        file_name: &str,
        feature: ProcessedFeature,
    ) -> TremorResult<(Vec<f64>, Vec<f64>)> {
        if file_name.is_empty() {
            return Err(TremorError::MissingParameter {
                name: "file_name".to_string(),
            });
        }

        let path = self.dir.join(file_name);
        if !path.exists() {
            return Err(TremorError::FileNotFound {
                path: path.to_string_lossy().into_owned(),
            });
        }

        let (headers, columns) = read_csv_columns(&path)?;

        let time_idx = resolve_time_column(&headers).ok_or_else(|| TremorError::MissingColumns {
            file: file_name.to_string(),
            column: "Time".to_string(),
        })?;
        let feature_idx = feature
            .resolve(&headers)
            .ok_or_else(|| TremorError::FeatureNotFound {
                file: file_name.to_string(),
                feature: feature.as_str().to_string(),
            })?;

        Ok((columns[time_idx].clone(), columns[feature_idx].clone()))
    }
}

/// Persisted case-study label mapping, treated as an opaque JSON object
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Read the configuration, returning the default label map when no
    /// file has been written yet.
    pub fn load(&self) -> TremorResult<serde_json::Map<String, serde_json::Value>> {
        if !self.path.exists() {
            let mut default = serde_json::Map::new();
            for key in ["normal", "earlyPD", "moderatePD", "advancedPD"] {
                default.insert(key.to_string(), serde_json::Value::String(String::new()));
            }
            return Ok(default);
        }

        let contents = std::fs::read_to_string(&self.path)?;
        let value: serde_json::Value =
            serde_json::from_str(&contents).map_err(|e| TremorError::Malformed {
                file: self.path.to_string_lossy().into_owned(),
                reason: e.to_string(),
            })?;

        match value {
            serde_json::Value::Object(map) => Ok(map),
            _ => Err(TremorError::Malformed {
                file: self.path.to_string_lossy().into_owned(),
                reason: "expected a JSON object".to_string(),
            }),
        }
    }

    /// Overwrite the configuration with a new JSON object
    pub fn save(&self, config: &serde_json::Map<String, serde_json::Value>) -> TremorResult<()> {
        let contents = serde_json::to_string_pretty(config).map_err(|e| TremorError::Io {
            context: e.to_string(),
        })?;
        std::fs::write(&self.path, contents)?;
        Ok(())
    }
}

/// Sink for recorded live-session samples
///
/// Writes the same tabular shape `RecordingStore` reads, so recorded
/// sessions can be replayed through the decomposition pipeline.
#[derive(Debug, Clone)]
pub struct RecorderSink {
    dir: PathBuf,
}

impl RecorderSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Persist a recorded sample sequence, returning the written path
    pub fn save(&self, file_name: &str, records: &[SampleRecord]) -> TremorResult<PathBuf> {
        if file_name.is_empty() {
            return Err(TremorError::MissingParameter {
                name: "filename".to_string(),
            });
        }
        if records.is_empty() {
            return Err(TremorError::MissingParameter {
                name: "recorded_data".to_string(),
            });
        }

        std::fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(file_name);

        let mut writer = csv::Writer::from_path(&path)?;
        writer.write_record([
            "time",
            "theta",
            "theta_dot",
            "filteredAngle",
            "torque",
            "tremor",
            "envelope",
        ])?;
        for record in records {
            writer.write_record([
                record.time.to_string(),
                record.raw_angle.to_string(),
                record.angular_velocity.to_string(),
                record.filtered_angle.to_string(),
                record.torque.to_string(),
                record.tremor.to_string(),
                record.envelope.to_string(),
            ])?;
        }
        writer.flush()?;

        Ok(path)
    }
}
