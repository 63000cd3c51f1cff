//! Tremor-Core: Foundation types for tremor recording analysis
//!
//! Recording model, processed-feature schema, error taxonomy, and the
//! file-backed stores the decomposition engine reads from and writes to.

pub mod error;
pub mod feature;
pub mod recording;
pub mod store;

pub use error::{TremorError, TremorResult};
pub use feature::ProcessedFeature;
pub use recording::{Recording, SampleRecord, SignalStats};
pub use store::{ConfigStore, ProcessedStore, RecorderSink, RecordingStore};
