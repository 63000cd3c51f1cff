//! Tremor-Stream: live decomposition sessions and paced playback
//!
//! A live session decomposes a time-windowed slice of a recording around
//! its measured dominant tremor frequency, and the session manager
//! replays the resulting samples over a channel at the recording's own
//! sampling rate.

pub mod playback;
pub mod session;

pub use playback::{SessionHandle, SessionManager};
pub use session::{LiveParams, LiveSession};
