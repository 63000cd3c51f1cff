//! Paced replay of prepared sessions
//!
//! One session streams at a time. Starting a new session cancels the
//! previous one; emission is paced by a tokio interval at the session's
//! own sampling rate, and cancellation is checked before each sample
//! goes out, so an in-flight tick is never interrupted.

use crate::session::LiveSession;
use tokio::sync::{mpsc, watch};
use tokio::time::{interval, Duration};
use tracing::info;
use tremor_core::{SampleRecord, TremorError, TremorResult};
use uuid::Uuid;

const CHANNEL_CAPACITY: usize = 64;

/// Handle to a running replay: its id and the sample stream
pub struct SessionHandle {
    pub id: Uuid,
    pub samples: mpsc::Receiver<SampleRecord>,
}

struct ActiveSession {
    id: Uuid,
    stop: watch::Sender<bool>,
}

/// Owns the single active replay task
pub struct SessionManager {
    active: Option<ActiveSession>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self { active: None }
    }

    /// Id of the session currently streaming, if any
    pub fn active_id(&self) -> Option<Uuid> {
        self.active.as_ref().map(|s| s.id)
    }

    /// Start replaying a prepared session, cancelling any previous one.
    pub fn start(&mut self, session: LiveSession) -> SessionHandle {
        if let Some(previous) = self.active.take() {
            let _ = previous.stop.send(true);
            info!(id = %previous.id, "replaced active session");
        }

        let id = Uuid::new_v4();
        let (sample_tx, sample_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (stop_tx, mut stop_rx) = watch::channel(false);

        let fs = session.sampling_rate();
        let tick = Duration::from_secs_f64(1.0 / fs);
        let samples: Vec<SampleRecord> = session.samples().to_vec();

        info!(id = %id, fs, count = samples.len(), "session started");

        tokio::spawn(async move {
            let mut ticker = interval(tick);
            for sample in samples {
                if *stop_rx.borrow() {
                    break;
                }
                tokio::select! {
                    _ = stop_rx.changed() => {
                        if *stop_rx.borrow() {
                            break;
                        }
                    }
                    _ = ticker.tick() => {
                        if sample_tx.send(sample).await.is_err() {
                            break;
                        }
                    }
                }
            }
        });

        self.active = Some(ActiveSession { id, stop: stop_tx });

        SessionHandle {
            id,
            samples: sample_rx,
        }
    }

    /// Stop the active replay
    pub fn stop(&mut self) -> TremorResult<Uuid> {
        match self.active.take() {
            Some(session) => {
                let _ = session.stop.send(true);
                info!(id = %session.id, "session stopped");
                Ok(session.id)
            }
            None => Err(TremorError::NoActiveSession),
        }
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}
