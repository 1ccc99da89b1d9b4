//! External setpoint input.
//!
//! The scheduler writes a single float into a file; `0` means no target.
//! [`SetpointPoller`] reads it once per tick and forwards the value over an
//! `mpsc` channel to the [`SetpointInbox`] held by the control loop. Settle
//! acknowledgements flow back on a second channel; the loop flushes them to
//! the source as `0` on the settling tick, before the next read.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Failure reading or acknowledging a setpoint. Never fatal.
#[derive(Debug, Error)]
pub enum SetpointError {
    #[error("Setpoint I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed setpoint {0:?}")]
    Parse(String),
}

/// Something that holds the current target.
pub trait SetpointSource: Send {
    /// Current value; `0.0` means no target.
    fn read(&mut self) -> Result<f64, SetpointError>;

    /// Mark the current target as consumed.
    fn acknowledge(&mut self) -> Result<(), SetpointError>;
}

/// Setpoint file with a single float.
#[derive(Debug, Clone)]
pub struct FileSetpoint {
    path: PathBuf,
}

impl FileSetpoint {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Parse the file contents.
pub fn parse_setpoint(text: &str) -> Result<f64, SetpointError> {
    let trimmed = text.trim();
    match trimmed.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(SetpointError::Parse(trimmed.to_string())),
    }
}

impl SetpointSource for FileSetpoint {
    fn read(&mut self) -> Result<f64, SetpointError> {
        parse_setpoint(&fs::read_to_string(&self.path)?)
    }

    fn acknowledge(&mut self) -> Result<(), SetpointError> {
        fs::write(&self.path, "0")?;
        Ok(())
    }
}

/// Wire a source to a poller/inbox pair.
pub fn channel<S: SetpointSource>(source: S) -> (SetpointPoller<S>, SetpointInbox) {
    let (value_tx, value_rx) = mpsc::channel();
    let (ack_tx, ack_rx) = mpsc::channel();
    (
        SetpointPoller {
            source,
            values: value_tx,
            acks: ack_rx,
            last_error: None,
        },
        SetpointInbox {
            values: value_rx,
            acks: ack_tx,
        },
    )
}

/// Reads the source and forwards every value.
pub struct SetpointPoller<S> {
    source: S,
    values: Sender<f64>,
    acks: Receiver<()>,
    last_error: Option<String>,
}

impl<S: SetpointSource> SetpointPoller<S> {
    /// Write every pending acknowledgement to the source.
    pub fn flush_acks(&mut self) {
        while self.acks.try_recv().is_ok() {
            match self.source.acknowledge() {
                Ok(()) => debug!("Setpoint acknowledged"),
                Err(e) => warn!("Failed to acknowledge setpoint: {e}"),
            }
        }
    }

    /// Forward the current value.
    ///
    /// Unreadable or malformed input is forwarded as `0.0`.
    pub fn poll(&mut self) {
        self.flush_acks();
        let value = match self.source.read() {
            Ok(v) => {
                self.last_error = None;
                v
            }
            Err(e) => {
                let msg = e.to_string();
                if self.last_error.as_deref() != Some(msg.as_str()) {
                    warn!("Ignoring setpoint: {msg}");
                    self.last_error = Some(msg);
                }
                0.0
            }
        };
        // The inbox is gone only during shutdown.
        let _ = self.values.send(value);
    }

    pub fn source(&self) -> &S {
        &self.source
    }
}

/// Loop-side end of the setpoint channel.
pub struct SetpointInbox {
    values: Receiver<f64>,
    acks: Sender<()>,
}

impl SetpointInbox {
    /// Most recent forwarded value, if any arrived since the last call.
    pub fn latest(&self) -> Option<f64> {
        self.values.try_iter().last()
    }

    /// Report the active target as reached.
    pub fn retire(&self) {
        info!("Setpoint retired");
        let _ = self.acks.send(());
    }
}
