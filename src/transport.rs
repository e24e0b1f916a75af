//! Transport channel: where flushed bytecode goes.
//!
//! Sends are fire-and-forget from the scheduler's point of view. The engine
//! spawns each send and only logs the outcome.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::config::{TransportConfig, TransportKind};

/// Failure reported by a transport.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Writing to the device failed.
    #[error("device write failed: {0}")]
    Io(#[from] std::io::Error),

    /// The transport refused the transmission.
    #[error("transmission rejected: {0}")]
    Rejected(String),
}

/// Future returned by [`Transport::send`].
pub type SendFuture<'a> = Pin<Box<dyn Future<Output = Result<(), TransportError>> + Send + 'a>>;

/// A channel that accepts bytecode transmissions.
///
/// Implementations must be cheap to share; the engine holds them in an
/// `Arc` and calls `send` from spawned tasks.
pub trait Transport: Send + Sync {
    /// Short name used in log lines.
    fn name(&self) -> &'static str;

    /// Transmits one flushed bytecode string.
    fn send(&self, bytecode: String) -> SendFuture<'_>;
}

/// Builds the transport selected in the config.
pub fn from_config(config: &TransportConfig) -> anyhow::Result<Arc<dyn Transport>> {
    match config.kind {
        TransportKind::Log => Ok(Arc::new(LogTransport)),
        TransportKind::Device => {
            let path = config
                .device_path
                .clone()
                .ok_or_else(|| anyhow::anyhow!("device transport requires a device_path"))?;
            info!("Sending bytecode to {}", path.display());
            Ok(Arc::new(DeviceTransport::new(path)))
        }
    }
}

/// Logs each transmission and reports success.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogTransport;

impl Transport for LogTransport {
    fn name(&self) -> &'static str {
        "log"
    }

    fn send(&self, bytecode: String) -> SendFuture<'_> {
        Box::pin(async move {
            info!(target: "bwtemu::transmit", "{bytecode}");
            Ok(())
        })
    }
}

/// Appends raw bytecode to a serial device node or a plain file.
#[derive(Debug)]
pub struct DeviceTransport {
    path: PathBuf,
    write_lock: tokio::sync::Mutex<()>,
}

impl DeviceTransport {
    /// Creates a transport writing to `path`. The path is opened on each send.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: tokio::sync::Mutex::new(()),
        }
    }
}

impl Transport for DeviceTransport {
    fn name(&self) -> &'static str {
        "device"
    }

    fn send(&self, bytecode: String) -> SendFuture<'_> {
        Box::pin(async move {
            // Serialize writes so flushes reach the device in order.
            let _guard = self.write_lock.lock().await;

            let mut file = tokio::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.path)
                .await?;
            file.write_all(bytecode.as_bytes()).await?;
            file.flush().await?;

            debug!("Wrote {} bytes to {}", bytecode.len(), self.path.display());
            Ok(())
        })
    }
}

/// Collects transmissions in memory. Clones share the same log.
#[derive(Debug, Clone, Default)]
pub struct MemoryTransport {
    sent: Arc<Mutex<Vec<String>>>,
    failing: Arc<AtomicBool>,
}

impl MemoryTransport {
    /// Creates an empty transport that accepts everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every accepted transmission, oldest first.
    #[must_use]
    pub fn sent(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// All accepted transmissions concatenated.
    #[must_use]
    pub fn joined(&self) -> String {
        self.sent().concat()
    }

    /// Makes subsequent sends fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

impl Transport for MemoryTransport {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn send(&self, bytecode: String) -> SendFuture<'_> {
        Box::pin(async move {
            if self.failing.load(Ordering::SeqCst) {
                return Err(TransportError::Rejected(bytecode));
            }
            self.sent
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(bytecode);
            Ok(())
        })
    }
}
