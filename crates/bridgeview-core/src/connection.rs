//! Connection acquisition and lifecycle management.
//!
//! This module provides [`ConnectionManager`], which owns the wait-for-device
//! polling state machine: it repeatedly queries the transport's device list,
//! filters candidates through a [`DeviceSelector`], and hands out a
//! [`DeviceHandle`] once a match reaches [`DeviceState::Online`] — or reports
//! absence when the wait budget runs out. Every handle it produces is
//! registered so that [`shutdown`](ConnectionManager::shutdown) can release
//! them all, and terminate the bridge session if this manager created it.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use bridgeview_core::connection::{BridgeOptions, ConnectionManager};
//! use bridgeview_core::transport::DeviceTransport;
//!
//! # async fn example(transport: Arc<dyn DeviceTransport>) -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConnectionManager::open(transport, BridgeOptions::default()).await?;
//!
//! if let Some(device) = manager
//!     .wait_for_connection(Some(Duration::from_secs(10)), "emulator-5554")
//!     .await?
//! {
//!     println!("connected to {}", device.serial());
//! }
//!
//! manager.shutdown().await?;
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use tracing::{debug, info, warn};

use crate::device::DeviceHandle;
use crate::selector::DeviceSelector;
use crate::transport::{DeviceState, DeviceTransport, TransportError};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// How long to wait between checks of the transport's device list.
const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Margin added when promoting a sub-interval timeout, so that the budget
/// survives the first sleep and a second poll is guaranteed.
const POLL_MARGIN: Duration = Duration::from_millis(1);

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Options for initializing a bridge session via
/// [`ConnectionManager::open`].
#[derive(Debug, Clone)]
pub struct BridgeOptions {
    /// Where to find the bridge executable. `None` lets the transport
    /// locate it by itself.
    pub session_location: Option<PathBuf>,

    /// Whether to initialize the bridge with debugger support.
    pub debugger_support: bool,

    /// Whether to force a fresh bridge session even if one is already
    /// running.
    pub force_new_session: bool,
}

impl Default for BridgeOptions {
    fn default() -> Self {
        Self {
            session_location: None,
            debugger_support: false,
            force_new_session: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Shutdown errors
// ---------------------------------------------------------------------------

/// One device handle that could not be disposed during shutdown.
#[derive(Debug, Error)]
#[error("failed to dispose device {serial}: {source}")]
pub struct DisposalFailure {
    /// The serial of the device whose disposal failed.
    pub serial: String,

    /// The transport error that caused the failure.
    #[source]
    pub source: TransportError,
}

/// Aggregated failures from a best-effort [`ConnectionManager::shutdown`].
///
/// Shutdown attempts every registered handle regardless of individual
/// failures; everything that went wrong is collected here rather than
/// cutting the fan-out short.
#[derive(Debug, Error)]
#[error("shutdown finished with errors: {} device(s) failed to dispose", .disposals.len())]
pub struct ShutdownError {
    /// Disposal failures, one per handle that could not be released.
    pub disposals: Vec<DisposalFailure>,

    /// The error from terminating the bridge session, if this manager owned
    /// the session and terminating it failed.
    pub terminate: Option<TransportError>,
}

// ---------------------------------------------------------------------------
// ConnectionManager
// ---------------------------------------------------------------------------

/// Acquires device connections with a bounded polling wait and tracks every
/// handle it hands out so they can be released on shutdown.
///
/// A manager either *owns* its bridge session (created via
/// [`open`](Self::open), terminated on shutdown) or wraps a pre-initialized
/// transport (created via [`with_session`](Self::with_session), left running
/// on shutdown).
///
/// A single wait call polls on the calling task with no internal
/// parallelism; callers needing concurrent waits run them on separate tasks.
/// `shutdown` must not overlap an in-flight wait on the same manager —
/// that coordination is the caller's responsibility.
pub struct ConnectionManager {
    transport: Arc<dyn DeviceTransport>,
    devices: Mutex<Vec<DeviceHandle>>,
    owns_session: AtomicBool,
    cancel: CancellationToken,
}

impl ConnectionManager {
    /// Wraps a transport whose session the caller has already initialized.
    ///
    /// [`shutdown`](Self::shutdown) will dispose handed-out devices but will
    /// NOT terminate the transport session.
    pub fn with_session(transport: Arc<dyn DeviceTransport>) -> Self {
        Self {
            transport,
            devices: Mutex::new(Vec::new()),
            owns_session: AtomicBool::new(false),
            cancel: CancellationToken::new(),
        }
    }

    /// Initializes the bridge and creates a session owned by this manager.
    ///
    /// Runs `init` then `create_session` on the transport;
    /// [`shutdown`](Self::shutdown) will later terminate the session.
    ///
    /// # Errors
    ///
    /// Propagates any [`TransportError`] from bridge initialization; most
    /// commonly [`TransportError::Unavailable`] when the bridge cannot be
    /// started.
    pub async fn open(
        transport: Arc<dyn DeviceTransport>,
        options: BridgeOptions,
    ) -> Result<Self, TransportError> {
        transport.init(options.debugger_support).await?;
        transport
            .create_session(
                options.session_location.as_deref(),
                options.force_new_session,
            )
            .await?;
        info!("bridge session created");

        Ok(Self {
            transport,
            devices: Mutex::new(Vec::new()),
            owns_session: AtomicBool::new(true),
            cancel: CancellationToken::new(),
        })
    }

    /// A token that aborts a pending [`wait_for_connection`](Self::wait_for_connection).
    ///
    /// Cancelling it while a wait is sleeping between polls makes the wait
    /// return [`TransportError::Interrupted`] — not success, not absence.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Waits for any attached device to come online, with no deadline.
    ///
    /// Equivalent to `wait_for_connection(None, ".*")`.
    pub async fn wait_for_any(&self) -> Result<Option<DeviceHandle>, TransportError> {
        self.wait_for_connection(None, ".*").await
    }

    /// Waits for a device matching `selector` to reach
    /// [`DeviceState::Online`], polling the transport's device list every
    /// 200 ms until the budget runs out.
    ///
    /// `timeout` of `None` waits forever. A timeout smaller than one poll
    /// interval is silently promoted to one interval plus a small margin so
    /// that at least two polling attempts happen; very small timeouts never
    /// fail spuriously on the first check.
    ///
    /// The selector is matched as a regular expression with a literal
    /// string-equality fallback (see [`DeviceSelector`]). Among several
    /// simultaneously matching online devices, the first in the transport's
    /// reported order wins.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(handle))` — a matching device came online; the handle is
    ///   registered for disposal at shutdown.
    /// - `Ok(None)` — the budget ran out with no match. Absence is a normal
    ///   outcome, not an error.
    ///
    /// # Errors
    ///
    /// Transport failures from listing devices abort the wait immediately —
    /// "not yet online" is the only retried condition. Cancellation via
    /// [`cancel_token`](Self::cancel_token) aborts with
    /// [`TransportError::Interrupted`].
    pub async fn wait_for_connection(
        &self,
        timeout: Option<Duration>,
        selector: &str,
    ) -> Result<Option<DeviceHandle>, TransportError> {
        let selector = DeviceSelector::new(selector);

        let mut remaining = match timeout {
            None => Duration::MAX,
            // Promote sub-interval budgets: guarantee at least two polls.
            Some(t) if t < POLL_INTERVAL => POLL_INTERVAL + POLL_MARGIN,
            Some(t) => t,
        };

        loop {
            let devices = self.transport.list_devices().await?;
            debug!(
                selector = %selector,
                candidates = devices.len(),
                "polling device list"
            );

            let matched = devices
                .into_iter()
                .find(|d| selector.matches(&d.serial) && d.state == DeviceState::Online);
            if let Some(info) = matched {
                let handle =
                    DeviceHandle::new(Arc::clone(&self.transport), info.serial, info.state);
                info!(serial = handle.serial(), "device online, connection acquired");
                self.devices.lock().await.push(handle.clone());
                return Ok(Some(handle));
            }

            tokio::select! {
                _ = self.cancel.cancelled() => {
                    debug!(selector = %selector, "wait interrupted");
                    return Err(TransportError::Interrupted);
                }
                _ = sleep(POLL_INTERVAL) => {}
            }

            remaining = remaining.saturating_sub(POLL_INTERVAL);
            if remaining.is_zero() {
                debug!(selector = %selector, "wait budget exhausted, no device online");
                return Ok(None);
            }
        }
    }

    /// Disposes every registered device handle, then terminates the bridge
    /// session if this manager owns it.
    ///
    /// Disposal is best-effort fan-out: a failure on one handle never
    /// prevents attempting the rest. All failures are aggregated into the
    /// returned [`ShutdownError`]. Calling `shutdown` twice is safe — the
    /// second call finds an empty registry and, session ownership having
    /// been relinquished by the first call, does not terminate again.
    pub async fn shutdown(&self) -> Result<(), ShutdownError> {
        let handles: Vec<DeviceHandle> = {
            let mut devices = self.devices.lock().await;
            devices.drain(..).collect()
        };
        info!(count = handles.len(), "shutting down connection manager");

        let mut disposals = Vec::new();
        for handle in handles {
            if let Err(source) = handle.dispose().await {
                warn!(serial = handle.serial(), error = %source, "disposal failed");
                disposals.push(DisposalFailure {
                    serial: handle.serial().to_string(),
                    source,
                });
            }
        }

        let terminate = if self.owns_session.swap(false, Ordering::SeqCst) {
            match self.transport.terminate().await {
                Ok(()) => None,
                Err(e) => {
                    warn!(error = %e, "failed to terminate bridge session");
                    Some(e)
                }
            }
        } else {
            None
        };

        if disposals.is_empty() && terminate.is_none() {
            Ok(())
        } else {
            Err(ShutdownError {
                disposals,
                terminate,
            })
        }
    }
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("owns_session", &self.owns_session.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}
