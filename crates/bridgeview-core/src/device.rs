//! A live device connection handle.

use std::sync::Arc;

use tracing::debug;

use crate::transport::{DeviceState, DeviceTransport, TransportError};
use crate::view::{AccessibilityId, ViewNode};

/// One live connection to a device.
///
/// Handles are created only by the connection manager's polling loop, once a
/// matching device has reached [`DeviceState::Online`], and are registered
/// with the manager so they can be disposed at shutdown. They are cheap to
/// clone; all clones refer to the same transport-side resources, and
/// [`dispose`](Self::dispose) releases those resources for every clone.
#[derive(Clone)]
pub struct DeviceHandle {
    transport: Arc<dyn DeviceTransport>,
    serial: Arc<str>,
    state: DeviceState,
}

impl std::fmt::Debug for DeviceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceHandle")
            .field("serial", &self.serial)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl DeviceHandle {
    pub(crate) fn new(
        transport: Arc<dyn DeviceTransport>,
        serial: impl Into<Arc<str>>,
        state: DeviceState,
    ) -> Self {
        Self {
            transport,
            serial: serial.into(),
            state,
        }
    }

    /// The device's serial identifier.
    pub fn serial(&self) -> &str {
        &self.serial
    }

    /// The readiness state observed when the connection was acquired.
    ///
    /// This is a snapshot, not a live value; the device may have changed
    /// state since.
    pub const fn state(&self) -> DeviceState {
        self.state
    }

    /// Projects a view node for the given accessibility ids on this device.
    ///
    /// The node issues its own transport queries on every accessor call;
    /// constructing it performs no I/O.
    pub fn view(&self, ids: AccessibilityId) -> ViewNode {
        ViewNode::new(
            Arc::clone(&self.transport),
            Arc::clone(&self.serial),
            ids,
        )
    }

    /// Releases transport-side resources held for this device.
    ///
    /// Normally invoked by the connection manager's shutdown; callers that
    /// release a device early should not use the handle (or any of its
    /// clones) afterwards.
    pub async fn dispose(&self) -> Result<(), TransportError> {
        debug!(serial = %self.serial, "disposing device handle");
        self.transport.dispose(&self.serial).await
    }
}
