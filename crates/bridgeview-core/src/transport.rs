//! The debug-bridge transport boundary.
//!
//! This module defines the [`DeviceTransport`] trait, which is everything the
//! connection and view-tree layers need from the underlying bridge: the
//! current device list with readiness states, session lifecycle hooks, and
//! per-node introspection queries. Locating the bridge executable, spawning
//! the daemon, and the wire protocol itself all live behind this trait.
//!
//! Implementations are expected to be cheap to share (`Arc<dyn
//! DeviceTransport>`); every consumer holds a shared reference and issues
//! independent round trips.

use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::view::{AccessibilityId, ViewRect};

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors that can occur while talking to the debug bridge.
///
/// Device absence is deliberately *not* represented here: a wait that runs
/// out of budget returns `Ok(None)`, and callers must check for it. Only
/// genuine transport failures take these forms.
#[derive(Error, Debug)]
pub enum TransportError {
    /// The bridge or its session could not be created or is unreachable.
    #[error("bridge unavailable: {0}")]
    Unavailable(String),

    /// The transport refused a specific request.
    #[error("command rejected: {0}")]
    CommandRejected(String),

    /// A single transport round trip exceeded its own timeout.
    #[error("transport operation timed out")]
    TimedOut,

    /// A pending wait was cancelled while sleeping between polls.
    #[error("wait interrupted")]
    Interrupted,

    /// One attribute query on one view node could not complete.
    ///
    /// This does not invalidate the node's identity; only the single
    /// accessor call that produced it failed.
    #[error("attribute query '{attribute}' failed: {reason}")]
    AttributeQueryFailed {
        /// The attribute that was being queried.
        attribute: String,
        /// Why the query could not complete.
        reason: String,
    },

    /// An I/O error occurred on the bridge connection.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A bridge payload could not be parsed.
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),
}

// ---------------------------------------------------------------------------
// Device readiness
// ---------------------------------------------------------------------------

/// A device's connection lifecycle stage as reported by the bridge.
///
/// Only [`Online`](DeviceState::Online) devices are handed out by the
/// connection manager; every other state is treated as "not yet ready" and
/// polled again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceState {
    /// Attached but not accepting commands.
    Offline,
    /// Still starting up.
    Booting,
    /// Ready for automation.
    Online,
    /// Previously attached, now gone.
    Disconnected,
}

impl std::fmt::Display for DeviceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DeviceState::Offline => "offline",
            DeviceState::Booting => "booting",
            DeviceState::Online => "online",
            DeviceState::Disconnected => "disconnected",
        };
        f.write_str(s)
    }
}

/// One attached device as reported by [`DeviceTransport::list_devices`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// The device's serial identifier (e.g., `"emulator-5554"`).
    pub serial: String,

    /// The device's current readiness state.
    pub state: DeviceState,
}

#[derive(Debug, Deserialize)]
struct DeviceList {
    devices: Vec<DeviceInfo>,
}

/// Parses a JSON device-list payload into a flat vector of devices.
///
/// Bridges that report their device table as JSON (`{"devices": [...]}`)
/// can use this directly; it is also the parsing seam the tests exercise.
///
/// # Errors
///
/// [`TransportError::JsonParse`] if the payload is invalid or has an
/// unexpected structure.
pub fn parse_device_list(json: &[u8]) -> Result<Vec<DeviceInfo>, TransportError> {
    let list: DeviceList = serde_json::from_slice(json)?;
    Ok(list.devices)
}

// ---------------------------------------------------------------------------
// Attribute values
// ---------------------------------------------------------------------------

/// A value returned by a view-node attribute query.
///
/// The transport reports attribute values dynamically typed; accessors on
/// [`ViewNode`](crate::view::ViewNode) narrow them with the `into_*`
/// extractors, which turn a shape mismatch into
/// [`TransportError::AttributeQueryFailed`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    /// A textual attribute (class name, text content).
    Text(String),
    /// A boolean attribute (checked, enabled, selected, focused).
    Flag(bool),
    /// A rectangle attribute (on-screen location).
    Rect(ViewRect),
}

impl AttributeValue {
    /// Converts a raw JSON value from the bridge into an attribute value.
    ///
    /// Strings become [`Text`](AttributeValue::Text), booleans become
    /// [`Flag`](AttributeValue::Flag), and objects with `x`/`y`/`width`/
    /// `height` become [`Rect`](AttributeValue::Rect).
    ///
    /// # Errors
    ///
    /// [`TransportError::AttributeQueryFailed`] if the value has none of the
    /// supported shapes.
    pub fn from_json(attribute: &str, value: serde_json::Value) -> Result<Self, TransportError> {
        serde_json::from_value(value).map_err(|e| TransportError::AttributeQueryFailed {
            attribute: attribute.to_string(),
            reason: e.to_string(),
        })
    }

    /// Extracts the textual payload.
    pub fn into_text(self, attribute: &str) -> Result<String, TransportError> {
        match self {
            AttributeValue::Text(s) => Ok(s),
            other => Err(Self::mismatch(attribute, "text", &other)),
        }
    }

    /// Extracts the boolean payload.
    pub fn into_flag(self, attribute: &str) -> Result<bool, TransportError> {
        match self {
            AttributeValue::Flag(b) => Ok(b),
            other => Err(Self::mismatch(attribute, "flag", &other)),
        }
    }

    /// Extracts the rectangle payload.
    pub fn into_rect(self, attribute: &str) -> Result<ViewRect, TransportError> {
        match self {
            AttributeValue::Rect(r) => Ok(r),
            other => Err(Self::mismatch(attribute, "rect", &other)),
        }
    }

    fn mismatch(attribute: &str, expected: &str, got: &AttributeValue) -> TransportError {
        TransportError::AttributeQueryFailed {
            attribute: attribute.to_string(),
            reason: format!("expected {expected} value, got {got:?}"),
        }
    }
}

// ---------------------------------------------------------------------------
// DeviceTransport trait
// ---------------------------------------------------------------------------

/// Everything the automation core needs from the underlying debug bridge.
///
/// Implementors wrap a concrete bridge (a local daemon, a TCP agent, a USB
/// tunnel). All methods take `&self`; implementations manage their own
/// interior locking so that multiple consumers can issue concurrent reads
/// against the same device. There is no atomicity guarantee across calls —
/// each is an independent round trip against a live, mutable device.
#[async_trait]
pub trait DeviceTransport: Send + Sync {
    /// Returns the currently attached devices and their readiness states,
    /// in the bridge's reported order.
    async fn list_devices(&self) -> Result<Vec<DeviceInfo>, TransportError>;

    /// Initializes the bridge layer.
    ///
    /// Called once by the connection manager that owns the bridge lifecycle,
    /// before [`create_session`](Self::create_session).
    async fn init(&self, debugger_support: bool) -> Result<(), TransportError>;

    /// Creates (or attaches to) the bridge session.
    ///
    /// `location` optionally points at the bridge executable; `force_new`
    /// requests a fresh session even if one is already running.
    async fn create_session(
        &self,
        location: Option<&Path>,
        force_new: bool,
    ) -> Result<(), TransportError>;

    /// Tears down the bridge session.
    async fn terminate(&self) -> Result<(), TransportError>;

    /// Queries one attribute of one view node on one device.
    async fn query_attribute(
        &self,
        serial: &str,
        ids: AccessibilityId,
        attribute: &str,
    ) -> Result<AttributeValue, TransportError>;

    /// Returns the accessibility ids of a node's children, in device order.
    async fn query_children(
        &self,
        serial: &str,
        ids: AccessibilityId,
    ) -> Result<Vec<AccessibilityId>, TransportError>;

    /// Returns the accessibility id of a node's parent, or `None` for the
    /// hierarchy root.
    async fn query_parent(
        &self,
        serial: &str,
        ids: AccessibilityId,
    ) -> Result<Option<AccessibilityId>, TransportError>;

    /// Asks the device to change a UI property of a node.
    ///
    /// There is no read-after-write guarantee: the device UI may have
    /// changed again before a subsequent query observes the new value.
    async fn set_property(
        &self,
        serial: &str,
        ids: AccessibilityId,
        property: &str,
        value: AttributeValue,
    ) -> Result<(), TransportError>;

    /// Releases transport-side resources held for one device.
    async fn dispose(&self, serial: &str) -> Result<(), TransportError>;
}
