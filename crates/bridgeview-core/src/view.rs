//! Accessibility-addressed view hierarchy introspection.
//!
//! This module defines the types for navigating a device's on-screen UI
//! tree: [`AccessibilityId`] (the stable address of one node within one UI
//! snapshot), [`ViewRect`] (a node's on-screen location), and [`ViewNode`]
//! (a transient, read-only projection of one UI element).
//!
//! Because the UI tree lives on a remote, mutable device, nothing here
//! assumes the tree is static between two observations. Every accessor and
//! every parent/child navigation is a fresh transport query rather than a
//! walk of a locally cached structure, trading round trips for correctness
//! against a moving target. Consequently no node owns another — parent and
//! child lookups are id-keyed re-queries, so reference cycles cannot form
//! and a discarded node never invalidates its relatives.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::transport::{AttributeValue, DeviceTransport, TransportError};

/// Attribute names understood by the bridge's view queries.
pub(crate) mod attr {
    pub(crate) const CLASS: &str = "class";
    pub(crate) const TEXT: &str = "text";
    pub(crate) const LOCATION: &str = "location";
    pub(crate) const CHECKED: &str = "checked";
    pub(crate) const ENABLED: &str = "enabled";
    pub(crate) const SELECTED: &str = "selected";
    pub(crate) const FOCUSED: &str = "focused";
}

// ---------------------------------------------------------------------------
// AccessibilityId
// ---------------------------------------------------------------------------

/// The address of one UI node within a device's current UI snapshot.
///
/// A pair of the accessibility window id and the node id within that window.
/// Identity is stable for the lifetime of one snapshot only — the device can
/// rebuild its UI at any time, after which an id may address a different
/// node or nothing at all.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccessibilityId {
    /// The accessibility window id.
    pub window_id: i32,
    /// The node id within the window.
    pub node_id: i64,
}

impl AccessibilityId {
    /// Creates an id from its window and node components.
    pub const fn new(window_id: i32, node_id: i64) -> Self {
        Self { window_id, node_id }
    }

    /// Returns true if this is the all-zero sentinel the bridge uses for
    /// "no id assigned".
    ///
    /// Caveat: some devices can legitimately address a node at window 0 /
    /// node 0, which is indistinguishable from the sentinel. The bridge
    /// protocol does not disambiguate the two, and neither does this crate.
    pub const fn is_unset(&self) -> bool {
        self.window_id == 0 && self.node_id == 0
    }
}

impl std::fmt::Display for AccessibilityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.window_id, self.node_id)
    }
}

// ---------------------------------------------------------------------------
// ViewRect
// ---------------------------------------------------------------------------

/// A view's location on the device screen, in screen coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewRect {
    /// Left edge.
    pub x: i32,
    /// Top edge.
    pub y: i32,
    /// Width in pixels.
    pub width: i32,
    /// Height in pixels.
    pub height: i32,
}

// ---------------------------------------------------------------------------
// ViewNode
// ---------------------------------------------------------------------------

/// A read-only projection of one UI element on a device.
///
/// A node is identified by its [`AccessibilityId`], fixed at construction.
/// Everything else — class, text, location, state flags, parent, children —
/// is queried live from the transport on every call and can fail
/// independently per call without affecting the node's identity or any
/// sibling query. Two calls to the same accessor may observe different
/// values if the device UI changed in between; there is no caching contract
/// and no snapshot isolation.
///
/// Nodes are cheap to clone (a shared transport reference, a serial, and an
/// id) and carry no exclusive ownership obligation.
#[derive(Clone)]
pub struct ViewNode {
    transport: Arc<dyn DeviceTransport>,
    serial: Arc<str>,
    ids: AccessibilityId,
}

impl std::fmt::Debug for ViewNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewNode")
            .field("serial", &self.serial)
            .field("ids", &self.ids)
            .finish_non_exhaustive()
    }
}

impl ViewNode {
    pub(crate) fn new(
        transport: Arc<dyn DeviceTransport>,
        serial: Arc<str>,
        ids: AccessibilityId,
    ) -> Self {
        Self {
            transport,
            serial,
            ids,
        }
    }

    /// The node's accessibility ids — its stable identity within one UI
    /// snapshot. Infallible and invariant for the lifetime of this node.
    pub const fn accessibility_ids(&self) -> AccessibilityId {
        self.ids
    }

    /// The serial of the device this node belongs to.
    pub fn serial(&self) -> &str {
        &self.serial
    }

    async fn attribute(&self, attribute: &str) -> Result<AttributeValue, TransportError> {
        self.transport
            .query_attribute(&self.serial, self.ids, attribute)
            .await
    }

    /// The class name of the view (e.g., `"android.widget.Button"`).
    pub async fn view_class(&self) -> Result<String, TransportError> {
        self.attribute(attr::CLASS).await?.into_text(attr::CLASS)
    }

    /// The text contained in the view.
    pub async fn text(&self) -> Result<String, TransportError> {
        self.attribute(attr::TEXT).await?.into_text(attr::TEXT)
    }

    /// The location of the view on the device screen.
    pub async fn location(&self) -> Result<ViewRect, TransportError> {
        self.attribute(attr::LOCATION)
            .await?
            .into_rect(attr::LOCATION)
    }

    /// The checked status of the view.
    pub async fn checked(&self) -> Result<bool, TransportError> {
        self.attribute(attr::CHECKED).await?.into_flag(attr::CHECKED)
    }

    /// The enabled status of the view.
    pub async fn enabled(&self) -> Result<bool, TransportError> {
        self.attribute(attr::ENABLED).await?.into_flag(attr::ENABLED)
    }

    /// The selected status of the view.
    pub async fn selected(&self) -> Result<bool, TransportError> {
        self.attribute(attr::SELECTED)
            .await?
            .into_flag(attr::SELECTED)
    }

    /// The focused status of the view.
    pub async fn focused(&self) -> Result<bool, TransportError> {
        self.attribute(attr::FOCUSED).await?.into_flag(attr::FOCUSED)
    }

    /// Requests that the device change this view's selected status.
    ///
    /// No read-after-write guarantee: a subsequent [`selected`](Self::selected)
    /// call may not reflect the change if the device UI has moved on.
    pub async fn set_selected(&self, selected: bool) -> Result<(), TransportError> {
        self.transport
            .set_property(
                &self.serial,
                self.ids,
                attr::SELECTED,
                AttributeValue::Flag(selected),
            )
            .await
    }

    /// Requests that the device change this view's focused status.
    ///
    /// Same caveat as [`set_selected`](Self::set_selected).
    pub async fn set_focused(&self, focused: bool) -> Result<(), TransportError> {
        self.transport
            .set_property(
                &self.serial,
                self.ids,
                attr::FOCUSED,
                AttributeValue::Flag(focused),
            )
            .await
    }

    /// The parent of this view, or `None` for the hierarchy root.
    ///
    /// Resolved by an id lookup against the transport, not by following a
    /// stored back-pointer, so the result stays valid even if the node this
    /// was first reached through has been discarded.
    pub async fn parent(&self) -> Result<Option<ViewNode>, TransportError> {
        let parent = self
            .transport
            .query_parent(&self.serial, self.ids)
            .await?;
        Ok(parent.map(|ids| {
            ViewNode::new(Arc::clone(&self.transport), Arc::clone(&self.serial), ids)
        }))
    }

    /// The children of this view, in the order the transport reports them.
    ///
    /// Empty for leaf nodes. Each call re-queries the device and may
    /// observe a different UI state than a prior call.
    pub async fn children(&self) -> Result<Vec<ViewNode>, TransportError> {
        let children = self
            .transport
            .query_children(&self.serial, self.ids)
            .await?;
        Ok(children
            .into_iter()
            .map(|ids| {
                ViewNode::new(Arc::clone(&self.transport), Arc::clone(&self.serial), ids)
            })
            .collect())
    }
}
