//! Shared test helpers for bridgeview-core integration tests.
//!
//! This module provides [`MockTransport`], a programmable in-memory
//! [`DeviceTransport`] whose device-list answers are scripted per poll and
//! whose view tree, attribute tables, and failure modes can be configured
//! per test.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use bridgeview_core::connection::ConnectionManager;
use bridgeview_core::device::DeviceHandle;
use bridgeview_core::transport::{
    AttributeValue, DeviceInfo, DeviceState, DeviceTransport, TransportError,
};
use bridgeview_core::view::AccessibilityId;

/// Installs a test tracing subscriber honoring `RUST_LOG`, once per process.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// What one `list_devices` poll should yield.
pub enum ListFrame {
    /// Report this device list.
    Devices(Vec<DeviceInfo>),
    /// Fail the poll with [`TransportError::CommandRejected`].
    Reject(String),
    /// Fail the poll with [`TransportError::Unavailable`].
    Unavailable(String),
}

/// Shorthand for a [`DeviceInfo`].
pub fn dev(serial: &str, state: DeviceState) -> DeviceInfo {
    DeviceInfo {
        serial: serial.to_string(),
        state,
    }
}

#[derive(Default)]
struct ViewTree {
    attributes: HashMap<(AccessibilityId, String), AttributeValue>,
    children: HashMap<AccessibilityId, Vec<AccessibilityId>>,
    parents: HashMap<AccessibilityId, AccessibilityId>,
}

/// A programmable in-memory transport.
///
/// Device-list polls consume scripted [`ListFrame`]s in order; once the
/// script is exhausted the last frame keeps repeating (an empty script
/// reports no devices). The view tree is a static table of attributes and
/// parent/child edges, with switchable failure injection.
#[derive(Default)]
pub struct MockTransport {
    frames: Mutex<Vec<ListFrame>>,
    poll_count: AtomicUsize,

    tree: Mutex<ViewTree>,
    queries_fail: AtomicBool,

    disposed: Mutex<Vec<String>>,
    dispose_failures: Mutex<HashSet<String>>,
    set_properties: Mutex<Vec<(AccessibilityId, String, AttributeValue)>>,

    init_calls: AtomicUsize,
    session_calls: AtomicUsize,
    terminate_calls: AtomicUsize,
    terminate_fails: AtomicBool,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Scripts one more device-list answer.
    pub fn push_frame(&self, frame: ListFrame) {
        self.frames.lock().unwrap().push(frame);
    }

    /// Scripts a plain device-list answer.
    pub fn push_devices(&self, devices: Vec<DeviceInfo>) {
        self.push_frame(ListFrame::Devices(devices));
    }

    /// How many times `list_devices` has been polled.
    pub fn polls(&self) -> usize {
        self.poll_count.load(Ordering::SeqCst)
    }

    pub fn set_attribute(&self, ids: AccessibilityId, attribute: &str, value: AttributeValue) {
        self.tree
            .lock()
            .unwrap()
            .attributes
            .insert((ids, attribute.to_string()), value);
    }

    pub fn set_children(&self, ids: AccessibilityId, children: Vec<AccessibilityId>) {
        let mut tree = self.tree.lock().unwrap();
        for child in &children {
            tree.parents.insert(*child, ids);
        }
        tree.children.insert(ids, children);
    }

    /// Makes every view query fail as if the device disconnected.
    pub fn fail_queries(&self) {
        self.queries_fail.store(true, Ordering::SeqCst);
    }

    /// Makes disposal of the given serial fail with `CommandRejected`.
    pub fn fail_dispose_for(&self, serial: &str) {
        self.dispose_failures
            .lock()
            .unwrap()
            .insert(serial.to_string());
    }

    /// Makes `terminate` fail.
    pub fn fail_terminate(&self) {
        self.terminate_fails.store(true, Ordering::SeqCst);
    }

    pub fn disposed(&self) -> Vec<String> {
        self.disposed.lock().unwrap().clone()
    }

    pub fn recorded_set_properties(&self) -> Vec<(AccessibilityId, String, AttributeValue)> {
        self.set_properties.lock().unwrap().clone()
    }

    pub fn init_calls(&self) -> usize {
        self.init_calls.load(Ordering::SeqCst)
    }

    pub fn session_calls(&self) -> usize {
        self.session_calls.load(Ordering::SeqCst)
    }

    pub fn terminate_calls(&self) -> usize {
        self.terminate_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DeviceTransport for MockTransport {
    async fn list_devices(&self) -> Result<Vec<DeviceInfo>, TransportError> {
        let poll = self.poll_count.fetch_add(1, Ordering::SeqCst);
        let frames = self.frames.lock().unwrap();
        if frames.is_empty() {
            return Ok(Vec::new());
        }
        let frame = &frames[poll.min(frames.len() - 1)];
        match frame {
            ListFrame::Devices(devices) => Ok(devices.clone()),
            ListFrame::Reject(msg) => Err(TransportError::CommandRejected(msg.clone())),
            ListFrame::Unavailable(msg) => Err(TransportError::Unavailable(msg.clone())),
        }
    }

    async fn init(&self, _debugger_support: bool) -> Result<(), TransportError> {
        self.init_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn create_session(
        &self,
        _location: Option<&Path>,
        _force_new: bool,
    ) -> Result<(), TransportError> {
        self.session_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn terminate(&self) -> Result<(), TransportError> {
        self.terminate_calls.fetch_add(1, Ordering::SeqCst);
        if self.terminate_fails.load(Ordering::SeqCst) {
            return Err(TransportError::Unavailable("terminate refused".to_string()));
        }
        Ok(())
    }

    async fn query_attribute(
        &self,
        _serial: &str,
        ids: AccessibilityId,
        attribute: &str,
    ) -> Result<AttributeValue, TransportError> {
        if self.queries_fail.load(Ordering::SeqCst) {
            return Err(TransportError::Unavailable("device disconnected".to_string()));
        }
        self.tree
            .lock()
            .unwrap()
            .attributes
            .get(&(ids, attribute.to_string()))
            .cloned()
            .ok_or_else(|| TransportError::AttributeQueryFailed {
                attribute: attribute.to_string(),
                reason: format!("node {ids} has no such attribute"),
            })
    }

    async fn query_children(
        &self,
        _serial: &str,
        ids: AccessibilityId,
    ) -> Result<Vec<AccessibilityId>, TransportError> {
        if self.queries_fail.load(Ordering::SeqCst) {
            return Err(TransportError::Unavailable("device disconnected".to_string()));
        }
        Ok(self
            .tree
            .lock()
            .unwrap()
            .children
            .get(&ids)
            .cloned()
            .unwrap_or_default())
    }

    async fn query_parent(
        &self,
        _serial: &str,
        ids: AccessibilityId,
    ) -> Result<Option<AccessibilityId>, TransportError> {
        if self.queries_fail.load(Ordering::SeqCst) {
            return Err(TransportError::Unavailable("device disconnected".to_string()));
        }
        Ok(self.tree.lock().unwrap().parents.get(&ids).copied())
    }

    async fn set_property(
        &self,
        _serial: &str,
        ids: AccessibilityId,
        property: &str,
        value: AttributeValue,
    ) -> Result<(), TransportError> {
        if self.queries_fail.load(Ordering::SeqCst) {
            return Err(TransportError::Unavailable("device disconnected".to_string()));
        }
        self.set_properties
            .lock()
            .unwrap()
            .push((ids, property.to_string(), value.clone()));
        self.tree
            .lock()
            .unwrap()
            .attributes
            .insert((ids, property.to_string()), value);
        Ok(())
    }

    async fn dispose(&self, serial: &str) -> Result<(), TransportError> {
        self.disposed.lock().unwrap().push(serial.to_string());
        if self.dispose_failures.lock().unwrap().contains(serial) {
            return Err(TransportError::CommandRejected(format!(
                "dispose refused for {serial}"
            )));
        }
        Ok(())
    }
}

/// Stands up a manager around a transport that reports `serial` online, and
/// returns the acquired device handle alongside the manager.
pub async fn connected_device(
    transport: Arc<MockTransport>,
    serial: &str,
) -> (ConnectionManager, DeviceHandle) {
    transport.push_devices(vec![dev(serial, DeviceState::Online)]);
    let manager = ConnectionManager::with_session(transport);
    let handle = manager
        .wait_for_connection(Some(std::time::Duration::from_secs(1)), serial)
        .await
        .expect("transport should not fail")
        .expect("device should be online on the first poll");
    (manager, handle)
}
