//! # bridgeview-core
//!
//! Core library for scripting interactions against a live device over a
//! debug-bridge transport.
//!
//! This crate provides the two hard pieces of a device-automation client:
//! acquiring a device connection with a bounded-time polling wait, and
//! navigating the device's on-screen UI hierarchy as a tree of nodes
//! addressed by accessibility identifiers, where every attribute read is a
//! live, independently fallible query.
//!
//! ## Modules
//!
//! - [`transport`] - The [`DeviceTransport`](transport::DeviceTransport)
//!   boundary trait, device readiness states, and attribute values
//! - [`selector`] - Device id matching (exact string or regular expression)
//! - [`connection`] - The wait-for-device polling state machine and handle
//!   registry
//! - [`device`] - A live device connection handle
//! - [`view`] - Accessibility ids and the [`ViewNode`](view::ViewNode)
//!   hierarchy projection
//!
//! ## Example
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
//! // Wait up to 30 seconds for any emulator to come online.
//! match manager
//!     .wait_for_connection(Some(Duration::from_secs(30)), "emulator-.*")
//!     .await?
//! {
//!     Some(device) => {
//!         let root = device.view(Default::default());
//!         for child in root.children().await? {
//!             println!("{}", child.view_class().await?);
//!         }
//!     }
//!     None => eprintln!("no device came online"),
//! }
//!
//! manager.shutdown().await?;
//! # Ok(())
//! # }
//! ```

pub mod connection;
pub mod device;
pub mod selector;
pub mod transport;
pub mod view;
