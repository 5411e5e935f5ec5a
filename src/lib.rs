//! Web Push for the autoflex shift notifier.
//!
//! Built for `wasm32`, the crate is the browser side: the page controller
//! that registers the service worker and subscribes it to push, and the
//! service worker that turns push payloads into notifications. Built
//! natively, it is the collector those subscriptions are posted to and the
//! broadcaster that pushes payloads to them.

pub mod cfg;
pub mod control;
pub mod error;
pub mod key;
pub mod notification;

#[cfg(not(target_arch = "wasm32"))]
pub mod server;

#[cfg(target_arch = "wasm32")]
pub mod browser;

pub use error::{Error, Result};
