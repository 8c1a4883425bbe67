//! Import event bus.
//!
//! [`EventBus`] is an in-process publish/subscribe hub over
//! `tokio::sync::broadcast`. [`ImportEvent`] is what a running import
//! session reports as it starts, advances, pauses, completes and closes.

pub mod bus;

pub use bus::{EventBus, ImportEvent, ImportEventKind};
