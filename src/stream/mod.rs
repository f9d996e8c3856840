//! Camera stream acquisition and release.
//!
//! A [`StreamHandle`] stands for one open hardware stream. Only the
//! [`StreamManager`] can create or stop one, which keeps the device from
//! leaking across capture sessions.

mod manager;

pub use manager::{StreamHandle, StreamManager};
