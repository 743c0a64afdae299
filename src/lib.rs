//! Extension activation, registry and lifecycle management.
//!
//! The [`extension`] module turns host-provided descriptors into live,
//! registered extension instances and dispatches their lifecycle hooks.
//! [`backend`] keeps inference backends current through the engine
//! extension, and [`notifications`] carries events between the two and any
//! observer.

pub mod app;
pub mod backend;
pub mod cli;
pub mod config;
pub mod extension;
pub mod logging;
pub mod notifications;
