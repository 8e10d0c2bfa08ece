//! Hardware abstraction traits for the split-flap clock firmware
//!
//! This crate defines the boundaries between the platform-agnostic control
//! logic and the board. BSPs implement these traits; the core crate only ever
//! sees them through generics.
//!
//! Async operations are declared as `fn ... -> impl Future` rather than
//! `async fn` so that callers can name the returned futures without boxing.

#![no_std]
#![deny(unsafe_code)]
#![deny(warnings)]

pub mod display;
pub mod network;
pub mod time;

pub use display::DisplaySink;
pub use network::{BrokerSession, Credentials, HttpClient, HttpResponse, InboundHandler, LinkLayer};
pub use time::Monotonic;

// Delays come straight from embedded-hal-async so any HAL timer plugs in.
pub use embedded_hal_async::delay::DelayNs;
