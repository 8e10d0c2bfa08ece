//! Platform-agnostic core logic for the split-flap clock
//!
//! Everything here runs the same on any board: connection supervision, time
//! sync, the local clock, display formatting and the control loop tying them
//! together. Hardware is reached only through the traits in
//! `hal-abstractions`, so the whole crate is unit tested on the host.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]
#![deny(warnings)]

mod logging;

pub mod clock;
pub mod config;
pub mod control;
pub mod discovery;
pub mod display;
pub mod error;
pub mod http;
pub mod router;
pub mod supervisor;
pub mod time_sync;
pub mod timer;

#[cfg(test)]
mod fakes;

pub use clock::{ClockModel, LocalDateTime};
pub use config::{
    BrokerConfig, DeviceConfig, DeviceIdentity, LinkRetryPolicy, LoopConfig, TimeSyncConfig,
};
pub use control::{ControlLoop, PassReport, Phase};
pub use display::{to_display_form, DisplayString, DisplayTracker, DisplayUpdate, DISPLAY_WIDTH};
pub use error::{
    DisplayFormError, HttpError, LinkError, SessionError, TimeSyncError, TopicError,
};
pub use supervisor::{ConnectionState, ConnectionSupervisor};
pub use time_sync::{TimeSyncClient, WorldTime};
