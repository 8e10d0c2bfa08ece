//! Broker session buffers in main SRAM
//!
//! The MQTT client outlives the call that connects it, so everything it
//! borrows (TCP socket buffers, packet buffers and the credential strings
//! handed to the CONNECT packet) must be `'static`. Each reconnect drops the
//! previous client before taking the buffers again.
//!
//! # Safety
//!
//! These buffers use `static mut`. Safety is ensured by:
//! - A single accessor handing out all of them at once
//! - Exactly one broker session in the firmware, running in one task
//! - The session dropping its client before calling the accessor again

#![allow(unsafe_code)] // Required for static mut buffers
#![deny(warnings)]

/// TCP socket buffers; one MQTT packet plus headroom
pub const TCP_BUF_LEN: usize = 1024;

/// MQTT packet buffers; bounds the largest inbound text and the discovery record
pub const MQTT_BUF_LEN: usize = 1024;

/// Client id, username and password, back to back
pub const CREDENTIAL_BUF_LEN: usize = 192;

static mut TCP_RX_BUF: [u8; TCP_BUF_LEN] = [0; TCP_BUF_LEN];
static mut TCP_TX_BUF: [u8; TCP_BUF_LEN] = [0; TCP_BUF_LEN];
static mut MQTT_RX_BUF: [u8; MQTT_BUF_LEN] = [0; MQTT_BUF_LEN];
static mut MQTT_TX_BUF: [u8; MQTT_BUF_LEN] = [0; MQTT_BUF_LEN];
static mut CREDENTIAL_BUF: [u8; CREDENTIAL_BUF_LEN] = [0; CREDENTIAL_BUF_LEN];

/// Every buffer one broker connection borrows
pub struct SessionBuffers {
    pub tcp_rx: &'static mut [u8],
    pub tcp_tx: &'static mut [u8],
    pub mqtt_rx: &'static mut [u8],
    pub mqtt_tx: &'static mut [u8],
    pub credentials: &'static mut [u8],
}

/// Get the session buffers
///
/// # Safety
///
/// The caller must ensure:
/// - No reference from a previous call is still alive (the previous client
///   and socket have been dropped)
/// - The buffers are not accessed concurrently from multiple contexts
pub unsafe fn session_buffers() -> SessionBuffers {
    // SAFETY: Caller guarantees exclusive use
    // Raw pointer dereference required per Rust 2024 edition
    SessionBuffers {
        tcp_rx: &mut *core::ptr::addr_of_mut!(TCP_RX_BUF),
        tcp_tx: &mut *core::ptr::addr_of_mut!(TCP_TX_BUF),
        mqtt_rx: &mut *core::ptr::addr_of_mut!(MQTT_RX_BUF),
        mqtt_tx: &mut *core::ptr::addr_of_mut!(MQTT_TX_BUF),
        credentials: &mut *core::ptr::addr_of_mut!(CREDENTIAL_BUF),
    }
}
