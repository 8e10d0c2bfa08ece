//! Network collaborator traits
//!
//! Three layers are modelled, each owned exclusively by the control loop:
//! - **`LinkLayer`**: local network join (Ethernet link + DHCP, Wi-Fi association)
//! - **`BrokerSession`**: the MQTT session used for commands and discovery
//! - **`HttpClient`**: one-shot requests to the time service

use core::fmt::Debug;
use core::future::Future;

/// Local network join
pub trait LinkLayer {
    /// Error reported by a failed join attempt
    type Error: Debug;

    /// Make one bounded join attempt
    ///
    /// Implementations must return within their own timeout; retrying is the
    /// caller's concern.
    fn join(&mut self) -> impl Future<Output = Result<(), Self::Error>>;

    /// Whether the link is currently usable for application traffic
    fn is_up(&self) -> bool;
}

/// Identity presented to the broker on connect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Credentials<'a> {
    pub client_id: &'a str,
    pub username: &'a str,
    pub password: &'a str,
}

/// Receiver for messages delivered by the broker session
///
/// Called synchronously from inside [`BrokerSession::poll`]; the topic and
/// payload borrows end when the call returns.
pub trait InboundHandler {
    fn on_message(&mut self, topic: &str, payload: &[u8]);
}

/// Broker session status codes reported by [`BrokerSession::status_code`]
///
/// Negative values are transport conditions seen by the client, positive
/// values are CONNACK refusals, following the PubSubClient numbering.
pub mod status {
    pub const CONNECTION_TIMEOUT: i32 = -4;
    pub const CONNECTION_LOST: i32 = -3;
    pub const CONNECT_FAILED: i32 = -2;
    pub const DISCONNECTED: i32 = -1;
    pub const CONNECTED: i32 = 0;
    pub const BAD_PROTOCOL: i32 = 1;
    pub const BAD_CLIENT_ID: i32 = 2;
    pub const UNAVAILABLE: i32 = 3;
    pub const BAD_CREDENTIALS: i32 = 4;
    pub const UNAUTHORIZED: i32 = 5;
}

/// Application-layer publish/subscribe session
pub trait BrokerSession {
    /// Error reported by session operations
    type Error: Debug;

    /// Make one connect attempt
    fn connect(
        &mut self,
        credentials: &Credentials<'_>,
    ) -> impl Future<Output = Result<(), Self::Error>>;

    /// Whether the session is established
    fn is_connected(&self) -> bool;

    /// Numeric client status, kept for diagnostics after a failed connect
    ///
    /// See [`status`] for the values.
    fn status_code(&self) -> i32;

    /// Subscribe to a topic filter
    fn subscribe(&mut self, topic: &str) -> impl Future<Output = Result<(), Self::Error>>;

    /// Publish a message
    fn publish(
        &mut self,
        topic: &str,
        payload: &[u8],
        retain: bool,
    ) -> impl Future<Output = Result<(), Self::Error>>;

    /// Run one step of the client's event processing
    ///
    /// Services keep-alive and hands any delivered message to `handler`.
    /// Must not wait for traffic; returns promptly when nothing is pending.
    /// A no-op when the session is not connected.
    fn poll<H: InboundHandler>(
        &mut self,
        handler: &mut H,
    ) -> impl Future<Output = Result<(), Self::Error>>;
}

/// Outcome of an HTTP exchange that reached the server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status code
    pub status: u16,
    /// Number of body bytes written into the caller's buffer
    pub body_len: usize,
}

/// Minimal blocking-style HTTP client
pub trait HttpClient {
    /// Transport error (DNS, socket, timeout, malformed framing)
    type Error: Debug;

    /// Issue a GET and copy the response body into `body`
    ///
    /// Bodies longer than `body` are truncated to its length.
    fn get(
        &mut self,
        url: &str,
        accept: &str,
        body: &mut [u8],
    ) -> impl Future<Output = Result<HttpResponse, Self::Error>>;
}
