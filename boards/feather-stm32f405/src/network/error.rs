#![deny(unsafe_code)]
#![deny(warnings)]
//! Network transport error types

use defmt::Format;
use splitflap_core::HttpError;

/// Errors from the board's link, HTTP and MQTT transports
#[derive(Debug, Clone, Copy, Format)]
pub enum NetworkError {
    /// Ethernet controller did not come up
    DeviceInit,
    /// No DHCP lease within the join timeout
    DhcpTimeout,
    /// DNS resolution failed
    DnsError,
    /// Socket connect/read/write error
    SocketError,
    /// Operation did not finish in time
    Timeout,
    /// HTTP request or response framing
    Http(HttpError),
    /// Broker client failed, with its status code
    Mqtt { status: i32 },
    /// Operation needs a connected broker session
    NotConnected,
    /// Credentials do not fit the session's credential buffer
    CredentialsTooLong,
}

impl core::fmt::Display for NetworkError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::DeviceInit => write!(f, "Ethernet controller init failed"),
            Self::DhcpTimeout => write!(f, "DHCP timeout"),
            Self::DnsError => write!(f, "DNS resolution failed"),
            Self::SocketError => write!(f, "Socket error"),
            Self::Timeout => write!(f, "Request timeout"),
            Self::Http(e) => write!(f, "{}", e),
            Self::Mqtt { status } => write!(f, "MQTT error rc={}", status),
            Self::NotConnected => write!(f, "MQTT not connected"),
            Self::CredentialsTooLong => write!(f, "MQTT credentials too long"),
        }
    }
}

impl core::error::Error for NetworkError {}

impl From<HttpError> for NetworkError {
    fn from(e: HttpError) -> Self {
        Self::Http(e)
    }
}

impl embedded_io_async::Error for NetworkError {
    fn kind(&self) -> embedded_io_async::ErrorKind {
        match self {
            Self::SocketError => embedded_io_async::ErrorKind::BrokenPipe,
            Self::Timeout => embedded_io_async::ErrorKind::TimedOut,
            _ => embedded_io_async::ErrorKind::Other,
        }
    }
}
