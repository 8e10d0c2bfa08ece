#![deny(unsafe_code)]
#![deny(warnings)]
//! Async TCP socket wrapper for the protocol clients
//!
//! Wraps `embassy_net::tcp::TcpSocket` behind the `embedded-io-async` traits
//! `rust-mqtt` is written against (including `ReadReady`, for polling
//! without blocking), and puts a deadline on connect and on every
//! read and write so a dead peer can never stall the control loop.

use defmt::{error, Debug2Format};
use embassy_net::dns::DnsQueryType;
use embassy_net::tcp::TcpSocket;
use embassy_net::{IpAddress, IpEndpoint, Stack};
use embassy_time::{with_timeout, Duration};
use embedded_io_async::{ErrorType, Read, ReadReady, Write};

use super::error::NetworkError;

/// Resolve `host` to an IPv4 address; IP literals resolve without a query
pub async fn resolve(stack: Stack<'_>, host: &str) -> Result<IpAddress, NetworkError> {
    stack
        .dns_query(host, DnsQueryType::A)
        .await
        .map_err(|e| {
            error!("DNS query failed: {:?}", Debug2Format(&e));
            NetworkError::DnsError
        })?
        .first()
        .copied()
        .ok_or_else(|| {
            error!("DNS returned no results for {}", host);
            NetworkError::DnsError
        })
}

/// TCP socket with a per-operation deadline
pub struct AsyncTcpSocket<'a> {
    socket: TcpSocket<'a>,
    timeout: Duration,
}

impl<'a> AsyncTcpSocket<'a> {
    pub fn new(
        stack: Stack<'a>,
        rx_buffer: &'a mut [u8],
        tx_buffer: &'a mut [u8],
        timeout: Duration,
    ) -> Self {
        let mut socket = TcpSocket::new(stack, rx_buffer, tx_buffer);
        socket.set_timeout(Some(timeout));
        Self { socket, timeout }
    }

    /// Connect to a remote endpoint
    pub async fn connect(&mut self, endpoint: IpEndpoint) -> Result<(), NetworkError> {
        with_timeout(self.timeout, self.socket.connect(endpoint))
            .await
            .map_err(|_| NetworkError::Timeout)?
            .map_err(|_| NetworkError::SocketError)
    }

    /// Send FIN; the peer closing its side finishes the connection
    pub fn close(&mut self) {
        self.socket.close();
    }
}

impl ErrorType for AsyncTcpSocket<'_> {
    type Error = NetworkError;
}

impl Read for AsyncTcpSocket<'_> {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        with_timeout(self.timeout, self.socket.read(buf))
            .await
            .map_err(|_| NetworkError::Timeout)?
            .map_err(|_| NetworkError::SocketError)
    }
}

/// A closed receive half reads as ready, so the end of stream surfaces on
/// the next read instead of going unnoticed
impl ReadReady for AsyncTcpSocket<'_> {
    fn read_ready(&mut self) -> Result<bool, Self::Error> {
        Ok(self.socket.can_recv() || !self.socket.may_recv())
    }
}

impl Write for AsyncTcpSocket<'_> {
    async fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        with_timeout(self.timeout, self.socket.write(buf))
            .await
            .map_err(|_| NetworkError::Timeout)?
            .map_err(|_| NetworkError::SocketError)
    }

    async fn flush(&mut self) -> Result<(), Self::Error> {
        with_timeout(self.timeout, self.socket.flush())
            .await
            .map_err(|_| NetworkError::Timeout)?
            .map_err(|_| NetworkError::SocketError)
    }
}
