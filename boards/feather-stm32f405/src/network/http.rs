#![deny(unsafe_code)]
#![deny(warnings)]
//! HTTP/1.0 GET over an embassy-net TCP socket
//!
//! One connection per request, read until the server closes it. Framing is
//! done by [`splitflap_core::http`].

use defmt::{debug, warn};
use embassy_net::{IpEndpoint, Stack};
use embassy_time::Duration;
use embedded_io_async::{Read, Write};
use hal_abstractions::{HttpClient, HttpResponse};
use splitflap_core::http::{get_request, split_response, Url};

use super::error::NetworkError;
use super::socket::{resolve, AsyncTcpSocket};

/// Status line, headers and a worldtimeapi.org body fit comfortably
const RESPONSE_BUF_LEN: usize = 2048;
const TCP_RX_LEN: usize = 1024;
const TCP_TX_LEN: usize = 512;

pub struct TcpHttpClient {
    stack: Stack<'static>,
    timeout: Duration,
}

impl TcpHttpClient {
    pub fn new(stack: Stack<'static>, timeout: Duration) -> Self {
        Self { stack, timeout }
    }
}

impl HttpClient for TcpHttpClient {
    type Error = NetworkError;

    async fn get(
        &mut self,
        url: &str,
        accept: &str,
        body: &mut [u8],
    ) -> Result<HttpResponse, NetworkError> {
        let url = Url::parse(url)?;
        let request = get_request(&url, accept)?;
        let address = resolve(self.stack, url.host).await?;

        let mut rx_buffer = [0u8; TCP_RX_LEN];
        let mut tx_buffer = [0u8; TCP_TX_LEN];
        let mut socket =
            AsyncTcpSocket::new(self.stack, &mut rx_buffer, &mut tx_buffer, self.timeout);
        socket.connect(IpEndpoint::new(address, url.port)).await?;
        socket.write_all(request.as_bytes()).await?;
        socket.flush().await?;

        let mut response = [0u8; RESPONSE_BUF_LEN];
        let mut len = 0;
        while len < response.len() {
            let n = socket.read(&mut response[len..]).await?;
            if n == 0 {
                break;
            }
            len += n;
        }
        if len == response.len() {
            warn!("HTTP response truncated to {} bytes", len);
        }
        socket.close();
        debug!("HTTP response: {} bytes", len);

        let (status, offset) = split_response(&response[..len])?;
        let body_len = (len - offset).min(body.len());
        body[..body_len].copy_from_slice(&response[offset..offset + body_len]);

        Ok(HttpResponse { status, body_len })
    }
}
