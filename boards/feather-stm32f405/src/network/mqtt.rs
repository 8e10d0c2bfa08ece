#![allow(unsafe_code)] // Required for session buffer access
#![deny(warnings)]
//! MQTT v5.0 broker session using `rust-mqtt`
//!
//! Plain TCP to the broker (port 1883 on the local network). Each connect
//! attempt resolves the broker, opens a fresh socket and sends CONNECT; the
//! resulting client lives in [`MqttSession`] until an operation reports a
//! network failure, at which point it is dropped and the session reads as
//! disconnected.
//!
//! # Polling
//!
//! [`BrokerSession::poll`] never waits for traffic: it reads a packet only
//! when the socket already holds data (`receive_message_if_ready`), so a
//! read is never abandoned halfway through a packet. Keep-alive is serviced
//! from the same call: a PINGREQ goes out once half the keep-alive period
//! has passed since the client last sent anything.
//!
//! `send_ping` waits for the next packet and reports anything other than
//! PINGRESP as an error. An inbound PUBLISH landing in that window is
//! consumed by the client, but the stream stays in sync, so the session is
//! kept and the late PINGRESP is skipped on a later poll.

use defmt::{debug, error, info, warn, Debug2Format};
use embassy_net::{IpEndpoint, Stack};
use embassy_time::{Duration, Instant};
use hal_abstractions::network::status;
use hal_abstractions::{BrokerSession, Credentials, InboundHandler};
use rust_mqtt::client::client::MqttClient;
use rust_mqtt::client::client_config::{ClientConfig, MqttVersion};
use rust_mqtt::packet::v5::publish_packet::QualityOfService;
use rust_mqtt::packet::v5::reason_codes::ReasonCode;
use rust_mqtt::utils::rng_generator::CountingRng;
use splitflap_core::BrokerConfig;

use crate::buffers;

use super::error::NetworkError;
use super::socket::{resolve, AsyncTcpSocket};

/// MQTT v5 properties per packet
const MAX_PROPERTIES: usize = 5;

type Client = MqttClient<'static, AsyncTcpSocket<'static>, MAX_PROPERTIES, CountingRng>;

/// Broker session with a connection that survives between calls
pub struct MqttSession {
    stack: Stack<'static>,
    config: BrokerConfig,
    socket_timeout: Duration,
    client: Option<Client>,
    status: i32,
    /// Last time the client sent a packet, for keep-alive
    last_sent: Instant,
}

impl MqttSession {
    pub fn new(stack: Stack<'static>, config: BrokerConfig, socket_timeout: Duration) -> Self {
        Self {
            stack,
            config,
            socket_timeout,
            client: None,
            status: status::DISCONNECTED,
            last_sent: Instant::now(),
        }
    }

    /// Interval after which an idle session sends PINGREQ
    fn ping_interval(&self) -> Duration {
        Duration::from_millis(u64::from(self.config.keep_alive_secs) * 500)
    }

    /// Resolve, connect TCP and complete the MQTT handshake
    ///
    /// Only called from `connect` after the previous client was dropped.
    async fn open(&self, credentials: &Credentials<'_>) -> Result<Client, NetworkError> {
        let address = resolve(self.stack, self.config.host).await?;
        let endpoint = IpEndpoint::new(address, self.config.port);

        // SAFETY: The previous client and its socket were dropped by `connect`
        let buffers = unsafe { buffers::session_buffers() };

        let mut strings = buffers.credentials;
        let client_id = stash(&mut strings, credentials.client_id)?;
        let username = stash(&mut strings, credentials.username)?;
        let password = stash(&mut strings, credentials.password)?;

        let mut socket = AsyncTcpSocket::new(
            self.stack,
            buffers.tcp_rx,
            buffers.tcp_tx,
            self.socket_timeout,
        );
        socket.connect(endpoint).await?;
        info!("TCP connection established to {}", Debug2Format(&endpoint));

        let mut config = ClientConfig::new(MqttVersion::MQTTv5, CountingRng(20_000));
        config.add_max_subscribe_qos(QualityOfService::QoS0);
        config.add_client_id(client_id);
        if !username.is_empty() {
            config.add_username(username);
        }
        if !password.is_empty() {
            config.add_password(password);
        }
        config.keep_alive = self.config.keep_alive_secs;
        config.max_packet_size = buffers::MQTT_BUF_LEN as u32;

        let mut client = MqttClient::new(
            socket,
            buffers.mqtt_tx,
            buffers::MQTT_BUF_LEN,
            buffers.mqtt_rx,
            buffers::MQTT_BUF_LEN,
            config,
        );

        client.connect_to_broker().await.map_err(|code| {
            error!("MQTT connect failed: {:?}", Debug2Format(&code));
            NetworkError::Mqtt {
                status: connack_status(&code),
            }
        })?;

        Ok(client)
    }

    /// Drop the client after a network failure
    fn lose(&mut self, code: ReasonCode) -> NetworkError {
        warn!("MQTT connection lost: {:?}", Debug2Format(&code));
        self.client = None;
        self.status = status::CONNECTION_LOST;
        NetworkError::Mqtt {
            status: self.status,
        }
    }

    /// Map an operation failure, dropping the client if the transport broke
    fn fail(&mut self, code: ReasonCode) -> NetworkError {
        if matches!(code, ReasonCode::NetworkError) {
            self.lose(code)
        } else {
            NetworkError::Mqtt {
                status: connack_status(&code),
            }
        }
    }
}

impl BrokerSession for MqttSession {
    type Error = NetworkError;

    async fn connect(&mut self, credentials: &Credentials<'_>) -> Result<(), NetworkError> {
        // Releases the session buffers held by the previous connection
        self.client = None;

        let opened = self.open(credentials).await;
        match opened {
            Ok(client) => {
                self.client = Some(client);
                self.status = status::CONNECTED;
                self.last_sent = Instant::now();
                Ok(())
            }
            Err(e) => {
                self.status = match e {
                    NetworkError::Mqtt { status } => status,
                    NetworkError::Timeout => status::CONNECTION_TIMEOUT,
                    _ => status::CONNECT_FAILED,
                };
                Err(e)
            }
        }
    }

    fn is_connected(&self) -> bool {
        self.client.is_some()
    }

    fn status_code(&self) -> i32 {
        self.status
    }

    async fn subscribe(&mut self, topic: &str) -> Result<(), NetworkError> {
        let client = self.client.as_mut().ok_or(NetworkError::NotConnected)?;
        let result = client.subscribe_to_topic(topic).await;
        match result {
            Ok(()) => {
                self.last_sent = Instant::now();
                Ok(())
            }
            Err(code) => Err(self.fail(code)),
        }
    }

    async fn publish(&mut self, topic: &str, payload: &[u8], retain: bool) -> Result<(), NetworkError> {
        let client = self.client.as_mut().ok_or(NetworkError::NotConnected)?;
        let result = client
            .send_message(topic, payload, QualityOfService::QoS0, retain)
            .await;
        match result {
            Ok(()) => {
                self.last_sent = Instant::now();
                Ok(())
            }
            Err(code) => Err(self.fail(code)),
        }
    }

    async fn poll<H: InboundHandler>(&mut self, handler: &mut H) -> Result<(), NetworkError> {
        let Some(client) = self.client.as_mut() else {
            return Ok(());
        };

        let received = match client.receive_message_if_ready().await {
            Ok(Some((topic, payload))) => {
                handler.on_message(topic, payload);
                Ok(())
            }
            Ok(None) => Ok(()),
            Err(code) => Err(code),
        };
        if let Err(code) = received {
            match after_failure(&code) {
                Session::Keep => debug!("Skipped unsolicited MQTT packet"),
                Session::Drop => return Err(self.lose(code)),
            }
        }

        if self.last_sent.elapsed() < self.ping_interval() {
            return Ok(());
        }
        let Some(client) = self.client.as_mut() else {
            return Ok(());
        };
        let pinged = client.send_ping().await;
        if let Err(code) = pinged {
            match after_failure(&code) {
                Session::Keep => warn!("Packet arrived ahead of PINGRESP and was dropped"),
                Session::Drop => return Err(self.lose(code)),
            }
        }
        self.last_sent = Instant::now();
        Ok(())
    }
}

/// Whether the client is still usable after a failed read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Session {
    Keep,
    Drop,
}

/// `ImplementationSpecificError` means a whole packet was read that the
/// call had no use for (a late PINGRESP, or a PUBLISH while waiting on one),
/// so the stream is still in sync. Every other failure leaves it unknown.
fn after_failure(code: &ReasonCode) -> Session {
    match code {
        ReasonCode::ImplementationSpecificError => Session::Keep,
        _ => Session::Drop,
    }
}

/// Copy `value` to the front of `buf` and return it as a `'static` str
fn stash(buf: &mut &'static mut [u8], value: &str) -> Result<&'static str, NetworkError> {
    if value.len() > buf.len() {
        return Err(NetworkError::CredentialsTooLong);
    }
    let (head, tail) = core::mem::take(buf).split_at_mut(value.len());
    head.copy_from_slice(value.as_bytes());
    *buf = tail;
    core::str::from_utf8(head).map_err(|_| NetworkError::CredentialsTooLong)
}

/// PubSubClient-style status for a failed exchange
fn connack_status(code: &ReasonCode) -> i32 {
    match code {
        ReasonCode::NetworkError => status::CONNECT_FAILED,
        ReasonCode::UnsupportedProtocolVersion => status::BAD_PROTOCOL,
        ReasonCode::ClientIdNotValid => status::BAD_CLIENT_ID,
        ReasonCode::ServerUnavailable | ReasonCode::ServerBusy => status::UNAVAILABLE,
        ReasonCode::BadUserNameOrPassword => status::BAD_CREDENTIALS,
        ReasonCode::NotAuthorized => status::UNAUTHORIZED,
        _ => status::CONNECT_FAILED,
    }
}
