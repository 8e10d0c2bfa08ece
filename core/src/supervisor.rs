//! Connection supervisor
//!
//! Owns the two network layers and their lifecycle:
//!
//! ```text
//! Disconnected -> LinkJoining -> LinkJoined -> SessionConnecting -> SessionActive
//! ```
//!
//! The state is never stored. It is derived from the link and broker client
//! on every call to [`ConnectionSupervisor::state`], so a dropped session is
//! noticed on the next pass without any bookkeeping here.
//!
//! Pacing of reconnects is the control loop's job: [`ensure_session_up`]
//! makes exactly one attempt per call.
//!
//! [`ensure_session_up`]: ConnectionSupervisor::ensure_session_up

use hal_abstractions::{BrokerSession, Credentials, DelayNs, DisplaySink, LinkLayer};

use crate::config::{BrokerConfig, DeviceConfig, DeviceIdentity, LinkRetryPolicy};
use crate::discovery::{client_id, Discovery};
use crate::error::{LinkError, SessionError};
use crate::logging::{debug, info, warn, Dbg};
use crate::router::MessageRouter;

/// Connectivity as seen from the application
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConnectionState {
    Disconnected,
    LinkJoining,
    LinkJoined,
    SessionConnecting,
    SessionActive,
}

/// Link and broker session owner
pub struct ConnectionSupervisor<L, B> {
    link: L,
    session: B,
    identity: DeviceIdentity,
    broker: BrokerConfig,
    link_retry: LinkRetryPolicy,
    last_status: Option<i32>,
}

impl<L: LinkLayer, B: BrokerSession> ConnectionSupervisor<L, B> {
    pub fn new(link: L, session: B, config: &DeviceConfig) -> Self {
        Self {
            link,
            session,
            identity: config.identity,
            broker: config.broker,
            link_retry: config.link_retry,
            last_status: None,
        }
    }

    /// Current connectivity, recomputed from the underlying clients
    pub fn state(&self) -> ConnectionState {
        if self.session.is_connected() {
            ConnectionState::SessionActive
        } else if self.link.is_up() {
            ConnectionState::LinkJoined
        } else {
            ConnectionState::Disconnected
        }
    }

    pub fn is_session_active(&self) -> bool {
        self.session.is_connected()
    }

    /// Broker status code recorded by the last connect attempt
    pub fn last_status(&self) -> Option<i32> {
        self.last_status
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    pub fn session(&self) -> &B {
        &self.session
    }

    /// Join the local network, retrying until it comes up
    ///
    /// Waits between attempts as the retry policy dictates. With no attempt
    /// cap this only returns once the link is up. Returns the number of join
    /// attempts made (zero if the link was already up).
    pub async fn ensure_link_up<D: DelayNs>(&mut self, delay: &mut D) -> Result<u32, LinkError> {
        if self.link.is_up() {
            return Ok(0);
        }

        let mut attempt: u32 = 0;
        loop {
            attempt = attempt.saturating_add(1);
            info!(
                "Establishing connection to network (attempt {}, {:?})",
                attempt,
                ConnectionState::LinkJoining
            );

            match self.link.join().await {
                Ok(()) => {
                    info!("Connected to network after {} attempt(s)", attempt);
                    return Ok(attempt);
                }
                Err(e) => {
                    warn!("Network join failed: {:?}", Dbg(&e));
                }
            }

            if self
                .link_retry
                .max_attempts
                .is_some_and(|max| attempt >= max)
            {
                return Err(LinkError::AttemptsExhausted { attempts: attempt });
            }

            delay.delay_ms(self.link_retry.delay_after(attempt)).await;
        }
    }

    /// Make one broker connect attempt, then subscribe and announce
    ///
    /// On failure the client's status code is recorded and returned; the
    /// caller decides when to try again.
    pub async fn ensure_session_up(&mut self) -> Result<(), SessionError> {
        let discovery = Discovery::for_identity(&self.identity)?;
        let id = client_id(self.identity.hostname, self.broker.username)?;
        let credentials = Credentials {
            client_id: id.as_str(),
            username: self.broker.username,
            password: self.broker.password,
        };

        info!(
            "Attempting MQTT connection to {}:{} as {} ({:?})",
            self.broker.host,
            self.broker.port,
            id.as_str(),
            ConnectionState::SessionConnecting
        );

        let connected = self.session.connect(&credentials).await;
        let status = self.session.status_code();
        self.last_status = Some(status);

        if let Err(e) = connected {
            warn!("MQTT failed rc={} ({:?})", status, Dbg(&e));
            return Err(SessionError::ConnectFailed { status });
        }
        info!("MQTT connected");

        match self.session.subscribe(self.identity.command_topic).await {
            Ok(()) => info!("Subscribed to {}", self.identity.command_topic),
            Err(e) => warn!(
                "Failed to subscribe to {}: {:?}",
                self.identity.command_topic,
                Dbg(&e)
            ),
        }

        self.publish_discovery(&discovery).await
    }

    async fn publish_discovery(&mut self, discovery: &Discovery) -> Result<(), SessionError> {
        self.session
            .publish(
                discovery.topic.as_str(),
                discovery.payload.as_bytes(),
                true,
            )
            .await
            .map_err(|e| {
                warn!("Discovery publish failed: {:?}", Dbg(&e));
                SessionError::PublishFailed
            })?;

        info!("Published MQTT discovery message to {}", discovery.topic.as_str());
        Ok(())
    }

    /// Run one step of the broker client's event processing
    ///
    /// Called every pass whatever the connection state. Delivered messages
    /// go straight to `display`. Returns how many were forwarded.
    pub async fn pump<D: DisplaySink>(&mut self, display: &mut D) -> usize {
        let mut router = MessageRouter::new(display);
        if let Err(e) = self.session.poll(&mut router).await {
            debug!("MQTT poll error: {:?}", Dbg(&e));
        }
        router.forwarded()
    }
}
