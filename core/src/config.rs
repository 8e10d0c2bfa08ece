//! Device configuration structures
//!
//! Every value here is a compile-time constant of the deployed device; the
//! board fills in secrets and otherwise takes the defaults.

/// Who this device is, and which topics it answers on
#[derive(Debug, Clone, Copy)]
pub struct DeviceIdentity {
    /// Device hostname, also the discovery node id and `unique_id`
    pub hostname: &'static str,
    /// Topic carrying text to show on the display
    pub command_topic: &'static str,
    /// Topic advertised as the entity state
    pub state_topic: &'static str,
    /// Home Assistant discovery prefix
    pub discovery_prefix: &'static str,
    /// Discovery component type
    pub discovery_component: &'static str,
}

impl Default for DeviceIdentity {
    fn default() -> Self {
        Self {
            hostname: "splitflap",
            command_topic: "splitflap/text/set",
            state_topic: "splitflap/text/set",
            discovery_prefix: "homeassistant",
            discovery_component: "text",
        }
    }
}

/// MQTT broker connection parameters
#[derive(Debug, Clone, Copy)]
pub struct BrokerConfig {
    /// Broker hostname or IPv4 literal
    pub host: &'static str,
    /// Broker port (1883 for plain MQTT)
    pub port: u16,
    pub username: &'static str,
    pub password: &'static str,
    /// Keep-alive interval in seconds
    pub keep_alive_secs: u16,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            host: "192.168.1.1",
            port: 1883,
            username: "splitflap",
            password: "",
            keep_alive_secs: 15,
        }
    }
}

/// Time service parameters
#[derive(Debug, Clone, Copy)]
pub struct TimeSyncConfig {
    /// Endpoint returning the worldtimeapi.org JSON document
    pub url: &'static str,
    /// Value sent in the `Accept` header
    pub accept: &'static str,
    /// Milliseconds between resync attempts while the session is up
    pub resync_interval_ms: u64,
    /// UTC offset assumed until the first successful sync
    pub default_utc_offset_secs: i32,
}

impl Default for TimeSyncConfig {
    fn default() -> Self {
        Self {
            url: "http://worldtimeapi.org/api/timezone/America/New_York",
            accept: "application/json",
            resync_interval_ms: 3_600_000,
            default_utc_offset_secs: -5 * 3600,
        }
    }
}

/// Retry cadence for the startup link join
///
/// The delay doubles after each failure up to `max_delay_ms`. With both
/// delays equal the cadence is fixed.
#[derive(Debug, Clone, Copy)]
pub struct LinkRetryPolicy {
    pub initial_delay_ms: u32,
    pub max_delay_ms: u32,
    /// `None` retries until the link comes up
    pub max_attempts: Option<u32>,
}

impl LinkRetryPolicy {
    /// Delay to wait after failed attempt number `attempt` (1-based)
    pub fn delay_after(&self, attempt: u32) -> u32 {
        let shift = attempt.saturating_sub(1).min(31);
        self.initial_delay_ms
            .saturating_mul(1u32 << shift)
            .min(self.max_delay_ms.max(self.initial_delay_ms))
    }
}

impl Default for LinkRetryPolicy {
    fn default() -> Self {
        Self {
            initial_delay_ms: 1000,
            max_delay_ms: 1000,
            max_attempts: None,
        }
    }
}

/// Control loop pacing
#[derive(Debug, Clone, Copy)]
pub struct LoopConfig {
    /// Minimum milliseconds between broker reconnect attempts
    pub reconnect_cooldown_ms: u64,
    /// Milliseconds yielded at the end of every pass
    pub yield_ms: u32,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            reconnect_cooldown_ms: 5000,
            yield_ms: 1,
        }
    }
}

/// Complete device configuration
#[derive(Debug, Clone, Copy, Default)]
pub struct DeviceConfig {
    pub identity: DeviceIdentity,
    pub broker: BrokerConfig,
    pub time_sync: TimeSyncConfig,
    pub link_retry: LinkRetryPolicy,
    pub control: LoopConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DeviceConfig::default();
        assert_eq!(config.broker.port, 1883);
        assert_eq!(config.control.reconnect_cooldown_ms, 5000);
        assert_eq!(config.time_sync.resync_interval_ms, 3_600_000);
        assert_eq!(config.time_sync.default_utc_offset_secs, -18000);
        assert_eq!(config.identity.state_topic, config.identity.command_topic);
    }

    #[test]
    fn test_fixed_link_cadence() {
        let policy = LinkRetryPolicy::default();
        assert_eq!(policy.delay_after(1), 1000);
        assert_eq!(policy.delay_after(10), 1000);
        assert_eq!(policy.delay_after(u32::MAX), 1000);
    }

    #[test]
    fn test_link_backoff_is_capped() {
        let policy = LinkRetryPolicy {
            initial_delay_ms: 250,
            max_delay_ms: 2000,
            max_attempts: Some(8),
        };
        assert_eq!(policy.delay_after(1), 250);
        assert_eq!(policy.delay_after(2), 500);
        assert_eq!(policy.delay_after(3), 1000);
        assert_eq!(policy.delay_after(4), 2000);
        assert_eq!(policy.delay_after(7), 2000);
    }
}
