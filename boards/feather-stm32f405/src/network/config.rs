#![deny(unsafe_code)]
#![deny(warnings)]
//! Board network configuration
//!
//! Broker address and credentials are baked in at build time from the
//! environment, e.g. `SPLITFLAP_MQTT_PASSWORD=... cargo embed --release`.
//! Anything unset falls back to the defaults in [`DeviceConfig`].

use splitflap_core::DeviceConfig;

/// Network stack configuration
#[derive(Debug, Clone, Copy)]
pub struct NetworkConfig {
    /// MAC address for Ethernet
    pub mac_addr: [u8; 6],
    /// Random seed for network stack
    pub seed: u64,
    /// How long one link join attempt waits for a DHCP lease
    pub dhcp_timeout_ms: u64,
    /// Upper bound for TCP connect and each socket read/write
    pub socket_timeout_ms: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            mac_addr: [0x02, 0x00, 0x00, 0x12, 0x34, 0x56],
            seed: 0x1234_5678_u64,
            dhcp_timeout_ms: 10_000,
            socket_timeout_ms: 5_000,
        }
    }
}

/// Device configuration with build-time overrides applied
pub fn device_config() -> DeviceConfig {
    let mut config = DeviceConfig::default();

    if let Some(host) = option_env!("SPLITFLAP_MQTT_HOST") {
        config.broker.host = host;
    }
    if let Some(port) = option_env!("SPLITFLAP_MQTT_PORT").and_then(|p| p.parse().ok()) {
        config.broker.port = port;
    }
    if let Some(username) = option_env!("SPLITFLAP_MQTT_USERNAME") {
        config.broker.username = username;
    }
    if let Some(password) = option_env!("SPLITFLAP_MQTT_PASSWORD") {
        config.broker.password = password;
    }
    if let Some(hostname) = option_env!("SPLITFLAP_HOSTNAME") {
        config.identity.hostname = hostname;
    }
    if let Some(url) = option_env!("SPLITFLAP_TIME_URL") {
        config.time_sync.url = url;
    }

    config
}
