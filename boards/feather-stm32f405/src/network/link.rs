#![deny(unsafe_code)]
#![deny(warnings)]
//! Ethernet link layer
//!
//! The W5500 and embassy-net runners bring the PHY up on their own; a join
//! attempt only waits, with a deadline, for the DHCP lease.

use defmt::info;
use embassy_net::Stack;
use embassy_time::{with_timeout, Duration};
use hal_abstractions::LinkLayer;

use super::error::NetworkError;

/// Ethernet + DHCP link
pub struct EthLink {
    stack: Stack<'static>,
    dhcp_timeout: Duration,
}

impl EthLink {
    pub fn new(stack: Stack<'static>, dhcp_timeout: Duration) -> Self {
        Self {
            stack,
            dhcp_timeout,
        }
    }

    fn log_lease(&self) {
        if let Some(config) = self.stack.config_v4() {
            let octets = config.address.address().octets();
            info!(
                "IP: {}.{}.{}.{}",
                octets[0], octets[1], octets[2], octets[3]
            );

            if let Some(gateway) = config.gateway {
                let gw_octets = gateway.octets();
                info!(
                    "Gateway: {}.{}.{}.{}",
                    gw_octets[0], gw_octets[1], gw_octets[2], gw_octets[3]
                );
            }
        }
    }
}

impl LinkLayer for EthLink {
    type Error = NetworkError;

    async fn join(&mut self) -> Result<(), NetworkError> {
        info!("Waiting for DHCP...");
        with_timeout(self.dhcp_timeout, self.stack.wait_config_up())
            .await
            .map_err(|_| NetworkError::DhcpTimeout)?;
        info!("Network is UP!");
        self.log_lease();
        Ok(())
    }

    fn is_up(&self) -> bool {
        self.stack.is_link_up() && self.stack.is_config_up()
    }
}
