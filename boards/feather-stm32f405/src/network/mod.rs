#![deny(warnings)]
//! Board implementations of the network collaborator traits
//!
//! - **`link`**: `LinkLayer` over the W5500 Ethernet link and a DHCP lease
//! - **`mqtt`**: `BrokerSession` using `rust-mqtt` over TCP
//! - **`http`**: `HttpClient` issuing HTTP/1.0 GETs over TCP
//! - **`socket`**: DNS helper and deadline-bound TCP socket shared by both clients
//! - **`config`**: board network settings and build-time overrides
//! - **`error`**: transport error enum
//!
//! The embassy-net `Stack` is `!Send`; everything here lives in the network task.

pub mod config;
pub mod error;
pub mod http;
pub mod link;
pub mod mqtt;
pub mod socket;

pub use config::NetworkConfig;
pub use error::NetworkError;
pub use http::TcpHttpClient;
pub use link::EthLink;
pub use mqtt::MqttSession;
