//! Simulated gNB configuration.
//!
//! The configured N2/N3 addresses are the addresses of the *first* gNB;
//! further gNBs in a dedicated topology take the following addresses.

use std::net::{IpAddr, Ipv4Addr};

use ipnetwork::{IpNetwork, Ipv4Network};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::plmn::PlmnConfig;

#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct GnbConfig {
    /// N2 (NGAP/SCTP) interface.
    #[validate(nested)]
    #[serde(default = "default_control_if")]
    pub control_if: InterfaceConfig,

    /// N3 (GTP-U) interface.
    #[validate(nested)]
    #[serde(default = "default_data_if")]
    pub data_if: InterfaceConfig,

    #[validate(nested)]
    #[serde(default)]
    pub plmn: PlmnConfig,

    /// Fallback wait for gNBs that cannot acknowledge readiness (milliseconds).
    #[validate(range(max = 60_000))]
    #[serde(default = "default_settle_delay")]
    pub settle_delay_ms: u64,

    /// Upper bound on waiting for readiness acknowledgements (milliseconds).
    #[validate(range(min = 1, max = 600_000))]
    #[serde(default = "default_ready_timeout")]
    pub ready_timeout_ms: u64,
}

/// Base address of one gNB interface and the subnet every derived address must stay in.
#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct InterfaceConfig {
    pub ip: IpAddr,

    #[validate(range(min = 1))]
    pub port: u16,

    #[serde(default = "default_subnet")]
    pub subnet: IpNetwork,
}

fn default_control_if() -> InterfaceConfig {
    InterfaceConfig {
        ip: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 9487,
        subnet: default_subnet(),
    }
}

fn default_data_if() -> InterfaceConfig {
    InterfaceConfig {
        ip: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 2152,
        subnet: default_subnet(),
    }
}

/// Unconstrained: every IPv4 address is acceptable.
fn default_subnet() -> IpNetwork {
    match Ipv4Network::new(Ipv4Addr::UNSPECIFIED, 0) {
        Ok(network) => IpNetwork::V4(network),
        Err(_) => unreachable!("a zero-length prefix is always valid"),
    }
}

fn default_settle_delay() -> u64 {
    1000
}

fn default_ready_timeout() -> u64 {
    5000
}

impl Default for GnbConfig {
    fn default() -> Self {
        Self {
            control_if: default_control_if(),
            data_if: default_data_if(),
            plmn: PlmnConfig::default(),
            settle_delay_ms: default_settle_delay(),
            ready_timeout_ms: default_ready_timeout(),
        }
    }
}
