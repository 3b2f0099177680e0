use std::net::IpAddr;

use ipnetwork::IpNetwork;
use thiserror::Error;

use crate::mailbox::Command;

/// Failures while deriving the network topology or endpoint identities.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TopologyError {
    #[error("address {address} is outside subnet {subnet}")]
    SubnetViolation { address: IpAddr, subnet: IpNetwork },

    #[error("address {address} and subnet {subnet} belong to different IP families")]
    FamilyMismatch { address: IpAddr, subnet: IpNetwork },

    #[error("identity {0:?} is not a decimal numeral")]
    InvalidIdentity(String),

    #[error("identity offsets start at 1, got {0}")]
    InvalidOffset(u32),

    #[error("identity {base:?} + {offset} no longer fits {width} digits")]
    IdentityOverflow {
        base: String,
        offset: u32,
        width: usize,
    },

    #[error("station index {0} cannot be rendered as a gNB id")]
    StationIndexOutOfRange(u32),

    #[error("gNB {0} is already part of the station set")]
    DuplicateStation(String),
}

/// Failures reported by the external gNB / UE runtimes.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("gNB {gnb_id} failed to start: {reason}")]
    StationStart { gnb_id: String, reason: String },

    #[error("UE {ue_id} failed to start: {reason}")]
    EndpointStart { ue_id: u32, reason: String },

    #[error("UE {ue_id} rejected {command:?}: {reason}")]
    Command {
        ue_id: u32,
        command: Command,
        reason: String,
    },
}
