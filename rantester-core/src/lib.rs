//! # rantester-core
//!
//! Building blocks of the multi-UE orchestrator: address and identity
//! derivation, gNB topology, per-UE mailboxes, the join barrier and the
//! traits the external gNB/UE runtimes implement.

pub mod address;
pub mod barrier;
pub mod endpoint;
pub mod error;
pub mod identity;
pub mod mailbox;
pub mod runtime;
pub mod topology;

pub mod prelude {
    pub use crate::address::{allocate, increment_ip, AddressAllocator};
    pub use crate::barrier::{BarrierUnit, JoinBarrier};
    pub use crate::endpoint::{ActorPhase, EndpointContext, RegistrationState};
    pub use crate::error::{RuntimeError, TopologyError};
    pub use crate::identity::{derive_identity, gnb_id, IdentityGenerator};
    pub use crate::mailbox::{mailbox, Command, Mailbox, MailboxClosed, MailboxHandle, MailboxTable};
    pub use crate::runtime::{
        EndpointRuntime, EndpointSession, EndpointSpec, StationHandle, StationRuntime,
    };
    pub use crate::topology::{
        plan_stations, AddressPlan, BaseStationContext, BaseStationSet, Plmn, Topology,
    };
}

pub use error::{RuntimeError, TopologyError};
