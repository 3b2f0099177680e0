//! Seams to the external gNB and UE runtimes.
//!
//! The orchestrator never looks inside a registration or PDU session
//! handshake. It starts stations and endpoints through these traits, feeds
//! endpoints their mailbox commands and observes registration state.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use crate::barrier::JoinBarrier;
use crate::endpoint::RegistrationState;
use crate::error::RuntimeError;
use crate::mailbox::Command;
use crate::topology::{BaseStationContext, Plmn};

/// A started gNB.
#[derive(Debug)]
pub struct StationHandle {
    pub context: Arc<BaseStationContext>,
    /// Fires once the gNB finished its own setup. `None` if the runtime cannot tell.
    pub ready: Option<oneshot::Receiver<()>>,
}

#[async_trait]
pub trait StationRuntime: Send + Sync + 'static {
    /// Starts the gNB task. The task must hold a unit of `barrier` until it
    /// exits, and exit once `shutdown` is cancelled.
    async fn start(
        &self,
        station: BaseStationContext,
        barrier: &JoinBarrier,
        shutdown: CancellationToken,
    ) -> Result<StationHandle, RuntimeError>;
}

/// Start request for one UE incarnation.
#[derive(Debug, Clone)]
pub struct EndpointSpec {
    pub ue_id: u32,
    /// MSIN; combined with `plmn` into the IMSI.
    pub identity: String,
    /// Home network of the subscriber.
    pub plmn: Plmn,
    /// Mailbox generation this incarnation reads from.
    pub generation: u64,
    pub tunnel_enabled: bool,
}

#[async_trait]
pub trait EndpointRuntime: Send + Sync + 'static {
    type Session: EndpointSession;

    async fn start(
        &self,
        spec: EndpointSpec,
        station: Arc<BaseStationContext>,
    ) -> Result<Self::Session, RuntimeError>;
}

/// Protocol engine of one running UE.
#[async_trait]
pub trait EndpointSession: Send + 'static {
    /// Runs `Register` or `EstablishSession`. `Terminate` is handled by [`shutdown`](Self::shutdown).
    async fn execute(&mut self, command: Command) -> Result<(), RuntimeError>;

    /// Waits for the next registration state change. Must be cancel safe.
    async fn observe_registration_state(&mut self) -> RegistrationState;

    /// Tears the UE down (deregistration, tunnel removal).
    async fn shutdown(&mut self);
}
