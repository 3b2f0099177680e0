//! Per-UE state owned by its actor.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::topology::BaseStationContext;

/// 5GMM registration state as reported by the UE runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegistrationState {
    Deregistered,
    RegisteredInitiated,
    Registered,
    DeregisteredInitiated,
}

/// Coarse lifecycle of one UE actor, as seen by the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ActorPhase {
    Idle,
    Registering,
    Registered,
    SessionsPending,
    SessionsEstablished,
    Terminating,
    Terminated,
}

impl fmt::Display for ActorPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ActorPhase::Idle => "idle",
            ActorPhase::Registering => "registering",
            ActorPhase::Registered => "registered",
            ActorPhase::SessionsPending => "sessions-pending",
            ActorPhase::SessionsEstablished => "sessions-established",
            ActorPhase::Terminating => "terminating",
            ActorPhase::Terminated => "terminated",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
pub struct EndpointContext {
    /// 1-based UE index.
    pub ue_id: u32,
    /// MSIN derived from the configured base.
    pub identity: String,
    pub station: Arc<BaseStationContext>,
    pub registration: RegistrationState,
    pub phase: ActorPhase,
    pub sessions_established: u8,
}

impl EndpointContext {
    pub fn new(ue_id: u32, identity: String, station: Arc<BaseStationContext>) -> Self {
        Self {
            ue_id,
            identity,
            station,
            registration: RegistrationState::Deregistered,
            phase: ActorPhase::Idle,
            sessions_established: 0,
        }
    }

    /// Moves the phase forward; earlier phases are ignored.
    pub fn advance(&mut self, next: ActorPhase) -> bool {
        if next <= self.phase {
            return false;
        }
        debug!(ue_id = self.ue_id, from = %self.phase, to = %next, "phase change");
        self.phase = next;
        true
    }
}
