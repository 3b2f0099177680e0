mod actor;
mod error;
mod supervisor;

pub use self::{
    actor::{ActorReport, ActorSettings, EndpointActor},
    error::EngineError,
    supervisor::{preflight, FleetSupervisor, RunReport, ScenarioPlan},
};

pub mod prelude {
    pub use super::{
        preflight, ActorReport, ActorSettings, EndpointActor, EngineError, FleetSupervisor,
        RunReport, ScenarioPlan,
    };
}
