/*!
# rantester simulator

In-process stand-ins for the external gNB and UE runtimes. They let the
orchestrator run end to end without a core network: NG setup, registration
and PDU session establishment become sampled delays, and an optional
failure injector makes registrations stall.

## Key Components:
- **Latency models:** fixed delay or delay plus seeded jitter.
- **Failure injector:** registrations that never complete.
- **Ledger:** what each runtime was asked to do, per UE incarnation.
*/

use std::sync::Arc;

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::SeedableRng;

use rantester_config::SimulatorConfig;

pub mod chaos;
pub mod gnb;
pub mod latency;
pub mod ledger;
pub mod ue;

pub use chaos::FailureInjector;
pub use gnb::SimulatedGnbRuntime;
pub use latency::{FixedLatencyModel, JitteredLatencyModel, LatencyModel};
pub use ledger::{Incarnation, SimulationLedger};
pub use ue::{SimulatedUeRuntime, SimulatedUeSession};

/// Both runtimes, wired to one seeded RNG and one ledger.
pub struct Simulation {
    pub stations: SimulatedGnbRuntime,
    pub endpoints: SimulatedUeRuntime,
    pub ledger: SimulationLedger,
}

impl Simulation {
    pub fn new(config: &SimulatorConfig) -> Self {
        let rng = Arc::new(Mutex::new(StdRng::seed_from_u64(config.seed)));
        let ledger = SimulationLedger::new();

        let stations = SimulatedGnbRuntime::new(
            latency::latency_model(config.gnb_setup_latency_ms, config.jitter_ms, &rng),
            ledger.clone(),
        );
        let endpoints = SimulatedUeRuntime::new(
            latency::latency_model(config.registration_latency_ms, config.jitter_ms, &rng),
            latency::latency_model(config.session_latency_ms, config.jitter_ms, &rng),
            FailureInjector::new(config.failure_probability, Arc::clone(&rng)),
            ledger.clone(),
        );

        Self {
            stations,
            endpoints,
            ledger,
        }
    }
}
