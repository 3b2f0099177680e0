pub mod engine;
pub mod runtime;

// Frontends only need these two entry points.
pub use runtime::{plan_scenario, run_simulated_scenario};
