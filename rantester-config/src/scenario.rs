//! Multi-UE scenario parameters.
//!
//! Immutable for the whole run and checked once, before any gNB or UE
//! is started.

use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::{
    providers::{Format, Serialized, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::ConfigError;

/// Minimum time between UE spawns when GTP tunnels are created.
pub const TUNNEL_SPAWN_DELAY_FLOOR_MS: u64 = 500;

/// Maximum number of PDU sessions a UE may hold.
pub const MAX_PDU_SESSIONS: u8 = 16;

#[derive(Debug, Serialize, Deserialize, Validate, Clone, PartialEq, Eq)]
pub struct ScenarioConfig {
    /// Number of UEs spawned per iteration.
    #[validate(range(min = 1, max = 16_777_215))]
    pub num_ues: u32,

    /// Create a GTP tunnel interface for each UE.
    #[serde(default)]
    pub tunnel_enabled: bool,

    /// One gNB per UE instead of a single shared gNB.
    #[serde(default)]
    pub dedicated_gnb: bool,

    /// Repeat the registration of all UEs until interrupted.
    #[serde(default, rename = "loop")]
    pub loop_enabled: bool,

    /// Pause after each UE spawn (milliseconds).
    #[serde(default)]
    pub time_between_registration_ms: u64,

    /// Terminate each UE this long after it was spawned (milliseconds, 0 = never).
    #[serde(default)]
    pub time_before_deregistration_ms: u64,

    /// PDU sessions requested once a UE is registered.
    #[serde(default)]
    pub num_pdu_sessions: u8,

    /// Optional bound on the drain phase after the last spawn (milliseconds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hold_ms: Option<u64>,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            num_ues: 1,
            tunnel_enabled: false,
            dedicated_gnb: false,
            loop_enabled: false,
            time_between_registration_ms: 0,
            time_before_deregistration_ms: 0,
            num_pdu_sessions: 0,
            hold_ms: None,
        }
    }
}

impl ScenarioConfig {
    /// Pre-flight checks: cross-field constraints first, then field ranges.
    pub fn check(&self) -> Result<(), ConfigError> {
        if self.tunnel_enabled && !self.dedicated_gnb {
            return Err(ConfigError::TunnelRequiresDedicatedGnb);
        }
        if self.tunnel_enabled && self.time_between_registration_ms < TUNNEL_SPAWN_DELAY_FLOOR_MS
        {
            return Err(ConfigError::SpawnDelayBelowTunnelFloor {
                delay_ms: self.time_between_registration_ms,
                floor_ms: TUNNEL_SPAWN_DELAY_FLOOR_MS,
            });
        }
        if self.num_pdu_sessions > MAX_PDU_SESSIONS {
            return Err(ConfigError::TooManyPduSessions {
                requested: self.num_pdu_sessions,
                max: MAX_PDU_SESSIONS,
            });
        }
        self.validate()?;
        Ok(())
    }

    pub fn spawn_delay(&self) -> Duration {
        Duration::from_millis(self.time_between_registration_ms)
    }

    /// Auto-terminate delay, if configured.
    pub fn deregistration_delay(&self) -> Option<Duration> {
        (self.time_before_deregistration_ms > 0)
            .then(|| Duration::from_millis(self.time_before_deregistration_ms))
    }

    pub fn hold(&self) -> Option<Duration> {
        self.hold_ms.map(Duration::from_millis)
    }

    /// Loads a scenario file on top of the defaults and checks it.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound(PathBuf::from(path)));
        }

        Figment::from(Serialized::defaults(ScenarioConfig::default()))
            .merge(Yaml::file(path))
            .extract()
            .map_err(ConfigError::from)
            .and_then(|scenario: Self| {
                scenario.check()?;
                Ok(scenario)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario() -> ScenarioConfig {
        ScenarioConfig {
            num_ues: 3,
            ..ScenarioConfig::default()
        }
    }

    #[test]
    fn plain_scenario_passes() {
        scenario().check().expect("valid scenario");
    }

    #[test]
    fn tunnel_requires_dedicated_gnb() {
        let config = ScenarioConfig {
            tunnel_enabled: true,
            time_between_registration_ms: 1000,
            ..scenario()
        };
        assert!(matches!(
            config.check(),
            Err(ConfigError::TunnelRequiresDedicatedGnb)
        ));
    }

    #[test]
    fn tunnel_requires_spawn_delay_floor() {
        let config = ScenarioConfig {
            tunnel_enabled: true,
            dedicated_gnb: true,
            time_between_registration_ms: 100,
            ..scenario()
        };
        assert!(matches!(
            config.check(),
            Err(ConfigError::SpawnDelayBelowTunnelFloor {
                delay_ms: 100,
                floor_ms: 500
            })
        ));

        let config = ScenarioConfig {
            time_between_registration_ms: 500,
            ..config
        };
        config.check().expect("floor itself is allowed");
    }

    #[test]
    fn at_most_sixteen_pdu_sessions() {
        let config = ScenarioConfig {
            num_pdu_sessions: 17,
            ..scenario()
        };
        assert!(matches!(
            config.check(),
            Err(ConfigError::TooManyPduSessions {
                requested: 17,
                max: 16
            })
        ));
        let config = ScenarioConfig {
            num_pdu_sessions: 16,
            ..scenario()
        };
        config.check().expect("sixteen sessions are allowed");
    }

    #[test]
    fn zero_ues_is_rejected() {
        let config = ScenarioConfig {
            num_ues: 0,
            ..scenario()
        };
        assert!(matches!(config.check(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn loads_scenario_file() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "scenario.yaml",
                r#"
                num_ues: 5
                dedicated_gnb: true
                loop: true
                num_pdu_sessions: 2
                time_before_deregistration_ms: 3000
                "#,
            )?;
            let scenario = ScenarioConfig::load_from_path("scenario.yaml").unwrap();
            assert_eq!(scenario.num_ues, 5);
            assert!(scenario.loop_enabled);
            assert_eq!(
                scenario.deregistration_delay(),
                Some(Duration::from_millis(3000))
            );
            assert_eq!(scenario.hold(), None);
            Ok(())
        });
    }

    #[test]
    fn missing_scenario_file() {
        assert!(matches!(
            ScenarioConfig::load_from_path("does/not/exist.yaml"),
            Err(ConfigError::FileNotFound(_))
        ));
    }
}
