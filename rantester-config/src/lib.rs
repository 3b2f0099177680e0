//! # rantester configuration
//!
//! Layered configuration for the multi-UE tester: built-in defaults, YAML
//! files and `RANTESTER_*` environment variables, validated on load.
//!
//! Scenario parameters ([`ScenarioConfig`]) are kept separate from the
//! tester configuration because they usually come from the command line.

#![warn(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

mod error;
mod gnodeb;
mod plmn;
mod scenario;
mod simulator;
mod telemetry;
mod ue;
mod validation;

pub use error::ConfigError;
pub use gnodeb::{GnbConfig, InterfaceConfig};
pub use plmn::PlmnConfig;
pub use scenario::{ScenarioConfig, MAX_PDU_SESSIONS, TUNNEL_SPAWN_DELAY_FLOOR_MS};
pub use simulator::SimulatorConfig;
pub use telemetry::TelemetryConfig;
pub use ue::UeConfig;

const DEFAULT_CONFIG_FILE: &str = "config/rantester.yaml";
const ENV_PREFIX: &str = "RANTESTER_";

/// Top‑level configuration container.
#[derive(Debug, Serialize, Deserialize, Validate, Default, Clone)]
pub struct TesterConfig {
    /// Simulated gNB interfaces and timing.
    #[validate(nested)]
    #[serde(default)]
    pub gnodeb: GnbConfig,

    /// Simulated UE identity and registration deadline.
    #[validate(nested)]
    #[serde(default)]
    pub ue: UeConfig,

    #[validate(nested)]
    #[serde(default)]
    pub telemetry: TelemetryConfig,

    /// In-process gNB/UE stand-ins.
    #[validate(nested)]
    #[serde(default)]
    pub simulator: SimulatorConfig,
}

impl TesterConfig {
    /// Load configuration from default files and environment.
    ///
    /// Hierarchy:
    /// 1. Default values
    /// 2. `config/rantester.yaml`, if present
    /// 3. `config/<RANTESTER_ENV>.yaml`, if present
    /// 4. `RANTESTER_*` environment variables (`__` separates nested keys)
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(TesterConfig::default()));

        if Path::new(DEFAULT_CONFIG_FILE).exists() {
            figment = figment.merge(Yaml::file(DEFAULT_CONFIG_FILE));
        }

        if let Ok(env) = std::env::var("RANTESTER_ENV") {
            let env_file = format!("config/{}.yaml", env);
            if Path::new(&env_file).exists() {
                figment = figment.merge(Yaml::file(env_file));
            }
        }

        Self::extract(figment)
    }

    /// Load configuration from a specific file, still honouring environment overrides.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound(PathBuf::from(path)));
        }

        let figment =
            Figment::from(Serialized::defaults(TesterConfig::default())).merge(Yaml::file(path));
        Self::extract(figment)
    }

    fn extract(figment: Figment) -> Result<Self, ConfigError> {
        figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .map_err(ConfigError::from)
            .and_then(|config: Self| {
                config.validate()?;
                Ok(config)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_config_validation() {
        let config = TesterConfig::default();
        config.validate().expect("Default config should validate");
    }

    #[test]
    fn file_and_environment_layers() {
        figment::Jail::expect_with(|jail| {
            jail.create_dir("config")?;
            jail.create_file(
                "config/rantester.yaml",
                r#"
                gnodeb:
                  control_if:
                    ip: 192.168.2.10
                    port: 9487
                    subnet: 192.168.2.0/24
                ue:
                  msin: "0000000001"
                "#,
            )?;
            jail.set_env("RANTESTER_UE__REGISTRATION_TIMEOUT_MS", "2500");

            let config = TesterConfig::load().unwrap();
            assert_eq!(config.gnodeb.control_if.ip.to_string(), "192.168.2.10");
            assert_eq!(config.gnodeb.control_if.subnet.prefix(), 24);
            assert_eq!(config.gnodeb.data_if.port, 2152);
            assert_eq!(config.ue.msin, "0000000001");
            assert_eq!(config.ue.registration_timeout_ms, 2500);
            Ok(())
        });
    }

    #[test]
    fn invalid_file_is_rejected() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("bad.yaml", "ue:\n  msin: \"12x\"\n")?;
            assert!(matches!(
                TesterConfig::load_from_path("bad.yaml"),
                Err(ConfigError::Validation(_))
            ));
            Ok(())
        });
    }

    #[test]
    fn missing_file() {
        assert!(matches!(
            TesterConfig::load_from_path("nope/rantester.yaml"),
            Err(ConfigError::FileNotFound(_))
        ));
    }
}
