use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::validation;

/// Public land mobile network identity.
#[derive(Debug, Serialize, Deserialize, Validate, Clone, PartialEq, Eq)]
pub struct PlmnConfig {
    #[validate(custom(function = validation::validate_mcc))]
    pub mcc: String,

    #[validate(custom(function = validation::validate_mnc))]
    pub mnc: String,
}

impl Default for PlmnConfig {
    fn default() -> Self {
        Self {
            mcc: "208".into(),
            mnc: "93".into(),
        }
    }
}
