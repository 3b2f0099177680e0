//! Custom validation functions for configuration.

use validator::ValidationError;

/// MSIN: non-empty decimal numeral, at most 38 digits.
pub fn validate_msin(msin: &str) -> Result<(), ValidationError> {
    let re = regex::Regex::new("^[0-9]{1,38}$")
        .map_err(|_| ValidationError::new("invalid_regex"))?;
    if re.is_match(msin) {
        Ok(())
    } else {
        Err(ValidationError::new("msin_not_numeric"))
    }
}

/// Mobile country code: exactly three digits.
pub fn validate_mcc(mcc: &str) -> Result<(), ValidationError> {
    let re = regex::Regex::new("^[0-9]{3}$").map_err(|_| ValidationError::new("invalid_regex"))?;
    if re.is_match(mcc) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_mcc"))
    }
}

/// Mobile network code: two or three digits.
pub fn validate_mnc(mnc: &str) -> Result<(), ValidationError> {
    let re =
        regex::Regex::new("^[0-9]{2,3}$").map_err(|_| ValidationError::new("invalid_regex"))?;
    if re.is_match(mnc) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_mnc"))
    }
}

/// Log level accepted by the subscriber filter.
pub fn validate_level(level: &str) -> Result<(), ValidationError> {
    let valid = ["trace", "debug", "info", "warn", "error"]
        .contains(&level.to_lowercase().as_str());
    if valid {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_log_level"))
    }
}
