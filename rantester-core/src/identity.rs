//! Per-endpoint identity (MSIN) and per-station identity (gNB id) derivation.

use crate::error::TopologyError;

/// Largest gNB index that still renders into six hex digits.
pub const MAX_GNB_INDEX: u32 = 0x00ff_ffff;

/// Derives identities for endpoints `1..=N` from a fixed-width decimal base.
#[derive(Debug, Clone)]
pub struct IdentityGenerator {
    base: String,
    value: u128,
    width: usize,
}

impl IdentityGenerator {
    pub fn new(base: &str) -> Result<Self, TopologyError> {
        if base.is_empty() || !base.bytes().all(|b| b.is_ascii_digit()) {
            return Err(TopologyError::InvalidIdentity(base.to_string()));
        }
        let value = base
            .parse::<u128>()
            .map_err(|_| TopologyError::InvalidIdentity(base.to_string()))?;
        Ok(Self {
            base: base.to_string(),
            value,
            width: base.len(),
        })
    }

    /// Identity for 1-based `offset`: `base + (offset - 1)`, zero-padded to the base width.
    pub fn derive(&self, offset: u32) -> Result<String, TopologyError> {
        if offset == 0 {
            return Err(TopologyError::InvalidOffset(offset));
        }
        let overflow = || TopologyError::IdentityOverflow {
            base: self.base.clone(),
            offset,
            width: self.width,
        };
        let value = self
            .value
            .checked_add(u128::from(offset - 1))
            .ok_or_else(overflow)?;
        let rendered = format!("{:0width$}", value, width = self.width);
        if rendered.len() > self.width {
            return Err(overflow());
        }
        Ok(rendered)
    }
}

/// One-shot form of [`IdentityGenerator::derive`].
pub fn derive_identity(base: &str, offset: u32) -> Result<String, TopologyError> {
    IdentityGenerator::new(base)?.derive(offset)
}

/// gNB id for station `index`: six lowercase hex digits.
pub fn gnb_id(index: u32) -> Result<String, TopologyError> {
    if index > MAX_GNB_INDEX {
        return Err(TopologyError::StationIndexOutOfRange(index));
    }
    Ok(format!("{:06x}", index))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;

    #[test]
    fn derives_zero_padded_identities() {
        let generator = IdentityGenerator::new("0000000001").unwrap();
        let ids: Vec<_> = (1..=3).map(|i| generator.derive(i).unwrap()).collect();
        assert_eq!(ids, ["0000000001", "0000000002", "0000000003"]);
    }

    #[test]
    fn offset_is_one_based() {
        assert_eq!(derive_identity("0000000120", 1).unwrap(), "0000000120");
        assert_eq!(derive_identity("0000000120", 11).unwrap(), "0000000130");
        assert_eq!(
            derive_identity("0000000120", 0),
            Err(TopologyError::InvalidOffset(0))
        );
    }

    #[test]
    fn rejects_non_numeric_base() {
        for base in ["", "12a4", "+123", "-1", " 1"] {
            assert!(
                matches!(
                    IdentityGenerator::new(base),
                    Err(TopologyError::InvalidIdentity(_))
                ),
                "{base:?} should be rejected"
            );
        }
    }

    #[test]
    fn overflowing_the_width_is_an_error() {
        assert_eq!(derive_identity("9998", 2).unwrap(), "9999");
        assert!(matches!(
            derive_identity("9998", 3),
            Err(TopologyError::IdentityOverflow { width: 4, .. })
        ));
    }

    #[test]
    fn gnb_ids_are_hex() {
        assert_eq!(gnb_id(1).unwrap(), "000001");
        assert_eq!(gnb_id(26).unwrap(), "00001a");
        assert!(gnb_id(MAX_GNB_INDEX + 1).is_err());
    }

    proptest! {
        #[test]
        fn derivation_is_injective(start in 0u64..1_000_000, n in 1u32..200) {
            let base = format!("{:010}", start);
            let generator = IdentityGenerator::new(&base).unwrap();
            let mut seen = HashSet::new();
            for offset in 1..=n {
                let id = generator.derive(offset).unwrap();
                prop_assert_eq!(id.len(), 10);
                prop_assert_eq!(id.parse::<u64>().unwrap(), start + u64::from(offset) - 1);
                prop_assert!(seen.insert(id));
            }
        }
    }
}
