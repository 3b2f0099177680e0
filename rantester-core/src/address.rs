//! Sequential address allocation inside a flat subnet.
//!
//! Each simulated gNB gets the numeric successor of the previous gNB's
//! address on both its control (N2) and data (N3) interface. Operator ranges
//! must therefore be contiguous; no interface discovery is performed.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use ipnetwork::IpNetwork;

use crate::error::TopologyError;

/// Returns the big-endian successor of `address`, wrapping at the all-ones address.
#[inline]
pub fn increment_ip(address: IpAddr) -> IpAddr {
    match address {
        IpAddr::V4(v4) => IpAddr::V4(Ipv4Addr::from(u32::from(v4).wrapping_add(1))),
        IpAddr::V6(v6) => IpAddr::V6(Ipv6Addr::from(u128::from(v6).wrapping_add(1))),
    }
}

/// Checks that `address` belongs to `subnet`.
pub fn ensure_within(address: IpAddr, subnet: IpNetwork) -> Result<(), TopologyError> {
    if address.is_ipv4() != subnet.is_ipv4() {
        return Err(TopologyError::FamilyMismatch { address, subnet });
    }
    if !subnet.contains(address) {
        return Err(TopologyError::SubnetViolation { address, subnet });
    }
    Ok(())
}

/// Hands out consecutive addresses from a base address, refusing to leave the subnet.
#[derive(Debug, Clone)]
pub struct AddressAllocator {
    next: IpAddr,
    subnet: IpNetwork,
}

impl AddressAllocator {
    pub fn new(base: IpAddr, subnet: IpNetwork) -> Result<Self, TopologyError> {
        ensure_within(base, subnet)?;
        Ok(Self { next: base, subnet })
    }

    /// Returns the current address and advances the running base.
    pub fn next_address(&mut self) -> Result<IpAddr, TopologyError> {
        let address = self.next;
        ensure_within(address, self.subnet)?;
        self.next = increment_ip(address);
        Ok(address)
    }
}

/// Returns `count` consecutive addresses starting at `base`.
pub fn allocate(
    base: IpAddr,
    subnet: IpNetwork,
    count: usize,
) -> Result<Vec<IpAddr>, TopologyError> {
    let mut allocator = AddressAllocator::new(base, subnet)?;
    (0..count).map(|_| allocator.next_address()).collect()
}
