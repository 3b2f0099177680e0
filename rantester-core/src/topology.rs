//! Base-station topology: how many gNBs a scenario needs, which addresses
//! they get, and which gNB serves a given UE.

use std::collections::BTreeMap;
use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;

use ipnetwork::IpNetwork;

use crate::address::AddressAllocator;
use crate::error::TopologyError;
use crate::identity::gnb_id;

/// Network a station broadcasts and a UE subscribes to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Plmn {
    pub mcc: String,
    pub mnc: String,
}

impl Plmn {
    pub fn new(mcc: impl Into<String>, mnc: impl Into<String>) -> Self {
        Self {
            mcc: mcc.into(),
            mnc: mnc.into(),
        }
    }

    /// Full IMSI of the subscriber `msin` in this network.
    pub fn imsi(&self, msin: &str) -> String {
        format!("{}{}{}", self.mcc, self.mnc, msin)
    }
}

impl fmt::Display for Plmn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.mcc, self.mnc)
    }
}

/// One simulated gNB. Immutable once built and shared read-only by its UEs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseStationContext {
    /// 1-based position in construction order.
    pub index: u32,
    pub gnb_id: String,
    /// N2 address.
    pub control_ip: IpAddr,
    pub control_port: u16,
    /// N3 address.
    pub data_ip: IpAddr,
    pub data_port: u16,
    pub plmn: Plmn,
}

/// Shared (one gNB for every UE) or dedicated (one gNB per UE).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topology {
    Shared,
    Dedicated,
}

impl Topology {
    pub fn from_dedicated(dedicated: bool) -> Self {
        if dedicated {
            Topology::Dedicated
        } else {
            Topology::Shared
        }
    }

    pub fn station_count(self, num_ues: u32) -> u32 {
        match self {
            Topology::Shared => 1,
            Topology::Dedicated => num_ues,
        }
    }

    /// 1-based station index serving `ue_id`; uses the same mapping as construction.
    pub fn station_index_for(self, ue_id: u32) -> u32 {
        match self {
            Topology::Shared => 1,
            Topology::Dedicated => ue_id,
        }
    }
}

/// Base addresses and subnets for the N2 and N3 interfaces.
///
/// Ports are shared: every station listens on the same ports at its own addresses.
#[derive(Debug, Clone, Copy)]
pub struct AddressPlan {
    pub control_base: IpAddr,
    pub control_port: u16,
    pub control_subnet: IpNetwork,
    pub data_base: IpAddr,
    pub data_port: u16,
    pub data_subnet: IpNetwork,
}

/// Derives every station of a scenario without starting any of them.
pub fn plan_stations(
    topology: Topology,
    num_ues: u32,
    plan: &AddressPlan,
    plmn: &Plmn,
) -> Result<Vec<BaseStationContext>, TopologyError> {
    let mut control = AddressAllocator::new(plan.control_base, plan.control_subnet)?;
    let mut data = AddressAllocator::new(plan.data_base, plan.data_subnet)?;

    (1..=topology.station_count(num_ues))
        .map(|index| {
            Ok(BaseStationContext {
                index,
                gnb_id: gnb_id(index)?,
                control_ip: control.next_address()?,
                control_port: plan.control_port,
                data_ip: data.next_address()?,
                data_port: plan.data_port,
                plmn: plmn.clone(),
            })
        })
        .collect()
}

/// gNB id → context for every started station.
#[derive(Debug, Clone)]
pub struct BaseStationSet {
    topology: Topology,
    stations: BTreeMap<String, Arc<BaseStationContext>>,
}

impl BaseStationSet {
    pub fn new(topology: Topology) -> Self {
        Self {
            topology,
            stations: BTreeMap::new(),
        }
    }

    pub fn topology(&self) -> Topology {
        self.topology
    }

    pub fn insert(
        &mut self,
        station: Arc<BaseStationContext>,
    ) -> Result<Arc<BaseStationContext>, TopologyError> {
        if self.stations.contains_key(&station.gnb_id) {
            return Err(TopologyError::DuplicateStation(station.gnb_id.clone()));
        }
        self.stations
            .insert(station.gnb_id.clone(), Arc::clone(&station));
        Ok(station)
    }

    pub fn get(&self, gnb_id: &str) -> Option<&Arc<BaseStationContext>> {
        self.stations.get(gnb_id)
    }

    /// Station serving `ue_id` under this set's topology.
    pub fn station_for_ue(&self, ue_id: u32) -> Option<&Arc<BaseStationContext>> {
        let id = gnb_id(self.topology.station_index_for(ue_id)).ok()?;
        self.stations.get(&id)
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<BaseStationContext>> {
        self.stations.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan(control: &str, data: &str, subnet_control: &str, subnet_data: &str) -> AddressPlan {
        AddressPlan {
            control_base: control.parse().unwrap(),
            control_port: 38412,
            control_subnet: subnet_control.parse().unwrap(),
            data_base: data.parse().unwrap(),
            data_port: 2152,
            data_subnet: subnet_data.parse().unwrap(),
        }
    }

    fn plmn() -> Plmn {
        Plmn::new("001", "01")
    }

    #[test]
    fn dedicated_topology_builds_one_station_per_ue() {
        let plan = plan("192.168.2.10", "192.168.3.10", "192.168.2.0/24", "192.168.3.0/24");
        let stations = plan_stations(Topology::Dedicated, 3, &plan, &plmn()).unwrap();
        assert_eq!(stations.len(), 3);
        assert_eq!(stations[2].gnb_id, "000003");
        assert_eq!(stations[2].control_ip, "192.168.2.12".parse::<IpAddr>().unwrap());
        assert_eq!(stations[2].data_ip, "192.168.3.12".parse::<IpAddr>().unwrap());
        assert!(stations
            .iter()
            .all(|station| station.control_port == 38412 && station.data_port == 2152));
        assert_eq!(stations[0].plmn, plmn());
    }

    #[test]
    fn shared_topology_builds_a_single_station() {
        let plan = plan("10.0.0.1", "10.0.1.1", "0.0.0.0/0", "0.0.0.0/0");
        let stations = plan_stations(Topology::Shared, 50, &plan, &plmn()).unwrap();
        assert_eq!(stations.len(), 1);
        assert_eq!(Topology::Shared.station_index_for(42), 1);
    }

    #[test]
    fn data_plane_violation_aborts_planning() {
        let plan = plan("10.0.0.1", "10.0.1.254", "10.0.0.0/24", "10.0.1.0/24");
        assert!(matches!(
            plan_stations(Topology::Dedicated, 3, &plan, &plmn()),
            Err(TopologyError::SubnetViolation { .. })
        ));
    }

    #[test]
    fn station_set_maps_ues_to_stations() {
        let plan = plan("10.0.0.1", "10.0.1.1", "0.0.0.0/0", "0.0.0.0/0");
        let mut set = BaseStationSet::new(Topology::Dedicated);
        for station in plan_stations(Topology::Dedicated, 4, &plan, &plmn()).unwrap() {
            set.insert(Arc::new(station)).unwrap();
        }
        assert_eq!(set.len(), 4);
        assert_eq!(set.station_for_ue(3).unwrap().index, 3);
        assert!(set.station_for_ue(5).is_none());

        let duplicate = Arc::clone(set.get("000001").unwrap());
        assert_eq!(
            set.insert(duplicate),
            Err(TopologyError::DuplicateStation("000001".into()))
        );
    }

    #[test]
    fn imsi_prefixes_the_msin_with_the_plmn() {
        let plmn = Plmn::new("208", "93");
        assert_eq!(plmn.imsi("0000000120"), "208930000000120");
        assert_eq!(plmn.to_string(), "208-93");
    }
}
