//! Records what the simulated runtimes were asked to do.
//!
//! Tests and the CLI summary read it back to check the orchestrator's
//! ordering guarantees from the runtime's point of view.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;
use rantester_core::mailbox::Command;

/// One started UE incarnation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Incarnation {
    pub generation: u64,
    pub identity: String,
    pub gnb_id: String,
    pub commands: Vec<Command>,
    pub stopped: bool,
}

#[derive(Debug, Default)]
struct LedgerState {
    incarnations: BTreeMap<u32, Vec<Incarnation>>,
    live: BTreeMap<u32, usize>,
    max_live_per_ue: usize,
    overlaps: usize,
    stations_started: Vec<String>,
    stations_stopped: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct SimulationLedger {
    state: Arc<Mutex<LedgerState>>,
}

impl SimulationLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn station_started(&self, gnb_id: &str) {
        self.state.lock().stations_started.push(gnb_id.to_string());
    }

    pub(crate) fn station_stopped(&self, gnb_id: &str) {
        self.state.lock().stations_stopped.push(gnb_id.to_string());
    }

    pub(crate) fn endpoint_started(
        &self,
        ue_id: u32,
        generation: u64,
        identity: &str,
        gnb_id: &str,
    ) {
        let mut state = self.state.lock();
        state
            .incarnations
            .entry(ue_id)
            .or_default()
            .push(Incarnation {
                generation,
                identity: identity.to_string(),
                gnb_id: gnb_id.to_string(),
                commands: Vec::new(),
                stopped: false,
            });

        let live = state.live.entry(ue_id).or_insert(0);
        *live += 1;
        let live = *live;
        if live > 1 {
            state.overlaps += 1;
        }
        state.max_live_per_ue = state.max_live_per_ue.max(live);
    }

    pub(crate) fn command(&self, ue_id: u32, generation: u64, command: Command) {
        let mut state = self.state.lock();
        if let Some(incarnation) = find(&mut state, ue_id, generation) {
            incarnation.commands.push(command);
        }
    }

    pub(crate) fn endpoint_stopped(&self, ue_id: u32, generation: u64) {
        let mut state = self.state.lock();
        let Some(incarnation) = find(&mut state, ue_id, generation) else {
            return;
        };
        if incarnation.stopped {
            return;
        }
        incarnation.stopped = true;
        if let Some(live) = state.live.get_mut(&ue_id) {
            *live = live.saturating_sub(1);
        }
    }

    /// Every incarnation of `ue_id`, oldest first.
    pub fn incarnations(&self, ue_id: u32) -> Vec<Incarnation> {
        self.state
            .lock()
            .incarnations
            .get(&ue_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn total_starts(&self) -> usize {
        self.state.lock().incarnations.values().map(Vec::len).sum()
    }

    /// UE ids that were started at least once.
    pub fn ue_ids(&self) -> Vec<u32> {
        self.state.lock().incarnations.keys().copied().collect()
    }

    /// Highest number of simultaneously running incarnations seen for any single UE id.
    pub fn max_live_per_ue(&self) -> usize {
        self.state.lock().max_live_per_ue
    }

    /// How many starts found a previous incarnation of the same UE still running.
    pub fn overlaps(&self) -> usize {
        self.state.lock().overlaps
    }

    pub fn live_endpoints(&self) -> usize {
        self.state.lock().live.values().sum()
    }

    pub fn stations_started(&self) -> Vec<String> {
        self.state.lock().stations_started.clone()
    }

    pub fn stations_stopped(&self) -> Vec<String> {
        self.state.lock().stations_stopped.clone()
    }
}

fn find(state: &mut LedgerState, ue_id: u32, generation: u64) -> Option<&mut Incarnation> {
    state
        .incarnations
        .get_mut(&ue_id)?
        .iter_mut()
        .rev()
        .find(|incarnation| incarnation.generation == generation)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_overlapping_incarnations() {
        let ledger = SimulationLedger::new();
        ledger.endpoint_started(1, 1, "0000000120", "000001");
        ledger.endpoint_stopped(1, 1);
        ledger.endpoint_started(1, 2, "0000000120", "000001");
        assert_eq!(ledger.overlaps(), 0);
        assert_eq!(ledger.max_live_per_ue(), 1);

        ledger.endpoint_started(1, 3, "0000000120", "000001");
        assert_eq!(ledger.overlaps(), 1);
        assert_eq!(ledger.max_live_per_ue(), 2);
        assert_eq!(ledger.live_endpoints(), 2);
    }

    #[test]
    fn commands_land_on_their_generation() {
        let ledger = SimulationLedger::new();
        ledger.endpoint_started(4, 1, "0000000123", "000001");
        ledger.endpoint_stopped(4, 1);
        ledger.endpoint_started(4, 2, "0000000123", "000001");
        ledger.command(4, 1, Command::Register);
        ledger.command(4, 2, Command::EstablishSession);

        let incarnations = ledger.incarnations(4);
        assert_eq!(incarnations[0].commands, vec![Command::Register]);
        assert_eq!(incarnations[1].commands, vec![Command::EstablishSession]);
    }

    #[test]
    fn double_stop_is_counted_once() {
        let ledger = SimulationLedger::new();
        ledger.endpoint_started(2, 1, "0000000121", "000001");
        ledger.endpoint_stopped(2, 1);
        ledger.endpoint_stopped(2, 1);
        assert_eq!(ledger.live_endpoints(), 0);
    }
}
