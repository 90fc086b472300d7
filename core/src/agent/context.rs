//! Services shared by every node of one agent.

use std::sync::Arc;

use super::clock::{Clock, SystemClock};
use super::faults::FaultRegistry;
use crate::persist::{PersistStorage, SavePolicy};
use crate::types::config::DEFAULT_IGNORE_UPDATE_MS;

/// Handed to every scalar and table at construction.
pub struct AgentContext {
    storage: Arc<PersistStorage>,
    faults: Arc<FaultRegistry>,
    clock: Arc<dyn Clock>,
    ignore_update_ms: u64,
}

impl AgentContext {
    pub fn new(storage: Arc<PersistStorage>) -> Self {
        AgentContext {
            storage,
            faults: Arc::new(FaultRegistry::new(true)),
            clock: Arc::new(SystemClock::new()),
            ignore_update_ms: DEFAULT_IGNORE_UPDATE_MS,
        }
    }

    /// In-memory storage, quiet faults, system clock.
    pub fn in_memory(policy: SavePolicy) -> Self {
        AgentContext::new(Arc::new(PersistStorage::in_memory(policy))).with_faults(Arc::new(FaultRegistry::new(false)))
    }

    pub fn with_faults(mut self, faults: Arc<FaultRegistry>) -> Self {
        self.faults = faults;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_ignore_update_ms(mut self, ms: u64) -> Self {
        self.ignore_update_ms = ms;
        self
    }

    pub fn storage(&self) -> &Arc<PersistStorage> {
        &self.storage
    }

    pub fn faults(&self) -> &Arc<FaultRegistry> {
        &self.faults
    }

    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    pub fn ignore_update_ms(&self) -> u64 {
        self.ignore_update_ms
    }

    /// Whether a GET event last fired at `last` may fire again now.
    pub(crate) fn get_window_open(&self, last: Option<u64>, now: u64) -> bool {
        match last {
            None => true,
            Some(last) => now.saturating_sub(last) > self.ignore_update_ms,
        }
    }
}
