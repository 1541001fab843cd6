//! Bounded registry of in-flight tile requests.
//!
//! Entries are kept in admission order. The registry never holds more than
//! `max_in_flight` entries; admitting past the bound evicts the oldest entry,
//! which the caller then cancels. Of the admitted entries at most
//! `max_connections` are fetching at a time; a freed slot goes to the queued
//! entry with the highest priority, oldest first on ties.
//!
//! The registry does no I/O and sends nothing itself. Callers resolve the
//! entries it hands back after releasing the lock.

use std::collections::VecDeque;

use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use super::types::{TileError, TileOutcome};
use crate::coord::TileAddress;

/// Fetch progress of an admitted entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FetchState {
    Queued,
    Fetching,
}

/// One admitted request and everyone waiting on it.
pub(crate) struct InFlight {
    pub id: u64,
    pub address: TileAddress,
    pub priority: f32,
    pub state: FetchState,
    pub cancellation: CancellationToken,
    pub waiters: Vec<oneshot::Sender<TileOutcome>>,
}

impl InFlight {
    /// Deliver the same outcome to every waiter.
    pub fn resolve(self, outcome: TileOutcome) {
        for waiter in self.waiters {
            // Receiver dropped: the caller stopped caring
            let _ = waiter.send(outcome.clone());
        }
    }

    /// Stop the fetch task, if any, and resolve every waiter as cancelled.
    pub fn cancel(self) {
        self.cancellation.cancel();
        self.resolve(Err(TileError::Cancelled));
    }
}

/// Instruction to start fetching an entry.
#[derive(Debug, Clone)]
pub(crate) struct Dispatch {
    pub id: u64,
    pub address: TileAddress,
    pub cancellation: CancellationToken,
}

pub(crate) struct InFlightRegistry {
    entries: VecDeque<InFlight>,
    max_in_flight: usize,
    max_connections: usize,
    next_id: u64,
}

impl InFlightRegistry {
    pub fn new(max_in_flight: usize, max_connections: usize) -> Self {
        let max_in_flight = max_in_flight.max(1);
        Self {
            entries: VecDeque::with_capacity(max_in_flight),
            max_in_flight,
            max_connections: max_connections.max(1),
            next_id: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn contains(&self, address: &TileAddress) -> bool {
        self.position(address).is_some()
    }

    pub fn priority_of(&self, address: &TileAddress) -> Option<f32> {
        self.position(address).map(|i| self.entries[i].priority)
    }

    pub fn fetching(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.state == FetchState::Fetching)
            .count()
    }

    /// Addresses currently admitted, oldest first.
    pub fn addresses(&self) -> Vec<TileAddress> {
        self.entries.iter().map(|e| e.address).collect()
    }

    fn position(&self, address: &TileAddress) -> Option<usize> {
        self.entries.iter().position(|e| e.address == *address)
    }

    /// Attach a waiter to an existing entry, raising its priority to the
    /// maximum requested. Hands the waiter back if nothing is in flight for
    /// the address.
    pub fn join(
        &mut self,
        address: TileAddress,
        priority: f32,
        waiter: oneshot::Sender<TileOutcome>,
    ) -> Result<(), oneshot::Sender<TileOutcome>> {
        match self.position(&address) {
            Some(index) => {
                let entry = &mut self.entries[index];
                entry.priority = entry.priority.max(priority);
                entry.waiters.push(waiter);
                Ok(())
            }
            None => Err(waiter),
        }
    }

    /// Admit a new entry. Returns the entry evicted to make room, if any.
    ///
    /// Callers must [`join`](Self::join) first; admitting an address that is
    /// already in flight would create a duplicate fetch.
    pub fn admit(
        &mut self,
        address: TileAddress,
        priority: f32,
        waiter: oneshot::Sender<TileOutcome>,
    ) -> Option<InFlight> {
        debug_assert!(!self.contains(&address));

        let evicted = if self.entries.len() >= self.max_in_flight {
            self.entries.pop_front()
        } else {
            None
        };

        let id = self.next_id;
        self.next_id += 1;
        self.entries.push_back(InFlight {
            id,
            address,
            priority,
            state: FetchState::Queued,
            cancellation: CancellationToken::new(),
            waiters: vec![waiter],
        });
        evicted
    }

    /// Remove the entry for `address`, whatever its state.
    pub fn remove(&mut self, address: &TileAddress) -> Option<InFlight> {
        let index = self.position(address)?;
        self.entries.remove(index)
    }

    /// Remove the entry a fetch task was started for. Returns `None` if the
    /// entry was cancelled or evicted in the meantime.
    pub fn complete(&mut self, id: u64) -> Option<InFlight> {
        let index = self.entries.iter().position(|e| e.id == id)?;
        self.entries.remove(index)
    }

    /// Promote queued entries into free connection slots.
    pub fn dispatch(&mut self) -> Vec<Dispatch> {
        let mut started = Vec::new();
        let mut fetching = self.fetching();

        while fetching < self.max_connections {
            let mut best: Option<usize> = None;
            for (index, entry) in self.entries.iter().enumerate() {
                if entry.state != FetchState::Queued {
                    continue;
                }
                match best {
                    Some(b) if self.entries[b].priority >= entry.priority => {}
                    _ => best = Some(index),
                }
            }

            let Some(index) = best else { break };
            let entry = &mut self.entries[index];
            entry.state = FetchState::Fetching;
            started.push(Dispatch {
                id: entry.id,
                address: entry.address,
                cancellation: entry.cancellation.clone(),
            });
            fetching += 1;
        }

        started
    }

    /// Remove every entry.
    pub fn drain(&mut self) -> Vec<InFlight> {
        self.entries.drain(..).collect()
    }
}
