//! Subscription registry
//!
//! Owns every live subscription. Entries are addressed by generation-checked
//! ids; cancelled entries stay in place (so a cancel issued mid-turn is
//! observed by the dispatcher) until the next turn boundary reaps them.

use std::collections::HashMap;

use super::{Handler, SubscriptionId};
use crate::arena::Arena;
use crate::contract::ContractId;
use crate::error::LoopError;

struct Subscription {
    contract: ContractId,
    /// Registration order across the whole registry
    seq: u64,
    /// `None` while the callback is executing
    handler: Option<Box<dyn Handler>>,
    cancelled: bool,
    invocations: u64,
}

/// Set of live subscriptions, iterated in registration order
pub struct SubscriptionRegistry {
    entries: Arena<Subscription>,
    by_contract: HashMap<ContractId, Vec<SubscriptionId>>,
    next_seq: u64,
    limit: usize,
}

impl SubscriptionRegistry {
    pub(crate) fn new(limit: usize) -> Self {
        Self {
            entries: Arena::new(),
            by_contract: HashMap::new(),
            next_seq: 0,
            limit,
        }
    }

    pub(crate) fn insert(
        &mut self,
        contract: ContractId,
        handler: Box<dyn Handler>,
    ) -> Result<SubscriptionId, LoopError> {
        if self.active_count() >= self.limit {
            return Err(LoopError::SubscriptionLimit { limit: self.limit });
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        let id = SubscriptionId::from_index(self.entries.insert(Subscription {
            contract,
            seq,
            handler: Some(handler),
            cancelled: false,
            invocations: 0,
        }));
        self.by_contract.entry(contract).or_default().push(id);
        Ok(id)
    }

    /// Mark a subscription cancelled. Idempotent; stale ids are ignored.
    pub fn cancel(&mut self, id: SubscriptionId) -> bool {
        match self.entries.get_mut(id.index()) {
            Some(entry) if !entry.cancelled => {
                entry.cancelled = true;
                true
            }
            _ => false,
        }
    }

    pub fn is_active(&self, id: SubscriptionId) -> bool {
        self.entries
            .get(id.index())
            .is_some_and(|entry| !entry.cancelled)
    }

    /// Active subscriptions on `contract`, in registration order
    pub fn resolve(&self, contract: ContractId) -> impl Iterator<Item = SubscriptionId> + '_ {
        self.by_contract
            .get(&contract)
            .into_iter()
            .flatten()
            .copied()
            .filter(|id| self.is_active(*id))
    }

    /// Registration sequence of the earliest active subscription on
    /// `contract`; the dispatcher's tie-break key
    pub fn first_seq(&self, contract: ContractId) -> Option<u64> {
        self.resolve(contract)
            .filter_map(|id| self.entries.get(id.index()))
            .map(|entry| entry.seq)
            .min()
    }

    pub fn has_active(&self, contract: ContractId) -> bool {
        self.resolve(contract).next().is_some()
    }

    /// Whether any subscription on `contract` is still stored, dormant or
    /// cancelled-but-unreaped ones included
    pub fn has_subscriptions(&self, contract: ContractId) -> bool {
        self.by_contract.contains_key(&contract)
    }

    /// How many times the callback has been invoked
    pub fn invocations(&self, id: SubscriptionId) -> Option<u64> {
        self.entries.get(id.index()).map(|entry| entry.invocations)
    }

    pub(crate) fn take_handler(&mut self, id: SubscriptionId) -> Option<Box<dyn Handler>> {
        let entry = self.entries.get_mut(id.index())?;
        if entry.cancelled {
            return None;
        }
        entry.invocations += 1;
        entry.handler.take()
    }

    pub(crate) fn restore_handler(&mut self, id: SubscriptionId, handler: Box<dyn Handler>) {
        if let Some(entry) = self.entries.get_mut(id.index()) {
            entry.handler = Some(handler);
        }
    }

    /// Drop cancelled subscriptions and their state. Returns how many were
    /// reclaimed.
    pub(crate) fn reap(&mut self) -> usize {
        let dead: Vec<SubscriptionId> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.cancelled && entry.handler.is_some())
            .map(|(index, _)| SubscriptionId::from_index(index))
            .collect();

        for id in &dead {
            if let Some(entry) = self.entries.remove(id.index()) {
                if let Some(ids) = self.by_contract.get_mut(&entry.contract) {
                    ids.retain(|other| other != id);
                    if ids.is_empty() {
                        self.by_contract.remove(&entry.contract);
                    }
                }
            }
        }

        if !dead.is_empty() {
            tracing::trace!("Reclaimed {} cancelled subscriptions", dead.len());
        }
        dead.len()
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
        self.by_contract.clear();
    }

    /// Subscriptions not yet cancelled
    pub fn active_count(&self) -> usize {
        self.entries.iter().filter(|(_, e)| !e.cancelled).count()
    }

    /// All stored subscriptions, including cancelled ones awaiting reclaim
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }
}

impl std::fmt::Debug for SubscriptionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionRegistry")
            .field("active", &self.active_count())
            .field("stored", &self.len())
            .field("limit", &self.limit)
            .finish()
    }
}
