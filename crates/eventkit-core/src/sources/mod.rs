//! Event sources
//!
//! Everything that can make a contract ready: timers, queues and external
//! signals. The [`Sources`] table owns the contract arena and maps each
//! contract to the state backing it.

pub(crate) mod mailbox;
pub mod queue;
pub mod signal;
pub mod timer;

pub use queue::{Queue, QueueSender};
pub use signal::{Signal, SignalSource};
pub use timer::{DueTimer, Timer, TimerMode, TimerService};

use std::any::Any;
use std::sync::Arc;
use std::time::Instant;

use crate::arena::Arena;
use crate::contract::{Contract, ContractId, ContractKind};
use crate::error::LoopError;
use crate::ingress::Ingress;
use mailbox::{ItemSource, Mailbox};

enum Backing {
    Timer,
    Items(Arc<dyn ItemSource>),
}

struct ContractEntry {
    kind: ContractKind,
    seq: u64,
    backing: Backing,
}

/// Contract table for one event loop
pub(crate) struct Sources {
    loop_id: u32,
    ingress: Arc<Ingress>,
    contracts: Arena<ContractEntry>,
    timers: TimerService,
    next_seq: u64,
}

impl Sources {
    pub fn new(loop_id: u32, ingress: Arc<Ingress>) -> Self {
        Self {
            loop_id,
            ingress,
            contracts: Arena::new(),
            timers: TimerService::new(),
            next_seq: 0,
        }
    }

    pub fn loop_id(&self) -> u32 {
        self.loop_id
    }

    pub fn ingress(&self) -> &Arc<Ingress> {
        &self.ingress
    }

    pub fn timers(&self) -> &TimerService {
        &self.timers
    }

    pub fn timers_mut(&mut self) -> &mut TimerService {
        &mut self.timers
    }

    fn next_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }

    pub fn create_timer(
        &mut self,
        mode: TimerMode,
        interval_ms: u64,
        now: Instant,
    ) -> Result<Contract<()>, LoopError> {
        let timer = Timer::new(mode, interval_ms, now)?;
        let seq = self.next_seq();
        let index = self.contracts.insert(ContractEntry {
            kind: ContractKind::Timer,
            seq,
            backing: Backing::Timer,
        });
        let id = ContractId::new(self.loop_id, index);
        self.timers.insert(id, timer);
        Ok(Contract::new(id, ContractKind::Timer))
    }

    /// Create a mailbox-backed contract (queue or signal)
    pub fn create_mailbox<T: Send + 'static>(
        &mut self,
        kind: ContractKind,
        capacity: usize,
    ) -> (Contract<T>, Arc<Mailbox<T>>) {
        let seq = self.next_seq();
        let loop_id = self.loop_id;
        let ingress = self.ingress.clone();
        let mut created = None;

        let index = self.contracts.insert_with(|index| {
            let mailbox = Arc::new(Mailbox::new(
                ContractId::new(loop_id, index),
                capacity,
                ingress,
            ));
            created = Some(mailbox.clone());
            ContractEntry {
                kind,
                seq,
                backing: Backing::Items(mailbox),
            }
        });

        let id = ContractId::new(loop_id, index);
        let mailbox = match created {
            Some(mailbox) => mailbox,
            None => unreachable!("insert_with always runs its constructor"),
        };
        (Contract::new(id, kind), mailbox)
    }

    /// Reject contracts minted by another loop or already released
    pub fn check(&self, contract: ContractId) -> Result<(), LoopError> {
        if contract.loop_id() != self.loop_id {
            return Err(LoopError::ForeignContract { contract });
        }
        if !self.contracts.contains(contract.index()) {
            return Err(LoopError::ExpiredContract { contract });
        }
        Ok(())
    }

    /// Drop the contracts of fired oneshots that nothing subscribes to
    pub fn release_spent(&mut self, in_use: impl FnMut(ContractId) -> bool) -> usize {
        let released = self.timers.release_spent(in_use);
        for contract in &released {
            self.contracts.remove(contract.index());
        }
        released.len()
    }

    pub fn kind(&self, contract: ContractId) -> Option<ContractKind> {
        self.contracts.get(contract.index()).map(|e| e.kind)
    }

    /// Creation order of the contract
    pub fn seq(&self, contract: ContractId) -> u64 {
        self.contracts
            .get(contract.index())
            .map_or(u64::MAX, |e| e.seq)
    }

    /// Dequeue the next item of a mailbox-backed contract
    pub fn take_item(&self, contract: ContractId) -> Option<Box<dyn Any + Send>> {
        match &self.contracts.get(contract.index())?.backing {
            Backing::Items(source) => source.take(),
            Backing::Timer => None,
        }
    }

    pub fn pending_items(&self, contract: ContractId) -> usize {
        match self.contracts.get(contract.index()).map(|e| &e.backing) {
            Some(Backing::Items(source)) => source.pending(),
            _ => 0,
        }
    }

    pub fn len(&self) -> usize {
        self.contracts.len()
    }

    /// Tear down: refuse further posts and wake every blocked sender
    pub fn close_all(&self) {
        self.ingress.close();
        for (_, entry) in self.contracts.iter() {
            if let Backing::Items(source) = &entry.backing {
                source.close();
            }
        }
    }
}
