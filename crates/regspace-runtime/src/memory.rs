//! A sparse in-memory bus that records every transaction.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::error::TransportError;
use crate::transport::BusTransport;

/// One completed bus transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transaction {
    Read { address: u64, word: u64 },
    Write { address: u64, word: u64 },
}

impl Transaction {
    pub fn address(&self) -> u64 {
        match *self {
            Transaction::Read { address, .. } | Transaction::Write { address, .. } => address,
        }
    }
}

#[derive(Debug, Default)]
struct State {
    words: BTreeMap<u64, u64>,
    faults: BTreeSet<u64>,
    clear_on_write: BTreeSet<u64>,
    log: Vec<Transaction>,
}

/// Word store keyed by address. Unwritten addresses read as 0.
#[derive(Debug, Default)]
pub struct MemoryBus {
    state: Mutex<State>,
}

impl MemoryBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Preload a word without logging a transaction.
    pub fn with_word(self, address: u64, word: u64) -> Self {
        self.poke(address, word);
        self
    }

    /// Make every transaction at `address` fail.
    pub fn with_fault(self, address: u64) -> Self {
        self.state().faults.insert(address);
        self
    }

    /// Treat `address` as a write-1-to-clear register: a written word
    /// clears its set bits in the stored word instead of replacing it.
    pub fn with_clear_on_write(self, address: u64) -> Self {
        self.state().clear_on_write.insert(address);
        self
    }

    /// Current word at `address`, without logging.
    pub fn peek(&self, address: u64) -> u64 {
        self.state().words.get(&address).copied().unwrap_or(0)
    }

    /// Set the word at `address`, without logging.
    pub fn poke(&self, address: u64, word: u64) {
        self.state().words.insert(address, word);
    }

    /// Every transaction so far, in issue order.
    pub fn transactions(&self) -> Vec<Transaction> {
        self.state().log.clone()
    }

    pub fn clear_log(&self) {
        self.state().log.clear();
    }
}

impl BusTransport for MemoryBus {
    fn read_word(&self, address: u64) -> Result<u64, TransportError> {
        let mut state = self.state();
        if state.faults.contains(&address) {
            return Err(TransportError::Fault {
                address,
                detail: "injected fault".into(),
            });
        }
        let word = state.words.get(&address).copied().unwrap_or(0);
        state.log.push(Transaction::Read { address, word });
        Ok(word)
    }

    fn write_word(&self, address: u64, word: u64) -> Result<(), TransportError> {
        let mut state = self.state();
        if state.faults.contains(&address) {
            return Err(TransportError::Fault {
                address,
                detail: "injected fault".into(),
            });
        }
        let stored = if state.clear_on_write.contains(&address) {
            state.words.get(&address).copied().unwrap_or(0) & !word
        } else {
            word
        };
        state.words.insert(address, stored);
        state.log.push(Transaction::Write { address, word });
        Ok(())
    }
}
