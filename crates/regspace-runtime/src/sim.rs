//! A clocked simulation bus.
//!
//! [`ClockedBus`] queues each transaction and suspends the caller until
//! [`SimClock::edge`] completes the queue, oldest first.

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use futures::channel::oneshot;

use crate::error::TransportError;
use crate::memory::Transaction;
use crate::transport::AsyncBusTransport;

struct Pending {
    address: u64,
    /// `Some` for writes.
    word: Option<u64>,
    reply: oneshot::Sender<u64>,
}

#[derive(Default)]
struct SimState {
    words: BTreeMap<u64, u64>,
    queue: VecDeque<Pending>,
    log: Vec<Transaction>,
    cycles: u64,
}

type Shared = Arc<Mutex<SimState>>;

fn lock(state: &Shared) -> MutexGuard<'_, SimState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Create a bus and the clock that drives it.
pub fn clocked_bus() -> (ClockedBus, SimClock) {
    let state = Shared::default();
    (
        ClockedBus {
            state: Arc::clone(&state),
        },
        SimClock { state },
    )
}

/// Async transport whose transactions complete on clock edges.
#[derive(Clone)]
pub struct ClockedBus {
    state: Shared,
}

impl ClockedBus {
    pub fn peek(&self, address: u64) -> u64 {
        lock(&self.state).words.get(&address).copied().unwrap_or(0)
    }

    pub fn poke(&self, address: u64, word: u64) {
        lock(&self.state).words.insert(address, word);
    }

    /// Completed transactions, in completion order.
    pub fn transactions(&self) -> Vec<Transaction> {
        lock(&self.state).log.clone()
    }

    fn submit(&self, address: u64, word: Option<u64>) -> oneshot::Receiver<u64> {
        let (reply, receiver) = oneshot::channel();
        lock(&self.state).queue.push_back(Pending {
            address,
            word,
            reply,
        });
        receiver
    }
}

#[async_trait]
impl AsyncBusTransport for ClockedBus {
    async fn read_word(&self, address: u64) -> Result<u64, TransportError> {
        self.submit(address, None)
            .await
            .map_err(|_| TransportError::Disconnected { address })
    }

    async fn write_word(&self, address: u64, word: u64) -> Result<(), TransportError> {
        self.submit(address, Some(word))
            .await
            .map(|_| ())
            .map_err(|_| TransportError::Disconnected { address })
    }
}

/// The clock of a [`ClockedBus`].
#[derive(Clone)]
pub struct SimClock {
    state: Shared,
}

impl SimClock {
    /// Advance one cycle, completing every queued transaction in issue
    /// order. Returns how many completed.
    pub fn edge(&self) -> usize {
        let mut state = lock(&self.state);
        state.cycles += 1;
        let queue = std::mem::take(&mut state.queue);
        let completed = queue.len();
        for pending in queue {
            let word = match pending.word {
                Some(word) => {
                    state.words.insert(pending.address, word);
                    state.log.push(Transaction::Write {
                        address: pending.address,
                        word,
                    });
                    word
                }
                None => {
                    let word = state.words.get(&pending.address).copied().unwrap_or(0);
                    state.log.push(Transaction::Read {
                        address: pending.address,
                        word,
                    });
                    word
                }
            };
            // The caller may have given up on the transaction.
            let _ = pending.reply.send(word);
        }
        if completed > 0 {
            tracing::trace!(cycle = state.cycles, completed, "clock edge");
        }
        completed
    }

    pub fn cycles(&self) -> u64 {
        lock(&self.state).cycles
    }

    /// Transactions waiting for the next edge.
    pub fn pending(&self) -> usize {
        lock(&self.state).queue.len()
    }

    /// Drop every queued transaction; their callers see `Disconnected`.
    pub fn halt(&self) {
        lock(&self.state).queue.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::LocalPool;
    use futures::task::LocalSpawnExt;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn transactions_wait_for_edge() {
        let (bus, clock) = clocked_bus();
        bus.poke(0x8, 42);
        let mut pool = LocalPool::new();
        let seen = Rc::new(RefCell::new(None));
        let out = Rc::clone(&seen);
        let reader = bus.clone();
        pool.spawner()
            .spawn_local(async move {
                *out.borrow_mut() = Some(reader.read_word(0x8).await);
            })
            .unwrap();

        pool.run_until_stalled();
        assert_eq!(clock.pending(), 1);
        assert_eq!(*seen.borrow(), None);

        assert_eq!(clock.edge(), 1);
        pool.run_until_stalled();
        assert_eq!(*seen.borrow(), Some(Ok(42)));
        assert_eq!(clock.cycles(), 1);
    }

    #[test]
    fn halted_transactions_disconnect() {
        let (bus, clock) = clocked_bus();
        let mut pool = LocalPool::new();
        let seen = Rc::new(RefCell::new(None));
        let out = Rc::clone(&seen);
        pool.spawner()
            .spawn_local(async move {
                *out.borrow_mut() = Some(bus.write_word(0x4, 1).await);
            })
            .unwrap();
        pool.run_until_stalled();
        clock.halt();
        pool.run_until_stalled();
        assert_eq!(
            *seen.borrow(),
            Some(Err(TransportError::Disconnected { address: 0x4 }))
        );
    }
}
