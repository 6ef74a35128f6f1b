//! # Transaction Storage
//!
//! Process-wide, in-memory only (see Non-goals: no durability across
//! restarts). Holds a "current" transaction pointer and a bounded history
//! list. Consulted for diagnostics; it never drives lifecycle itself.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use cfgsaga_txn::Transaction;

use crate::config::StorageConfig;

struct Inner {
    current: Option<Arc<Transaction>>,
    history: VecDeque<Arc<Transaction>>,
}

/// Thread-safe transaction storage with a capped history.
pub struct TransactionStorage {
    config: StorageConfig,
    inner: Mutex<Inner>,
}

impl TransactionStorage {
    /// Construct empty storage with the given configuration.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(Inner {
                current: None,
                history: VecDeque::with_capacity(config.max_history.min(1024)),
            }),
        }
    }

    /// Replace the current transaction, moving the previous one (if any)
    /// into history. Evicts the oldest history entry once `max_history` is
    /// exceeded.
    pub fn set_current(&self, tx: Arc<Transaction>) {
        let mut inner = self.inner.lock().expect("transaction storage mutex poisoned");
        if let Some(previous) = inner.current.take() {
            if inner.history.len() >= self.config.max_history {
                inner.history.pop_front();
            }
            inner.history.push_back(previous);
        }
        inner.current = Some(tx);
    }

    /// The transaction currently being processed, if any.
    pub fn current(&self) -> Option<Arc<Transaction>> {
        self.inner.lock().expect("transaction storage mutex poisoned").current.clone()
    }

    /// Historical transactions, oldest first, capped at `max_history`.
    pub fn history(&self) -> Vec<Arc<Transaction>> {
        self.inner
            .lock()
            .expect("transaction storage mutex poisoned")
            .history
            .iter()
            .cloned()
            .collect()
    }
}
