//! Single-writer ledger mutation queue
//!
//! `LedgerWriter` serialises every mutation of one ledger file through a
//! dedicated worker thread that owns the `TransactionStore`. Callers hold
//! cheap cloneable handles and talk to the worker over a bounded `tokio`
//! channel.
//!
//! # Architecture
//!
//! ```text
//! LedgerWriter (clone) ──┐
//! LedgerWriter (clone) ──┼── mpsc (bounded) ──► worker thread ──► TransactionStore
//! LedgerWriter (clone) ──┘                           │
//!                          ◄──── oneshot reply ──────┘
//! ```
//!
//! # Back-pressure
//!
//! - `append` / `remove` wait for queue space, then for the worker's reply
//! - `try_append` fails fast with `LedgerError::QueueFull` when the queue is full
//!
//! The worker exits once every handle has been dropped and the queue drained.
//!
//! # Commit hook
//!
//! `spawn_with_hook` runs a callback with the affected username after every
//! successful mutation and before the caller is answered. The `Ledger` facade
//! uses it to drop the user's cached history, so a read issued after `append`
//! returns observes the record.

use crate::core::transaction_store::TransactionStore;
use crate::types::{LedgerError, Transaction};
use chrono::NaiveDateTime;
use std::thread;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};

/// Called with the username of every applied mutation
pub type CommitHook = Box<dyn Fn(&str) + Send + 'static>;

enum WriteCommand {
    Append(Transaction, oneshot::Sender<Result<(), LedgerError>>),
    Remove(String, NaiveDateTime, oneshot::Sender<Result<bool, LedgerError>>),
}

/// Handle to the ledger writer thread
#[derive(Debug, Clone)]
pub struct LedgerWriter {
    sender: mpsc::Sender<WriteCommand>,
    capacity: usize,
}

impl std::fmt::Debug for WriteCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WriteCommand::Append(tx, _) => write!(f, "Append({}, {})", tx.username, tx.formatted_timestamp()),
            WriteCommand::Remove(user, ts, _) => write!(f, "Remove({}, {})", user, ts),
        }
    }
}

/// Outcome of a queued `try_append`
#[derive(Debug)]
pub struct PendingWrite {
    reply: oneshot::Receiver<Result<(), LedgerError>>,
}

impl PendingWrite {
    /// Wait until the worker has applied the append
    ///
    /// # Errors
    ///
    /// The store's error, or `LedgerError::WriterClosed` if the worker stopped
    /// before replying.
    pub async fn wait(self) -> Result<(), LedgerError> {
        self.reply.await.map_err(|_| LedgerError::WriterClosed)?
    }
}

impl LedgerWriter {
    /// Start the writer thread for `store`
    ///
    /// # Arguments
    ///
    /// * `store` - The store the worker owns for its whole lifetime
    /// * `capacity` - Commands buffered before callers wait; zero is treated as one
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::Io` if the worker thread cannot be spawned.
    pub fn spawn(store: TransactionStore, capacity: usize) -> Result<Self, LedgerError> {
        Self::spawn_with_hook(store, capacity, Box::new(|_| {}))
    }

    /// Start the writer thread with a hook run after each applied mutation
    ///
    /// The hook runs on the worker thread, before the caller's reply is sent.
    pub fn spawn_with_hook(store: TransactionStore, capacity: usize, on_commit: CommitHook) -> Result<Self, LedgerError> {
        let (writer, receiver) = Self::channel(capacity);

        thread::Builder::new()
            .name("ledger-writer".to_string())
            .spawn(move || run_worker(store, receiver, on_commit))?;

        tracing::info!(capacity = writer.capacity, "Started ledger writer");
        Ok(writer)
    }

    fn channel(capacity: usize) -> (Self, mpsc::Receiver<WriteCommand>) {
        let capacity = capacity.max(1);
        let (sender, receiver) = mpsc::channel(capacity);
        (LedgerWriter { sender, capacity }, receiver)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append a transaction, waiting for queue space if necessary
    pub async fn append(&self, transaction: Transaction) -> Result<(), LedgerError> {
        let (reply, response) = oneshot::channel();
        self.sender
            .send(WriteCommand::Append(transaction, reply))
            .await
            .map_err(|_| LedgerError::WriterClosed)?;
        response.await.map_err(|_| LedgerError::WriterClosed)?
    }

    /// Queue an append without waiting for space
    ///
    /// # Errors
    ///
    /// * `LedgerError::QueueFull` - The queue holds `capacity` commands already
    /// * `LedgerError::WriterClosed` - The worker has stopped
    pub fn try_append(&self, transaction: Transaction) -> Result<PendingWrite, LedgerError> {
        let (reply, response) = oneshot::channel();
        match self.sender.try_send(WriteCommand::Append(transaction, reply)) {
            Ok(()) => Ok(PendingWrite { reply: response }),
            Err(TrySendError::Full(_)) => Err(LedgerError::QueueFull {
                capacity: self.capacity,
            }),
            Err(TrySendError::Closed(_)) => Err(LedgerError::WriterClosed),
        }
    }

    /// Remove the first record of `username` at `timestamp`
    pub async fn remove(&self, username: &str, timestamp: NaiveDateTime) -> Result<bool, LedgerError> {
        let (reply, response) = oneshot::channel();
        self.sender
            .send(WriteCommand::Remove(username.to_string(), timestamp, reply))
            .await
            .map_err(|_| LedgerError::WriterClosed)?;
        response.await.map_err(|_| LedgerError::WriterClosed)?
    }
}

fn run_worker(store: TransactionStore, mut receiver: mpsc::Receiver<WriteCommand>, on_commit: CommitHook) {
    tracing::debug!(path = %store.path().display(), "Ledger writer running");
    let mut applied = 0usize;

    while let Some(command) = receiver.blocking_recv() {
        match command {
            WriteCommand::Append(transaction, reply) => {
                let result = store.append(&transaction);
                match &result {
                    Ok(()) => on_commit(&transaction.username),
                    Err(e) => {
                        tracing::warn!(username = %transaction.username, error = %e, "Queued append failed")
                    }
                }
                // The caller may have stopped waiting
                let _ = reply.send(result);
            }
            WriteCommand::Remove(username, timestamp, reply) => {
                let result = store.remove(&username, timestamp);
                if let Ok(true) = result {
                    on_commit(&username);
                }
                let _ = reply.send(result);
            }
        }
        applied += 1;
    }

    tracing::info!(applied, "Ledger writer stopped");
}
