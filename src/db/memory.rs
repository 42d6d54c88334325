//! In-process transaction store.
//!
//! DESIGN
//! ======
//! Records live in a `HashMap` behind a `std::sync::RwLock`; no lock is held
//! across an await. Every write publishes the affected owner id on a
//! broadcast channel and each live subscription re-reads its owner's list
//! when it sees its own id. A lagged receiver simply re-reads, since each
//! delivery is a full snapshot.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, TimeDelta, Utc};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

use super::{StoreError, Subscription, TransactionStore, auto_id, sort_newest_first};
use crate::models::{Category, NewTransaction, Transaction, TransactionPatch};

const CHANGE_CHANNEL_CAPACITY: usize = 256;

#[derive(Clone)]
pub struct MemoryStore {
    shared: Arc<Shared>,
}

struct Shared {
    inner: RwLock<Inner>,
    changes: broadcast::Sender<String>,
}

#[derive(Default)]
struct Inner {
    records: HashMap<String, Transaction>,
    last_timestamp: Option<DateTime<Utc>>,
}

impl Inner {
    /// Server clock, forced strictly increasing so ordering is total.
    fn next_timestamp(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let ts = match self.last_timestamp {
            Some(last) if now <= last => last + TimeDelta::microseconds(1),
            _ => now,
        };
        self.last_timestamp = Some(ts);
        ts
    }
}

impl Shared {
    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, Inner>, StoreError> {
        self.inner
            .read()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".into()))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, Inner>, StoreError> {
        self.inner
            .write()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".into()))
    }

    fn snapshot(&self, owner_id: &str, category: Option<Category>) -> Result<Vec<Transaction>, StoreError> {
        let inner = self.read()?;
        let mut out: Vec<Transaction> = inner
            .records
            .values()
            .filter(|t| t.owner_id == owner_id && category.is_none_or(|c| t.category == c))
            .cloned()
            .collect();
        sort_newest_first(&mut out);
        Ok(out)
    }

    fn publish(&self, owner_id: &str) {
        // No receivers is not an error: nobody is subscribed yet.
        let _ = self.changes.send(owner_id.to_owned());
    }
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self { shared: Arc::new(Shared { inner: RwLock::new(Inner::default()), changes }) }
    }

    /// Number of records across all owners.
    #[must_use]
    pub fn len(&self) -> usize {
        self.shared
            .read()
            .map(|inner| inner.records.len())
            .unwrap_or(0)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl TransactionStore for MemoryStore {
    async fn insert(&self, owner_id: &str, new: NewTransaction) -> Result<Transaction, StoreError> {
        let tx = {
            let mut inner = self.shared.write()?;
            let tx = Transaction {
                id: auto_id(),
                owner_id: owner_id.to_owned(),
                amount: new.amount,
                description: new.description,
                date: new.date,
                category: new.category,
                timestamp: inner.next_timestamp(),
            };
            inner.records.insert(tx.id.clone(), tx.clone());
            tx
        };
        self.shared.publish(owner_id);
        Ok(tx)
    }

    async fn merge(&self, owner_id: &str, id: &str, patch: &TransactionPatch) -> Result<Transaction, StoreError> {
        let updated = {
            let mut inner = self.shared.write()?;
            let Some(tx) = inner
                .records
                .get_mut(id)
                .filter(|t| t.owner_id == owner_id)
            else {
                return Err(StoreError::NotFound(id.to_owned()));
            };
            patch.apply(tx);
            tx.clone()
        };
        self.shared.publish(owner_id);
        Ok(updated)
    }

    async fn delete(&self, owner_id: &str, id: &str) -> Result<(), StoreError> {
        {
            let mut inner = self.shared.write()?;
            if !inner.records.get(id).is_some_and(|t| t.owner_id == owner_id) {
                return Err(StoreError::NotFound(id.to_owned()));
            }
            inner.records.remove(id);
        }
        self.shared.publish(owner_id);
        Ok(())
    }

    async fn query(&self, owner_id: &str, category: Option<Category>) -> Result<Vec<Transaction>, StoreError> {
        self.shared.snapshot(owner_id, category)
    }

    async fn subscribe(&self, owner_id: &str) -> Result<Subscription, StoreError> {
        let (tx, cancel, subscription) = Subscription::channel();
        // Subscribe before the first read so no change slips between them.
        let mut changes = self.shared.changes.subscribe();
        let shared = Arc::clone(&self.shared);
        let owner = owner_id.to_owned();

        tokio::spawn(async move {
            if tx.send(shared.snapshot(&owner, None)).await.is_err() {
                return;
            }
            loop {
                tokio::select! {
                    () = cancel.cancelled() => break,
                    changed = changes.recv() => {
                        match changed {
                            Ok(changed_owner) if changed_owner != owner => continue,
                            Ok(_) | Err(RecvError::Lagged(_)) => {
                                if tx.send(shared.snapshot(&owner, None)).await.is_err() {
                                    break;
                                }
                            }
                            Err(RecvError::Closed) => break,
                        }
                    }
                }
            }
            tracing::debug!(owner = %owner, "memory store: subscription closed");
        });

        Ok(subscription)
    }
}

#[cfg(test)]
#[path = "memory_test.rs"]
mod tests;
