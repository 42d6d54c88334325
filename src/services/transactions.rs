//! Transaction store adapter and the add/edit form.
//!
//! ARCHITECTURE
//! ============
//! A `TransactionAdapter` is bound to one owner. `mount` opens a live
//! subscription and a task that mirrors every delivery into a `watch`
//! channel of [`FeedState`]; observers (the live WebSocket feed) read from
//! that channel. Writes go straight to the store and are never applied to
//! the local list directly: the next delivery carries them.
//!
//! ERROR HANDLING
//! ==============
//! Store errors are recorded as a display string in `FeedState::error` and
//! never retried. `add_transaction` and `get_filtered_transactions` record
//! and return the error; update and delete only return it.

use std::sync::Arc;

use chrono::{Local, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::db::{StoreError, TransactionStore};
use crate::error::FieldError;
use crate::models::{Category, NewTransaction, Transaction, TransactionPatch, parse_date};

pub const ADDED: &str = "Transaction added successfully!";
pub const UPDATED: &str = "Transaction updated successfully!";
pub const DELETED: &str = "Transaction deleted successfully!";
pub const SAVE_FAILED: &str = "Failed to save transaction";
pub const DELETE_FAILED: &str = "Failed to delete transaction";
pub const LOAD_FAILED: &str = "Failed to load transactions";

// =============================================================================
// FEED STATE
// =============================================================================

/// Local mirror of the owner's transactions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedState {
    pub transactions: Vec<Transaction>,
    /// True until the first delivery (or the first failure).
    pub loading: bool,
    pub error: Option<String>,
}

impl Default for FeedState {
    fn default() -> Self {
        Self { transactions: Vec::new(), loading: true, error: None }
    }
}

// =============================================================================
// ADAPTER
// =============================================================================

struct Listener {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

pub struct TransactionAdapter {
    store: Arc<dyn TransactionStore>,
    owner_id: String,
    state: watch::Sender<FeedState>,
    listener: Option<Listener>,
}

impl TransactionAdapter {
    #[must_use]
    pub fn new(store: Arc<dyn TransactionStore>, owner_id: impl Into<String>) -> Self {
        let (state, _) = watch::channel(FeedState::default());
        Self { store, owner_id: owner_id.into(), state, listener: None }
    }

    #[must_use]
    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    /// Observe local state. The receiver sees every later change.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<FeedState> {
        self.state.subscribe()
    }

    #[must_use]
    pub fn snapshot(&self) -> FeedState {
        self.state.borrow().clone()
    }

    #[must_use]
    pub fn is_mounted(&self) -> bool {
        self.listener.is_some()
    }

    /// Open the live subscription. Mounting twice replaces the first one.
    ///
    /// # Errors
    ///
    /// Returns the store error if the subscription cannot be opened; it is
    /// also recorded in local state.
    pub async fn mount(&mut self) -> Result<(), StoreError> {
        self.unmount();

        let mut subscription = match self.store.subscribe(&self.owner_id).await {
            Ok(sub) => sub,
            Err(e) => {
                self.record_error(&e);
                return Err(e);
            }
        };

        let cancel = CancellationToken::new();
        let stop = cancel.clone();
        let state = self.state.clone();
        let owner = self.owner_id.clone();

        let task = tokio::spawn(async move {
            loop {
                let delivery = tokio::select! {
                    () = stop.cancelled() => break,
                    delivery = subscription.next() => delivery,
                };
                match delivery {
                    Some(Ok(transactions)) => {
                        debug!(owner = %owner, count = transactions.len(), "adapter: delivery");
                        state.send_modify(|s| {
                            s.transactions = transactions;
                            s.loading = false;
                            s.error = None;
                        });
                    }
                    Some(Err(e)) => {
                        warn!(owner = %owner, error = %e, "adapter: subscription error");
                        state.send_modify(|s| {
                            s.loading = false;
                            s.error = Some(e.to_string());
                        });
                    }
                    None => break,
                }
            }
            subscription.unsubscribe();
        });

        self.listener = Some(Listener { cancel, task });
        info!(owner = %self.owner_id, "adapter: mounted");
        Ok(())
    }

    /// Release the live subscription. No delivery is applied afterwards.
    pub fn unmount(&mut self) {
        if let Some(listener) = self.listener.take() {
            listener.cancel.cancel();
            listener.task.abort();
            debug!(owner = %self.owner_id, "adapter: unmounted");
        }
    }

    /// Write a new record for this owner and return its id.
    ///
    /// # Errors
    ///
    /// Returns the store error after recording it and clearing `loading`.
    pub async fn add_transaction(&self, fields: NewTransaction) -> Result<String, StoreError> {
        match self.store.insert(&self.owner_id, fields).await {
            Ok(tx) => {
                info!(owner = %self.owner_id, id = %tx.id, "adapter: transaction added");
                Ok(tx.id)
            }
            Err(e) => {
                self.record_error(&e);
                Err(e)
            }
        }
    }

    /// Merge `patch` into an existing record; unspecified fields keep their
    /// stored values.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the record does not exist or belongs to
    /// someone else, or any other store error.
    pub async fn update_transaction(&self, id: &str, patch: &TransactionPatch) -> Result<Transaction, StoreError> {
        let tx = self.store.merge(&self.owner_id, id, patch).await?;
        info!(owner = %self.owner_id, id, "adapter: transaction updated");
        Ok(tx)
    }

    /// # Errors
    ///
    /// Returns `NotFound` if the record does not exist or belongs to
    /// someone else, or any other store error.
    pub async fn delete_transaction(&self, id: &str) -> Result<(), StoreError> {
        self.store.delete(&self.owner_id, id).await?;
        info!(owner = %self.owner_id, id, "adapter: transaction deleted");
        Ok(())
    }

    /// One-shot query by category, replacing the local list.
    ///
    /// # Errors
    ///
    /// Returns the store error after recording it.
    pub async fn get_filtered_transactions(&self, category: Category) -> Result<Vec<Transaction>, StoreError> {
        match self.store.query(&self.owner_id, Some(category)).await {
            Ok(transactions) => {
                self.state.send_modify(|s| {
                    s.transactions.clone_from(&transactions);
                    s.loading = false;
                    s.error = None;
                });
                Ok(transactions)
            }
            Err(e) => {
                self.record_error(&e);
                Err(e)
            }
        }
    }

    fn record_error(&self, err: &StoreError) {
        warn!(owner = %self.owner_id, error = %err, "adapter: store error");
        let message = err.to_string();
        self.state.send_modify(|s| {
            s.loading = false;
            s.error = Some(message);
        });
    }
}

impl Drop for TransactionAdapter {
    fn drop(&mut self) {
        self.unmount();
    }
}

// =============================================================================
// FORM
// =============================================================================

/// Add/edit form as submitted. Every field is optional on the wire;
/// [`TransactionForm::into_new`] decides what is required.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransactionForm {
    #[serde(default)]
    pub amount: Option<Decimal>,
    #[serde(default)]
    pub description: Option<String>,
    /// `dd-mm-yyyy`; blank means "today" on create and "unchanged" on edit.
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub category: Option<Category>,
}

impl TransactionForm {
    /// Validate for creation. A missing date becomes `today`, a missing
    /// category becomes `default_category` (the active tab).
    ///
    /// # Errors
    ///
    /// Returns every failed field.
    pub fn into_new(self, default_category: Category, today: NaiveDate) -> Result<NewTransaction, Vec<FieldError>> {
        let mut errors = Vec::new();
        let amount = match self.amount {
            None => {
                errors.push(FieldError::new("amount", "Amount is required"));
                None
            }
            Some(amount) => check_amount(amount, &mut errors),
        };
        let date = check_date(self.date.as_deref(), &mut errors);

        match amount {
            Some(amount) if errors.is_empty() => Ok(NewTransaction {
                amount,
                description: self.description.unwrap_or_default().trim().to_owned(),
                date: date.unwrap_or(today),
                category: self.category.unwrap_or(default_category),
            }),
            _ => Err(errors),
        }
    }

    /// Validate for an edit. Only supplied fields end up in the patch.
    ///
    /// # Errors
    ///
    /// Returns every failed field, or a form-level error for an empty edit.
    pub fn into_patch(self) -> Result<TransactionPatch, Vec<FieldError>> {
        let mut errors = Vec::new();
        let amount = self.amount.and_then(|a| check_amount(a, &mut errors));
        let date = check_date(self.date.as_deref(), &mut errors);
        if !errors.is_empty() {
            return Err(errors);
        }

        let patch = TransactionPatch {
            amount,
            description: self.description.map(|d| d.trim().to_owned()),
            date,
            category: self.category,
        };
        if patch.is_empty() {
            return Err(vec![FieldError::new("form", "Nothing to update")]);
        }
        Ok(patch)
    }
}

fn check_amount(amount: Decimal, errors: &mut Vec<FieldError>) -> Option<Decimal> {
    if amount <= Decimal::ZERO {
        errors.push(FieldError::new("amount", "Amount must be positive"));
        return None;
    }
    Some(amount)
}

fn check_date(raw: Option<&str>, errors: &mut Vec<FieldError>) -> Option<NaiveDate> {
    let raw = raw.map(str::trim).filter(|r| !r.is_empty())?;
    let parsed = parse_date(raw);
    if parsed.is_none() {
        errors.push(FieldError::new("date", "Date must be dd-mm-yyyy"));
    }
    parsed
}

/// Today on the server's local calendar.
#[must_use]
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

#[cfg(test)]
#[path = "transactions_test.rs"]
mod tests;
