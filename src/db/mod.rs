//! Transaction store: trait, live subscriptions, and backends.
//!
//! SYSTEM CONTEXT
//! ==============
//! The store is the source of truth for transactions. Everything above it
//! (the adapter, the view, the live WebSocket feed) holds copies that are
//! refreshed by push deliveries from [`TransactionStore::subscribe`].
//!
//! Two backends implement the trait: [`memory::MemoryStore`] for local runs
//! and tests, and [`postgres::PgStore`] which uses `LISTEN/NOTIFY` for push.

pub mod memory;
pub mod postgres;

use std::sync::Arc;

use rand::Rng;
use rand::distr::Alphanumeric;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::models::{Category, NewTransaction, Transaction, TransactionPatch};

const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;
const AUTO_ID_LEN: usize = 20;
/// Bounded buffer between a backend's listener task and its subscriber.
pub(crate) const SUBSCRIPTION_BUFFER: usize = 16;

// =============================================================================
// ERROR
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("transaction not found: {0}")]
    NotFound(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("stored record is malformed: {0}")]
    Decode(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl crate::error::ErrorCode for StoreError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "E_NOT_FOUND",
            Self::Database(_) => "E_DATABASE",
            Self::Decode(_) => "E_DECODE",
            Self::Unavailable(_) => "E_STORE_UNAVAILABLE",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Database(_) | Self::Unavailable(_))
    }
}

// =============================================================================
// SUBSCRIPTION
// =============================================================================

/// One delivery from a live query: the owner's full list, newest first.
pub type Delivery = Result<Vec<Transaction>, StoreError>;

/// Handle to a live query. Deliveries stop once it is cancelled or dropped.
pub struct Subscription {
    rx: mpsc::Receiver<Delivery>,
    cancel: CancellationToken,
}

impl Subscription {
    /// Create a channel pair for a backend listener task. The task must stop
    /// when the returned token is cancelled.
    #[must_use]
    pub fn channel() -> (mpsc::Sender<Delivery>, CancellationToken, Self) {
        let (tx, rx) = mpsc::channel(SUBSCRIPTION_BUFFER);
        let cancel = CancellationToken::new();
        (tx, cancel.clone(), Self { rx, cancel })
    }

    /// Next delivery, or `None` once the listener has stopped.
    pub async fn next(&mut self) -> Option<Delivery> {
        self.rx.recv().await
    }

    pub fn unsubscribe(&self) {
        self.cancel.cancel();
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

// =============================================================================
// STORE TRAIT
// =============================================================================

/// Owner-scoped transaction persistence with live queries.
#[async_trait::async_trait]
pub trait TransactionStore: Send + Sync {
    /// Write a new record. The store assigns id and ordering timestamp.
    async fn insert(&self, owner_id: &str, new: NewTransaction) -> Result<Transaction, StoreError>;

    /// Merge `patch` into an existing record owned by `owner_id`.
    async fn merge(&self, owner_id: &str, id: &str, patch: &TransactionPatch) -> Result<Transaction, StoreError>;

    /// Remove a record owned by `owner_id`.
    async fn delete(&self, owner_id: &str, id: &str) -> Result<(), StoreError>;

    /// One-shot query, newest first, optionally narrowed to a category.
    async fn query(&self, owner_id: &str, category: Option<Category>) -> Result<Vec<Transaction>, StoreError>;

    /// Live query over all of the owner's records, newest first. The first
    /// delivery is the current state; later ones follow every change.
    async fn subscribe(&self, owner_id: &str) -> Result<Subscription, StoreError>;
}

/// Generate a store-assigned record id: 20 alphanumeric characters.
#[must_use]
pub fn auto_id() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(AUTO_ID_LEN)
        .map(char::from)
        .collect()
}

/// Newest first, id as a stable tiebreak.
pub(crate) fn sort_newest_first(records: &mut [Transaction]) {
    records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then_with(|| a.id.cmp(&b.id)));
}

// =============================================================================
// STARTUP
// =============================================================================

/// Initialize the `PostgreSQL` connection pool and run migrations.
///
/// # Errors
///
/// Returns an error if the connection or migrations fail.
pub async fn init_pool(database_url: &str, max_connections: Option<u32>) -> Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections.unwrap_or(DEFAULT_DB_MAX_CONNECTIONS))
        .connect(database_url)
        .await?;

    sqlx::migrate!("src/db/migrations").run(&pool).await?;

    Ok(pool)
}

/// Open the Postgres store when a database URL is configured, otherwise an
/// in-process store that forgets everything on restart.
///
/// # Errors
///
/// Returns an error if the database connection or migrations fail.
pub async fn open_store(
    database_url: Option<&str>,
    max_connections: Option<u32>,
) -> Result<Arc<dyn TransactionStore>, sqlx::Error> {
    match database_url {
        Some(url) => {
            let pool = init_pool(url, max_connections).await?;
            tracing::info!("transaction store: postgres");
            Ok(Arc::new(postgres::PgStore::new(pool)))
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using in-memory transaction store");
            Ok(Arc::new(memory::MemoryStore::new()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auto_id_is_twenty_alphanumerics() {
        let id = auto_id();
        assert_eq!(id.len(), 20);
        assert!(id.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn auto_ids_differ() {
        assert_ne!(auto_id(), auto_id());
    }

    #[tokio::test]
    async fn dropping_subscription_cancels_listener_token() {
        let (_tx, token, sub) = Subscription::channel();
        assert!(!token.is_cancelled());
        drop(sub);
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn subscription_ends_when_sender_closes() {
        let (tx, _token, mut sub) = Subscription::channel();
        tx.send(Ok(Vec::new())).await.unwrap();
        drop(tx);
        assert!(matches!(sub.next().await, Some(Ok(list)) if list.is_empty()));
        assert!(sub.next().await.is_none());
    }
}
