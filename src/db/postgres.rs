//! `PostgreSQL` transaction store.
//!
//! DESIGN
//! ======
//! Plain `sqlx::query` with runtime binds; no compile-time database. Live
//! queries use a dedicated `PgListener` per subscription on the
//! `transactions_changed` channel, whose payload is the owner id (see the
//! trigger in `migrations/0001_transactions.sql`). Each matching
//! notification re-reads the owner's list and delivers it whole.
//!
//! When the listener connection drops, `try_recv` reports it once and
//! reconnects on the next call; notifications in between are lost, so the
//! task re-reads to resynchronize.

use sqlx::postgres::{PgListener, PgRow};
use sqlx::{PgPool, Row};

use super::{StoreError, Subscription, TransactionStore, auto_id};
use crate::models::{Category, NewTransaction, Transaction, TransactionPatch};

pub const CHANGE_CHANNEL: &str = "transactions_changed";

const SELECT_COLUMNS: &str = "id, owner_id, amount, description, date, category, created_at";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

pub(crate) fn decode_category(raw: &str) -> Result<Category, StoreError> {
    Category::parse(raw).ok_or_else(|| StoreError::Decode(format!("unknown category {raw:?}")))
}

fn row_to_transaction(row: &PgRow) -> Result<Transaction, StoreError> {
    let category: String = row.try_get("category")?;
    Ok(Transaction {
        id: row.try_get("id")?,
        owner_id: row.try_get("owner_id")?,
        amount: row.try_get("amount")?,
        description: row.try_get("description")?,
        date: row.try_get("date")?,
        category: decode_category(&category)?,
        timestamp: row.try_get("created_at")?,
    })
}

async fn fetch_owned(pool: &PgPool, owner_id: &str, category: Option<Category>) -> Result<Vec<Transaction>, StoreError> {
    let rows = sqlx::query(&format!(
        "SELECT {SELECT_COLUMNS} FROM transactions
         WHERE owner_id = $1 AND ($2::text IS NULL OR category = $2)
         ORDER BY created_at DESC, id ASC"
    ))
    .bind(owner_id)
    .bind(category.map(Category::as_str))
    .fetch_all(pool)
    .await?;

    rows.iter().map(row_to_transaction).collect()
}

#[async_trait::async_trait]
impl TransactionStore for PgStore {
    async fn insert(&self, owner_id: &str, new: NewTransaction) -> Result<Transaction, StoreError> {
        let row = sqlx::query(&format!(
            "INSERT INTO transactions (id, owner_id, amount, description, date, category)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {SELECT_COLUMNS}"
        ))
        .bind(auto_id())
        .bind(owner_id)
        .bind(new.amount)
        .bind(&new.description)
        .bind(new.date)
        .bind(new.category.as_str())
        .fetch_one(&self.pool)
        .await?;
        row_to_transaction(&row)
    }

    async fn merge(&self, owner_id: &str, id: &str, patch: &TransactionPatch) -> Result<Transaction, StoreError> {
        let row = sqlx::query(&format!(
            "UPDATE transactions SET
                 amount = COALESCE($3, amount),
                 description = COALESCE($4, description),
                 date = COALESCE($5, date),
                 category = COALESCE($6, category)
             WHERE id = $1 AND owner_id = $2
             RETURNING {SELECT_COLUMNS}"
        ))
        .bind(id)
        .bind(owner_id)
        .bind(patch.amount)
        .bind(patch.description.as_deref())
        .bind(patch.date)
        .bind(patch.category.map(Category::as_str))
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::NotFound(id.to_owned()))?;
        row_to_transaction(&row)
    }

    async fn delete(&self, owner_id: &str, id: &str) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM transactions WHERE id = $1 AND owner_id = $2")
            .bind(id)
            .bind(owner_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id.to_owned()));
        }
        Ok(())
    }

    async fn query(&self, owner_id: &str, category: Option<Category>) -> Result<Vec<Transaction>, StoreError> {
        fetch_owned(&self.pool, owner_id, category).await
    }

    async fn subscribe(&self, owner_id: &str) -> Result<Subscription, StoreError> {
        let mut listener = PgListener::connect_with(&self.pool).await?;
        listener.listen(CHANGE_CHANNEL).await?;

        let (tx, cancel, subscription) = Subscription::channel();
        let pool = self.pool.clone();
        let owner = owner_id.to_owned();

        tokio::spawn(async move {
            if tx.send(fetch_owned(&pool, &owner, None).await).await.is_err() {
                return;
            }
            loop {
                let resync = tokio::select! {
                    () = cancel.cancelled() => break,
                    received = listener.try_recv() => match received {
                        Ok(Some(notification)) => notification.payload() == owner,
                        Ok(None) => {
                            tracing::warn!(owner = %owner, "postgres store: listener reconnecting");
                            true
                        }
                        Err(e) => {
                            let _ = tx.send(Err(e.into())).await;
                            break;
                        }
                    },
                };
                if resync && tx.send(fetch_owned(&pool, &owner, None).await).await.is_err() {
                    break;
                }
            }
            tracing::debug!(owner = %owner, "postgres store: subscription closed");
        });

        Ok(subscription)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_category_accepts_stored_values() {
        assert_eq!(decode_category("INCOME").unwrap(), Category::Income);
        assert_eq!(decode_category("EXPENSE").unwrap(), Category::Expense);
    }

    #[test]
    fn decode_category_rejects_unknown() {
        assert!(matches!(decode_category("REFUND"), Err(StoreError::Decode(_))));
    }

    #[cfg(feature = "live-db-tests")]
    mod live {
        use std::time::Duration;

        use chrono::NaiveDate;
        use rust_decimal::Decimal;

        use super::*;

        async fn store() -> PgStore {
            let url = std::env::var("DATABASE_URL").expect("DATABASE_URL required for live-db-tests");
            PgStore::new(crate::db::init_pool(&url, None).await.expect("pool"))
        }

        #[tokio::test]
        async fn live_insert_merge_delete_round() {
            let store = store().await;
            let owner = format!("live-{}", auto_id());
            let mut sub = store.subscribe(&owner).await.unwrap();
            let first = tokio::time::timeout(Duration::from_secs(5), sub.next()).await.unwrap().unwrap().unwrap();
            assert!(first.is_empty());

            let tx = store
                .insert(
                    &owner,
                    NewTransaction {
                        amount: Decimal::new(100, 0),
                        description: "live".into(),
                        date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
                        category: Category::Income,
                    },
                )
                .await
                .unwrap();
            let after_insert = tokio::time::timeout(Duration::from_secs(5), sub.next()).await.unwrap().unwrap().unwrap();
            assert_eq!(after_insert.len(), 1);

            let patch = TransactionPatch { description: Some("edited".into()), ..TransactionPatch::default() };
            let merged = store.merge(&owner, &tx.id, &patch).await.unwrap();
            assert_eq!(merged.amount, Decimal::new(100, 0));
            assert_eq!(merged.description, "edited");

            store.delete(&owner, &tx.id).await.unwrap();
            assert!(store.query(&owner, None).await.unwrap().is_empty());
        }
    }
}
