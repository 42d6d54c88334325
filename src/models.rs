//! Durable and ephemeral domain records.
//!
//! `Transaction` is owned by the document store; this crate only holds typed
//! copies of it. `ChatMessage` lives only inside a chat session.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Calendar format used on the wire and in forms.
pub const DATE_FORMAT: &str = "%d-%m-%Y";

// =============================================================================
// CATEGORY
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Category {
    #[default]
    Income,
    Expense,
}

impl Category {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Income => "INCOME",
            Self::Expense => "EXPENSE",
        }
    }

    /// Case-insensitive parse of `INCOME` / `EXPENSE`.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "INCOME" => Some(Self::Income),
            "EXPENSE" => Some(Self::Expense),
            _ => None,
        }
    }

    /// Direction of money flow: inflow positive, outflow negative.
    #[must_use]
    pub fn sign(self) -> Decimal {
        match self {
            Self::Income => Decimal::ONE,
            Self::Expense => Decimal::NEGATIVE_ONE,
        }
    }
}

// =============================================================================
// TRANSACTION
// =============================================================================

/// One stored transaction. `amount` is a positive magnitude; its direction is
/// given by `category`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub owner_id: String,
    pub amount: Decimal,
    pub description: String,
    #[serde(with = "day_month_year")]
    pub date: NaiveDate,
    pub category: Category,
    /// Server-assigned ordering key. Live queries sort on it descending.
    pub timestamp: DateTime<Utc>,
}

impl Transaction {
    #[must_use]
    pub fn signed_amount(&self) -> Decimal {
        self.amount * self.category.sign()
    }
}

/// Fields supplied when creating a transaction. The store adds id, owner and
/// timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTransaction {
    pub amount: Decimal,
    pub description: String,
    pub date: NaiveDate,
    pub category: Category,
}

/// Partial update with merge semantics: `None` leaves the stored value alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionPatch {
    pub amount: Option<Decimal>,
    pub description: Option<String>,
    pub date: Option<NaiveDate>,
    pub category: Option<Category>,
}

impl TransactionPatch {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.amount.is_none() && self.description.is_none() && self.date.is_none() && self.category.is_none()
    }

    pub fn apply(&self, tx: &mut Transaction) {
        if let Some(amount) = self.amount {
            tx.amount = amount;
        }
        if let Some(description) = &self.description {
            tx.description.clone_from(description);
        }
        if let Some(date) = self.date {
            tx.date = date;
        }
        if let Some(category) = self.category {
            tx.category = category;
        }
    }
}

// =============================================================================
// CHAT MESSAGE
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub is_user: bool,
    pub content: String,
}

impl ChatMessage {
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self { is_user: true, content: content.into() }
    }

    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self { is_user: false, content: content.into() }
    }
}

// =============================================================================
// SERDE HELPERS
// =============================================================================

/// Parse a `dd-mm-yyyy` date.
#[must_use]
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).ok()
}

#[must_use]
pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub mod day_month_year {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_date(*date))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_date(&raw).ok_or_else(|| serde::de::Error::custom(format!("expected dd-mm-yyyy date, got {raw:?}")))
    }
}

#[cfg(test)]
#[path = "models_test.rs"]
mod tests;
