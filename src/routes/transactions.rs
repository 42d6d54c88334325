//! Transaction routes: view page, create, edit, delete.
//!
//! Every handler is scoped to the signed-in user: the owner id is the
//! session's provider uid, never a request field.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::{Deserialize, Serialize};

use crate::db::StoreError;
use crate::error::{ApiError, FieldError};
use crate::models::{Category, Transaction};
use crate::routes::auth::AuthUser;
use crate::services::ledger::{Sort, SortDir, SortKey, TransactionView, ViewPage};
use crate::services::transactions::{self as tx_svc, TransactionAdapter, TransactionForm};
use crate::state::AppState;

pub(crate) fn store_error_to_status(err: &StoreError) -> StatusCode {
    match err {
        StoreError::NotFound(_) => StatusCode::NOT_FOUND,
        StoreError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        StoreError::Database(_) | StoreError::Decode(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Store failure shown as the form's toast text. Not-found keeps its own
/// message so the caller can tell a stale row from an outage.
fn store_failure(err: &StoreError, toast: &str) -> ApiError {
    let mut api = ApiError::new(store_error_to_status(err), err);
    if !matches!(err, StoreError::NotFound(_)) {
        api.body.message = toast.to_owned();
    }
    api
}

#[derive(Debug, Default, Deserialize)]
pub struct ViewQuery {
    pub tab: Option<String>,
    pub page: Option<usize>,
    pub sort: Option<SortKey>,
    pub dir: Option<SortDir>,
}

impl ViewQuery {
    /// Build the view this query asks for.
    ///
    /// # Errors
    ///
    /// Rejects an unknown tab.
    pub fn into_view(self) -> Result<TransactionView, Vec<FieldError>> {
        let tab = match self.tab.as_deref() {
            None | Some("") => Category::default(),
            Some(raw) => Category::parse(raw).ok_or_else(|| vec![FieldError::new("tab", "Unknown category")])?,
        };
        let mut view = TransactionView::default();
        view.set_tab(tab);
        view.set_page(self.page.unwrap_or(0));
        view.set_sort(self.sort.map(|key| Sort { key, dir: self.dir.unwrap_or_default() }));
        Ok(view)
    }
}

#[derive(Debug, Serialize)]
pub struct Created {
    pub id: String,
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct Updated {
    pub transaction: Transaction,
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct Deleted {
    pub message: &'static str,
}

// =============================================================================
// HANDLERS
// =============================================================================

/// `GET /api/transactions?tab=&page=&sort=&dir=`: one page of the table.
pub async fn list(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<ViewQuery>,
) -> Result<Json<ViewPage>, ApiError> {
    let mut view = query.into_view().map_err(ApiError::validation)?;
    let adapter = TransactionAdapter::new(state.store.clone(), auth.user.uid);
    let rows = adapter
        .get_filtered_transactions(view.tab)
        .await
        .map_err(|e| store_failure(&e, tx_svc::LOAD_FAILED))?;
    Ok(Json(view.derive(&rows)))
}

/// `POST /api/transactions`: add. Category defaults to the income tab and
/// the date to today.
pub async fn create(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(form): Json<TransactionForm>,
) -> Result<(StatusCode, Json<Created>), ApiError> {
    let new = form
        .into_new(Category::default(), tx_svc::today())
        .map_err(ApiError::validation)?;
    let adapter = TransactionAdapter::new(state.store.clone(), auth.user.uid);
    let id = adapter
        .add_transaction(new)
        .await
        .map_err(|e| store_failure(&e, tx_svc::SAVE_FAILED))?;
    Ok((StatusCode::CREATED, Json(Created { id, message: tx_svc::ADDED })))
}

/// `PATCH /api/transactions/{id}`: merge the supplied fields.
pub async fn update(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
    Json(form): Json<TransactionForm>,
) -> Result<Json<Updated>, ApiError> {
    let patch = form.into_patch().map_err(ApiError::validation)?;
    let adapter = TransactionAdapter::new(state.store.clone(), auth.user.uid);
    let transaction = adapter
        .update_transaction(&id, &patch)
        .await
        .map_err(|e| store_failure(&e, tx_svc::SAVE_FAILED))?;
    Ok(Json(Updated { transaction, message: tx_svc::UPDATED }))
}

/// `DELETE /api/transactions/{id}`
pub async fn delete(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Deleted>, ApiError> {
    let adapter = TransactionAdapter::new(state.store.clone(), auth.user.uid);
    adapter
        .delete_transaction(&id)
        .await
        .map_err(|e| store_failure(&e, tx_svc::DELETE_FAILED))?;
    Ok(Json(Deleted { message: tx_svc::DELETED }))
}

#[cfg(test)]
#[path = "transactions_test.rs"]
mod tests;
