//! Inventory operations. Every entry point takes the [`Caller`] and
//! checks it before touching the store.

use serde_json::Value;
use tracing::{info, warn};

use super::{
    dto::SweetInput,
    repo::SweetStore,
    repo_types::{StockChange, Sweet},
    validation::{restock_quantity, validate_sweet, WriteMode, QUANTITY_TOO_LARGE},
};
use crate::{
    auth::Caller,
    error::{AppError, AppResult},
};

pub const OUT_OF_STOCK: &str = "This sweet is out of stock.";

/// Splits a search query on whitespace and commas.
pub fn search_terms(query: &str) -> Vec<String> {
    query
        .replace('\0', "")
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

pub async fn list(store: &dyn SweetStore, caller: &Caller) -> AppResult<Vec<Sweet>> {
    caller.require_authenticated()?;
    Ok(store.list().await?)
}

pub async fn search(store: &dyn SweetStore, caller: &Caller, query: &str) -> AppResult<Vec<Sweet>> {
    caller.require_authenticated()?;
    let terms = search_terms(query);
    if terms.is_empty() {
        return Ok(store.list().await?);
    }
    Ok(store.search(&terms).await?)
}

pub async fn create(store: &dyn SweetStore, caller: &Caller, input: SweetInput) -> AppResult<Sweet> {
    let user_id = caller.require_authenticated()?;
    let fields = validate_sweet(&input, None, WriteMode::Create).map_err(AppError::Validation)?;
    let sweet = store.create(fields).await?;
    info!(sweet_id = sweet.id, %user_id, name = %sweet.name, "sweet created");
    Ok(sweet)
}

pub async fn retrieve(store: &dyn SweetStore, caller: &Caller, id: i64) -> AppResult<Sweet> {
    caller.require_authenticated()?;
    store.get(id).await?.ok_or(AppError::NotFound)
}

/// PUT (`partial == false`) or PATCH (`partial == true`).
pub async fn update(
    store: &dyn SweetStore,
    caller: &Caller,
    id: i64,
    input: SweetInput,
    partial: bool,
) -> AppResult<Sweet> {
    let user_id = caller.require_authenticated()?;
    let current = store.get(id).await?.ok_or(AppError::NotFound)?;
    let mode = if partial { WriteMode::Patch } else { WriteMode::Replace };
    let fields = validate_sweet(&input, Some(&current), mode).map_err(AppError::Validation)?;

    // Deleted between the read and the write
    let sweet = store.update(id, fields).await?.ok_or(AppError::NotFound)?;
    info!(sweet_id = id, %user_id, "sweet updated");
    Ok(sweet)
}

pub async fn delete(store: &dyn SweetStore, caller: &Caller, id: i64) -> AppResult<()> {
    let user_id = caller.require_admin()?;
    if !store.delete(id).await? {
        return Err(AppError::NotFound);
    }
    info!(sweet_id = id, %user_id, "sweet deleted");
    Ok(())
}

pub async fn purchase(store: &dyn SweetStore, caller: &Caller, id: i64) -> AppResult<Sweet> {
    let user_id = caller.require_authenticated()?;
    match store.adjust_stock(id, -1).await? {
        StockChange::Updated(sweet) => {
            info!(sweet_id = id, %user_id, remaining = sweet.quantity_in_stock, "sweet purchased");
            Ok(sweet)
        }
        StockChange::NotFound => Err(AppError::NotFound),
        StockChange::OutOfStock => {
            warn!(sweet_id = id, %user_id, "purchase of out-of-stock sweet");
            Err(AppError::BadRequest(OUT_OF_STOCK.into()))
        }
        StockChange::Overflow => Err(AppError::Internal(anyhow::anyhow!(
            "stock underflow on purchase of sweet {id}"
        ))),
    }
}

pub async fn restock(
    store: &dyn SweetStore,
    caller: &Caller,
    id: i64,
    quantity: Option<&Value>,
) -> AppResult<Sweet> {
    let user_id = caller.require_admin()?;
    if store.get(id).await?.is_none() {
        return Err(AppError::NotFound);
    }
    let quantity = restock_quantity(quantity).inspect_err(|e| {
        warn!(sweet_id = id, %user_id, error = %e, "restock rejected");
    })?;

    match store.adjust_stock(id, quantity).await? {
        StockChange::Updated(sweet) => {
            info!(sweet_id = id, %user_id, added = quantity, total = sweet.quantity_in_stock, "sweet restocked");
            Ok(sweet)
        }
        StockChange::NotFound => Err(AppError::NotFound),
        StockChange::Overflow => Err(AppError::BadRequest(QUANTITY_TOO_LARGE.into())),
        StockChange::OutOfStock => Err(AppError::Internal(anyhow::anyhow!(
            "positive restock drove sweet {id} negative"
        ))),
    }
}
