use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use super::{
    dto::{RestockRequest, SearchParams, SweetInput},
    repo_types::Sweet,
    services,
};
use crate::{
    auth::Caller,
    error::{AppError, AppResult},
    extract::AppJson,
    state::AppState,
};

pub fn sweet_routes() -> Router<AppState> {
    Router::new()
        .route("/sweets/", get(list_sweets).post(create_sweet))
        .route("/sweets/search/", get(search_sweets))
        .route(
            "/sweets/:id/",
            get(get_sweet)
                .put(put_sweet)
                .patch(patch_sweet)
                .delete(delete_sweet),
        )
        .route("/sweets/:id/purchase/", post(purchase_sweet))
        .route("/sweets/:id/restock/", post(restock_sweet))
}

/// Non-numeric ids cannot name a sweet.
fn sweet_id(raw: &str) -> AppResult<i64> {
    raw.parse::<i64>().map_err(|_| AppError::NotFound)
}

/// Body problems only surface for callers who are allowed in at all.
fn body_after_auth<T>(caller: &Caller, payload: Result<AppJson<T>, AppError>) -> AppResult<T> {
    caller.require_authenticated()?;
    payload.map(|AppJson(v)| v)
}

#[instrument(skip(state))]
pub async fn list_sweets(
    State(state): State<AppState>,
    caller: Caller,
) -> AppResult<Json<Vec<Sweet>>> {
    Ok(Json(services::list(state.sweets.as_ref(), &caller).await?))
}

#[instrument(skip(state))]
pub async fn search_sweets(
    State(state): State<AppState>,
    caller: Caller,
    Query(params): Query<SearchParams>,
) -> AppResult<Json<Vec<Sweet>>> {
    Ok(Json(
        services::search(state.sweets.as_ref(), &caller, &params.search).await?,
    ))
}

#[instrument(skip(state, payload))]
pub async fn create_sweet(
    State(state): State<AppState>,
    caller: Caller,
    payload: Result<AppJson<SweetInput>, AppError>,
) -> AppResult<(StatusCode, Json<Sweet>)> {
    let input = body_after_auth(&caller, payload)?;
    let sweet = services::create(state.sweets.as_ref(), &caller, input).await?;
    Ok((StatusCode::CREATED, Json(sweet)))
}

#[instrument(skip(state))]
pub async fn get_sweet(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
) -> AppResult<Json<Sweet>> {
    caller.require_authenticated()?;
    let id = sweet_id(&id)?;
    Ok(Json(services::retrieve(state.sweets.as_ref(), &caller, id).await?))
}

#[instrument(skip(state, payload))]
pub async fn put_sweet(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
    payload: Result<AppJson<SweetInput>, AppError>,
) -> AppResult<Json<Sweet>> {
    let input = body_after_auth(&caller, payload)?;
    let id = sweet_id(&id)?;
    Ok(Json(
        services::update(state.sweets.as_ref(), &caller, id, input, false).await?,
    ))
}

#[instrument(skip(state, payload))]
pub async fn patch_sweet(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
    payload: Result<AppJson<SweetInput>, AppError>,
) -> AppResult<Json<Sweet>> {
    let input = body_after_auth(&caller, payload)?;
    let id = sweet_id(&id)?;
    Ok(Json(
        services::update(state.sweets.as_ref(), &caller, id, input, true).await?,
    ))
}

#[instrument(skip(state))]
pub async fn delete_sweet(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    caller.require_admin()?;
    let id = sweet_id(&id)?;
    services::delete(state.sweets.as_ref(), &caller, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
pub async fn purchase_sweet(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
) -> AppResult<Json<Sweet>> {
    caller.require_authenticated()?;
    let id = sweet_id(&id)?;
    Ok(Json(services::purchase(state.sweets.as_ref(), &caller, id).await?))
}

#[instrument(skip(state, payload))]
pub async fn restock_sweet(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
    payload: Option<AppJson<RestockRequest>>,
) -> AppResult<Json<Sweet>> {
    caller.require_admin()?;
    let id = sweet_id(&id)?;
    let quantity = payload.and_then(|AppJson(body)| body.quantity);
    Ok(Json(
        services::restock(state.sweets.as_ref(), &caller, id, quantity.as_ref()).await?,
    ))
}
