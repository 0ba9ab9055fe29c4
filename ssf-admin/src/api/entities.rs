//! Per-entity CRUD endpoints
//!
//! `GET|POST /api/<entity>` and `GET|PUT|DELETE /api/<entity>/:id` for
//! pillars, themes, sub-themes, standards and indicators. Updates are partial:
//! fields left out of the body keep their stored value. Deletes cascade.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use ssf_common::db::indicators::IndicatorFilter;
use ssf_common::db::{
    indicators, pillars, standards, subthemes, themes, Indicator, IndicatorUpdate, NewIndicator,
    NewIndicatorRequest, NewPillar, NewStandard, NewSubtheme, NewTheme, Pillar, PillarUpdate,
    Standard, StandardUpdate, Subtheme, SubthemeUpdate, Theme, ThemeUpdate,
};
use ssf_common::Error;
use tracing::info;

use crate::error::ApiResult;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ThemeQuery {
    pub pillar_id: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SubthemeQuery {
    pub theme_id: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct StandardQuery {
    pub subtheme_id: Option<i64>,
}

fn require(value: &str, field: &str) -> Result<(), Error> {
    if value.trim().is_empty() {
        return Err(Error::Validation(format!("'{}' must not be empty", field)));
    }
    Ok(())
}

fn deleted(level: &str, id: i64) -> Json<Value> {
    info!("Deleted {} {}", level, id);
    Json(json!({ "ok": true, "deleted": id }))
}

// ========================================
// Pillars
// ========================================

pub async fn list_pillars(State(state): State<AppState>) -> ApiResult<Json<Vec<Pillar>>> {
    Ok(Json(pillars::list(&state.db).await?))
}

pub async fn get_pillar(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Pillar>> {
    Ok(Json(pillars::get(&state.db, id).await?))
}

pub async fn create_pillar(
    State(state): State<AppState>,
    Json(new): Json<NewPillar>,
) -> ApiResult<(StatusCode, Json<Pillar>)> {
    require(&new.code, "code")?;
    require(&new.name, "name")?;
    let id = pillars::insert(&state.db, &new).await?;
    info!("Created pillar {} ({})", id, new.code);
    Ok((StatusCode::CREATED, Json(pillars::get(&state.db, id).await?)))
}

pub async fn update_pillar(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(changes): Json<PillarUpdate>,
) -> ApiResult<Json<Pillar>> {
    pillars::update(&state.db, id, &changes).await?;
    Ok(Json(pillars::get(&state.db, id).await?))
}

pub async fn delete_pillar(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Value>> {
    pillars::delete(&state.db, id).await?;
    Ok(deleted("pillar", id))
}

// ========================================
// Themes
// ========================================

pub async fn list_themes(
    State(state): State<AppState>,
    Query(query): Query<ThemeQuery>,
) -> ApiResult<Json<Vec<Theme>>> {
    Ok(Json(themes::list(&state.db, query.pillar_id).await?))
}

pub async fn get_theme(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Theme>> {
    Ok(Json(themes::get(&state.db, id).await?))
}

pub async fn create_theme(
    State(state): State<AppState>,
    Json(new): Json<NewTheme>,
) -> ApiResult<(StatusCode, Json<Theme>)> {
    require(&new.code, "code")?;
    require(&new.name, "name")?;
    let id = themes::insert(&state.db, &new).await?;
    info!("Created theme {} ({})", id, new.code);
    Ok((StatusCode::CREATED, Json(themes::get(&state.db, id).await?)))
}

pub async fn update_theme(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(changes): Json<ThemeUpdate>,
) -> ApiResult<Json<Theme>> {
    themes::update(&state.db, id, &changes).await?;
    Ok(Json(themes::get(&state.db, id).await?))
}

pub async fn delete_theme(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Value>> {
    themes::delete(&state.db, id).await?;
    Ok(deleted("theme", id))
}

// ========================================
// Sub-themes
// ========================================

pub async fn list_subthemes(
    State(state): State<AppState>,
    Query(query): Query<SubthemeQuery>,
) -> ApiResult<Json<Vec<Subtheme>>> {
    Ok(Json(subthemes::list(&state.db, query.theme_id).await?))
}

pub async fn get_subtheme(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Subtheme>> {
    Ok(Json(subthemes::get(&state.db, id).await?))
}

pub async fn create_subtheme(
    State(state): State<AppState>,
    Json(new): Json<NewSubtheme>,
) -> ApiResult<(StatusCode, Json<Subtheme>)> {
    require(&new.code, "code")?;
    require(&new.name, "name")?;
    let id = subthemes::insert(&state.db, &new).await?;
    info!("Created sub-theme {} ({})", id, new.code);
    Ok((StatusCode::CREATED, Json(subthemes::get(&state.db, id).await?)))
}

pub async fn update_subtheme(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(changes): Json<SubthemeUpdate>,
) -> ApiResult<Json<Subtheme>> {
    subthemes::update(&state.db, id, &changes).await?;
    Ok(Json(subthemes::get(&state.db, id).await?))
}

pub async fn delete_subtheme(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Value>> {
    subthemes::delete(&state.db, id).await?;
    Ok(deleted("subtheme", id))
}

// ========================================
// Standards
// ========================================

pub async fn list_standards(
    State(state): State<AppState>,
    Query(query): Query<StandardQuery>,
) -> ApiResult<Json<Vec<Standard>>> {
    Ok(Json(standards::list(&state.db, query.subtheme_id).await?))
}

pub async fn get_standard(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Standard>> {
    Ok(Json(standards::get(&state.db, id).await?))
}

pub async fn create_standard(
    State(state): State<AppState>,
    Json(new): Json<NewStandard>,
) -> ApiResult<(StatusCode, Json<Standard>)> {
    require(&new.description, "description")?;
    let id = standards::insert(&state.db, &new).await?;
    info!("Created standard {}", id);
    Ok((StatusCode::CREATED, Json(standards::get(&state.db, id).await?)))
}

pub async fn update_standard(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(changes): Json<StandardUpdate>,
) -> ApiResult<Json<Standard>> {
    standards::update(&state.db, id, &changes).await?;
    Ok(Json(standards::get(&state.db, id).await?))
}

pub async fn delete_standard(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Value>> {
    standards::delete(&state.db, id).await?;
    Ok(deleted("standard", id))
}

// ========================================
// Indicators
// ========================================

pub async fn list_indicators(
    State(state): State<AppState>,
    Query(filter): Query<IndicatorFilter>,
) -> ApiResult<Json<Vec<Indicator>>> {
    Ok(Json(indicators::list(&state.db, &filter).await?))
}

pub async fn get_indicator(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Indicator>> {
    Ok(Json(indicators::get(&state.db, id).await?))
}

pub async fn create_indicator(
    State(state): State<AppState>,
    Json(request): Json<NewIndicatorRequest>,
) -> ApiResult<(StatusCode, Json<Indicator>)> {
    let new = NewIndicator::try_from(request)?;
    require(&new.name, "name")?;
    let id = indicators::insert(&state.db, &new).await?;
    info!("Created indicator {} on {} {}", id, new.parent.level(), new.parent.id());
    Ok((StatusCode::CREATED, Json(indicators::get(&state.db, id).await?)))
}

pub async fn update_indicator(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(changes): Json<IndicatorUpdate>,
) -> ApiResult<Json<Indicator>> {
    indicators::update(&state.db, id, &changes).await?;
    Ok(Json(indicators::get(&state.db, id).await?))
}

pub async fn delete_indicator(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Value>> {
    indicators::delete(&state.db, id).await?;
    Ok(deleted("indicator", id))
}

/// Collection and item routes for every entity
pub fn entity_routes() -> Router<AppState> {
    Router::new()
        .route("/api/pillars", get(list_pillars).post(create_pillar))
        .route(
            "/api/pillars/:id",
            get(get_pillar).put(update_pillar).delete(delete_pillar),
        )
        .route("/api/themes", get(list_themes).post(create_theme))
        .route(
            "/api/themes/:id",
            get(get_theme).put(update_theme).delete(delete_theme),
        )
        .route("/api/subthemes", get(list_subthemes).post(create_subtheme))
        .route(
            "/api/subthemes/:id",
            get(get_subtheme).put(update_subtheme).delete(delete_subtheme),
        )
        .route("/api/standards", get(list_standards).post(create_standard))
        .route(
            "/api/standards/:id",
            get(get_standard).put(update_standard).delete(delete_standard),
        )
        .route("/api/indicators", get(list_indicators).post(create_indicator))
        .route(
            "/api/indicators/:id",
            get(get_indicator).put(update_indicator).delete(delete_indicator),
        )
}
