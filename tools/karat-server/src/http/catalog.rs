//! Category, material and item endpoints.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use karat_commerce::prelude::*;
use serde::Deserialize;
use serde_json::{json, Value};

use super::error::{ApiError, JsonBody};
use super::AppState;

fn message(text: &str) -> Json<Value> {
    Json(json!({ "message": text }))
}

fn created(text: &str, id: &str) -> impl IntoResponse {
    (StatusCode::CREATED, Json(json!({ "message": text, "id": id })))
}

fn required<T>(raw: Option<&str>, parse: fn(&str) -> Option<T>, field: &str) -> Result<T, ApiError> {
    raw.and_then(parse)
        .ok_or_else(|| ApiError::bad_request(format!("Missing required field: {field}")))
}

#[derive(Debug, Default, Deserialize)]
pub struct SortParams {
    pub sort: Option<String>,
}

impl SortParams {
    fn sort(&self) -> SortOption {
        self.sort.as_deref().map(SortOption::parse).unwrap_or_default()
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct CategoryItemsParams {
    pub category_id: Option<String>,
    pub sort: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TextParams {
    pub q: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct IdParams {
    pub id: Option<String>,
}

/// Body of `PUT /update_item`: the target id plus any item fields.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateItemBody {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(flatten)]
    pub patch: ItemPatch,
}

// ---- categories ----

pub async fn category_tree(
    State(state): State<AppState>,
) -> Result<Json<Vec<CategoryNode>>, ApiError> {
    Ok(Json(state.catalog.category_tree().await?))
}

pub async fn add_category(
    State(state): State<AppState>,
    JsonBody(input): JsonBody<NewCategory>,
) -> Result<impl IntoResponse, ApiError> {
    let category = state.catalog.add_category(input).await?;
    Ok(created("Category added successfully", category.id.as_str()))
}

pub async fn update_category(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(patch): JsonBody<CategoryPatch>,
) -> Result<Json<Value>, ApiError> {
    let id = required(Some(id.as_str()), CategoryId::parse, "id")?;
    state.catalog.update_category(&id, patch).await?;
    Ok(message("Category updated successfully"))
}

pub async fn delete_category(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let id = required(Some(id.as_str()), CategoryId::parse, "id")?;
    let removed = state.catalog.delete_category(&id).await?;
    Ok(Json(json!({
        "message": "Category deleted successfully",
        "removed": removed,
    })))
}

// ---- materials ----

pub async fn list_materials(
    State(state): State<AppState>,
) -> Result<Json<Vec<Material>>, ApiError> {
    Ok(Json(state.catalog.list_materials().await?))
}

pub async fn add_material(
    State(state): State<AppState>,
    JsonBody(input): JsonBody<NewMaterial>,
) -> Result<impl IntoResponse, ApiError> {
    let material = state.catalog.add_material(input).await?;
    Ok(created("Material added successfully", material.id.as_str()))
}

// ---- item reads ----

pub async fn list_items(
    State(state): State<AppState>,
    Query(params): Query<SortParams>,
) -> Result<Json<Vec<ItemView>>, ApiError> {
    Ok(Json(state.catalog.list_items(params.sort()).await?))
}

pub async fn items_by_category(
    State(state): State<AppState>,
    Query(params): Query<CategoryItemsParams>,
) -> Result<Json<Vec<ItemView>>, ApiError> {
    let id = required(params.category_id.as_deref(), CategoryId::parse, "category_id")?;
    let sort = params.sort.as_deref().map(SortOption::parse).unwrap_or_default();
    Ok(Json(state.catalog.items_by_category(&id, sort).await?))
}

pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<TextParams>,
) -> Result<Json<Vec<ItemView>>, ApiError> {
    let text = params.q.unwrap_or_default();
    Ok(Json(state.catalog.search(&text).await?))
}

pub async fn autocomplete(
    State(state): State<AppState>,
    Query(params): Query<TextParams>,
) -> Result<Json<Vec<ItemSuggestion>>, ApiError> {
    let text = params.q.unwrap_or_default();
    Ok(Json(state.catalog.autocomplete(&text).await?))
}

pub async fn get_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ItemDetail>, ApiError> {
    let id = required(Some(id.as_str()), ItemId::parse, "id")?;
    Ok(Json(state.catalog.get_item_detail(&id).await?))
}

// ---- item writes ----

pub async fn add_item(
    State(state): State<AppState>,
    JsonBody(input): JsonBody<NewItem>,
) -> Result<impl IntoResponse, ApiError> {
    let item = state.catalog.add_item(input).await?;
    Ok(created("Item added successfully", item.id.as_str()))
}

pub async fn update_item(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<UpdateItemBody>,
) -> Result<Json<Value>, ApiError> {
    let id = required(body.id.as_deref(), ItemId::parse, "id")?;
    state.catalog.update_item(&id, body.patch).await?;
    Ok(message("Item updated successfully"))
}

pub async fn delete_item(
    State(state): State<AppState>,
    Query(params): Query<IdParams>,
) -> Result<Json<Value>, ApiError> {
    let id = required(params.id.as_deref(), ItemId::parse, "id")?;
    state.catalog.delete_item(&id).await?;
    Ok(message("Item deleted successfully"))
}
