use super::Deleted;
use crate::application::menu::{CategoryInput, CategoryPatch};
use crate::domain::menu::{Category, MenuFilter, MenuFilters, MenuItem, MenuItemPatch, NewMenuItem};
use crate::interfaces::http::extract::Owner;
use crate::interfaces::http::response::{ApiJson, ApiResponse, ApiResult};
use crate::interfaces::http::state::AppState;
use axum::extract::{Path, Query, State};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub struct MenuList {
    items: Vec<MenuItem>,
}

#[derive(Debug, Deserialize)]
pub struct SubcategoryBody {
    pub name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryRemoved {
    deleted_items: u64,
}

pub async fn list_items(
    State(state): State<AppState>,
    Query(filter): Query<MenuFilter>,
) -> ApiResult<MenuList> {
    Ok(ApiResponse::ok(MenuList {
        items: state.menu.list_items(&filter).await?,
    }))
}

pub async fn filters(State(state): State<AppState>) -> ApiResult<MenuFilters> {
    Ok(ApiResponse::ok(state.menu.filters().await?))
}

pub async fn get_item(State(state): State<AppState>, Path(id): Path<u64>) -> ApiResult<MenuItem> {
    Ok(ApiResponse::ok(state.menu.get_item(id).await?))
}

pub async fn create_item(
    _: Owner,
    State(state): State<AppState>,
    ApiJson(item): ApiJson<NewMenuItem>,
) -> ApiResult<MenuItem> {
    Ok(ApiResponse::created(state.menu.create_item(item).await?))
}

pub async fn update_item(
    _: Owner,
    State(state): State<AppState>,
    Path(id): Path<u64>,
    ApiJson(patch): ApiJson<MenuItemPatch>,
) -> ApiResult<MenuItem> {
    Ok(ApiResponse::ok(state.menu.update_item(id, patch).await?))
}

pub async fn delete_item(
    _: Owner,
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> ApiResult<Deleted> {
    state.menu.delete_item(id).await?;
    Ok(ApiResponse::ok(Deleted::YES))
}

pub async fn list_categories(State(state): State<AppState>) -> ApiResult<Vec<Category>> {
    Ok(ApiResponse::ok(state.menu.list_categories().await?))
}

pub async fn create_category(
    _: Owner,
    State(state): State<AppState>,
    ApiJson(input): ApiJson<CategoryInput>,
) -> ApiResult<Category> {
    Ok(ApiResponse::created(state.menu.create_category(input).await?))
}

pub async fn update_category(
    _: Owner,
    State(state): State<AppState>,
    Path(id): Path<u64>,
    ApiJson(patch): ApiJson<CategoryPatch>,
) -> ApiResult<Category> {
    Ok(ApiResponse::ok(state.menu.update_category(id, patch).await?))
}

pub async fn delete_category(
    _: Owner,
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> ApiResult<CategoryRemoved> {
    let deleted_items = state.menu.delete_category(id).await?;
    Ok(ApiResponse::ok(CategoryRemoved { deleted_items })
        .message("Category and associated menu items deleted"))
}

pub async fn add_subcategory(
    _: Owner,
    State(state): State<AppState>,
    Path(id): Path<u64>,
    ApiJson(body): ApiJson<SubcategoryBody>,
) -> ApiResult<Category> {
    Ok(ApiResponse::created(
        state.menu.add_subcategory(id, &body.name).await?,
    ))
}

pub async fn remove_subcategory(
    _: Owner,
    State(state): State<AppState>,
    Path((id, sub)): Path<(u64, String)>,
) -> ApiResult<Category> {
    Ok(ApiResponse::ok(state.menu.remove_subcategory(id, &sub).await?))
}
