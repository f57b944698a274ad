use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::{info, instrument};

use crate::{
    auth::{dto::MessageResponse, AuthUser},
    error::{ApiError, ApiResult},
    extract::JsonBody,
    products::{dto::ProductPayload, repo_types::Product},
    state::AppState,
};

const NOT_FOUND: ApiError = ApiError::NotFound("Product not found");

pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(list_products).post(create_product))
        .route(
            "/products/:id",
            get(get_product).put(update_product).delete(delete_product),
        )
}

/// Ids that are not positive integers cannot exist.
fn parse_id(raw: &str) -> ApiResult<i64> {
    raw.parse::<i64>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or(NOT_FOUND)
}

#[instrument(skip_all, fields(user_id = auth.user.id))]
pub async fn list_products(
    State(state): State<AppState>,
    AuthUser(auth): AuthUser,
) -> ApiResult<Json<Vec<Product>>> {
    let products = state.products.list().await?;
    Ok(Json(products))
}

#[instrument(skip_all, fields(user_id = auth.user.id))]
pub async fn create_product(
    State(state): State<AppState>,
    AuthUser(auth): AuthUser,
    JsonBody(payload): JsonBody<ProductPayload>,
) -> ApiResult<(StatusCode, Json<Product>)> {
    let new = payload.validate_create()?;
    let product = state.products.add(new).await?;
    info!(product_id = product.id, "product created");
    Ok((StatusCode::CREATED, Json(product)))
}

#[instrument(skip_all, fields(user_id = auth.user.id, product_id = %id))]
pub async fn get_product(
    State(state): State<AppState>,
    AuthUser(auth): AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Product>> {
    let id = parse_id(&id)?;
    let product = state.products.find(id).await?.ok_or(NOT_FOUND)?;
    Ok(Json(product))
}

#[instrument(skip_all, fields(user_id = auth.user.id, product_id = %id))]
pub async fn update_product(
    State(state): State<AppState>,
    AuthUser(auth): AuthUser,
    Path(id): Path<String>,
    payload: Result<JsonBody<ProductPayload>, ApiError>,
) -> ApiResult<Json<Product>> {
    let id = parse_id(&id)?;
    // a missing product wins over a bad or unreadable payload
    if state.products.find(id).await?.is_none() {
        return Err(NOT_FOUND);
    }
    let JsonBody(payload) = payload?;
    let changes = payload.validate_update()?;
    let product = state.products.update(id, changes).await?.ok_or(NOT_FOUND)?;
    info!("product updated");
    Ok(Json(product))
}

#[instrument(skip_all, fields(user_id = auth.user.id, product_id = %id))]
pub async fn delete_product(
    State(state): State<AppState>,
    AuthUser(auth): AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    let id = parse_id(&id)?;
    if !state.products.delete(id).await? {
        return Err(NOT_FOUND);
    }
    info!("product deleted");
    Ok(Json(MessageResponse::new("Product deleted successfully")))
}
