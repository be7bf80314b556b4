//! Catalog management for staff.

use axum::{
    Json,
    extract::{Multipart, Path, Query, State},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder,
    sea_query::{Expr, extension::postgres::PgExpr},
};
use serde::Deserialize;

use crate::{
    entity::{
        order_item,
        product::{self, ProductCategory},
    },
    error::ApiError,
    not_found,
    state::AppState,
    utils::create_id,
};

#[derive(Debug, Clone, Deserialize)]
pub struct ProductFilterParams {
    /// Case-insensitive name filter
    pub q: Option<String>,
    pub category: Option<ProductCategory>,
}

#[derive(Debug, Deserialize)]
pub struct ProductUpsert {
    pub name: String,
    pub category: ProductCategory,
    pub price: Decimal,
    pub stock: i32,
    pub is_active: Option<bool>,
}

pub(crate) fn validate_product_upsert(payload: &ProductUpsert) -> Result<(), ApiError> {
    if payload.name.trim().is_empty() {
        return Err(ApiError::bad_request("Product name must not be empty."));
    }
    if payload.price < Decimal::ZERO {
        return Err(ApiError::bad_request("Price must not be negative."));
    }
    if payload.stock < 0 {
        return Err(ApiError::bad_request("Stock must not be negative."));
    }
    Ok(())
}

#[tracing::instrument(name = "GET /admin/products", skip(state))]
pub async fn list_products(
    State(state): State<AppState>,
    Query(params): Query<ProductFilterParams>,
) -> Result<Json<Vec<product::Model>>, ApiError> {
    let mut query = product::Entity::find();

    if let Some(q) = params.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
        query = query.filter(Expr::col(product::Column::Name).ilike(format!("%{}%", q)));
    }
    if let Some(category) = params.category {
        query = query.filter(product::Column::Category.eq(category));
    }

    let products = query
        .order_by_desc(product::Column::CreatedAt)
        .all(&state.db)
        .await?;

    Ok(Json(products))
}

#[tracing::instrument(name = "POST /admin/products", skip(state, payload))]
pub async fn create_product(
    State(state): State<AppState>,
    Json(payload): Json<ProductUpsert>,
) -> Result<Json<product::Model>, ApiError> {
    validate_product_upsert(&payload)?;

    let now = Utc::now().naive_utc();
    let product = product::ActiveModel {
        id: Set(create_id()),
        name: Set(payload.name.trim().to_string()),
        category: Set(payload.category),
        price: Set(payload.price),
        stock: Set(payload.stock),
        image_path: Set(None),
        is_active: Set(payload.is_active.unwrap_or(true)),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&state.db)
    .await?;

    Ok(Json(product))
}

#[tracing::instrument(name = "PUT /admin/products/{product_id}", skip(state, payload))]
pub async fn update_product(
    State(state): State<AppState>,
    Path(product_id): Path<String>,
    Json(payload): Json<ProductUpsert>,
) -> Result<Json<product::Model>, ApiError> {
    validate_product_upsert(&payload)?;

    let product = product::Entity::find_by_id(&product_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| not_found!("Product {} not found", product_id))?;

    let mut active: product::ActiveModel = product.into();
    active.name = Set(payload.name.trim().to_string());
    active.category = Set(payload.category);
    active.price = Set(payload.price);
    active.stock = Set(payload.stock);
    if let Some(is_active) = payload.is_active {
        active.is_active = Set(is_active);
    }
    active.updated_at = Set(Utc::now().naive_utc());
    let product = active.update(&state.db).await?;

    Ok(Json(product))
}

/// Order items keep a foreign key to their product, so deletion is refused
/// while any order references it; deactivate the product instead.
#[tracing::instrument(name = "DELETE /admin/products/{product_id}", skip(state))]
pub async fn delete_product(
    State(state): State<AppState>,
    Path(product_id): Path<String>,
) -> Result<Json<()>, ApiError> {
    let product = product::Entity::find_by_id(&product_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| not_found!("Product {} not found", product_id))?;

    let referenced = order_item::Entity::find()
        .filter(order_item::Column::ProductId.eq(&product.id))
        .count(&state.db)
        .await?;
    if referenced > 0 {
        return Err(ApiError::conflict(
            "Product is referenced by existing orders and cannot be deleted.",
        ));
    }

    let active: product::ActiveModel = product.into();
    active.delete(&state.db).await?;

    Ok(Json(()))
}

/// Stores the upload as an opaque blob below the media root. No format
/// validation, matching the upload form it replaces.
#[tracing::instrument(name = "POST /admin/products/{product_id}/image", skip(state, multipart))]
pub async fn upload_product_image(
    State(state): State<AppState>,
    Path(product_id): Path<String>,
    mut multipart: Multipart,
) -> Result<Json<product::Model>, ApiError> {
    let product = product::Entity::find_by_id(&product_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| not_found!("Product {} not found", product_id))?;

    let mut upload: Option<(String, axum::body::Bytes)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid multipart upload: {}", e)))?
    {
        if field.name() != Some("image") {
            continue;
        }
        let ext = field
            .file_name()
            .and_then(|name| std::path::Path::new(name).extension())
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .filter(|ext| !ext.is_empty() && ext.len() <= 8 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
            .unwrap_or_else(|| "bin".to_string());
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::bad_request(format!("Failed to read upload: {}", e)))?;
        upload = Some((ext, data));
        break;
    }

    let Some((ext, data)) = upload else {
        return Err(ApiError::bad_request("Missing image field in upload."));
    };

    let relative = format!("products/{}.{}", product.id, ext);
    let target = state.config.media_dir.join(&relative);
    if let Some(parent) = target.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(&target, &data).await?;

    let mut active: product::ActiveModel = product.into();
    active.image_path = Set(Some(relative));
    active.updated_at = Set(Utc::now().naive_utc());
    let product = active.update(&state.db).await?;

    Ok(Json(product))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upsert(name: &str, price: &str, stock: i32) -> ProductUpsert {
        ProductUpsert {
            name: name.to_string(),
            category: ProductCategory::Bottled,
            price: price.parse::<Decimal>().unwrap(),
            stock,
            is_active: None,
        }
    }

    #[test]
    fn test_valid_upsert_passes() {
        assert!(validate_product_upsert(&upsert("Bottled Chili Garlic", "150.00", 10)).is_ok());
        assert!(validate_product_upsert(&upsert("Free Sample", "0.00", 0)).is_ok());
    }

    #[test]
    fn test_blank_name_rejected() {
        assert!(validate_product_upsert(&upsert("   ", "150.00", 10)).is_err());
    }

    #[test]
    fn test_negative_price_and_stock_rejected() {
        assert!(validate_product_upsert(&upsert("Meal", "-1.00", 10)).is_err());
        assert!(validate_product_upsert(&upsert("Meal", "1.00", -1)).is_err());
    }
}
