use axum::{
    Json,
    extract::{Path, State},
};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};

use crate::{entity::product, error::ApiError, not_found, state::AppState};

/// Everything active, including sold-out products; the storefront greys
/// those out instead of hiding them.
#[tracing::instrument(name = "GET /customer/products", skip(state))]
pub async fn list_products(
    State(state): State<AppState>,
) -> Result<Json<Vec<product::Model>>, ApiError> {
    let products = product::Entity::find()
        .filter(product::Column::IsActive.eq(true))
        .order_by_asc(product::Column::Category)
        .order_by_asc(product::Column::Name)
        .all(&state.db)
        .await?;

    Ok(Json(products))
}

#[tracing::instrument(name = "GET /customer/products/{product_id}", skip(state))]
pub async fn get_product(
    State(state): State<AppState>,
    Path(product_id): Path<String>,
) -> Result<Json<product::Model>, ApiError> {
    let product = product::Entity::find_by_id(&product_id)
        .filter(product::Column::IsActive.eq(true))
        .one(&state.db)
        .await?
        .ok_or_else(|| not_found!("Product {} not found", product_id))?;

    Ok(Json(product))
}
