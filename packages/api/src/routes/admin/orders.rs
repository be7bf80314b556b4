use axum::{
    Json,
    extract::{Path, Query, State},
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, EntityTrait, QueryOrder, QuerySelect,
};
use serde::Deserialize;

use crate::{
    entity::order::{self, OrderStatus},
    error::ApiError,
    routes::PaginationParams,
    routes::customer::orders::{OrderView, load_order_views},
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct UpdateOrderStatusRequest {
    pub status: String,
}

#[tracing::instrument(name = "GET /admin/orders", skip(state))]
pub async fn list_orders(
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> Result<Json<Vec<OrderView>>, ApiError> {
    let limit = params.limit.unwrap_or(50).min(200);
    let offset = params.offset.unwrap_or(0);

    let orders = order::Entity::find()
        .order_by_desc(order::Column::CreatedAt)
        .limit(limit)
        .offset(offset)
        .all(&state.db)
        .await?;

    Ok(Json(load_order_views(&state.db, orders, true).await?))
}

/// Staff may set any of the five statuses regardless of the current one;
/// there is no enforced transition graph.
#[tracing::instrument(name = "POST /admin/orders/{order_id}/status", skip(state, payload))]
pub async fn update_order_status(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
    Json(payload): Json<UpdateOrderStatusRequest>,
) -> Result<Json<OrderView>, ApiError> {
    let status = OrderStatus::parse(payload.status.trim())
        .ok_or_else(|| ApiError::bad_request("Invalid status update."))?;

    let order = order::Entity::find_by_id(&order_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("Order not found."))?;

    let mut active: order::ActiveModel = order.into();
    active.status = Set(status);
    active.updated_at = Set(Utc::now().naive_utc());
    let order = active.update(&state.db).await?;

    let mut views = load_order_views(&state.db, vec![order], true).await?;
    views
        .pop()
        .ok_or_else(|| ApiError::internal("Updated order disappeared while rendering"))
        .map(Json)
}
