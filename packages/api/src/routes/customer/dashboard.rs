use axum::{Extension, Json, extract::State};
use rust_decimal::Decimal;
use sea_orm::{
    ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
};
use serde::Serialize;

use crate::{
    entity::{order, order::OrderStatus, product},
    error::ApiError,
    middleware::auth::AppUser,
    state::AppState,
};

use super::orders::{OrderView, load_order_views};

#[derive(Debug, Serialize)]
pub struct CustomerDashboard {
    pub total_orders: u64,
    pub pending_orders: u64,
    pub total_spent: Decimal,
    pub order_history: Vec<OrderView>,
    /// Active products with stock on hand, ready to order
    pub products: Vec<product::Model>,
}

#[tracing::instrument(name = "GET /customer/dashboard", skip(state, user))]
pub async fn get_dashboard(
    State(state): State<AppState>,
    Extension(user): Extension<AppUser>,
) -> Result<Json<CustomerDashboard>, ApiError> {
    let auth = user.auth()?;

    let total_orders = order::Entity::find()
        .filter(order::Column::CustomerId.eq(&auth.id))
        .count(&state.db)
        .await?;

    let pending_orders = order::Entity::find()
        .filter(order::Column::CustomerId.eq(&auth.id))
        .filter(order::Column::Status.eq(OrderStatus::Pending))
        .count(&state.db)
        .await?;

    let total_spent = order::Entity::find()
        .filter(order::Column::CustomerId.eq(&auth.id))
        .select_only()
        .column_as(order::Column::TotalAmount.sum(), "total")
        .into_tuple::<Option<Decimal>>()
        .one(&state.db)
        .await?
        .flatten()
        .unwrap_or(Decimal::ZERO);

    let orders = order::Entity::find()
        .filter(order::Column::CustomerId.eq(&auth.id))
        .order_by_desc(order::Column::CreatedAt)
        .all(&state.db)
        .await?;
    let order_history = load_order_views(&state.db, orders, false).await?;

    let products = product::Entity::find()
        .filter(product::Column::IsActive.eq(true))
        .filter(product::Column::Stock.gt(0))
        .order_by_asc(product::Column::Category)
        .order_by_asc(product::Column::Name)
        .all(&state.db)
        .await?;

    Ok(Json(CustomerDashboard {
        total_orders,
        pending_orders,
        total_spent,
        order_history,
        products,
    }))
}
