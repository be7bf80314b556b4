use std::collections::HashMap;

use axum::{Extension, Json, extract::State};
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    entity::{order, order_item, product, user},
    error::ApiError,
    middleware::auth::AppUser,
    state::AppState,
};

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderItemView {
    pub product_id: String,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub addons: String,
    pub line_total: Decimal,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderView {
    pub id: String,
    pub customer_id: String,
    /// Only populated on staff views
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_username: Option<String>,
    pub status: String,
    pub payment_method: String,
    pub total_amount: Decimal,
    pub created_at: NaiveDateTime,
    pub items: Vec<OrderItemView>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MyOrdersResponse {
    pub active: Vec<OrderView>,
    pub past: Vec<OrderView>,
}

/// Assembles nested order views with two batched lookups instead of one
/// query per order.
pub(crate) async fn load_order_views(
    db: &DatabaseConnection,
    orders: Vec<order::Model>,
    include_customer: bool,
) -> Result<Vec<OrderView>, ApiError> {
    let order_ids: Vec<String> = orders.iter().map(|order| order.id.clone()).collect();
    let items = if order_ids.is_empty() {
        Vec::new()
    } else {
        order_item::Entity::find()
            .filter(order_item::Column::OrderId.is_in(order_ids))
            .all(db)
            .await?
    };

    let product_ids: Vec<String> = items.iter().map(|item| item.product_id.clone()).collect();
    let product_names: HashMap<String, String> = if product_ids.is_empty() {
        HashMap::new()
    } else {
        product::Entity::find()
            .filter(product::Column::Id.is_in(product_ids))
            .all(db)
            .await?
            .into_iter()
            .map(|product| (product.id, product.name))
            .collect()
    };

    let customer_names: HashMap<String, String> = if include_customer && !orders.is_empty() {
        let customer_ids: Vec<String> =
            orders.iter().map(|order| order.customer_id.clone()).collect();
        user::Entity::find()
            .filter(user::Column::Id.is_in(customer_ids))
            .all(db)
            .await?
            .into_iter()
            .map(|account| (account.id, account.username))
            .collect()
    } else {
        HashMap::new()
    };

    let mut items_by_order: HashMap<String, Vec<order_item::Model>> = HashMap::new();
    for item in items {
        items_by_order
            .entry(item.order_id.clone())
            .or_default()
            .push(item);
    }

    Ok(orders
        .into_iter()
        .map(|order| {
            let items = items_by_order
                .remove(&order.id)
                .unwrap_or_default()
                .into_iter()
                .map(|item| OrderItemView {
                    line_total: item.unit_price * Decimal::from(item.quantity),
                    product_name: product_names
                        .get(&item.product_id)
                        .cloned()
                        .unwrap_or_default(),
                    product_id: item.product_id,
                    quantity: item.quantity,
                    unit_price: item.unit_price,
                    addons: item.addons,
                })
                .collect();

            OrderView {
                customer_username: if include_customer {
                    customer_names.get(&order.customer_id).cloned()
                } else {
                    None
                },
                id: order.id,
                customer_id: order.customer_id,
                status: order.status.as_str().to_string(),
                payment_method: order.payment_method,
                total_amount: order.total_amount,
                created_at: order.created_at,
                items,
            }
        })
        .collect())
}

#[tracing::instrument(name = "GET /customer/orders", skip(state, user))]
pub async fn my_orders(
    State(state): State<AppState>,
    Extension(user): Extension<AppUser>,
) -> Result<Json<MyOrdersResponse>, ApiError> {
    let auth = user.auth()?;

    let orders = order::Entity::find()
        .filter(order::Column::CustomerId.eq(&auth.id))
        .order_by_desc(order::Column::CreatedAt)
        .all(&state.db)
        .await?;

    let (active, past): (Vec<_>, Vec<_>) =
        orders.into_iter().partition(|order| order.status.is_active());

    Ok(Json(MyOrdersResponse {
        active: load_order_views(&state.db, active, false).await?,
        past: load_order_views(&state.db, past, false).await?,
    }))
}
