//! Staff dashboard aggregates.
//!
//! One query fetches the trailing week of orders, everything else is
//! computed over that snapshot per request; the volume of a single vendor
//! does not warrant pre-aggregation.

use std::collections::HashMap;

use axum::{Json, extract::State};
use chrono::{Duration, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    entity::{
        order::{self, OrderStatus},
        order_item, product,
    },
    error::ApiError,
    routes::customer::orders::{OrderView, load_order_views},
    state::AppState,
};

const RECENT_ORDERS_LIMIT: u64 = 10;

#[derive(Debug, Serialize, ToSchema)]
pub struct TopProduct {
    pub product_id: String,
    pub name: String,
    pub quantity_sold: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AdminDashboardResponse {
    /// Orders placed since local midnight
    pub today_orders_count: u64,
    /// Revenue over completed orders in the trailing 7 days
    pub week_revenue: Decimal,
    /// Best seller by quantity across the same window, absent without sales
    pub top_product: Option<TopProduct>,
    pub recent_orders: Vec<OrderView>,
}

/// Today's midnight plus the start of the trailing 7-day window (today and
/// the six days before it).
pub(crate) fn reporting_windows(now: NaiveDateTime) -> (NaiveDateTime, NaiveDateTime) {
    let today_start = now.date().and_time(NaiveTime::MIN);
    (today_start, today_start - Duration::days(6))
}

pub(crate) fn completed_revenue(orders: &[order::Model]) -> Decimal {
    orders
        .iter()
        .filter(|order| order.status == OrderStatus::Completed)
        .map(|order| order.total_amount)
        .sum()
}

/// Highest summed quantity; ties resolve to the lexicographically smallest
/// product id so the result is stable.
pub(crate) fn top_seller(items: &[order_item::Model]) -> Option<(String, i64)> {
    let mut totals: HashMap<&str, i64> = HashMap::new();
    for item in items {
        *totals.entry(item.product_id.as_str()).or_insert(0) += i64::from(item.quantity);
    }
    totals
        .into_iter()
        .max_by(|a, b| a.1.cmp(&b.1).then(b.0.cmp(a.0)))
        .map(|(product_id, quantity)| (product_id.to_string(), quantity))
}

#[utoipa::path(
    get,
    path = "/admin/dashboard",
    tag = "admin",
    responses(
        (status = 200, description = "Sales dashboard aggregates", body = AdminDashboardResponse),
        (status = 401, description = "Not logged in"),
        (status = 403, description = "Staff only")
    )
)]
#[tracing::instrument(name = "GET /admin/dashboard", skip(state))]
pub async fn get_dashboard(
    State(state): State<AppState>,
) -> Result<Json<AdminDashboardResponse>, ApiError> {
    let (today_start, week_start) = reporting_windows(chrono::Utc::now().naive_utc());

    let today_orders_count = order::Entity::find()
        .filter(order::Column::CreatedAt.gte(today_start))
        .count(&state.db)
        .await?;

    let week_orders = order::Entity::find()
        .filter(order::Column::CreatedAt.gte(week_start))
        .all(&state.db)
        .await?;
    let week_revenue = completed_revenue(&week_orders);

    let completed_ids: Vec<String> = week_orders
        .iter()
        .filter(|order| order.status == OrderStatus::Completed)
        .map(|order| order.id.clone())
        .collect();
    let week_items = if completed_ids.is_empty() {
        Vec::new()
    } else {
        order_item::Entity::find()
            .filter(order_item::Column::OrderId.is_in(completed_ids))
            .all(&state.db)
            .await?
    };

    let top_product = match top_seller(&week_items) {
        Some((product_id, quantity_sold)) => {
            let name = product::Entity::find_by_id(&product_id)
                .select_only()
                .column(product::Column::Name)
                .into_tuple::<String>()
                .one(&state.db)
                .await?
                .unwrap_or_default();
            Some(TopProduct {
                product_id,
                name,
                quantity_sold,
            })
        }
        None => None,
    };

    let recent = order::Entity::find()
        .order_by_desc(order::Column::CreatedAt)
        .limit(RECENT_ORDERS_LIMIT)
        .all(&state.db)
        .await?;
    let recent_orders = load_order_views(&state.db, recent, true).await?;

    Ok(Json(AdminDashboardResponse {
        today_orders_count,
        week_revenue,
        top_product,
        recent_orders,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn order(id: &str, status: OrderStatus, total: &str) -> order::Model {
        let now = chrono::Utc::now().naive_utc();
        order::Model {
            id: id.to_string(),
            customer_id: "c1".to_string(),
            status,
            payment_method: "cash".to_string(),
            total_amount: total.parse::<Decimal>().unwrap(),
            created_at: now,
            updated_at: now,
        }
    }

    fn item(product_id: &str, quantity: i32) -> order_item::Model {
        order_item::Model {
            id: crate::utils::create_id(),
            order_id: "o1".to_string(),
            product_id: product_id.to_string(),
            quantity,
            unit_price: "10.00".parse::<Decimal>().unwrap(),
            addons: String::new(),
        }
    }

    #[test]
    fn test_reporting_windows() {
        let now = NaiveDate::from_ymd_opt(2026, 8, 6)
            .unwrap()
            .and_hms_opt(15, 30, 12)
            .unwrap();
        let (today_start, week_start) = reporting_windows(now);
        assert_eq!(
            today_start,
            NaiveDate::from_ymd_opt(2026, 8, 6).unwrap().and_time(NaiveTime::MIN)
        );
        assert_eq!(
            week_start,
            NaiveDate::from_ymd_opt(2026, 7, 31).unwrap().and_time(NaiveTime::MIN)
        );
    }

    #[test]
    fn test_completed_revenue_excludes_other_statuses() {
        let orders = vec![
            order("o1", OrderStatus::Completed, "10.00"),
            order("o2", OrderStatus::Completed, "15.00"),
            order("o3", OrderStatus::Pending, "20.00"),
            order("o4", OrderStatus::Cancelled, "40.00"),
        ];
        assert_eq!(
            completed_revenue(&orders),
            "25.00".parse::<Decimal>().unwrap()
        );
    }

    #[test]
    fn test_completed_revenue_of_nothing_is_zero() {
        assert_eq!(completed_revenue(&[]), Decimal::ZERO);
    }

    #[test]
    fn test_top_seller_sums_across_orders() {
        let items = vec![item("p1", 2), item("p2", 4), item("p1", 3)];
        assert_eq!(top_seller(&items), Some(("p1".to_string(), 5)));
    }

    #[test]
    fn test_top_seller_without_sales() {
        assert_eq!(top_seller(&[]), None);
    }

    #[test]
    fn test_top_seller_breaks_ties_deterministically() {
        let items = vec![item("p2", 3), item("p1", 3)];
        assert_eq!(top_seller(&items), Some(("p1".to_string(), 3)));
    }
}
