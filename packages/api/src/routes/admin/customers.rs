use std::collections::HashMap;

use axum::{Json, extract::State};
use chrono::NaiveDateTime;
use sea_orm::{
    ColumnTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect,
};
use serde::Serialize;

use crate::{
    entity::{order, user},
    error::ApiError,
    state::AppState,
};

#[derive(Debug, Serialize)]
pub struct CustomerSummary {
    pub id: String,
    pub username: String,
    pub email: String,
    pub order_count: i64,
    pub created_at: NaiveDateTime,
}

#[tracing::instrument(name = "GET /admin/customers", skip(state))]
pub async fn list_customers(
    State(state): State<AppState>,
) -> Result<Json<Vec<CustomerSummary>>, ApiError> {
    let customers = user::Entity::find()
        .filter(user::Column::IsStaff.eq(false))
        .order_by_desc(user::Column::CreatedAt)
        .all(&state.db)
        .await?;

    let counts: HashMap<String, i64> = order::Entity::find()
        .select_only()
        .column(order::Column::CustomerId)
        .column_as(order::Column::Id.count(), "order_count")
        .group_by(order::Column::CustomerId)
        .into_tuple::<(String, i64)>()
        .all(&state.db)
        .await?
        .into_iter()
        .collect();

    let summaries = customers
        .into_iter()
        .map(|account| CustomerSummary {
            order_count: counts.get(&account.id).copied().unwrap_or(0),
            id: account.id,
            username: account.username,
            email: account.email,
            created_at: account.created_at,
        })
        .collect();

    Ok(Json(summaries))
}
