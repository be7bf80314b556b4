//! Checkout: turns the session cart into an order.
//!
//! Validation, order/line creation and the stock decrement all run inside a
//! single database transaction; any failed line aborts the whole operation
//! with cart and stock untouched. The cart is cleared only after commit.

use axum::{
    Extension, Json,
    extract::State,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, QueryFilter, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    bad_request,
    entity::{
        order::{self, OrderStatus},
        order_item, product,
    },
    error::ApiError,
    middleware::auth::AppUser,
    session::Cart,
    state::AppState,
    utils::create_id,
};

use super::cart::{CartLine, build_cart_view, current_session};

/// Pickup-only vendor; the address is part of the checkout summary.
const PICKUP_ADDRESS: &str = "Brgy. Parag-um, Carigara, Leyte.";

const DEFAULT_PAYMENT_METHOD: &str = "cash";

#[derive(Debug, Serialize, ToSchema)]
pub struct CheckoutPreview {
    pub items: Vec<CartLine>,
    pub total: Decimal,
    pub pickup_address: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PlaceOrderRequest {
    pub payment_method: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PlaceOrderResponse {
    pub order_id: String,
    pub total_amount: Decimal,
    pub status: String,
    pub message: String,
}

/// A validated cart line, ready to be written.
#[derive(Debug)]
pub(crate) struct CheckoutLine {
    pub product: product::Model,
    pub quantity: u32,
    pub addons: String,
    pub line_total: Decimal,
}

/// Re-validates every cart line against live stock. Any shortfall fails the
/// whole build so no partial order can be derived from the result.
pub(crate) fn build_checkout_lines(
    cart: &Cart,
    products: &[product::Model],
) -> Result<Vec<CheckoutLine>, ApiError> {
    let mut lines = Vec::new();
    for product in products {
        let quantity = cart.quantity(&product.id);
        if quantity == 0 {
            continue;
        }
        if product.stock < quantity as i32 {
            return Err(bad_request!(
                "Not enough stock for {}. Available: {}, in your cart: {}.",
                product.name,
                product.stock.max(0),
                quantity
            ));
        }
        lines.push(CheckoutLine {
            line_total: product.price * Decimal::from(quantity),
            product: product.clone(),
            quantity,
            addons: cart.addons(&product.id).unwrap_or_default().to_string(),
        });
    }
    Ok(lines)
}

pub(crate) fn order_total(lines: &[CheckoutLine]) -> Decimal {
    lines.iter().map(|line| line.line_total).sum()
}

/// Floored at zero, stock is never driven negative.
pub(crate) fn decremented_stock(stock: i32, quantity: u32) -> i32 {
    (stock - quantity as i32).max(0)
}

#[tracing::instrument(name = "GET /customer/checkout", skip(state, user))]
pub async fn preview_checkout(
    State(state): State<AppState>,
    Extension(user): Extension<AppUser>,
) -> Result<Json<CheckoutPreview>, ApiError> {
    let session = current_session(&state, &user)?;
    if session.cart.is_empty() {
        return Err(ApiError::bad_request("Your cart is empty."));
    }

    let view = build_cart_view(&state, &session.cart).await?;
    Ok(Json(CheckoutPreview {
        items: view.items,
        total: view.total,
        pickup_address: PICKUP_ADDRESS.to_string(),
    }))
}

#[tracing::instrument(name = "POST /customer/checkout", skip(state, user, payload))]
pub async fn place_order(
    State(state): State<AppState>,
    Extension(user): Extension<AppUser>,
    Json(payload): Json<PlaceOrderRequest>,
) -> Result<Json<PlaceOrderResponse>, ApiError> {
    let auth = user.auth()?;
    let session = current_session(&state, &user)?;
    let cart = session.cart;
    if cart.is_empty() {
        return Err(ApiError::bad_request("Your cart is empty."));
    }

    let payment_method = payload
        .payment_method
        .as_deref()
        .map(|method| method.trim().to_lowercase())
        .filter(|method| !method.is_empty())
        .unwrap_or_else(|| DEFAULT_PAYMENT_METHOD.to_string());

    let customer_id = auth.id.clone();
    let order = state
        .db
        .transaction::<_, order::Model, ApiError>({
            let cart = cart.clone();
            let payment_method = payment_method.clone();
            move |txn| {
                Box::pin(async move {
                    let products = product::Entity::find()
                        .filter(product::Column::Id.is_in(cart.product_ids()))
                        .all(txn)
                        .await?;

                    let lines = build_checkout_lines(&cart, &products)?;
                    if lines.is_empty() {
                        return Err(ApiError::bad_request("Your cart is empty."));
                    }

                    let now = Utc::now().naive_utc();
                    let order = order::ActiveModel {
                        id: Set(create_id()),
                        customer_id: Set(customer_id),
                        status: Set(OrderStatus::Pending),
                        payment_method: Set(payment_method),
                        total_amount: Set(order_total(&lines)),
                        created_at: Set(now),
                        updated_at: Set(now),
                    }
                    .insert(txn)
                    .await?;

                    for line in lines {
                        order_item::ActiveModel {
                            id: Set(create_id()),
                            order_id: Set(order.id.clone()),
                            product_id: Set(line.product.id.clone()),
                            quantity: Set(line.quantity as i32),
                            // Snapshot: later price changes do not touch this row.
                            unit_price: Set(line.product.price),
                            addons: Set(line.addons),
                        }
                        .insert(txn)
                        .await?;

                        let new_stock = decremented_stock(line.product.stock, line.quantity);
                        let mut active: product::ActiveModel = line.product.into();
                        active.stock = Set(new_stock);
                        active.updated_at = Set(now);
                        active.update(txn).await?;
                    }

                    Ok(order)
                })
            }
        })
        .await?;

    // The order is committed; reset the cart (and its add-ons) for the session.
    if let Some(mut session) = state.sessions.get(&auth.session_id) {
        session.cart.clear();
        state.sessions.put(&auth.session_id, session);
    }

    tracing::info!(order_id = %order.id, "Order placed");

    Ok(Json(PlaceOrderResponse {
        message: format!(
            "Order has been placed for pickup. Payment method: {}.",
            order.payment_method
        ),
        order_id: order.id,
        total_amount: order.total_amount,
        status: order.status.as_str().to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::product::ProductCategory;

    fn product(id: &str, name: &str, price: &str, stock: i32) -> product::Model {
        let now = Utc::now().naive_utc();
        product::Model {
            id: id.to_string(),
            name: name.to_string(),
            category: ProductCategory::Meal,
            price: price.parse::<Decimal>().unwrap(),
            stock,
            image_path: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_lines_within_stock_succeed() {
        let mut cart = Cart::default();
        cart.add("p1", 3, Some("extra garlic"));

        let products = vec![product("p1", "Bottled Chili Garlic", "150.00", 5)];
        let lines = build_checkout_lines(&cart, &products).unwrap();

        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].quantity, 3);
        assert_eq!(lines[0].addons, "extra garlic");
        assert_eq!(lines[0].line_total, "450.00".parse::<Decimal>().unwrap());
        assert_eq!(order_total(&lines), "450.00".parse::<Decimal>().unwrap());
    }

    #[test]
    fn test_any_short_line_fails_the_whole_build() {
        let mut cart = Cart::default();
        cart.add("p1", 2, None);
        cart.add("p2", 6, None);

        let products = vec![
            product("p1", "Bottled Chili Garlic", "150.00", 5),
            product("p2", "Garlic Meal", "95.00", 5),
        ];

        let err = build_checkout_lines(&cart, &products).unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_vanished_products_are_dropped() {
        let mut cart = Cart::default();
        cart.add("p1", 1, None);
        cart.add("gone", 2, None);

        let products = vec![product("p1", "Bottled Chili Garlic", "150.00", 5)];
        let lines = build_checkout_lines(&cart, &products).unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].product.id, "p1");
    }

    #[test]
    fn test_order_total_sums_line_totals() {
        let mut cart = Cart::default();
        cart.add("p1", 2, None);
        cart.add("p2", 1, None);

        let products = vec![
            product("p1", "Bottled Chili Garlic", "150.00", 5),
            product("p2", "Garlic Meal", "95.50", 5),
        ];
        let lines = build_checkout_lines(&cart, &products).unwrap();
        assert_eq!(order_total(&lines), "395.50".parse::<Decimal>().unwrap());
    }

    #[test]
    fn test_stock_decrement_floors_at_zero() {
        assert_eq!(decremented_stock(5, 3), 2);
        assert_eq!(decremented_stock(3, 3), 0);
        assert_eq!(decremented_stock(2, 3), 0);
    }
}
