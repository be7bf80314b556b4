//! Session cart mutation and display.
//!
//! Every mutation checks the requested quantity against the product's
//! current stock snapshot; the authoritative check happens again inside the
//! checkout transaction.

use axum::{
    Extension, Json,
    extract::{Path, State},
};
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    bad_request,
    entity::product,
    error::ApiError,
    middleware::auth::AppUser,
    not_found,
    session::{Cart, Session},
    state::AppState,
};

#[derive(Debug, Serialize, ToSchema)]
pub struct CartLine {
    pub product_id: String,
    pub name: String,
    pub unit_price: Decimal,
    pub quantity: u32,
    pub addons: String,
    pub line_total: Decimal,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartView {
    pub items: Vec<CartLine>,
    pub total: Decimal,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddToCartRequest {
    pub quantity: Option<i64>,
    pub addons: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum CartOp {
    Inc,
    Dec,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateCartRequest {
    pub op: CartOp,
}

/// Prices cart entries at the current catalog price.
pub(crate) fn cart_lines(cart: &Cart, products: &[product::Model]) -> CartView {
    let mut items: Vec<CartLine> = products
        .iter()
        .filter_map(|product| {
            let quantity = cart.quantity(&product.id);
            if quantity == 0 {
                return None;
            }
            let line_total = product.price * Decimal::from(quantity);
            Some(CartLine {
                product_id: product.id.clone(),
                name: product.name.clone(),
                unit_price: product.price,
                quantity,
                addons: cart.addons(&product.id).unwrap_or_default().to_string(),
                line_total,
            })
        })
        .collect();
    items.sort_by(|a, b| a.name.cmp(&b.name));

    let total = items.iter().map(|line| line.line_total).sum();
    CartView { items, total }
}

pub(crate) async fn build_cart_view(state: &AppState, cart: &Cart) -> Result<CartView, ApiError> {
    let ids = cart.product_ids();
    let products = if ids.is_empty() {
        Vec::new()
    } else {
        product::Entity::find()
            .filter(product::Column::Id.is_in(ids))
            .all(&state.db)
            .await?
    };
    Ok(cart_lines(cart, &products))
}

/// Add-to-cart guard: the cart may never hold more of a product than the
/// current stock snapshot.
pub(crate) fn validate_add_to_cart(
    product: &product::Model,
    current: u32,
    requested: u32,
) -> Result<(), ApiError> {
    if product.stock <= 0 {
        return Err(bad_request!("{} is currently out of stock.", product.name));
    }
    if current.saturating_add(requested) > product.stock as u32 {
        return Err(bad_request!(
            "Only {} × {} left in stock.",
            product.stock,
            product.name
        ));
    }
    Ok(())
}

pub(crate) fn current_session(state: &AppState, user: &AppUser) -> Result<Session, ApiError> {
    let auth = user.auth()?;
    state
        .sessions
        .get(&auth.session_id)
        .ok_or_else(|| ApiError::unauthorized("Session expired"))
}

#[utoipa::path(
    get,
    path = "/customer/cart",
    tag = "cart",
    responses(
        (status = 200, description = "Cart contents priced at current catalog prices", body = CartView),
        (status = 401, description = "Not logged in"),
        (status = 403, description = "Staff accounts have no cart")
    )
)]
#[tracing::instrument(name = "GET /customer/cart", skip(state, user))]
pub async fn view_cart(
    State(state): State<AppState>,
    Extension(user): Extension<AppUser>,
) -> Result<Json<CartView>, ApiError> {
    let session = current_session(&state, &user)?;
    Ok(Json(build_cart_view(&state, &session.cart).await?))
}

#[tracing::instrument(name = "POST /customer/cart/{product_id}", skip(state, user, payload))]
pub async fn add_to_cart(
    State(state): State<AppState>,
    Extension(user): Extension<AppUser>,
    Path(product_id): Path<String>,
    Json(payload): Json<AddToCartRequest>,
) -> Result<Json<CartView>, ApiError> {
    let auth = user.auth()?;
    let mut session = current_session(&state, &user)?;

    let product = product::Entity::find_by_id(&product_id)
        .filter(product::Column::IsActive.eq(true))
        .one(&state.db)
        .await?
        .ok_or_else(|| not_found!("Product {} not found", product_id))?;

    // A missing or nonsensical quantity means one unit.
    let quantity = u32::try_from(payload.quantity.unwrap_or(1).max(1)).unwrap_or(u32::MAX);

    let current = session.cart.quantity(&product.id);
    validate_add_to_cart(&product, current, quantity)?;

    session.cart.add(&product.id, quantity, payload.addons.as_deref());
    state.sessions.put(&auth.session_id, session.clone());

    Ok(Json(build_cart_view(&state, &session.cart).await?))
}

#[tracing::instrument(name = "POST /customer/cart/{product_id}/update", skip(state, user, payload))]
pub async fn update_cart_line(
    State(state): State<AppState>,
    Extension(user): Extension<AppUser>,
    Path(product_id): Path<String>,
    Json(payload): Json<UpdateCartRequest>,
) -> Result<Json<CartView>, ApiError> {
    let auth = user.auth()?;
    let mut session = current_session(&state, &user)?;

    let product = product::Entity::find_by_id(&product_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| not_found!("Product {} not found", product_id))?;

    // Nothing in the cart for this product: render the cart unchanged.
    if !session.cart.contains(&product.id) {
        return Ok(Json(build_cart_view(&state, &session.cart).await?));
    }

    match payload.op {
        CartOp::Inc => {
            let quantity = session.cart.quantity(&product.id);
            if product.stock <= 0 {
                return Err(bad_request!("No more stock available for this product."));
            }
            if quantity + 1 > product.stock as u32 {
                return Err(bad_request!(
                    "Only {} × {} left in stock.",
                    product.stock,
                    product.name
                ));
            }
            session.cart.increment(&product.id);
        }
        CartOp::Dec => {
            session.cart.decrement(&product.id);
        }
    }

    state.sessions.put(&auth.session_id, session.clone());
    Ok(Json(build_cart_view(&state, &session.cart).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    use crate::entity::product::{Model as Product, ProductCategory};

    fn product(id: &str, name: &str, price: &str, stock: i32) -> Product {
        let now = Utc::now().naive_utc();
        Product {
            id: id.to_string(),
            name: name.to_string(),
            category: ProductCategory::Bottled,
            price: price.parse::<Decimal>().unwrap(),
            stock,
            image_path: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_cart_lines_prices_and_totals() {
        let mut cart = Cart::default();
        cart.add("p1", 3, Some("extra garlic"));
        cart.add("p2", 1, None);

        let products = vec![
            product("p1", "Bottled Chili Garlic", "150.00", 5),
            product("p2", "Garlic Meal", "95.50", 10),
        ];

        let view = cart_lines(&cart, &products);
        assert_eq!(view.items.len(), 2);
        assert_eq!(view.total, "545.50".parse::<Decimal>().unwrap());

        let bottled = view
            .items
            .iter()
            .find(|line| line.product_id == "p1")
            .unwrap();
        assert_eq!(bottled.quantity, 3);
        assert_eq!(bottled.addons, "extra garlic");
        assert_eq!(bottled.line_total, "450.00".parse::<Decimal>().unwrap());
    }

    #[test]
    fn test_add_within_stock_allowed_then_rejected_at_limit() {
        // stock=5: adding 3 succeeds, adding 3 more would exceed stock.
        let bottled = product("p1", "Bottled Chili Garlic", "150.00", 5);
        let mut cart = Cart::default();

        validate_add_to_cart(&bottled, cart.quantity("p1"), 3).unwrap();
        cart.add("p1", 3, None);

        let err = validate_add_to_cart(&bottled, cart.quantity("p1"), 3).unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::BAD_REQUEST);
        // The rejected add leaves the cart untouched.
        assert_eq!(cart.quantity("p1"), 3);
    }

    #[test]
    fn test_add_rejected_when_out_of_stock() {
        let sold_out = product("p1", "Bottled Chili Garlic", "150.00", 0);
        assert!(validate_add_to_cart(&sold_out, 0, 1).is_err());
    }

    #[test]
    fn test_cart_lines_skips_products_missing_from_cart() {
        let mut cart = Cart::default();
        cart.add("p1", 1, None);

        let products = vec![
            product("p1", "Bottled Chili Garlic", "150.00", 5),
            product("p2", "Garlic Meal", "95.50", 10),
        ];

        let view = cart_lines(&cart, &products);
        assert_eq!(view.items.len(), 1);
        assert_eq!(view.total, "150.00".parse::<Decimal>().unwrap());
    }
}
