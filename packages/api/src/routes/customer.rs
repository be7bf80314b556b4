use axum::{
    Router,
    middleware::from_fn,
    routing::{get, post},
};

use crate::middleware::auth::require_customer;
use crate::state::AppState;

pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod dashboard;
pub mod orders;
pub mod profile;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(dashboard::get_dashboard))
        .route("/products", get(catalog::list_products))
        .route("/products/{product_id}", get(catalog::get_product))
        .route("/cart", get(cart::view_cart))
        .route("/cart/{product_id}", post(cart::add_to_cart))
        .route("/cart/{product_id}/update", post(cart::update_cart_line))
        .route(
            "/checkout",
            get(checkout::preview_checkout).post(checkout::place_order),
        )
        .route("/orders", get(orders::my_orders))
        .route(
            "/profile",
            get(profile::get_profile).put(profile::update_profile),
        )
        .layer(from_fn(require_customer))
}
