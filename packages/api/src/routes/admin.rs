use axum::{
    Router,
    middleware::from_fn,
    routing::{get, post, put},
};

use crate::middleware::auth::require_staff;
use crate::state::AppState;

pub mod customers;
pub mod dashboard;
pub mod orders;
pub mod products;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(dashboard::get_dashboard))
        .route(
            "/products",
            get(products::list_products).post(products::create_product),
        )
        .route(
            "/products/{product_id}",
            put(products::update_product).delete(products::delete_product),
        )
        .route(
            "/products/{product_id}/image",
            post(products::upload_product_image),
        )
        .route("/orders", get(orders::list_orders))
        .route("/orders/{order_id}/status", post(orders::update_order_status))
        .route("/customers", get(customers::list_customers))
        .layer(from_fn(require_staff))
}
