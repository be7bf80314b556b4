use utoipa::{
    Modify, OpenApi,
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
};

/// Registers the bearer session token scheme.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);

        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                Http::builder()
                    .scheme(HttpAuthScheme::Bearer)
                    .description(Some("Session token from POST /auth/login"))
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    info(
        title = "Sili Ordering API",
        version = "0.1.0",
        description = "Online ordering API for a single food vendor: catalog browsing, a session-scoped cart, pickup checkout and staff reporting.",
        license(name = "MIT")
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Registration and sessions"),
        (name = "cart", description = "Session cart"),
        (name = "admin", description = "Staff operations")
    ),
    paths(
        crate::routes::health::health,
        crate::routes::health::db_health,
        crate::routes::auth::register,
        crate::routes::auth::login,
        crate::routes::auth::logout,
        crate::routes::auth::me,
        crate::routes::customer::cart::view_cart,
        crate::routes::admin::dashboard::get_dashboard,
    ),
    components(schemas(
        crate::routes::health::HealthResponse,
        crate::routes::health::DbHealthResponse,
        crate::routes::auth::RegisterRequest,
        crate::routes::auth::LoginRequest,
        crate::routes::auth::UserInfo,
        crate::routes::auth::SessionResponse,
        crate::routes::customer::cart::CartLine,
        crate::routes::customer::cart::CartView,
        crate::routes::customer::orders::OrderItemView,
        crate::routes::customer::orders::OrderView,
        crate::routes::admin::dashboard::TopProduct,
        crate::routes::admin::dashboard::AdminDashboardResponse,
    ))
)]
pub struct ApiDoc;
