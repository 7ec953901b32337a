//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                  - Health check
//! GET    /health/ready            - Readiness check (database)
//!
//! # Products
//! GET    /products                - Collection listing (?collection=handle)
//! GET    /product/{handle}        - Product detail
//!
//! # Cart (session)
//! GET    /cart                    - Cart JSON
//! POST   /cart/add                - Product form submission
//! POST   /cart/remove             - Remove a line
//! POST   /cart/subscription       - Set line frequency / one-time
//!
//! # Checkout
//! GET    /checkout/{step}         - Step load (sync + guard, thank-you confirmation)
//! POST   /checkout/{step}         - Step submission (information, payment)
//! POST   /checkout/payment/authenticate - Charge after the card challenge
//! POST   /checkout/information/email - Email-only update
//! POST   /checkout/discount       - Apply discount code
//! DELETE /checkout/discount       - Remove discount code
//!
//! # Marketing
//! POST   /subscribe/{kind}        - SMS, newsletter or referral signup
//! ```

pub mod cart;
pub mod checkout;
pub mod products;
pub mod subscribe;

use axum::{
    Router,
    routing::{get, post},
};

use crate::middleware::{api_rate_limiter, checkout_rate_limiter};
use crate::state::AppState;

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(products::index))
        .route("/product/{handle}", get(products::show))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/remove", post(cart::remove))
        .route("/subscription", post(cart::set_subscription))
        .route_layer(api_rate_limiter())
}

/// Create the checkout routes router.
///
/// Step loads and submissions share `/{step}`: a static
/// `/information` route would shadow the step load for GET. Only the
/// mutating routes are rate limited; loads poll while the cart initializes.
pub fn checkout_routes() -> Router<AppState> {
    let loads = Router::new().route("/{step}", get(checkout::load));

    let submissions = Router::new()
        .route("/{step}", post(checkout::submit))
        .route("/payment/authenticate", post(checkout::authenticate_payment))
        .route("/information/email", post(checkout::update_email))
        .route(
            "/discount",
            post(checkout::apply_discount).delete(checkout::remove_discount),
        )
        .route_layer(checkout_rate_limiter());

    loads.merge(submissions)
}

/// Create the marketing subscription routes router.
pub fn subscribe_routes() -> Router<AppState> {
    Router::new()
        .route("/{kind}", post(subscribe::subscribe))
        .route_layer(api_rate_limiter())
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(product_routes())
        .nest("/cart", cart_routes())
        .nest("/checkout", checkout_routes())
        .nest("/subscribe", subscribe_routes())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Method, Request, StatusCode, header::CONTENT_TYPE};
    use sqlx::PgPool;
    use tower::ServiceExt;
    use tower_sessions::{MemoryStore, SessionManagerLayer};

    use crate::config::test_config;

    fn checkout_app() -> Router {
        let config = test_config();
        let pool = PgPool::connect_lazy("postgres://localhost/test").unwrap();
        let state = AppState::new(config, pool).unwrap();
        checkout_routes()
            .layer(SessionManagerLayer::new(MemoryStore::default()))
            .with_state(state)
    }

    fn request(method: Method) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri("/information")
            .header("cf-connecting-ip", "203.0.113.7")
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from("{}"))
            .unwrap()
    }

    #[tokio::test]
    async fn test_only_checkout_submissions_are_rate_limited() {
        let app = checkout_app();

        for _ in 0..15 {
            let response = app.clone().oneshot(request(Method::GET)).await.unwrap();
            assert_ne!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        }

        let mut limited = false;
        for _ in 0..15 {
            let response = app.clone().oneshot(request(Method::POST)).await.unwrap();
            limited |= response.status() == StatusCode::TOO_MANY_REQUESTS;
        }
        assert!(limited);
    }
}
