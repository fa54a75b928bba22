//! HTTP and websocket surface.

pub mod cart;
pub mod catalog;
pub mod error;
pub mod middleware;
pub mod orders;
pub mod state;
pub mod ws;

use std::time::Duration;

use axum::http::HeaderName;
use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::{delete, get, post, put};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};

pub use state::AppState;

/// Assemble the router. Admin mutations sit behind [`middleware::require_admin`].
pub fn build_router(state: AppState) -> Router {
    let admin = Router::new()
        .route("/category", post(catalog::add_category))
        .route(
            "/category/{id}",
            put(catalog::update_category).delete(catalog::delete_category),
        )
        .route("/material", post(catalog::add_material))
        .route("/add_item", post(catalog::add_item))
        .route("/update_item", put(catalog::update_item))
        .route("/delete_item", delete(catalog::delete_item))
        .route_layer(from_fn_with_state(state.clone(), middleware::require_admin));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers([
            HeaderName::from_static(middleware::SESSION_HEADER),
            HeaderName::from_static(middleware::REQUEST_ID_HEADER),
            HeaderName::from_static("x-order-id"),
        ]);

    Router::new()
        .route("/health", get(orders::health))
        .route("/get_category_tree", get(catalog::category_tree))
        .route("/get_materials", get(catalog::list_materials))
        .route("/get_items", get(catalog::list_items))
        .route("/get_items_by_category", get(catalog::items_by_category))
        .route("/get_item/{id}", get(catalog::get_item))
        .route("/search", get(catalog::search))
        .route("/autocomplete", get(catalog::autocomplete))
        .route("/get_metal_prices", get(orders::metal_prices))
        .route("/add_to_cart", post(cart::add_to_cart))
        .route("/remove_from_cart", post(cart::remove_from_cart))
        .route("/update_cart_item", post(cart::update_cart_item))
        .route("/get_cart", get(cart::get_cart))
        .route("/place_order", post(orders::place_order))
        .route("/download_bill", get(orders::download_bill))
        .route("/get_order_history", get(orders::order_history))
        .route("/ws", get(ws::subscribe))
        .merge(admin)
        .layer(from_fn(middleware::session))
        .layer(from_fn(middleware::request_tracing))
        .layer(cors)
        .with_state(state)
}

/// Periodically drop carts whose sessions have gone idle.
pub fn spawn_session_sweeper(state: AppState, every: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            match state.carts.purge_expired() {
                Ok(0) => {}
                Ok(purged) => tracing::info!(purged, "expired sessions purged"),
                Err(e) => tracing::warn!(error = %e, "session sweep failed"),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use state::test_support::memory_state;

    #[test]
    fn test_routes_register_without_conflicts() {
        let _router = build_router(memory_state().with_admin_token(Some("t".to_string())));
    }

    #[tokio::test]
    async fn test_sweeper_purges_idle_carts() {
        use karat_cache::{Cache, Session, SessionId};
        use karat_commerce::cart::Cart;

        let cache = Cache::new();
        let mut state = memory_state();
        state.carts = Session::with_cache(cache.clone()).with_idle_timeout(Duration::from_millis(1));
        let session = SessionId::new("sess_idle");
        state.carts.set(&session, &Cart::new("sess_idle")).unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        let sweeper = spawn_session_sweeper(state.clone(), Duration::from_millis(5));
        tokio::time::sleep(Duration::from_millis(30)).await;
        sweeper.abort();

        assert!(cache.keys().unwrap().is_empty());
    }
}
