mod actions;
pub(crate) mod health;
mod page;
mod proxy;

use crate::state::AppState;
use authdiag::render::GET_TOKEN_ACTION;
use axum::{
    routing::{any, post},
    Router,
};

/// Combines all routes into a single router
pub(super) fn router(state: &AppState) -> Router<AppState> {
    let mut root = Router::new()
        .merge(health::router())
        .route(GET_TOKEN_ACTION, post(actions::get_token));

    if state.settings.proxy.enabled {
        root = root.merge(proxy_routes(state));
    }

    // Everything else is a client-side route of the page
    root.fallback(page::render_page)
}

/// Routes forwarded to the backend, one set per configured prefix
fn proxy_routes(state: &AppState) -> Router<AppState> {
    let mut router = Router::new();
    for prefix in state.settings.proxy.get_prefixes() {
        log::info!("Forwarding {}/* to {}", prefix, state.settings.backend_url);
        router = router
            .route(&prefix, any(proxy::forward_to_backend))
            .route(&format!("{}/", prefix), any(proxy::forward_to_backend))
            .route(&format!("{}/{{*rest}}", prefix), any(proxy::forward_to_backend));
    }
    router
}
