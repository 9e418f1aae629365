//! Router assembly.

use axum::{
    Router,
    extract::Request,
    middleware,
    response::IntoResponse,
    routing::get,
};
use std::convert::Infallible;
use std::sync::Arc;
use tower::Service;
use tower_http::trace::TraceLayer;

use crate::auth::{self, AppState};

/// Builds the application router.
///
/// The auth routes are served here; every other request passes the access
/// gate and falls through to `content`.
pub fn router<C>(state: Arc<AppState>, content: C) -> Router
where
    C: Service<Request, Error = Infallible> + Clone + Send + Sync + 'static,
    C::Response: IntoResponse,
    C::Future: Send + 'static,
{
    Router::new()
        .route("/login", get(auth::login))
        .route("/logged-in", get(auth::logged_in))
        .route("/logout", get(auth::logout))
        .route("/whoami", get(auth::whoami))
        .fallback_service(content)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::access_gate,
        ))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::load_session,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
