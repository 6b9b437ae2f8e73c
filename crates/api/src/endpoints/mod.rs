//! API endpoints.

mod content;
mod posts;
mod reactions;
mod uploads;
mod users;

use axum::Router;

use crate::middleware::AppState;

/// Create the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .nest("/reactions", reactions::router())
        .nest("/posts", posts::router())
        .nest("/content", content::router())
        .nest("/users", users::router())
        .merge(uploads::router())
}
