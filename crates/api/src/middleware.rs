//! API middleware.

#![allow(missing_docs)]

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Bearer};
use rapshare_core::{ContentService, ReactionService, UserService};

/// Application state.
#[derive(Clone)]
pub struct AppState {
    pub user_service: UserService,
    pub reaction_service: ReactionService,
    pub content_service: ContentService,
}

/// Authentication middleware.
///
/// A valid bearer token puts the caller's `user::Model` into the request
/// extensions. A missing header leaves the request anonymous; a token that
/// resolves to nobody is rejected outright.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    if let Some(Authorization(bearer)) = req.headers().typed_get::<Authorization<Bearer>>() {
        match state.user_service.authenticate_by_token(bearer.token()).await {
            Ok(user) => {
                tracing::debug!(user_id = %user.id, "Authenticated request");
                req.extensions_mut().insert(user);
            }
            Err(e) => return e.into_response(),
        }
    }

    next.run(req).await
}
