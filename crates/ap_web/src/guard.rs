use axum::{
    body::Body,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};

use crate::auth::CurrentUser;

pub const SIGN_IN_PATH: &str = "/auth/signin";
pub const DASHBOARD_PATH: &str = "/dashboard";

/// Where a page request should be sent instead, if anywhere.
/// API routes are never redirected.
pub fn redirect_target(path: &str, signed_in: bool) -> Option<&'static str> {
    if path.starts_with("/api") {
        return None;
    }
    if path.starts_with("/auth") {
        return signed_in.then_some(DASHBOARD_PATH);
    }
    if path.starts_with(DASHBOARD_PATH) && !signed_in {
        return Some(SIGN_IN_PATH);
    }
    None
}

/// Redirects (303) page requests based on the session; runs after `identify`
pub async fn page_guard(request: Request<Body>, next: Next) -> Response {
    let signed_in = request
        .extensions()
        .get::<CurrentUser>()
        .is_some_and(|user| user.0.is_some());

    match redirect_target(request.uri().path(), signed_in) {
        Some(target) => {
            tracing::debug!(path = %request.uri().path(), target, "redirecting page request");
            Redirect::to(target).into_response()
        }
        None => next.run(request).await,
    }
}
