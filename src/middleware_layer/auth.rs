use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};
use tower_cookies::Cookies;

use crate::{
    error::AppError,
    models::user::User,
    state::AppState,
};

/// Name of the cookie that carries the session token.
pub const AUTH_COOKIE: &str = "Authorization";

/// The user resolved by [`require_auth`], available to handlers behind it
/// as `Extension<CurrentUser>`.
#[derive(Clone, Debug)]
pub struct CurrentUser(pub User);

/// Extracts the session token from the request cookies.
fn extract_session_token(cookies: &Cookies) -> Option<String> {
    cookies
        .get(AUTH_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .filter(|token| !token.is_empty())
}

/// A middleware that admits only requests carrying a valid session token
/// for a user that still exists.
///
/// Every rejection produces the same 401 response; the reason is logged
/// and never returned to the client.
pub async fn require_auth(
    State(state): State<AppState>,
    cookies: Cookies,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    tracing::debug!("🔐 Checking authentication...");

    let token = extract_session_token(&cookies).ok_or_else(|| {
        tracing::debug!("❌ No {} cookie found", AUTH_COOKIE);
        AppError::Unauthorized
    })?;

    let user_id = state.tokens.parse(&token).map_err(|e| {
        tracing::debug!("❌ Session token rejected: {}", e);
        AppError::Unauthorized
    })?;

    let user = match state.users.find_by_id(user_id).await {
        Ok(user) => user,
        Err(AppError::NotFound) => {
            tracing::debug!("❌ Token subject {} no longer exists", user_id);
            return Err(AppError::Unauthorized);
        }
        Err(e) => return Err(e),
    };

    tracing::debug!("✅ User authenticated: {}", user.id);

    request.extensions_mut().insert(CurrentUser(user));

    Ok(next.run(request).await)
}
