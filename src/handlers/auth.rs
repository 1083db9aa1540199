use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use garde::Validate;
use serde::{Deserialize, Serialize};
use tower_cookies::cookie::time::Duration;
use tower_cookies::{cookie::SameSite, Cookie, Cookies};

use crate::{
    config::Config,
    error::Result,
    middleware_layer::auth::{CurrentUser, AUTH_COOKIE},
    models::user::UserProfile,
    state::AppState,
    validation::auth::{not_blank, ValidatedJson},
};

/// Client-side lifetime of the session cookie. The token inside expires
/// sooner.
pub const COOKIE_MAX_AGE_DAYS: i64 = 30;

/// The request payload for user registration.
#[derive(Deserialize, Validate)]
pub struct RegisterRequest {
    #[garde(length(min = 1, max = 100), custom(not_blank))]
    pub name: String,
    #[garde(email, length(max = 100))]
    pub email: String,
    #[garde(length(min = 6, max = 128))]
    pub password: String,
}

/// The request payload for user login.
#[derive(Deserialize, Validate)]
pub struct LoginRequest {
    #[garde(email)]
    pub email: String,
    #[garde(length(min = 1, max = 128))]
    pub password: String,
}

/// The request payload for changing a user's password.
#[derive(Deserialize, Validate)]
pub struct ChangePasswordRequest {
    #[garde(length(min = 1, max = 128))]
    pub old_password: String,
    #[garde(length(min = 6, max = 128))]
    pub new_password: String,
}

/// Returned by register and login.
#[derive(Serialize)]
pub struct SessionResponse {
    pub status: &'static str,
    pub user: UserProfile,
    pub token: String,
}

/// A plain acknowledgement.
#[derive(Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

/// Builds the session cookie carrying `token`.
fn session_cookie(config: &Config, token: String) -> Cookie<'static> {
    let mut cookie = Cookie::new(AUTH_COOKIE, token);
    cookie.set_http_only(true);
    cookie.set_secure(false);
    cookie.set_same_site(SameSite::Lax);
    cookie.set_max_age(Duration::days(COOKIE_MAX_AGE_DAYS));
    cookie.set_path("/");
    if let Some(domain) = &config.cookie_domain {
        cookie.set_domain(domain.clone());
    }
    cookie
}

/// Builds a cookie that makes the client drop its session.
fn cleared_session_cookie(config: &Config) -> Cookie<'static> {
    let mut cookie = session_cookie(config, String::new());
    cookie.set_max_age(Duration::ZERO);
    cookie
}

/// Handles user registration.
#[axum::debug_handler]
pub async fn register(
    State(state): State<AppState>,
    cookies: Cookies,
    ValidatedJson(payload): ValidatedJson<RegisterRequest>,
) -> Result<Response> {
    tracing::info!("📝 Register attempt");

    let user = state
        .auth
        .register(&payload.name, &payload.email, &payload.password)
        .await?;

    let token = state.tokens.issue(user.id)?;
    cookies.add(session_cookie(&state.config, token.clone()));
    tracing::info!("✅ Session cookie added for user: {}", user.id);

    let response = SessionResponse {
        status: "user registered successfully",
        user: UserProfile::from(&user),
        token,
    };

    Ok((StatusCode::CREATED, Json(response)).into_response())
}

/// Handles user login.
#[axum::debug_handler]
pub async fn login(
    State(state): State<AppState>,
    cookies: Cookies,
    ValidatedJson(payload): ValidatedJson<LoginRequest>,
) -> Result<Response> {
    tracing::info!("🔐 Login attempt");

    let user = state.auth.login(&payload.email, &payload.password).await?;

    let token = state.tokens.issue(user.id)?;
    cookies.add(session_cookie(&state.config, token.clone()));

    tracing::info!("✅ User logged in: {}", user.id);

    let response = SessionResponse {
        status: "user login successfully",
        user: UserProfile::from(&user),
        token,
    };

    Ok((StatusCode::OK, Json(response)).into_response())
}

/// Returns the authenticated user.
pub async fn me(Extension(CurrentUser(user)): Extension<CurrentUser>) -> Json<UserProfile> {
    Json(UserProfile::from(&user))
}

/// Handles user logout.
///
/// Only the client's cookie is cleared. The token itself stays valid until
/// its `exp` claim passes.
#[axum::debug_handler]
pub async fn logout(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    cookies: Cookies,
) -> Result<Response> {
    cookies.add(cleared_session_cookie(&state.config));
    tracing::info!("👋 User logged out: {}", user.id);

    let response = MessageResponse {
        message: "successfully logged out",
    };

    Ok((StatusCode::OK, Json(response)).into_response())
}

/// Handles changing a user's password.
#[axum::debug_handler]
pub async fn change_password(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    ValidatedJson(payload): ValidatedJson<ChangePasswordRequest>,
) -> Result<Response> {
    state
        .auth
        .change_password(user.id, &payload.old_password, &payload.new_password)
        .await?;

    let response = MessageResponse {
        message: "password changed successfully",
    };

    Ok((StatusCode::OK, Json(response)).into_response())
}

/// Handles account deletion and clears the session cookie.
#[axum::debug_handler]
pub async fn delete_account(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    cookies: Cookies,
) -> Result<Response> {
    state.auth.delete_account(user.id).await?;
    cookies.add(cleared_session_cookie(&state.config));

    tracing::info!("✅ Account deleted: {}", user.id);

    let response = MessageResponse {
        message: "account deleted successfully",
    };

    Ok((StatusCode::OK, Json(response)).into_response())
}
