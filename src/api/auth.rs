use axum::{
    Json,
    extract::{Path, Request, State},
    http::{HeaderMap, StatusCode, header},
    middleware::Next,
    response::{AppendHeaders, IntoResponse, Response},
};
use serde::Deserialize;
use std::sync::Arc;

use super::{ApiError, ApiResponse, AppState};
use crate::api::types::{RegisteredDto, StatusDto, TokenResponse, UserDto};
use crate::services::{RegisterRequest, UserInfo};
use crate::tokens::TokenPair;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct ResetRequest {
    pub email: String,
}

#[derive(Deserialize)]
pub struct CompleteResetRequest {
    pub new_password: String,
}

/// Authenticated user attached to the request by [`auth_middleware`].
#[derive(Debug, Clone)]
pub struct CurrentUser(pub UserInfo);

// ============================================================================
// Middleware
// ============================================================================

/// Authentication middleware that checks:
/// 1. `Authorization: Bearer <access_token>` header
/// 2. The access-token cookie (from login)
///
/// A missing token is a 403; a present but invalid or expired one is a 401.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let cookie_name = state.shared.config.tokens.access_cookie.clone();
    let Some(token) = extract_token(&headers, &cookie_name) else {
        return Err(ApiError::Forbidden("Missing access token".to_string()));
    };

    let user = state.shared.auth_service.current_user(&token).await?;
    tracing::Span::current().record("user_id", user.id);

    request.extensions_mut().insert(CurrentUser(user));
    Ok(next.run(request).await)
}

/// Extract a bearer token from headers, falling back to the named cookie.
fn extract_token(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    if let Some(auth_header) = headers.get(header::AUTHORIZATION)
        && let Ok(auth_str) = auth_header.to_str()
        && let Some(token) = auth_str.strip_prefix("Bearer ")
    {
        return Some(token.trim().to_string());
    }

    if let Some(cookie_header) = headers.get(header::COOKIE)
        && let Ok(cookie_str) = cookie_header.to_str()
    {
        for pair in cookie_str.split(';') {
            if let Some((name, value)) = pair.trim().split_once('=')
                && name == cookie_name
            {
                return Some(value.to_string());
            }
        }
    }

    None
}

// ============================================================================
// Cookie helpers
// ============================================================================

fn cookie_value(name: &str, token: &str, max_age_hours: u32, secure: bool) -> String {
    let secure_flag = if secure { "; Secure" } else { "" };
    let max_age = u64::from(max_age_hours) * 3600;
    format!("{name}={token}; HttpOnly; SameSite=Lax; Path=/; Max-Age={max_age}{secure_flag}")
}

fn cleared_cookie(name: &str, secure: bool) -> String {
    let secure_flag = if secure { "; Secure" } else { "" };
    format!("{name}=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0{secure_flag}")
}

pub(super) fn pair_cookies(
    state: &AppState,
    pair: &TokenPair,
) -> AppendHeaders<[(header::HeaderName, String); 2]> {
    let tokens = &state.shared.config.tokens;
    let secure = state.shared.config.server.secure_cookies;
    AppendHeaders([
        (
            header::SET_COOKIE,
            cookie_value(
                &tokens.access_cookie,
                &pair.access_token,
                tokens.access_ttl_hours,
                secure,
            ),
        ),
        (
            header::SET_COOKIE,
            cookie_value(
                &tokens.refresh_cookie,
                &pair.refresh_token,
                tokens.refresh_ttl_hours,
                secure,
            ),
        ),
    ])
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /auth/register
/// Create an account; sends a confirmation mail when email is enabled
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let confirmation_required = state.shared.mailer.is_some();
    let user_id = state.shared.auth_service.register(payload).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(RegisteredDto {
            user_id,
            confirmation_required,
        })),
    ))
}

/// POST /auth/login
/// Authenticate with email and password, returns a token pair on success
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if payload.email.is_empty() {
        return Err(ApiError::validation("Email is required"));
    }
    if payload.password.is_empty() {
        return Err(ApiError::validation("Password is required"));
    }

    let pair = state
        .shared
        .auth_service
        .login(&payload.email, &payload.password)
        .await?;

    let cookies = pair_cookies(&state, &pair);
    Ok((
        cookies,
        Json(ApiResponse::success(TokenResponse::pair(pair))),
    ))
}

/// POST /auth/logout
/// Stateless: clears both token cookies
pub async fn logout(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let tokens = &state.shared.config.tokens;
    let secure = state.shared.config.server.secure_cookies;
    let cookies = AppendHeaders([
        (
            header::SET_COOKIE,
            cleared_cookie(&tokens.access_cookie, secure),
        ),
        (
            header::SET_COOKIE,
            cleared_cookie(&tokens.refresh_cookie, secure),
        ),
    ]);
    (cookies, Json(ApiResponse::success(StatusDto::ok())))
}

/// POST /auth/refresh
/// Exchange a bearer refresh token for a new access token
pub async fn refresh(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let cookie_name = state.shared.config.tokens.refresh_cookie.clone();
    let Some(token) = extract_token(&headers, &cookie_name) else {
        return Err(ApiError::Forbidden("Missing refresh token".to_string()));
    };

    let access_token = state.shared.auth_service.refresh(&token).await?;

    let tokens = &state.shared.config.tokens;
    let secure = state.shared.config.server.secure_cookies;
    let cookies = AppendHeaders([(
        header::SET_COOKIE,
        cookie_value(
            &tokens.access_cookie,
            &access_token,
            tokens.access_ttl_hours,
            secure,
        ),
    )]);

    Ok((
        cookies,
        Json(ApiResponse::success(TokenResponse::access_only(
            access_token,
        ))),
    ))
}

/// GET /auth/confirm/{token}
/// Redeem an email-confirmation token (idempotent)
pub async fn confirm_email(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
) -> Result<Json<ApiResponse<StatusDto>>, ApiError> {
    state.shared.auth_service.confirm_email(&token).await?;
    Ok(Json(ApiResponse::success(StatusDto::ok())))
}

/// POST /auth/reset
/// Request a password-reset mail
pub async fn request_reset(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ResetRequest>,
) -> Result<Json<ApiResponse<StatusDto>>, ApiError> {
    if payload.email.is_empty() {
        return Err(ApiError::validation("Email is required"));
    }
    state
        .shared
        .auth_service
        .request_password_reset(&payload.email)
        .await?;
    Ok(Json(ApiResponse::success(StatusDto::ok())))
}

/// PATCH /auth/reset/{token}
/// Complete a password reset with the mailed token
pub async fn complete_reset(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
    Json(payload): Json<CompleteResetRequest>,
) -> Result<Json<ApiResponse<StatusDto>>, ApiError> {
    state
        .shared
        .auth_service
        .complete_password_reset(&token, &payload.new_password)
        .await?;
    Ok(Json(ApiResponse::success(StatusDto::ok())))
}

/// GET /auth/me
/// Current user information (requires authentication)
pub async fn get_current_user(
    axum::Extension(CurrentUser(user)): axum::Extension<CurrentUser>,
) -> Json<ApiResponse<UserDto>> {
    Json(ApiResponse::success(UserDto {
        id: user.id,
        login: user.login,
        email: user.email,
        email_confirmed: user.email_confirmed,
    }))
}
