use axum::{
    Extension, Json,
    extract::{Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use std::sync::Arc;

use super::{ApiError, ApiResponse, AppState};
use crate::api::auth::{self, CurrentUser};
use crate::api::types::{
    DeletedDto, EmbeddingDto, EnrollmentStatusDto, PinChallengeDto, PinStatusDto, StatusDto,
    TokenResponse,
};
use crate::services::VerifyOutcome;

// ============================================================================
// Request Types
// ============================================================================

#[derive(Deserialize)]
pub struct VerifyPinRequest {
    pub user_id: i32,
    pub pin: String,
}

#[derive(Deserialize)]
pub struct CreatePinRequest {
    pub pin: String,
}

/// Fields accepted by the multipart endpoints. `file` is required; the rest
/// depend on the route.
#[derive(Default)]
struct MultipartFields {
    user_id: Option<i32>,
    email: Option<String>,
    meta: Option<String>,
    file: Option<Vec<u8>>,
}

async fn read_multipart(mut multipart: Multipart) -> Result<MultipartFields, ApiError> {
    let mut fields = MultipartFields::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::validation(format!("Malformed multipart body: {e}")))?
    {
        match field.name().unwrap_or_default() {
            "user_id" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::validation(format!("Invalid user_id field: {e}")))?;
                let id = text
                    .trim()
                    .parse()
                    .map_err(|_| ApiError::validation("user_id must be an integer"))?;
                fields.user_id = Some(id);
            }
            "email" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::validation(format!("Invalid email field: {e}")))?;
                fields.email = Some(text);
            }
            "meta" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::validation(format!("Invalid meta field: {e}")))?;
                fields.meta = Some(text);
            }
            "file" => {
                if let Some(content_type) = field.content_type()
                    && !content_type.starts_with("image/")
                {
                    return Err(ApiError::validation(format!(
                        "Unsupported content type: {content_type}"
                    )));
                }
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::validation(format!("Failed to read file: {e}")))?;
                fields.file = Some(bytes.to_vec());
            }
            _ => {}
        }
    }

    Ok(fields)
}

fn require_file(fields: &mut MultipartFields) -> Result<Vec<u8>, ApiError> {
    fields
        .file
        .take()
        .ok_or_else(|| ApiError::validation("Missing 'file' field"))
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /face/create
/// Enroll a face for an explicit user id (setup endpoint)
pub async fn create(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let mut fields = read_multipart(multipart).await?;
    let user_id = fields
        .user_id
        .ok_or_else(|| ApiError::validation("Missing 'user_id' field"))?;
    let file = require_file(&mut fields)?;

    let embedding_id = state
        .shared
        .face_service
        .enroll(user_id, file, fields.meta)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(EmbeddingDto { embedding_id })),
    ))
}

/// PUT /face/put
/// Enroll (or re-enroll) a face for the authenticated user
pub async fn put(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    multipart: Multipart,
) -> Result<Json<ApiResponse<EmbeddingDto>>, ApiError> {
    let mut fields = read_multipart(multipart).await?;
    let file = require_file(&mut fields)?;

    let embedding_id = state
        .shared
        .face_service
        .enroll(user.id, file, fields.meta)
        .await?;

    Ok(Json(ApiResponse::success(EmbeddingDto { embedding_id })))
}

/// POST /face/verify
/// Biometric login: 200 with tokens, or 202 when a PIN is still required
pub async fn verify(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    let mut fields = read_multipart(multipart).await?;
    let email = fields
        .email
        .take()
        .ok_or_else(|| ApiError::validation("Missing 'email' field"))?;
    let file = require_file(&mut fields)?;

    match state.shared.face_service.verify(&email, file).await? {
        VerifyOutcome::Tokens(pair) => {
            let cookies = auth::pair_cookies(&state, &pair);
            Ok((
                StatusCode::OK,
                cookies,
                Json(ApiResponse::success(serde_json::json!(
                    TokenResponse::pair(pair)
                ))),
            )
                .into_response())
        }
        VerifyOutcome::PinChallenge {
            user_id,
            embedding_id,
        } => Ok((
            StatusCode::ACCEPTED,
            Json(ApiResponse::success(serde_json::json!(PinChallengeDto {
                requires_pin: true,
                user_id,
                embedding_id,
            }))),
        )
            .into_response()),
    }
}

/// POST /face/verify-pin
/// Complete a PIN challenge
pub async fn verify_pin(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<VerifyPinRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let pair = state
        .shared
        .face_service
        .verify_pin(payload.user_id, &payload.pin)
        .await?;
    let cookies = auth::pair_cookies(&state, &pair);
    Ok((cookies, Json(ApiResponse::success(TokenResponse::pair(pair)))))
}

/// GET /face/status
/// Whether the authenticated user has an enrollment
pub async fn status(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<Json<ApiResponse<EnrollmentStatusDto>>, ApiError> {
    let enrolled = state.shared.face_service.embedding_status(user.id).await?;
    Ok(Json(ApiResponse::success(EnrollmentStatusDto { enrolled })))
}

/// DELETE /face/delete
/// Remove the authenticated user's enrollment and any attached PIN
pub async fn delete(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<Json<ApiResponse<DeletedDto>>, ApiError> {
    let deleted = state.shared.face_service.delete_embedding(user.id).await?;
    Ok(Json(ApiResponse::success(DeletedDto { deleted })))
}

/// GET /face/pin
/// Whether the authenticated user's enrollment carries a PIN
pub async fn pin_status(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<Json<ApiResponse<PinStatusDto>>, ApiError> {
    let status = state.shared.face_service.pin_status(user.id).await?;
    Ok(Json(ApiResponse::success(PinStatusDto {
        has_pin: status.has_pin,
    })))
}

/// POST /face/pin/create
/// Attach a PIN to the authenticated user's enrollment
pub async fn create_pin(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(payload): Json<CreatePinRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .shared
        .face_service
        .create_pin(user.id, &payload.pin)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(StatusDto::ok())),
    ))
}

/// DELETE /face/pin
/// Remove the PIN from the authenticated user's enrollment
pub async fn delete_pin(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<Json<ApiResponse<StatusDto>>, ApiError> {
    state.shared.face_service.delete_pin(user.id).await?;
    Ok(Json(ApiResponse::success(StatusDto::ok())))
}
