use serde::Serialize;

use crate::tokens::TokenPair;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub const fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Token pair as delivered in response bodies. The refresh token is omitted
/// on plain refreshes, which only mint a new access token.
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    pub token_type: &'static str,
}

impl TokenResponse {
    pub fn pair(pair: TokenPair) -> Self {
        Self {
            access_token: pair.access_token,
            refresh_token: Some(pair.refresh_token),
            token_type: "Bearer",
        }
    }

    pub fn access_only(access_token: String) -> Self {
        Self {
            access_token,
            refresh_token: None,
            token_type: "Bearer",
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RegisteredDto {
    pub user_id: i32,
    pub confirmation_required: bool,
}

#[derive(Debug, Serialize)]
pub struct StatusDto {
    pub status: String,
}

impl StatusDto {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
        }
    }
}

/// Returned with 202 when a face match still needs a PIN.
#[derive(Debug, Serialize)]
pub struct PinChallengeDto {
    pub requires_pin: bool,
    pub user_id: i32,
    pub embedding_id: i32,
}

#[derive(Debug, Serialize)]
pub struct EmbeddingDto {
    pub embedding_id: i32,
}

#[derive(Debug, Serialize)]
pub struct DeletedDto {
    pub deleted: bool,
}

#[derive(Debug, Serialize)]
pub struct EnrollmentStatusDto {
    pub enrolled: bool,
}

#[derive(Debug, Serialize)]
pub struct PinStatusDto {
    pub has_pin: bool,
}

#[derive(Debug, Serialize)]
pub struct UserDto {
    pub id: i32,
    pub login: String,
    pub email: String,
    pub email_confirmed: bool,
}

#[derive(Debug, Serialize)]
pub struct HealthDto {
    pub status: String,
    pub database: String,
    pub uptime_seconds: u64,
    pub version: String,
}
