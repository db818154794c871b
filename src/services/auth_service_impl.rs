use std::sync::{Arc, OnceLock};

use regex::Regex;
use tracing::{info, warn};

use crate::config::SecurityConfig;
use crate::credentials;
use crate::db::Store;
use crate::mailer::{MailKind, Mailer};
use crate::services::auth_service::{AuthError, AuthService, RegisterRequest, UserInfo};
use crate::tokens::{TokenCodec, TokenError, TokenKind, TokenPair};

const MIN_PASSWORD_LEN: usize = 8;

fn email_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("Invalid regex"))
}

fn login_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9_.-]{3,64}$").expect("Invalid regex"))
}

/// [`AuthService`] backed by the sqlite store and the HS256 token codec.
pub struct SeaOrmAuthService {
    store: Arc<Store>,
    codec: Arc<TokenCodec>,
    mailer: Option<Arc<dyn Mailer>>,
    security: SecurityConfig,
}

impl SeaOrmAuthService {
    pub fn new(
        store: Arc<Store>,
        codec: Arc<TokenCodec>,
        mailer: Option<Arc<dyn Mailer>>,
        security: SecurityConfig,
    ) -> Self {
        Self {
            store,
            codec,
            mailer,
            security,
        }
    }

    fn validate_register(request: &RegisterRequest) -> Result<(), AuthError> {
        if !login_re().is_match(&request.login) {
            return Err(AuthError::Validation(
                "login must be 3-64 characters of letters, digits, '_', '.' or '-'".to_string(),
            ));
        }
        if !email_re().is_match(&request.email) {
            return Err(AuthError::Validation("email address is malformed".to_string()));
        }
        if request.password.len() < MIN_PASSWORD_LEN {
            return Err(AuthError::Validation(format!(
                "password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }
        Ok(())
    }

    fn send_mail_background(&self, kind: MailKind, recipient: String, token: String) {
        if let Some(mailer) = self.mailer.clone() {
            tokio::spawn(async move {
                if let Err(err) = mailer.send(kind, &recipient, &token).await {
                    warn!("failed to send {} mail to {recipient}: {err}", kind.template());
                }
            });
        }
    }
}

#[async_trait::async_trait]
impl AuthService for SeaOrmAuthService {
    async fn register(&self, request: RegisterRequest) -> Result<i32, AuthError> {
        Self::validate_register(&request)?;

        if self
            .store
            .get_user_by_login(&request.login)
            .await
            .map_err(|e| AuthError::Database(e.to_string()))?
            .is_some()
        {
            return Err(AuthError::LoginTaken);
        }
        if self
            .store
            .get_user_by_email(&request.email)
            .await
            .map_err(|e| AuthError::Database(e.to_string()))?
            .is_some()
        {
            return Err(AuthError::EmailTaken);
        }

        let password_hash =
            credentials::hash_secret_blocking(request.password.clone(), self.security.clone())
                .await?;

        // Without a mailer there is no way to confirm, so accounts start
        // confirmed and the email leg is skipped entirely.
        let email_confirmed = self.mailer.is_none();

        let user_id = self
            .store
            .insert_user(crate::db::NewUser {
                login: request.login.clone(),
                email: request.email.clone(),
                password_hash,
                email_confirmed,
            })
            .await
            .map_err(|e| AuthError::Database(e.to_string()))?;

        info!("registered user {user_id} ({})", request.login);

        if !email_confirmed {
            let token = self
                .codec
                .issue(&request.email, TokenKind::EmailConfirm)?;
            self.send_mail_background(MailKind::ConfirmEmail, request.email, token);
        }

        Ok(user_id)
    }

    async fn login(&self, email: &str, password: &str) -> Result<TokenPair, AuthError> {
        let Some((user, password_hash)) = self
            .store
            .get_user_by_email_with_password(email)
            .await
            .map_err(|e| AuthError::Database(e.to_string()))?
        else {
            return Err(AuthError::IncorrectCredentials);
        };

        if !user.is_active {
            return Err(AuthError::UserInactive);
        }
        if !user.email_confirmed {
            return Err(AuthError::EmailNotConfirmed);
        }

        let matches =
            credentials::verify_secret_blocking(password.to_string(), password_hash).await?;
        if !matches {
            return Err(AuthError::IncorrectCredentials);
        }

        Ok(self.codec.issue_pair(&user.id.to_string())?)
    }

    async fn refresh(&self, refresh_token: &str) -> Result<String, AuthError> {
        let claims = self.codec.verify(refresh_token, TokenKind::Refresh)?;
        let user_id: i32 = claims
            .sub
            .parse()
            .map_err(|_| TokenError::Malformed)?;

        let user = self
            .store
            .get_user_by_id(user_id)
            .await
            .map_err(|e| AuthError::Database(e.to_string()))?
            .ok_or(AuthError::UserNotFound)?;
        if !user.is_active {
            return Err(AuthError::UserInactive);
        }

        Ok(self.codec.issue(&claims.sub, TokenKind::Access)?)
    }

    async fn confirm_email(&self, token: &str) -> Result<(), AuthError> {
        let claims = self.codec.verify(token, TokenKind::EmailConfirm)?;
        let found = self
            .store
            .confirm_user_email(&claims.sub)
            .await
            .map_err(|e| AuthError::Database(e.to_string()))?;
        if !found {
            return Err(AuthError::UserNotFound);
        }
        info!("confirmed email for {}", claims.sub);
        Ok(())
    }

    async fn request_password_reset(&self, email: &str) -> Result<(), AuthError> {
        if self.mailer.is_none() {
            return Err(AuthError::EmailDisabled);
        }
        let user = self
            .store
            .get_user_by_email(email)
            .await
            .map_err(|e| AuthError::Database(e.to_string()))?
            .ok_or(AuthError::UserNotFound)?;

        if !user.email_confirmed {
            return Err(AuthError::EmailNotConfirmed);
        }

        let token = self.codec.issue(&user.email, TokenKind::PasswordReset)?;
        self.send_mail_background(MailKind::PasswordReset, user.email, token);
        Ok(())
    }

    async fn complete_password_reset(
        &self,
        token: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        if new_password.len() < MIN_PASSWORD_LEN {
            return Err(AuthError::Validation(format!(
                "password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }
        let claims = self.codec.verify(token, TokenKind::PasswordReset)?;

        let password_hash =
            credentials::hash_secret_blocking(new_password.to_string(), self.security.clone())
                .await?;

        let found = self
            .store
            .update_user_password(&claims.sub, password_hash)
            .await
            .map_err(|e| AuthError::Database(e.to_string()))?;
        if !found {
            return Err(AuthError::UserNotFound);
        }
        info!("reset password for {}", claims.sub);
        Ok(())
    }

    async fn current_user(&self, access_token: &str) -> Result<UserInfo, AuthError> {
        let claims = self.codec.verify(access_token, TokenKind::Access)?;
        let user_id: i32 = claims
            .sub
            .parse()
            .map_err(|_| TokenError::Malformed)?;

        let user = self
            .store
            .get_user_by_id(user_id)
            .await
            .map_err(|e| AuthError::Database(e.to_string()))?
            .ok_or(AuthError::UserNotFound)?;
        if !user.is_active {
            return Err(AuthError::UserInactive);
        }

        Ok(UserInfo {
            id: user.id,
            login: user.login,
            email: user.email,
            email_confirmed: user.email_confirmed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(login: &str, email: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            login: login.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    #[test]
    fn validation_accepts_reasonable_input() {
        assert!(
            SeaOrmAuthService::validate_register(&request("alice", "alice@example.com", "hunter22"))
                .is_ok()
        );
    }

    #[test]
    fn validation_rejects_short_password() {
        let err =
            SeaOrmAuthService::validate_register(&request("alice", "alice@example.com", "short"))
                .unwrap_err();
        assert!(matches!(err, AuthError::Validation(_)));
    }

    #[test]
    fn validation_rejects_bad_email() {
        for email in ["not-an-email", "a@b", "two words@example.com", "@example.com"] {
            let err = SeaOrmAuthService::validate_register(&request("alice", email, "hunter22"))
                .unwrap_err();
            assert!(matches!(err, AuthError::Validation(_)), "{email}");
        }
    }

    #[test]
    fn validation_rejects_bad_login() {
        for login in ["ab", "spa ce", "way!bad", &"x".repeat(65)] {
            let err = SeaOrmAuthService::validate_register(&request(
                login,
                "alice@example.com",
                "hunter22",
            ))
            .unwrap_err();
            assert!(matches!(err, AuthError::Validation(_)), "{login}");
        }
    }
}
