use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};

use crate::entities::users;

/// User data returned from the repository (without the password hash).
#[derive(Debug, Clone)]
pub struct User {
    pub id: i32,
    pub login: String,
    pub email: String,
    pub is_active: bool,
    pub email_confirmed: bool,
    pub created_at: String,
}

impl From<users::Model> for User {
    fn from(model: users::Model) -> Self {
        Self {
            id: model.id,
            login: model.login,
            email: model.email,
            is_active: model.is_active,
            email_confirmed: model.email_confirmed,
            created_at: model.created_at,
        }
    }
}

/// Fields required to persist a new user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub login: String,
    pub email: String,
    pub password_hash: String,
    pub email_confirmed: bool,
}

pub struct UserRepository {
    conn: DatabaseConnection,
}

impl UserRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = users::Entity::find()
            .filter(users::Column::Email.eq(email))
            .one(&self.conn)
            .await
            .context("Failed to query user by email")?;

        Ok(user.map(User::from))
    }

    /// Login needs the stored hash for verification.
    pub async fn get_by_email_with_password(
        &self,
        email: &str,
    ) -> Result<Option<(User, String)>> {
        let user = users::Entity::find()
            .filter(users::Column::Email.eq(email))
            .one(&self.conn)
            .await
            .context("Failed to query user by email")?;

        Ok(user.map(|u| {
            let password_hash = u.password_hash.clone();
            (User::from(u), password_hash)
        }))
    }

    pub async fn get_by_login(&self, login: &str) -> Result<Option<User>> {
        let user = users::Entity::find()
            .filter(users::Column::Login.eq(login))
            .one(&self.conn)
            .await
            .context("Failed to query user by login")?;

        Ok(user.map(User::from))
    }

    pub async fn get_by_id(&self, id: i32) -> Result<Option<User>> {
        let user = users::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query user by ID")?;

        Ok(user.map(User::from))
    }

    pub async fn insert(&self, new_user: NewUser) -> Result<i32> {
        let now = chrono::Utc::now().to_rfc3339();

        let active = users::ActiveModel {
            login: Set(new_user.login),
            email: Set(new_user.email),
            password_hash: Set(new_user.password_hash),
            is_active: Set(true),
            email_confirmed: Set(new_user.email_confirmed),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        };

        let inserted = active
            .insert(&self.conn)
            .await
            .context("Failed to insert user")?;

        Ok(inserted.id)
    }

    /// Marks the email confirmed. Returns false when no such user exists.
    /// Confirming an already-confirmed email is a no-op, not an error.
    pub async fn confirm_email(&self, email: &str) -> Result<bool> {
        let user = users::Entity::find()
            .filter(users::Column::Email.eq(email))
            .one(&self.conn)
            .await
            .context("Failed to query user for email confirmation")?;

        let Some(user) = user else {
            return Ok(false);
        };

        if user.email_confirmed {
            return Ok(true);
        }

        let mut active: users::ActiveModel = user.into();
        active.email_confirmed = Set(true);
        active.updated_at = Set(chrono::Utc::now().to_rfc3339());
        active
            .update(&self.conn)
            .await
            .context("Failed to confirm email")?;

        Ok(true)
    }

    /// Overwrites the stored password hash. Returns false when no such user
    /// exists.
    pub async fn update_password(&self, email: &str, new_hash: String) -> Result<bool> {
        let user = users::Entity::find()
            .filter(users::Column::Email.eq(email))
            .one(&self.conn)
            .await
            .context("Failed to query user for password update")?;

        let Some(user) = user else {
            return Ok(false);
        };

        let mut active: users::ActiveModel = user.into();
        active.password_hash = Set(new_hash);
        active.updated_at = Set(chrono::Utc::now().to_rfc3339());
        active
            .update(&self.conn)
            .await
            .context("Failed to update password")?;

        Ok(true)
    }
}
