// ABOUTME: Account service: registration with profile, password authentication and change
// ABOUTME: Passwords are hashed with Argon2 on the blocking pool and never leave this module in clear

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
};
use rand::rngs::OsRng;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set, TransactionTrait};
use tokio::task;
use uuid::Uuid;

use crate::entities::{profile, user};
use crate::error::{AppError, Result, conflict_on_unique};
use crate::profiles::validate_profile_fields;
use crate::storage::{Storage, now_millis, today};
use crate::types::RegisterRequest;
use crate::validators::{self, FieldErrors, USERNAME_MAX_LENGTH};

const USERNAME_TAKEN: &str = "A user with that username already exists.";

async fn hash_password(password: String) -> Result<String> {
    task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AppError::Internal(format!("password hashing failed: {}", e)))
    })
    .await
    .map_err(|e| AppError::Internal(format!("password hashing worker failed: {}", e)))?
}

async fn verify_password(password: String, hash: String) -> Result<bool> {
    task::spawn_blocking(move || match PasswordHash::new(&hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    })
    .await
    .map_err(|e| AppError::Internal(format!("password verification worker failed: {}", e)))
}

impl Storage {
    /// Creates the user and its profile in one transaction.
    pub async fn register(&self, req: &RegisterRequest) -> Result<user::Model> {
        let username = req.username.trim().to_string();
        let fields = req.profile();

        let mut errors = FieldErrors::new();
        errors.check(
            "username",
            [
                validators::length_between(&username, 1, USERNAME_MAX_LENGTH),
                validators::username_chars(&username),
            ],
        );
        errors.check("password", [validators::password_policy(&req.password, &username)]);
        if req.password != req.password_confirmation {
            errors.push("password_confirmation", "The two password fields didn't match.");
        }
        validate_profile_fields(&mut errors, &fields, today());
        errors.finish()?;

        let existing = user::Entity::find()
            .filter(user::Column::Username.eq(username.as_str()))
            .one(&self.db)
            .await?;
        if existing.is_some() {
            return Err(AppError::Conflict(USERNAME_TAKEN.to_string()));
        }

        let password_hash = hash_password(req.password.clone()).await?;

        let txn = self.db.begin().await?;

        let user = user::ActiveModel {
            id: Set(Uuid::new_v4()),
            username: Set(username),
            password_hash: Set(password_hash),
            date_joined: Set(now_millis()),
            is_staff: Set(false),
        }
        .insert(&txn)
        .await
        .map_err(|e| conflict_on_unique(e, USERNAME_TAKEN))?;

        profile::ActiveModel {
            user_id: Set(user.id),
            first_name: Set(fields.first_name.trim().to_string()),
            last_name: Set(fields.last_name.trim().to_string()),
            profile_picture: Set(fields.profile_picture.trim().to_string()),
            date_of_birth: Set(fields.date_of_birth),
            email: Set(fields.email),
            gender: Set(fields.gender),
            description: Set(fields.description),
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;

        tracing::info!(user_id = %user.id, username = %user.username, "Registered user");
        Ok(user)
    }

    /// Same error for unknown usernames and wrong passwords.
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<user::Model> {
        let user = user::Entity::find()
            .filter(user::Column::Username.eq(username.trim()))
            .one(&self.db)
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        if !verify_password(password.to_string(), user.password_hash.clone()).await? {
            return Err(AppError::InvalidCredentials);
        }

        Ok(user)
    }

    pub async fn get_user(&self, user_id: Uuid) -> Result<user::Model> {
        user::Entity::find_by_id(user_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("user {}", user_id)))
    }

    /// Session invalidation is the caller's job; see `SessionStore::remove_user_sessions`.
    pub async fn change_password(
        &self,
        user_id: Uuid,
        old_password: &str,
        new_password: &str,
        new_password_confirmation: &str,
    ) -> Result<()> {
        let user = self.get_user(user_id).await?;

        if !verify_password(old_password.to_string(), user.password_hash.clone()).await? {
            return Err(AppError::field(
                "old_password",
                "Your old password was entered incorrectly.",
            ));
        }

        let mut errors = FieldErrors::new();
        errors.check(
            "new_password",
            [validators::password_policy(new_password, &user.username)],
        );
        if new_password != new_password_confirmation {
            errors.push("new_password_confirmation", "The two password fields didn't match.");
        }
        errors.finish()?;

        let password_hash = hash_password(new_password.to_string()).await?;

        let mut active: user::ActiveModel = user.into();
        active.password_hash = Set(password_hash);
        active.update(&self.db).await?;

        tracing::info!(%user_id, "Password changed");
        Ok(())
    }
}
