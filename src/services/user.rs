// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Account management: sign-up, password login, phone login and profile.

use crate::error::{AppError, Result};
use crate::models::{NewUser, User, UserUpdate};
use crate::repository::UserRepository;
use crate::services::password;

#[derive(Clone)]
pub struct UserService {
    repo: UserRepository,
}

impl UserService {
    pub fn new(repo: UserRepository) -> Self {
        Self { repo }
    }

    /// Create a password account. The strength rule is checked here.
    pub async fn signup(&self, account: &str, plain_password: &str) -> Result<User> {
        password::validate_password_strength(plain_password).map_err(AppError::BadRequest)?;

        let plain = plain_password.to_string();
        let hash = tokio::task::spawn_blocking(move || password::hash_password(&plain))
            .await
            .map_err(|e| AppError::Internal(e.into()))?
            .map_err(|e| AppError::Internal(anyhow::anyhow!("password hashing failed: {e}")))?;

        let user = self
            .repo
            .create(&NewUser::with_account(account, hash))
            .await
            .map_err(|e| match e {
                AppError::Conflict(_) => AppError::Conflict("account already exists".to_string()),
                other => other,
            })?;

        tracing::info!(user_id = user.id, "User signed up");
        Ok(user)
    }

    /// Unknown account and wrong password both yield `InvalidCredentials`.
    pub async fn login(&self, account: &str, plain_password: &str) -> Result<User> {
        let user = match self.repo.find_by_account(account).await {
            Ok(user) => user,
            Err(AppError::NotFound(_)) => return Err(AppError::InvalidCredentials),
            Err(e) => return Err(e),
        };

        let plain = plain_password.to_string();
        let hash = user.password_hash.clone();
        let matches =
            tokio::task::spawn_blocking(move || password::verify_password(&plain, &hash))
                .await
                .map_err(|e| AppError::Internal(e.into()))?;

        if !matches {
            return Err(AppError::InvalidCredentials);
        }
        Ok(user)
    }

    /// Look up the user owning `phone`, creating a phone-only user if none.
    ///
    /// A concurrent first login for the same phone loses the insert race with
    /// a duplicate-key error; both callers then read the same row.
    pub async fn find_or_create(&self, phone: &str) -> Result<User> {
        match self.repo.find_by_phone(phone).await {
            Err(AppError::NotFound(_)) => {}
            found => return found,
        }

        match self.repo.create(&NewUser::with_phone(phone)).await {
            Ok(user) => {
                tracing::info!(user_id = user.id, "Created user on first phone login");
                return Ok(user);
            }
            Err(AppError::Conflict(_)) => {
                tracing::debug!("Phone user created concurrently, re-reading");
            }
            Err(e) => return Err(e),
        }

        self.repo.find_by_phone(phone).await
    }

    pub async fn profile(&self, user_id: i64) -> Result<User> {
        self.repo.find_by_id(user_id).await
    }

    /// Update profile fields. Account, phone and password cannot change here.
    pub async fn update_non_sensitive(&self, update: &UserUpdate) -> Result<()> {
        self.repo.update(update).await.map_err(|e| match e {
            AppError::Conflict(_) => AppError::Conflict("username already taken".to_string()),
            other => other,
        })
    }
}
