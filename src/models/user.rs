// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User model for storage and API.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// User record as stored in Postgres.
///
/// This is also the shape written to the cache, minus the password hash:
/// the hash is never serialized, so a cached projection cannot leak it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    /// Database-assigned ID, stable for the lifetime of the row
    pub id: i64,
    /// Display handle (unique when present)
    pub username: Option<String>,
    /// Login account for password sign-in (unique when present)
    pub account: Option<String>,
    /// Phone number for code sign-in (unique when present)
    pub phone: Option<String>,
    /// Argon2id PHC string; empty for phone-only users
    #[serde(skip)]
    pub password_hash: String,
    pub nickname: Option<String>,
    pub weight_kg: i32,
    pub height_cm: i32,
    pub birthday: Option<NaiveDate>,
    /// Free-text bio
    pub about_me: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// The same user with credentials removed, as served from the cache.
    pub fn without_credentials(mut self) -> Self {
        self.password_hash.clear();
        self
    }
}

/// Fields accepted when creating a user.
#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub account: Option<String>,
    pub phone: Option<String>,
    pub password_hash: String,
}

impl NewUser {
    /// A password-based account.
    pub fn with_account(account: impl Into<String>, password_hash: impl Into<String>) -> Self {
        Self {
            account: Some(account.into()),
            phone: None,
            password_hash: password_hash.into(),
        }
    }

    /// A phone-only account created on first code sign-in.
    pub fn with_phone(phone: impl Into<String>) -> Self {
        Self {
            account: None,
            phone: Some(phone.into()),
            password_hash: String::new(),
        }
    }
}

/// Partial update of the non-sensitive profile fields.
///
/// Only `Some` fields are written. Account, phone and password are not
/// representable here and can never change through this path.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserUpdate {
    pub id: i64,
    pub username: Option<String>,
    pub nickname: Option<String>,
    pub weight_kg: Option<i32>,
    pub height_cm: Option<i32>,
    pub birthday: Option<NaiveDate>,
    pub about_me: Option<String>,
}

impl UserUpdate {
    /// Apply this update to an in-memory user (used by the in-memory store).
    pub fn apply_to(&self, user: &mut User, now: DateTime<Utc>) {
        if let Some(username) = &self.username {
            user.username = Some(username.clone());
        }
        if let Some(nickname) = &self.nickname {
            user.nickname = Some(nickname.clone());
        }
        if let Some(weight) = self.weight_kg {
            user.weight_kg = weight;
        }
        if let Some(height) = self.height_cm {
            user.height_cm = height;
        }
        if let Some(birthday) = self.birthday {
            user.birthday = Some(birthday);
        }
        if let Some(about_me) = &self.about_me {
            user.about_me = Some(about_me.clone());
        }
        user.updated_at = now;
    }
}
