// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use super::CacheAside;
use crate::cache::Cache;
use crate::db::{StoreError, UserStore};
use crate::error::{AppError, Result};
use crate::models::{NewUser, User, UserUpdate};
use std::sync::Arc;

pub fn user_key(id: i64) -> String {
    format!("user:info:{id}")
}

/// Users by id through the cache; unique-key lookups go straight to the store.
#[derive(Clone)]
pub struct UserRepository {
    store: Arc<dyn UserStore>,
    cached: CacheAside,
}

impl UserRepository {
    pub fn new(store: Arc<dyn UserStore>, cache: Arc<dyn Cache>) -> Self {
        Self {
            store,
            cached: CacheAside::new(cache),
        }
    }

    pub async fn create(&self, user: &NewUser) -> Result<User> {
        Ok(self.store.insert(user).await?)
    }

    /// Never carries the password hash, whether served from the cache or
    /// the store. Use `find_by_account` to check a password.
    pub async fn find_by_id(&self, id: i64) -> Result<User> {
        self.cached
            .read_through(&user_key(id), move || async move {
                match self.store.find_by_id(id).await {
                    Ok(user) => Ok(user.without_credentials()),
                    Err(StoreError::NotFound) => Err(AppError::NotFound(format!("user {id}"))),
                    Err(e) => Err(e.into()),
                }
            })
            .await
    }

    pub async fn find_by_account(&self, account: &str) -> Result<User> {
        Ok(self.store.find_by_account(account).await?)
    }

    pub async fn find_by_phone(&self, phone: &str) -> Result<User> {
        Ok(self.store.find_by_phone(phone).await?)
    }

    pub async fn update(&self, update: &UserUpdate) -> Result<()> {
        self.store.update_non_zero(update).await?;
        self.cached.invalidate(&user_key(update.id)).await
    }
}
