// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models for the application.

pub mod daily_summary;
pub mod user;

pub use daily_summary::DailySummary;
pub use user::{NewUser, User, UserUpdate};
