// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod code;
pub mod password;
pub mod session;
pub mod sms;
pub mod user;

pub use code::{CodeError, CodeService, CodeSettings, CodeStore};
pub use session::{AuthError, SessionClaims, SessionManager, TokenPair};
pub use sms::{MemorySmsSender, SmsError, SmsSender, TwilioSmsSender};
pub use user::UserService;
