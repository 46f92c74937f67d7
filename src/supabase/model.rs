// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use secrecy::Secret;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    roles::AccountKind,
    session::{Identity, Session, Token},
};

const DEFAULT_EXPIRY: Duration = Duration::from_secs(3600);

#[derive(Serialize)]
pub(super) struct PasswordGrant<'a> {
    pub(super) email: &'a str,
    pub(super) password: &'a str,
}

#[derive(Serialize)]
pub(super) struct RefreshGrant<'a> {
    pub(super) refresh_token: &'a str,
}

#[derive(Serialize)]
pub(super) struct Recover<'a> {
    pub(super) email: &'a str,
}

#[derive(Serialize)]
pub(super) struct NewRoleRecord<'a> {
    pub(super) user_id: Uuid,
    pub(super) email: &'a str,
    pub(super) role: AccountKind,
}

#[derive(Debug, Deserialize)]
pub(super) struct User {
    id: Uuid,
    #[serde(default)]
    email: Option<String>,
}

impl From<User> for Identity {
    fn from(value: User) -> Self {
        Self {
            id: value.id,
            email: value.email.unwrap_or_default(),
        }
    }
}

#[derive(Deserialize)]
pub(super) struct TokenResponse {
    access_token: Token,
    refresh_token: Token,
    #[serde(default)]
    expires_in: Option<u64>,
    #[serde(default)]
    expires_at: Option<u64>,
    user: User,
}

impl TokenResponse {
    pub(super) fn into_session(self, now: SystemTime) -> Session {
        let expires_at = match (self.expires_at, self.expires_in) {
            (Some(at), _) => UNIX_EPOCH + Duration::from_secs(at),
            (None, Some(secs)) => now + Duration::from_secs(secs),
            (None, None) => now + DEFAULT_EXPIRY,
        };
        Session {
            access_token: Secret::new(self.access_token),
            refresh_token: Secret::new(self.refresh_token),
            expires_at,
            user: self.user.into(),
        }
    }
}

/// Sign-up answers with a full token response when the account is usable
/// right away, and with just the user when it still has to be confirmed.
#[derive(Deserialize)]
#[serde(untagged)]
pub(super) enum SignUpResponse {
    Session(TokenResponse),
    User(User),
}

/// The auth and REST services each report errors under different keys.
#[derive(Default, Deserialize)]
pub(super) struct ErrorBody {
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl ErrorBody {
    pub(super) fn into_message(self) -> Option<String> {
        self.msg
            .or(self.message)
            .or(self.error_description)
            .or(self.error)
    }
}
