// SPDX-FileCopyrightText: 2022-2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::{io, result};

use thiserror::Error;
use uuid::Uuid;

pub(crate) type Result<T, E = Error> = result::Result<T, E>;

#[derive(Error, Debug)]
pub(crate) enum Error {
    #[error("IO operation failed: {0}")]
    Io(#[from] io::Error),
    #[error("JSON format error: {0}")]
    Json(serde_json::Error),
    #[error("authentication failed: {0}")]
    Authentication(String),
    #[error("transport error: {0}")]
    Transport(#[from] Transport),
    #[error("account {identity} was registered, but its role record could not be created: {source}")]
    PartialRegistration {
        identity: Uuid,
        source: Box<Error>,
    },
    #[error("remote sign-out could not be confirmed: {0}")]
    SignOut(#[source] Box<Error>),
    #[error("storage error: {0}")]
    Storage(#[from] Storage),
    #[error("password retrieval error: {0}")]
    Password(#[from] Password),
    #[error("operation cancelled")]
    Cancelled,
}

impl From<pinentry::Error> for Error {
    fn from(value: pinentry::Error) -> Self {
        // LINT: Deliberate fall-through that should catch future cases added to
        // the enum.
        #[allow(
            clippy::wildcard_enum_match_arm,
            clippy::match_wildcard_for_single_variants
        )]
        match value {
            pinentry::Error::Cancelled | pinentry::Error::Timeout => Self::Cancelled,
            pinentry::Error::Io(e) => Self::Io(e),
            _ => Self::Password(Password::Pinentry(value)),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(value: serde_json::Error) -> Self {
        // LINT: Deliberate fall-through that should catch future cases added to
        // the enum.
        #[allow(clippy::wildcard_enum_match_arm)]
        match value.classify() {
            serde_json::error::Category::Io => Self::Io(value.into()),
            _ => Self::Json(value),
        }
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(value: tokio::task::JoinError) -> Self {
        Self::Io(value.into())
    }
}

impl From<reqwest::Error> for Error {
    fn from(value: reqwest::Error) -> Self {
        Self::Transport(Transport::Http(value))
    }
}

#[derive(Error, Debug)]
pub(crate) enum Transport {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("service responded with status {status}: {message}")]
    Status { status: u16, message: String },
}

#[derive(Error, Debug)]
pub(crate) enum Storage {
    #[error("no data directory is available on this platform")]
    NoProjectDirs,
    #[error("stored data could not be decoded: {0}")]
    Corrupt(#[source] serde_json::Error),
    #[cfg(feature = "secret-service")]
    #[error("secret service error: {0}")]
    SecretService(#[from] oo7::Error),
    #[cfg(feature = "keychain")]
    #[error("keychain error: {0}")]
    Keychain(#[from] security_framework::base::Error),
}

#[derive(Error, Debug)]
pub(crate) enum Password {
    #[error("no password prompt available")]
    NoPrompt,
    #[error("the passwords do not match")]
    Mismatch,
    #[error("Pinentry implementation error: {0}")]
    Pinentry(pinentry::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_registration_names_the_identity() {
        let identity = uuid::uuid!("0b6c2f52-8d4f-4a0e-9a3c-3f5d7c1e2a90");
        let err = Error::PartialRegistration {
            identity,
            source: Box::new(Error::Transport(Transport::Status {
                status: 409,
                message: "duplicate key".to_owned(),
            })),
        };

        let message = err.to_string();
        assert!(message.contains("0b6c2f52-8d4f-4a0e-9a3c-3f5d7c1e2a90"));
        assert!(message.contains("duplicate key"));
    }

    #[test]
    fn json_errors_are_classified() {
        let err = serde_json::from_slice::<u32>(b"{").unwrap_err();
        assert!(matches!(Error::from(err), Error::Json(_)));
    }
}
