// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

#[cfg(test)]
pub(crate) mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use secrecy::SecretString;
use tokio::sync::watch;

use crate::{
    error::Result,
    session::{Identity, Session},
};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum EventKind {
    InitialSession,
    SignedIn,
    SignedOut,
    TokenRefreshed,
}

/// A change to the remote session, as reported by the identity service.
#[derive(Clone, Debug)]
pub(crate) struct Event {
    pub(crate) kind: EventKind,
    pub(crate) session: Option<Session>,
}

impl Event {
    pub(crate) const fn initial() -> Self {
        Self {
            kind: EventKind::InitialSession,
            session: None,
        }
    }
}

/// The outcome of creating a remote principal. The service only hands back a
/// session when it signs the new principal in directly.
#[derive(Clone, Debug)]
pub(crate) struct Registration {
    pub(crate) identity: Identity,
    pub(crate) session: Option<Session>,
}

#[async_trait]
pub(crate) trait IdentityService: Send + Sync {
    async fn password_sign_in(&self, identifier: &str, secret: &SecretString) -> Result<Session>;

    async fn password_sign_up(
        &self,
        identifier: &str,
        secret: &SecretString,
    ) -> Result<Registration>;

    async fn sign_out(&self, session: &Session) -> Result<()>;

    async fn request_password_reset(&self, identifier: &str) -> Result<()>;

    async fn refresh_session(&self, session: &Session) -> Result<Session>;

    /// Makes the given session the one that authorizes subsequent requests,
    /// without announcing it on the event channel.
    async fn set_session(&self, session: Option<&Session>);

    /// The channel always holds the latest remote state, so intermediate
    /// changes may be coalesced. Sign-up does not publish the session it
    /// issues.
    fn subscribe(&self) -> watch::Receiver<Event>;
}

#[async_trait]
impl<T: IdentityService + ?Sized> IdentityService for Arc<T> {
    async fn password_sign_in(&self, identifier: &str, secret: &SecretString) -> Result<Session> {
        (**self).password_sign_in(identifier, secret).await
    }

    async fn password_sign_up(
        &self,
        identifier: &str,
        secret: &SecretString,
    ) -> Result<Registration> {
        (**self).password_sign_up(identifier, secret).await
    }

    async fn sign_out(&self, session: &Session) -> Result<()> {
        (**self).sign_out(session).await
    }

    async fn request_password_reset(&self, identifier: &str) -> Result<()> {
        (**self).request_password_reset(identifier).await
    }

    async fn refresh_session(&self, session: &Session) -> Result<Session> {
        (**self).refresh_session(session).await
    }

    async fn set_session(&self, session: Option<&Session>) {
        (**self).set_session(session).await;
    }

    fn subscribe(&self) -> watch::Receiver<Event> {
        (**self).subscribe()
    }
}
