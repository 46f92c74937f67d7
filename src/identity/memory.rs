// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, AtomicU32, Ordering},
        Mutex,
    },
    time::{Duration, SystemTime},
};

use async_trait::async_trait;
use secrecy::{ExposeSecret as _, Secret, SecretString};
use tokio::sync::watch;
use uuid::Uuid;

use crate::{
    error::{self, Error, Result},
    session::{Identity, Session},
};

use super::{Event, EventKind, IdentityService, Registration};

struct Account {
    identity: Identity,
    secret: String,
}

/// An in-process identity service with switches for simulating remote
/// failures.
pub(crate) struct Memory {
    accounts: Mutex<HashMap<String, Account>>,
    issued: AtomicU32,
    unavailable: AtomicBool,
    fail_sign_out: AtomicBool,
    sign_up_issues_session: AtomicBool,
    events: watch::Sender<Event>,
}

impl Memory {
    pub(crate) fn new() -> Self {
        let (events, _) = watch::channel(Event::initial());
        Self {
            accounts: Mutex::new(HashMap::new()),
            issued: AtomicU32::new(0),
            unavailable: AtomicBool::new(false),
            fail_sign_out: AtomicBool::new(false),
            sign_up_issues_session: AtomicBool::new(false),
            events,
        }
    }

    pub(crate) fn with_account(self, email: &str, secret: &str) -> Self {
        _ = self.add_account(email, secret);
        self
    }

    pub(crate) fn add_account(&self, email: &str, secret: &str) -> Identity {
        let identity = Identity {
            id: Uuid::new_v4(),
            email: email.to_owned(),
        };
        _ = self.accounts.lock().unwrap().insert(
            email.to_owned(),
            Account {
                identity: identity.clone(),
                secret: secret.to_owned(),
            },
        );
        identity
    }

    pub(crate) fn identity_of(&self, email: &str) -> Option<Identity> {
        self.accounts
            .lock()
            .unwrap()
            .get(email)
            .map(|account| account.identity.clone())
    }

    pub(crate) fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub(crate) fn set_fail_sign_out(&self, fail: bool) {
        self.fail_sign_out.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn set_sign_up_issues_session(&self, issues: bool) {
        self.sign_up_issues_session.store(issues, Ordering::SeqCst);
    }

    pub(crate) fn subscribers(&self) -> usize {
        self.events.receiver_count()
    }

    pub(crate) async fn closed(&self) {
        self.events.closed().await;
    }

    /// Publishes a change that did not originate from a call on this service,
    /// like a refresh performed elsewhere.
    pub(crate) fn push(&self, kind: EventKind, session: Option<Session>) {
        _ = self.events.send_replace(Event { kind, session });
    }

    pub(crate) fn issue(&self, identity: &Identity) -> Session {
        let n = self.issued.fetch_add(1, Ordering::SeqCst);
        Session {
            access_token: Secret::new(format!("access-{}-{n}", identity.id).into()),
            refresh_token: Secret::new(format!("refresh-{}-{n}", identity.id).into()),
            expires_at: SystemTime::now() + Duration::from_secs(3600),
            user: identity.clone(),
        }
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(error::Transport::Status {
                status: 503,
                message: "service unavailable".to_owned(),
            }
            .into())
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl IdentityService for Memory {
    async fn password_sign_in(&self, identifier: &str, secret: &SecretString) -> Result<Session> {
        self.check_available()?;
        let identity = {
            let accounts = self.accounts.lock().unwrap();
            match accounts.get(identifier) {
                Some(account) if account.secret == *secret.expose_secret() => {
                    account.identity.clone()
                }
                _ => return Err(Error::Authentication("Invalid login credentials".to_owned())),
            }
        };
        let session = self.issue(&identity);
        self.push(EventKind::SignedIn, Some(session.clone()));
        Ok(session)
    }

    async fn password_sign_up(
        &self,
        identifier: &str,
        secret: &SecretString,
    ) -> Result<Registration> {
        self.check_available()?;
        if self.identity_of(identifier).is_some() {
            return Err(Error::Authentication("User already registered".to_owned()));
        }
        let identity = self.add_account(identifier, secret.expose_secret());
        let session = self
            .sign_up_issues_session
            .load(Ordering::SeqCst)
            .then(|| self.issue(&identity));
        Ok(Registration { identity, session })
    }

    async fn sign_out(&self, _session: &Session) -> Result<()> {
        self.check_available()?;
        if self.fail_sign_out.load(Ordering::SeqCst) {
            return Err(error::Transport::Status {
                status: 500,
                message: "logout failed".to_owned(),
            }
            .into());
        }
        self.push(EventKind::SignedOut, None);
        Ok(())
    }

    async fn request_password_reset(&self, _identifier: &str) -> Result<()> {
        self.check_available()
    }

    async fn refresh_session(&self, session: &Session) -> Result<Session> {
        self.check_available()?;
        let refreshed = self.issue(&session.user);
        self.push(EventKind::TokenRefreshed, Some(refreshed.clone()));
        Ok(refreshed)
    }

    async fn set_session(&self, _session: Option<&Session>) {}

    fn subscribe(&self) -> watch::Receiver<Event> {
        self.events.subscribe()
    }
}
