// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

//! Tracks the signed-in principal and the role it resolves to.
//!
//! Every change of the current session (set or cleared) bumps a generation
//! counter. Role lookups remember the generation they were issued in and only
//! publish their result if it is still current, so a slow lookup for a
//! principal that has since been replaced or signed out is dropped.

use std::{sync::Arc, time::SystemTime};

use futures_util::lock::{Mutex, MutexGuard};
use log::{debug, error, info, warn};
use secrecy::{ExposeSecret as _, SecretString, SecretVec};
use tokio::{sync::watch, task::JoinHandle};

use crate::{
    error::{self, Error, Result},
    identity::{Event, EventKind, IdentityService},
    metadata,
    roles::{AccountKind, RoleClassification, RoleStore},
    session::{Identity, Session},
    storage::Storage,
};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum State {
    Unauthenticated,
    /// A session is current but its role lookup has not finished.
    Resolving,
    Authenticated(RoleClassification),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Snapshot {
    pub(crate) state: State,
    pub(crate) identity: Option<Identity>,
}

impl Snapshot {
    const fn unauthenticated() -> Self {
        Self {
            state: State::Unauthenticated,
            identity: None,
        }
    }

    pub(crate) const fn is_authenticated(&self) -> bool {
        !matches!(self.state, State::Unauthenticated)
    }

    /// While a lookup is pending the principal gets the least-privileged
    /// classification.
    pub(crate) const fn classification(&self) -> RoleClassification {
        match self.state {
            State::Unauthenticated => RoleClassification::Unauthenticated,
            State::Resolving => RoleClassification::Default,
            State::Authenticated(classification) => classification,
        }
    }
}

struct Current {
    generation: u64,
    session: Option<Session>,
}

struct Shared<I, R, S> {
    identity: I,
    roles: R,
    storage: Mutex<S>,
    current: Mutex<Current>,
    snapshot: watch::Sender<Snapshot>,
}

impl<I: IdentityService, R: RoleStore, S: Storage> Shared<I, R, S> {
    fn publish(&self, state: State, identity: Option<Identity>) {
        _ = self.snapshot.send_replace(Snapshot { state, identity });
    }

    async fn persist(&self, session: &Session) {
        let result = match serde_json::to_vec(session).map(SecretVec::new) {
            Ok(data) => {
                self.storage
                    .lock()
                    .await
                    .set(metadata::SESSION_STORAGE_KEY, data.expose_secret())
                    .await
            }
            Err(e) => Err(e.into()),
        };
        if let Err(e) = result {
            warn!(
                "Failed to persist the session; it will not be restored next time: {}",
                e
            );
        }
    }

    async fn forget(&self) {
        let result = self
            .storage
            .lock()
            .await
            .remove(metadata::SESSION_STORAGE_KEY)
            .await;
        if let Err(e) = result {
            warn!("Failed to remove the persisted session: {}", e);
        }
    }

    async fn load(&self) -> Option<Session> {
        let data = match self
            .storage
            .lock()
            .await
            .get(metadata::SESSION_STORAGE_KEY)
            .await
        {
            Ok(data) => SecretVec::new(data?),
            Err(e) => {
                warn!(
                    "Could not read the persisted session, continuing without it: {}",
                    e
                );
                return None;
            }
        };

        match serde_json::from_slice(data.expose_secret()).map_err(error::Storage::Corrupt) {
            Ok(session) => Some(session),
            Err(e) => {
                warn!("Discarding the persisted session: {}", e);
                self.forget().await;
                None
            }
        }
    }

    /// Makes `session` current. Returns the generation its role lookup must
    /// be issued in.
    async fn replace(&self, current: &mut Current, session: Session) -> u64 {
        current.generation += 1;
        self.publish(State::Resolving, Some(session.user.clone()));
        self.persist(&session).await;
        current.session = Some(session);
        current.generation
    }

    async fn clear(&self, current: &mut Current) {
        self.forget().await;
        current.generation += 1;
        current.session = None;
        self.publish(State::Unauthenticated, None);
    }

    async fn resolve(&self, generation: u64, identity: &Identity) {
        let classification = match self.roles.get_role_record(identity.id).await {
            Ok(Some(record)) => record.classification(),
            Ok(None) => {
                info!(
                    "No role record exists for {}; treating the account as a follower",
                    identity.email
                );
                RoleClassification::Default
            }
            // Fail safe: an unknown role gets the least-privileged stack
            // instead of blocking the user.
            Err(e) => {
                warn!(
                    "Role lookup for {} failed; treating the account as a follower: {}",
                    identity.email, e
                );
                RoleClassification::Default
            }
        };

        let current = self.current.lock().await;
        if current.generation != generation {
            debug!(
                "Discarding role lookup for {} from superseded generation {} (now {})",
                identity.email, generation, current.generation
            );
            return;
        }
        debug!("Resolved {} as {}", identity.email, classification);
        self.publish(State::Authenticated(classification), Some(identity.clone()));
    }

    /// Commits `session` before releasing `current`, then resolves its role.
    async fn adopt(&self, mut current: MutexGuard<'_, Current>, session: Session) {
        let identity = session.user.clone();
        let generation = self.replace(&mut current, session).await;
        drop(current);
        self.resolve(generation, &identity).await;
    }

    async fn handle_event(&self, events: &mut watch::Receiver<Event>) {
        let mut current = self.current.lock().await;
        // Read under the lock so that the latest remote state is compared
        // against the latest local state.
        let event = events.borrow_and_update().clone();
        debug!("Received session event {:?}", event.kind);

        match event.session {
            Some(session) => {
                if current
                    .session
                    .as_ref()
                    .is_some_and(|known| known.same_tokens(&session))
                {
                    return;
                }
                info!("Session for {} changed remotely", session.user.email);
                self.adopt(current, session).await;
            }
            None if event.kind == EventKind::SignedOut && current.session.is_some() => {
                info!("Session ended remotely");
                self.clear(&mut current).await;
            }
            None => {}
        }
    }
}

async fn listen<I: IdentityService, R: RoleStore, S: Storage>(
    shared: Arc<Shared<I, R, S>>,
    mut events: watch::Receiver<Event>,
) {
    while events.changed().await.is_ok() {
        shared.handle_event(&mut events).await;
    }
    debug!("Identity service stopped publishing session events");
}

fn check_credentials(identifier: &str, secret: &SecretString) -> Result<()> {
    if identifier.trim().is_empty() || secret.expose_secret().is_empty() {
        return Err(Error::Authentication(
            "an email address and a password are required".to_owned(),
        ));
    }
    Ok(())
}

/// Owns the current session. Consumers read [`Snapshot`]s; nothing else gets
/// to see the session itself.
pub(crate) struct Resolver<I, R, S> {
    shared: Arc<Shared<I, R, S>>,
    listener: JoinHandle<()>,
}

impl<I, R, S> Resolver<I, R, S>
where
    I: IdentityService + 'static,
    R: RoleStore + 'static,
    S: Storage + 'static,
{
    /// Subscribes to the identity service's session events. Must be called
    /// from within a Tokio runtime.
    pub(crate) fn new(identity: I, roles: R, storage: S) -> Self {
        if !storage.is_persistent() {
            info!("Session storage is not persistent; the session will end with this process");
        }

        let events = identity.subscribe();
        let (snapshot, _) = watch::channel(Snapshot::unauthenticated());
        let shared = Arc::new(Shared {
            identity,
            roles,
            storage: Mutex::new(storage),
            current: Mutex::new(Current {
                generation: 0,
                session: None,
            }),
            snapshot,
        });
        let listener = tokio::spawn(listen(Arc::clone(&shared), events));

        Self { shared, listener }
    }

    pub(crate) async fn sign_in(&self, identifier: &str, secret: &SecretString) -> Result<()> {
        check_credentials(identifier, secret)?;
        // Held across the call so the listener sees the new session as current
        // by the time it handles the matching event.
        let current = self.shared.current.lock().await;
        let session = self
            .shared
            .identity
            .password_sign_in(identifier, secret)
            .await?;
        info!("Signed in as {}", session.user.email);
        self.shared.adopt(current, session).await;
        Ok(())
    }

    /// Registers a principal together with its role record. The principal is
    /// not removed again if the role record cannot be created.
    pub(crate) async fn sign_up(
        &self,
        identifier: &str,
        secret: &SecretString,
        kind: AccountKind,
    ) -> Result<()> {
        check_credentials(identifier, secret)?;
        let current = self.shared.current.lock().await;
        let registration = self
            .shared
            .identity
            .password_sign_up(identifier, secret)
            .await?;

        if let Err(e) = self
            .shared
            .roles
            .create_role_record(&registration.identity, kind)
            .await
        {
            error!(
                "Registered {} but could not create its role record: {}",
                registration.identity.email, e
            );
            self.shared
                .identity
                .set_session(current.session.as_ref())
                .await;
            return Err(Error::PartialRegistration {
                identity: registration.identity.id,
                source: Box::new(e),
            });
        }

        match registration.session {
            Some(session) => {
                info!("Registered and signed in as {}", session.user.email);
                self.shared.adopt(current, session).await;
            }
            None => info!(
                "Registered {}; the account must be confirmed before signing in",
                registration.identity.email
            ),
        }
        Ok(())
    }

    /// Local state is only cleared once the identity service confirms the
    /// session is gone.
    pub(crate) async fn sign_out(&self) -> Result<()> {
        let mut current = self.shared.current.lock().await;
        if let Some(session) = current.session.as_ref() {
            self.shared
                .identity
                .sign_out(session)
                .await
                .map_err(|e| Error::SignOut(Box::new(e)))?;
        }
        self.shared.clear(&mut current).await;
        info!("Signed out");
        Ok(())
    }

    /// Never fails: a session that cannot be read back is treated as absent.
    pub(crate) async fn restore_session(&self) -> RoleClassification {
        let current = self.shared.current.lock().await;
        if current.session.is_some() {
            drop(current);
            return self.classification();
        }

        match self.shared.load().await {
            Some(session) if !session.is_expired(SystemTime::now()) => {
                info!("Restored session for {}", session.user.email);
                self.shared.identity.set_session(Some(&session)).await;
                self.shared.adopt(current, session).await;
            }
            Some(session) => {
                info!("The persisted session for {} has expired", session.user.email);
                self.shared.forget().await;
            }
            None => debug!("No persisted session"),
        }

        self.classification()
    }

    pub(crate) async fn request_password_reset(&self, identifier: &str) -> Result<()> {
        self.shared
            .identity
            .request_password_reset(identifier)
            .await
    }

    pub(crate) async fn refresh_session(&self) -> Result<()> {
        let current = self.shared.current.lock().await;
        let session = current
            .session
            .clone()
            .ok_or_else(|| Error::Authentication("there is no session to refresh".to_owned()))?;
        let refreshed = self.shared.identity.refresh_session(&session).await?;
        info!("Refreshed session for {}", refreshed.user.email);
        self.shared.adopt(current, refreshed).await;
        Ok(())
    }

    pub(crate) fn snapshot(&self) -> Snapshot {
        self.shared.snapshot.borrow().clone()
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.shared.snapshot.subscribe()
    }

    pub(crate) fn classification(&self) -> RoleClassification {
        self.shared.snapshot.borrow().classification()
    }

    pub(crate) fn is_authenticated(&self) -> bool {
        self.shared.snapshot.borrow().is_authenticated()
    }

    pub(crate) fn identity(&self) -> Option<Identity> {
        self.shared.snapshot.borrow().identity.clone()
    }
}

impl<I, R, S> Drop for Resolver<I, R, S> {
    fn drop(&mut self) {
        self.listener.abort();
    }
}
