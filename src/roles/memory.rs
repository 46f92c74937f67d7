// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Mutex,
    },
};

use async_trait::async_trait;
use tokio::sync::watch;
use uuid::Uuid;

use crate::{
    error::{self, Result},
    session::Identity,
};

use super::{AccountKind, RoleKind, RoleRecord, RoleStore};

/// An in-process role table. Lookups for an identity can be held open with
/// [`Memory::hold`] until the returned gate is opened, to arrange the order in
/// which concurrent lookups finish.
pub(crate) struct Memory {
    records: Mutex<HashMap<Uuid, RoleRecord>>,
    emails: Mutex<HashMap<Uuid, String>>,
    gates: Mutex<HashMap<Uuid, watch::Receiver<bool>>>,
    fail_lookups: AtomicBool,
    fail_inserts: AtomicBool,
    lookups: AtomicUsize,
}

impl Memory {
    pub(crate) fn new() -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            emails: Mutex::new(HashMap::new()),
            gates: Mutex::new(HashMap::new()),
            fail_lookups: AtomicBool::new(false),
            fail_inserts: AtomicBool::new(false),
            lookups: AtomicUsize::new(0),
        }
    }

    pub(crate) fn insert(&self, user_id: Uuid, role: Option<RoleKind>) {
        _ = self
            .records
            .lock()
            .unwrap()
            .insert(user_id, RoleRecord { user_id, role });
    }

    /// The email stored alongside the record created for `user_id`.
    pub(crate) fn email_of(&self, user_id: Uuid) -> Option<String> {
        self.emails.lock().unwrap().get(&user_id).cloned()
    }

    pub(crate) fn set_fail_lookups(&self, fail: bool) {
        self.fail_lookups.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn set_fail_inserts(&self, fail: bool) {
        self.fail_inserts.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    /// Lookups for `user_id` stay pending until `true` is sent on the gate.
    pub(crate) fn hold(&self, user_id: Uuid) -> watch::Sender<bool> {
        let (tx, rx) = watch::channel(false);
        _ = self.gates.lock().unwrap().insert(user_id, rx);
        tx
    }

    fn failure(message: &str) -> error::Error {
        error::Transport::Status {
            status: 503,
            message: message.to_owned(),
        }
        .into()
    }
}

#[async_trait]
impl RoleStore for Memory {
    async fn get_role_record(&self, identity_id: Uuid) -> Result<Option<RoleRecord>> {
        _ = self.lookups.fetch_add(1, Ordering::SeqCst);

        let gate = self.gates.lock().unwrap().get(&identity_id).cloned();
        if let Some(mut gate) = gate {
            while !*gate.borrow() {
                if gate.changed().await.is_err() {
                    break;
                }
            }
        }

        if self.fail_lookups.load(Ordering::SeqCst) {
            return Err(Self::failure("role lookup failed"));
        }
        Ok(self.records.lock().unwrap().get(&identity_id).cloned())
    }

    async fn create_role_record(
        &self,
        identity: &Identity,
        kind: AccountKind,
    ) -> Result<RoleRecord> {
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(Self::failure("role insert failed"));
        }
        let record = RoleRecord {
            user_id: identity.id,
            role: Some(kind.into()),
        };
        _ = self
            .records
            .lock()
            .unwrap()
            .insert(identity.id, record.clone());
        _ = self
            .emails
            .lock()
            .unwrap()
            .insert(identity.id, identity.email.clone());
        Ok(record)
    }
}
