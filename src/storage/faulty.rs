// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::{
    io,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use async_trait::async_trait;

use crate::error::Result;

use super::{IsPersistent, Memory, Storage};

#[derive(Default)]
struct Switches {
    get: AtomicBool,
    set: AtomicBool,
    remove: AtomicBool,
}

/// In-memory storage whose operations can be made to fail. Clones share both
/// the data and the switches.
#[derive(Clone, Default)]
pub(crate) struct Faulty {
    inner: Memory,
    switches: Arc<Switches>,
}

impl Faulty {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn set_fail_get(&self, fail: bool) {
        self.switches.get.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn set_fail_set(&self, fail: bool) {
        self.switches.set.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn set_fail_remove(&self, fail: bool) {
        self.switches.remove.store(fail, Ordering::SeqCst);
    }

    fn check(switch: &AtomicBool, op: &str) -> Result<()> {
        if switch.load(Ordering::SeqCst) {
            let e = io::Error::new(io::ErrorKind::PermissionDenied, format!("{op} denied"));
            return Err(e.into());
        }
        Ok(())
    }
}

impl IsPersistent for Faulty {
    fn is_persistent(&self) -> bool {
        true
    }
}

#[async_trait]
impl Storage for Faulty {
    async fn get(&mut self, key: &str) -> Result<Option<Vec<u8>>> {
        Self::check(&self.switches.get, "read")?;
        self.inner.get(key).await
    }

    async fn set(&mut self, key: &str, value: &[u8]) -> Result<()> {
        Self::check(&self.switches.set, "write")?;
        self.inner.set(key, value).await
    }

    async fn remove(&mut self, key: &str) -> Result<()> {
        Self::check(&self.switches.remove, "remove")?;
        self.inner.remove(key).await
    }
}
