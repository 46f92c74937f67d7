// SPDX-FileCopyrightText: 2022-2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::collections::HashMap;

use async_trait::async_trait;

use crate::{
    error::{self, Result},
    metadata,
};

use super::{IsPersistent, Storage};

/// Keeps each key in its own keyring item, tagged with the backend URL so
/// that sessions for different deployments do not collide.
pub(crate) struct SecretService {
    keyring: oo7::Keyring,
    url: String,
}

impl SecretService {
    fn attributes<'a>(&'a self, key: &'a str) -> HashMap<&'a str, &'a str> {
        HashMap::from([
            ("tourney.kind", "storage"),
            ("tourney.url", self.url.as_str()),
            ("tourney.key", key),
        ])
    }

    async fn item(&self, key: &str) -> Result<Option<oo7::Item>> {
        Ok(self
            .keyring
            .search_items(self.attributes(key))
            .await
            .map_err(error::Storage::from)?
            .into_iter()
            .next())
    }

    pub(crate) async fn new(url: &url::Url) -> Result<Self> {
        Ok(Self {
            keyring: oo7::Keyring::new().await.map_err(error::Storage::from)?,
            url: url.as_str().to_owned(),
        })
    }
}

impl IsPersistent for SecretService {
    fn is_persistent(&self) -> bool {
        true
    }
}

#[async_trait]
impl Storage for SecretService {
    async fn get(&mut self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(match self.item(key).await? {
            Some(item) => Some(item.secret().await.map_err(error::Storage::from)?.to_vec()),
            None => None,
        })
    }

    async fn set(&mut self, key: &str, value: &[u8]) -> Result<()> {
        self.keyring
            .create_item(
                &metadata::CLIENT_DISPLAY_NAME,
                self.attributes(key),
                value,
                true,
            )
            .await
            .map_err(error::Storage::from)?;
        Ok(())
    }

    async fn remove(&mut self, key: &str) -> Result<()> {
        if let Some(item) = self.item(key).await? {
            item.delete().await.map_err(error::Storage::from)?;
        }
        Ok(())
    }
}
