// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

#[cfg(test)]
pub(crate) mod memory;

use std::{fmt, sync::Arc};

use async_trait::async_trait;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{error::Result, session::Identity};

/// The role column of a user's record. Anything the backend stores that we do
/// not recognize is treated as a follower.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum RoleKind {
    #[serde(alias = "administrator")]
    Admin,
    Player,
    Team,
    #[serde(other)]
    Follower,
}

/// The kinds of account a user can register for themselves.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub(crate) enum AccountKind {
    Player,
    Team,
}

impl From<AccountKind> for RoleKind {
    fn from(value: AccountKind) -> Self {
        match value {
            AccountKind::Player => Self::Player,
            AccountKind::Team => Self::Team,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum RoleClassification {
    Unauthenticated,
    Administrator,
    TeamOrPlayer,
    Default,
}

impl fmt::Display for RoleClassification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match *self {
            Self::Unauthenticated => "Unauthenticated",
            Self::Administrator => "Administrator",
            Self::TeamOrPlayer => "Team or player",
            Self::Default => "Follower",
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct RoleRecord {
    pub(crate) user_id: Uuid,
    #[serde(default)]
    pub(crate) role: Option<RoleKind>,
}

impl RoleRecord {
    pub(crate) fn classification(&self) -> RoleClassification {
        match self.role {
            Some(RoleKind::Admin) => RoleClassification::Administrator,
            Some(RoleKind::Player | RoleKind::Team) => RoleClassification::TeamOrPlayer,
            Some(RoleKind::Follower) | None => RoleClassification::Default,
        }
    }
}

#[async_trait]
pub(crate) trait RoleStore: Send + Sync {
    /// Returns `None` when the identity has no record.
    async fn get_role_record(&self, identity_id: Uuid) -> Result<Option<RoleRecord>>;

    /// Creates the record for a freshly registered principal.
    async fn create_role_record(&self, identity: &Identity, kind: AccountKind)
        -> Result<RoleRecord>;
}

#[async_trait]
impl<T: RoleStore + ?Sized> RoleStore for Arc<T> {
    async fn get_role_record(&self, identity_id: Uuid) -> Result<Option<RoleRecord>> {
        (**self).get_role_record(identity_id).await
    }

    async fn create_role_record(
        &self,
        identity: &Identity,
        kind: AccountKind,
    ) -> Result<RoleRecord> {
        (**self).create_role_record(identity, kind).await
    }
}
