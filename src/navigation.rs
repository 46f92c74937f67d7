// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::fmt;

use crate::{
    resolver::{Snapshot, State},
    roles::RoleClassification,
};

/// The top-level group of screens shown for a resolver state.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Stack {
    Loading,
    Auth,
    Admin,
    TeamOrPlayer,
    Main,
}

impl Stack {
    pub(crate) const fn select(snapshot: &Snapshot) -> Self {
        match snapshot.state {
            State::Unauthenticated => Self::Auth,
            State::Resolving => Self::Loading,
            State::Authenticated(classification) => match classification {
                RoleClassification::Administrator => Self::Admin,
                RoleClassification::TeamOrPlayer => Self::TeamOrPlayer,
                RoleClassification::Default => Self::Main,
                RoleClassification::Unauthenticated => Self::Auth,
            },
        }
    }
}

impl fmt::Display for Stack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Loading => "Loading",
            Self::Auth => "Sign in",
            Self::Admin => "Administration",
            Self::TeamOrPlayer => "Team and player",
            Self::Main => "Main",
        })
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use crate::session::Identity;

    use super::*;

    fn snapshot(state: State) -> Snapshot {
        Snapshot {
            state,
            identity: (state != State::Unauthenticated).then(|| Identity {
                id: Uuid::new_v4(),
                email: "fan@example.com".to_owned(),
            }),
        }
    }

    #[test]
    fn select() {
        let cases = [
            (State::Unauthenticated, Stack::Auth),
            (State::Resolving, Stack::Loading),
            (
                State::Authenticated(RoleClassification::Administrator),
                Stack::Admin,
            ),
            (
                State::Authenticated(RoleClassification::TeamOrPlayer),
                Stack::TeamOrPlayer,
            ),
            (State::Authenticated(RoleClassification::Default), Stack::Main),
        ];
        for (state, stack) in cases {
            assert_eq!(Stack::select(&snapshot(state)), stack, "{state:?}");
        }
    }
}
