// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use clap::Parser;
use tabled::{settings::Style, Table, Tabled};

use crate::{error::Result, navigation::Stack, roles::RoleClassification};

use super::{Context, Resolver};

#[derive(Tabled)]
struct Row {
    #[tabled(rename = "Identity")]
    id: String,
    #[tabled(rename = "Email")]
    email: String,
    #[tabled(rename = "Role")]
    role: RoleClassification,
    #[tabled(rename = "Stack")]
    stack: Stack,
}

pub(crate) fn print(resolver: &Resolver) {
    let snapshot = resolver.snapshot();
    let row = Row {
        id: snapshot
            .identity
            .as_ref()
            .map_or_else(|| "-".to_owned(), |identity| identity.id.to_string()),
        email: snapshot
            .identity
            .as_ref()
            .map_or_else(|| "-".to_owned(), |identity| identity.email.clone()),
        role: snapshot.classification(),
        stack: Stack::select(&snapshot),
    };
    println!("{}", Table::new([row]).with(Style::rounded()));
}

/// Show the signed-in account, its role and the screens it gets.
#[derive(Debug, Parser)]
pub(crate) struct Command {}

#[async_trait]
impl super::Command for Command {
    async fn execute(self, context: &Context) -> Result<()> {
        print(&context.resolver);
        Ok(())
    }
}
