// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use clap::Parser;
use log::error;

use crate::{
    error::{Error, Result},
    roles::AccountKind,
};

use super::Context;

/// Register a new player or team account.
#[derive(Debug, Parser)]
pub(crate) struct Command {
    /// What the account represents in the tournament.
    #[arg(long, short, value_enum)]
    kind: AccountKind,

    /// The email address to register.
    #[clap()]
    email: String,
}

#[async_trait]
impl super::Command for Command {
    async fn execute(self, context: &Context) -> Result<()> {
        let secret = super::password(&*context.prompt, &self.email, true).await?;
        match context
            .resolver
            .sign_up(&self.email, &secret, self.kind)
            .await
        {
            Ok(()) => {}
            Err(e @ Error::PartialRegistration { .. }) => {
                error!(
                    "The account {} exists but has no role; an administrator has to assign one",
                    self.email
                );
                return Err(e);
            }
            Err(e) => return Err(e),
        }

        if context.resolver.is_authenticated() {
            super::status::print(&context.resolver);
        } else {
            println!(
                "Follow the link sent to {} to confirm the account, then sign in.",
                self.email
            );
        }
        Ok(())
    }
}
