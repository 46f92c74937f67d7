// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use clap::Parser;

use crate::error::Result;

use super::Context;

/// Sign in with an email address and password.
#[derive(Debug, Parser)]
pub(crate) struct Command {
    /// The email address of the account.
    #[clap()]
    email: String,
}

#[async_trait]
impl super::Command for Command {
    async fn execute(self, context: &Context) -> Result<()> {
        let secret = super::password(&*context.prompt, &self.email, false).await?;
        context.resolver.sign_in(&self.email, &secret).await?;
        super::status::print(&context.resolver);
        Ok(())
    }
}
