// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use clap::Parser;

use crate::error::Result;

use super::Context;

/// Send a password reset link to an email address.
#[derive(Debug, Parser)]
pub(crate) struct Command {
    /// The email address of the account.
    #[clap()]
    email: String,
}

#[async_trait]
impl super::Command for Command {
    async fn execute(self, context: &Context) -> Result<()> {
        context
            .resolver
            .request_password_reset(&self.email)
            .await?;
        println!(
            "If an account exists for {}, a reset link is on its way.",
            self.email
        );
        Ok(())
    }
}
