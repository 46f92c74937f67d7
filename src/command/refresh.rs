// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use clap::Parser;
use log::debug;

use crate::error::Result;

use super::Context;

/// Exchange the stored session for fresh tokens and resolve its role again.
#[derive(Debug, Parser)]
pub(crate) struct Command {}

#[async_trait]
impl super::Command for Command {
    async fn execute(self, context: &Context) -> Result<()> {
        context.resolver.refresh_session().await?;
        if let Some(identity) = context.resolver.identity() {
            debug!("Refreshed session for {}", identity.email);
        }
        super::status::print(&context.resolver);
        Ok(())
    }
}
