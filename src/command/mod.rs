// SPDX-FileCopyrightText: 2022-2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use async_trait::async_trait;
use log::error;
use secrecy::{ExposeSecret as _, SecretString};

use crate::{
    error::{self, Result},
    password::{self, Prompt},
    resolver, storage, supabase,
};

pub(crate) mod refresh;
pub(crate) mod reset_password;
pub(crate) mod sign_in;
pub(crate) mod sign_out;
pub(crate) mod sign_up;
pub(crate) mod status;

const PASSWORD_ATTEMPTS: usize = 3;

pub(crate) type Resolver = resolver::Resolver<
    Arc<supabase::Backend>,
    Arc<supabase::Backend>,
    Box<dyn storage::Storage>,
>;

pub(crate) struct Context {
    pub(crate) resolver: Resolver,
    pub(crate) prompt: Box<dyn Prompt>,
}

#[async_trait]
pub(crate) trait Command {
    async fn execute(self, context: &Context) -> Result<()>;
}

/// Asks for the password of `account` until a non-empty one is entered.
pub(crate) async fn password(
    prompt: &dyn Prompt,
    account: &str,
    confirm: bool,
) -> Result<SecretString> {
    let mut request = password::RequestBuilder::new(account).with_confirmation(confirm);
    for _ in 0..PASSWORD_ATTEMPTS {
        match prompt.prompt(request.into_request()).await? {
            Some(secret) if !secret.expose_secret().is_empty() => return Ok(secret),
            Some(_) => {
                request = password::RequestBuilder::new(account)
                    .with_confirmation(confirm)
                    .with_error("The password must not be empty.");
            }
            None => {
                error!("There is no way to ask for the password of {}", account);
                return Err(error::Password::NoPrompt.into());
            }
        }
    }
    Err(error::Error::Cancelled)
}
