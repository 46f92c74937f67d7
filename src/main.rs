// SPDX-FileCopyrightText: 2022-2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]
#![deny(elided_lifetimes_in_paths)]
#![warn(
    rust_2018_idioms,
    future_incompatible,
    unused,
    unused_lifetimes,
    unused_qualifications,
    unused_results,
    anonymous_parameters,
    deprecated_in_future,
    elided_lifetimes_in_paths,
    explicit_outlives_requirements,
    keyword_idents,
    macro_use_extern_crate,
    missing_doc_code_examples,
    private_doc_tests,
    trivial_casts,
    trivial_numeric_casts,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::cargo,
    clippy::unseparated_literal_suffix,
    clippy::decimal_literal_representation,
    clippy::single_char_lifetime_names,
    clippy::fallible_impl_from,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::wildcard_enum_match_arm,
    clippy::deref_by_slicing,
    clippy::default_numeric_fallback,
    clippy::shadow_reuse,
    clippy::clone_on_ref_ptr,
    clippy::todo,
    clippy::string_add,
    clippy::use_debug,
    clippy::future_not_send
)]
#![cfg_attr(not(test), warn(clippy::panic_in_result_fn))]

mod command;
mod error;
mod identity;
mod metadata;
mod navigation;
mod password;
mod resolver;
mod roles;
mod session;
mod storage;
mod supabase;

use std::{convert::Infallible, path::PathBuf, process, sync::Arc};

use async_trait::async_trait;
use clap::{Parser, Subcommand};
use error::Result;
use log::{debug, error, warn};
use secrecy::SecretString;
use url::Url;

use crate::navigation::Stack;

#[derive(Debug, Subcommand)]
enum Command {
    SignIn(command::sign_in::Command),
    SignUp(command::sign_up::Command),
    SignOut(command::sign_out::Command),
    ResetPassword(command::reset_password::Command),
    Refresh(command::refresh::Command),
    Status(command::status::Command),
}

#[async_trait]
impl command::Command for Command {
    async fn execute(self, context: &command::Context) -> Result<()> {
        match self {
            Self::SignIn(cmd) => cmd.execute(context).await,
            Self::SignUp(cmd) => cmd.execute(context).await,
            Self::SignOut(cmd) => cmd.execute(context).await,
            Self::ResetPassword(cmd) => cmd.execute(context).await,
            Self::Refresh(cmd) => cmd.execute(context).await,
            Self::Status(cmd) => cmd.execute(context).await,
        }
    }
}

fn parse_secret(value: &str) -> Result<SecretString, Infallible> {
    Ok(SecretString::new(value.to_owned()))
}

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// The base URL of the tournament's Supabase project.
    #[arg(long, env = "TOURNEY_URL", value_parser = Url::parse)]
    url: Url,

    /// The project's public API key.
    #[arg(long, env = "TOURNEY_API_KEY", hide_env_values = true, value_parser = parse_secret)]
    api_key: SecretString,

    /// Keep the session in memory only, so that it ends with this process.
    #[arg(long)]
    no_persist_session: bool,

    /// The path to the Pinentry program to use when asking for an account's
    /// password.
    #[arg(long, value_hint = clap::ValueHint::ExecutablePath)]
    pinentry_program: Option<PathBuf>,

    #[clap(subcommand)]
    command: Command,
}

async fn get_session_storage(args: &Args) -> Box<dyn storage::Storage> {
    if !args.no_persist_session {
        #[cfg(feature = "secret-service")]
        match storage::SecretService::new(&args.url).await {
            Ok(secret_service_storage) => return Box::new(secret_service_storage),
            Err(e) => {
                warn!("We need to fall back to unencrypted file storage because we can't connect to the secret service: {}", e);
            }
        }

        #[cfg(feature = "keychain")]
        match storage::Keychain::new(&args.url) {
            Ok(keychain_storage) => return Box::new(keychain_storage),
            Err(e) => {
                warn!("We need to fall back to unencrypted file storage because we can't connect to Keychain: {}", e);
            }
        }

        match storage::File::new("session") {
            Ok(file_storage) => return Box::new(file_storage),
            Err(e) => {
                warn!("The session will only be kept in memory: {}", e);
            }
        }
    }

    Box::new(storage::Memory::new())
}

async fn run(args: Args) -> Result<()> {
    let prompt: Vec<Box<dyn password::Prompt>> = vec![
        Box::new(args.pinentry_program.clone().map_or_else(
            password::PinentryPrompt::new,
            password::PinentryPrompt::new_with_executable,
        )),
        Box::new(password::RpasswordPrompt),
    ];

    let backend = Arc::new(supabase::Backend::new(&args.url, args.api_key.clone()));
    let resolver = resolver::Resolver::new(
        Arc::clone(&backend),
        backend,
        get_session_storage(&args).await,
    );

    let mut snapshots = resolver.subscribe();
    let navigation = tokio::spawn(async move {
        while snapshots.changed().await.is_ok() {
            let stack = Stack::select(&snapshots.borrow_and_update());
            debug!("Navigating to the {} stack", stack);
        }
    });

    let classification = resolver.restore_session().await;
    debug!("Starting as {}", classification);

    let context = command::Context {
        resolver,
        prompt: Box::new(prompt),
    };
    let result = command::Command::execute(args.command, &context).await;
    navigation.abort();

    result
}

#[tokio::main]
async fn main() {
    let logger_env = env_logger::Env::new()
        .filter_or("TOURNEY_LOG", "warn")
        .write_style("TOURNEY_LOG_STYLE");
    env_logger::Builder::from_env(logger_env).init();

    if let Err(e) = run(Args::parse()).await {
        error!("We encountered an error: {}", e);
        process::exit(1);
    };
}
