// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

//! Identity service and role table hosted on Supabase.

mod model;

use std::time::SystemTime;

use async_trait::async_trait;
use log::{debug, info};
use reqwest::{header, Method, RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret as _, SecretString};
use serde::de::DeserializeOwned;
use tokio::sync::{watch, RwLock};
use uuid::Uuid;

use crate::{
    error::{self, Error, Result},
    identity::{Event, EventKind, IdentityService, Registration},
    roles::{AccountKind, RoleRecord, RoleStore},
    session::{Identity, Session},
};

use self::model::{
    ErrorBody, NewRoleRecord, PasswordGrant, Recover, RefreshGrant, SignUpResponse, TokenResponse,
};

const ROLE_TABLE: &str = "/rest/v1/users";

/// Auth endpoints report rejected credentials with these statuses; anything
/// else is a service or network problem.
fn auth_error(status: StatusCode, message: String) -> Error {
    match status {
        StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED | StatusCode::UNPROCESSABLE_ENTITY => {
            Error::Authentication(message)
        }
        _ => table_error(status, message),
    }
}

fn table_error(status: StatusCode, message: String) -> Error {
    error::Transport::Status {
        status: status.as_u16(),
        message,
    }
    .into()
}

async fn failure(response: Response) -> (StatusCode, String) {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&body)
        .ok()
        .and_then(ErrorBody::into_message)
        .unwrap_or_else(|| {
            if body.is_empty() {
                status.canonical_reason().unwrap_or("unknown error").to_owned()
            } else {
                body
            }
        });
    (status, message)
}

pub(crate) struct Backend {
    client: reqwest::Client,
    base: String,
    api_key: SecretString,
    session: RwLock<Option<Session>>,
    events: watch::Sender<Event>,
}

impl Backend {
    pub(crate) fn new(url: &url::Url, api_key: SecretString) -> Self {
        let (events, _) = watch::channel(Event::initial());
        Self {
            client: reqwest::Client::new(),
            base: url.as_str().trim_end_matches('/').to_owned(),
            api_key,
            session: RwLock::new(None),
            events,
        }
    }

    fn request(&self, method: Method, path: &str, bearer: &str) -> RequestBuilder {
        debug!("{} {}", method, path);
        self.client
            .request(method, format!("{}{path}", self.base))
            .header("apikey", self.api_key.expose_secret())
            .bearer_auth(bearer)
    }

    /// The current session's access token, or the API key when no session is
    /// set.
    async fn bearer(&self) -> String {
        match self.session.read().await.as_ref() {
            Some(session) => session.access_token.expose_secret().as_str().to_owned(),
            None => self.api_key.expose_secret().clone(),
        }
    }

    async fn auth<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = request.send().await?;
        if !response.status().is_success() {
            let (status, message) = failure(response).await;
            return Err(auth_error(status, message));
        }
        Ok(response.json().await?)
    }

    async fn table<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = request.send().await?;
        if !response.status().is_success() {
            let (status, message) = failure(response).await;
            return Err(table_error(status, message));
        }
        Ok(response.json().await?)
    }

    async fn commit(&self, kind: EventKind, session: Option<Session>) {
        *self.session.write().await = session.clone();
        _ = self.events.send_replace(Event { kind, session });
    }
}

#[async_trait]
impl IdentityService for Backend {
    async fn password_sign_in(&self, identifier: &str, secret: &SecretString) -> Result<Session> {
        let request = self
            .request(
                Method::POST,
                "/auth/v1/token?grant_type=password",
                self.api_key.expose_secret(),
            )
            .json(&PasswordGrant {
                email: identifier,
                password: secret.expose_secret(),
            });
        let response: TokenResponse = self.auth(request).await?;
        let session = response.into_session(SystemTime::now());
        self.commit(EventKind::SignedIn, Some(session.clone())).await;
        Ok(session)
    }

    async fn password_sign_up(
        &self,
        identifier: &str,
        secret: &SecretString,
    ) -> Result<Registration> {
        let request = self
            .request(Method::POST, "/auth/v1/signup", self.api_key.expose_secret())
            .json(&PasswordGrant {
                email: identifier,
                password: secret.expose_secret(),
            });
        let mut registration = match self.auth(request).await? {
            SignUpResponse::Session(response) => {
                let session = response.into_session(SystemTime::now());
                // Authorizes the role record insert that follows.
                *self.session.write().await = Some(session.clone());
                Registration {
                    identity: session.user.clone(),
                    session: Some(session),
                }
            }
            SignUpResponse::User(user) => {
                info!("Confirmation pending for {}", identifier);
                Registration {
                    identity: user.into(),
                    session: None,
                }
            }
        };
        if registration.identity.email.is_empty() {
            identifier.clone_into(&mut registration.identity.email);
        }
        Ok(registration)
    }

    async fn sign_out(&self, session: &Session) -> Result<()> {
        let response = self
            .request(
                Method::POST,
                "/auth/v1/logout",
                session.access_token.expose_secret().as_str(),
            )
            .send()
            .await?;
        match response.status() {
            status if status.is_success() => {}
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND => {
                debug!("Session was already invalid on the server");
            }
            _ => {
                let (status, message) = failure(response).await;
                return Err(auth_error(status, message));
            }
        }
        self.commit(EventKind::SignedOut, None).await;
        Ok(())
    }

    async fn request_password_reset(&self, identifier: &str) -> Result<()> {
        let response = self
            .request(Method::POST, "/auth/v1/recover", self.api_key.expose_secret())
            .json(&Recover { email: identifier })
            .send()
            .await?;
        if !response.status().is_success() {
            let (status, message) = failure(response).await;
            return Err(auth_error(status, message));
        }
        Ok(())
    }

    async fn refresh_session(&self, session: &Session) -> Result<Session> {
        let request = self
            .request(
                Method::POST,
                "/auth/v1/token?grant_type=refresh_token",
                self.api_key.expose_secret(),
            )
            .json(&RefreshGrant {
                refresh_token: session.refresh_token.expose_secret().as_str(),
            });
        let response: TokenResponse = self.auth(request).await?;
        let refreshed = response.into_session(SystemTime::now());
        self.commit(EventKind::TokenRefreshed, Some(refreshed.clone()))
            .await;
        Ok(refreshed)
    }

    async fn set_session(&self, session: Option<&Session>) {
        *self.session.write().await = session.cloned();
    }

    fn subscribe(&self) -> watch::Receiver<Event> {
        self.events.subscribe()
    }
}

#[async_trait]
impl RoleStore for Backend {
    async fn get_role_record(&self, identity_id: Uuid) -> Result<Option<RoleRecord>> {
        let filter = format!("eq.{identity_id}");
        let bearer = self.bearer().await;
        let request = self
            .request(Method::GET, ROLE_TABLE, &bearer)
            .query(&[("select", "user_id,role"), ("user_id", filter.as_str())]);
        let records: Vec<RoleRecord> = self.table(request).await?;
        Ok(records.into_iter().next())
    }

    async fn create_role_record(
        &self,
        identity: &Identity,
        kind: AccountKind,
    ) -> Result<RoleRecord> {
        let bearer = self.bearer().await;
        let request = self
            .request(Method::POST, ROLE_TABLE, &bearer)
            .header("Prefer", "return=representation")
            .header(header::ACCEPT, "application/json")
            .json(&NewRoleRecord {
                user_id: identity.id,
                email: &identity.email,
                role: kind,
            });
        let records: Vec<RoleRecord> = self.table(request).await?;
        Ok(records.into_iter().next().unwrap_or(RoleRecord {
            user_id: identity.id,
            role: Some(kind.into()),
        }))
    }
}
