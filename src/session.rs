// SPDX-FileCopyrightText: 2022-2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::time::SystemTime;

use secrecy::{ExposeSecret as _, Secret};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, TimestampSeconds};
use uuid::Uuid;

/// A bearer or refresh token issued by the identity service.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub(crate) struct Token(String);

impl Token {
    pub(crate) fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for Token {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for Token {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl secrecy::CloneableSecret for Token {}

impl secrecy::DebugSecret for Token {}

impl secrecy::SerializableSecret for Token {}

impl secrecy::Zeroize for Token {
    fn zeroize(&mut self) {
        secrecy::Zeroize::zeroize(&mut self.0);
    }
}

pub(crate) type SecretToken = Secret<Token>;

/// The principal a session was issued for.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct Identity {
    pub(crate) id: Uuid,
    #[serde(default)]
    pub(crate) email: String,
}

#[serde_as]
#[derive(Clone, Debug, Serialize, Deserialize)]
pub(crate) struct Session {
    pub(crate) access_token: SecretToken,
    pub(crate) refresh_token: SecretToken,
    #[serde_as(as = "TimestampSeconds<i64>")]
    pub(crate) expires_at: SystemTime,
    pub(crate) user: Identity,
}

impl Session {
    pub(crate) fn is_expired(&self, now: SystemTime) -> bool {
        now >= self.expires_at
    }

    /// Whether both sessions carry the same credentials, i.e. describe the
    /// same remote session rather than a refreshed or different one.
    pub(crate) fn same_tokens(&self, other: &Self) -> bool {
        self.access_token.expose_secret() == other.access_token.expose_secret()
            && self.refresh_token.expose_secret() == other.refresh_token.expose_secret()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::time::{Duration, UNIX_EPOCH};

    use serde_test::{assert_tokens, Configure, Token as SerdeToken};
    use uuid::uuid;

    use super::*;

    pub(crate) fn session_for(identity: &Identity, token: &str) -> Session {
        Session {
            access_token: Secret::new(format!("access-{token}").into()),
            refresh_token: Secret::new(format!("refresh-{token}").into()),
            expires_at: SystemTime::now() + Duration::from_secs(3600),
            user: identity.clone(),
        }
    }

    fn fixed() -> Session {
        Session {
            access_token: Secret::new("eyJ.access".into()),
            refresh_token: Secret::new("r3fr3sh".into()),
            expires_at: UNIX_EPOCH + Duration::from_secs(1_730_736_605),
            user: Identity {
                id: uuid!("d1f0e6a4-6b0c-4c59-9d0c-5d1e2b7f8a11"),
                email: "keeper@example.com".to_owned(),
            },
        }
    }

    #[test]
    fn expiry_is_inclusive() {
        let session = fixed();
        assert!(!session.is_expired(session.expires_at - Duration::from_secs(1)));
        assert!(session.is_expired(session.expires_at));
        assert!(session.is_expired(session.expires_at + Duration::from_secs(1)));
    }

    #[test]
    fn persisted_format() {
        let session = fixed();
        let round_tripped: Session =
            serde_json::from_value(serde_json::to_value(&session).unwrap()).unwrap();
        assert!(round_tripped.same_tokens(&session));
        assert_eq!(round_tripped.expires_at, session.expires_at);

        assert_tokens(
            &session.user.clone().readable(),
            &[
                SerdeToken::Struct {
                    name: "Identity",
                    len: 2,
                },
                SerdeToken::Str("id"),
                SerdeToken::Str("d1f0e6a4-6b0c-4c59-9d0c-5d1e2b7f8a11"),
                SerdeToken::Str("email"),
                SerdeToken::Str("keeper@example.com"),
                SerdeToken::StructEnd,
            ],
        );

        let value = serde_json::to_value(&session).unwrap();
        assert_eq!(value["access_token"], "eyJ.access");
        assert_eq!(value["refresh_token"], "r3fr3sh");
        assert_eq!(value["expires_at"], 1_730_736_605_i64);
    }

    #[test]
    fn debug_output_hides_tokens() {
        let rendered = format!("{:?}", fixed());
        assert!(!rendered.contains("eyJ.access"));
        assert!(!rendered.contains("r3fr3sh"));
        assert!(rendered.contains("keeper@example.com"));
    }

    #[test]
    fn refreshed_session_is_not_the_same() {
        let identity = fixed().user;
        let first = session_for(&identity, "one");
        let again = Session {
            expires_at: first.expires_at + Duration::from_secs(5),
            ..first.clone()
        };
        let refreshed = session_for(&identity, "two");

        assert!(first.same_tokens(&again));
        assert!(!first.same_tokens(&refreshed));
    }
}
