use crate::{
    credential::{Password, PasswordCredential},
    model::Id,
};
use serde::{
    Deserialize, Deserializer, Serialize,
    de::{Error, Unexpected},
};
use thiserror::Error;
use time::OffsetDateTime;

pub const USERNAME_MAX_LEN: usize = 50;

/// Names that would be shadowed by fixed routes under `/users/`.
pub const RESERVED_USERNAMES: [&str; 4] = ["me", "signup", "login", "logout"];

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct UserMarker;

/// Public view of an account. The password credential is deliberately not part
/// of this type; see [`crate::credential`].
#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
pub struct User {
    pub id: Id<UserMarker>,
    pub username: Username,
    pub biography: String,
    #[serde(rename = "avatar_img")]
    pub avatar: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Everything needed to insert a user row.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct NewUser {
    pub username: Username,
    pub credential: PasswordCredential,
    pub biography: String,
    pub avatar: String,
}

impl NewUser {
    #[must_use]
    pub fn new(username: Username, credential: PasswordCredential) -> Self {
        Self {
            username,
            credential,
            biography: String::new(),
            avatar: String::new(),
        }
    }
}

/// Body of signup and login requests.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize)]
pub struct Credentials {
    pub username: Username,
    pub password: Password,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
pub struct UpdateProfile {
    pub username: Username,
    pub biography: String,
    #[serde(rename = "avatar_img")]
    pub avatar: String,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize)]
pub struct UpdatePassword {
    pub password: Password,
}

/// Confirms which account a signup or login resolved to. Clients send the
/// username back in the `username` header on later requests.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
pub struct IdentityConfirmation {
    pub username: Username,
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize)]
#[serde(transparent)]
pub struct Username(String);

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("The username is invalid: {0:?}")]
pub struct InvalidUsernameError(String);

impl Username {
    /// Usernames are compared byte for byte, so `Alice` and `alice` are two
    /// different accounts.
    ///
    /// A username has to survive being sent back in the `username` header
    /// unchanged: no control characters and no surrounding whitespace.
    pub fn new(username: String) -> Result<Self, InvalidUsernameError> {
        let len = username.chars().count();
        let valid = len > 0
            && len <= USERNAME_MAX_LEN
            && username.trim() == username
            && !username.chars().any(char::is_control)
            && !RESERVED_USERNAMES.contains(&username.as_str());

        if valid {
            Ok(Username(username))
        } else {
            Err(InvalidUsernameError(username))
        }
    }

    #[must_use]
    pub fn get(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl std::fmt::Display for Username {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Username {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let inner = String::deserialize(deserializer)?;
        Username::new(inner)
            .map_err(|err| Error::invalid_value(Unexpected::Str(&err.0), &"a username"))
    }
}
