//! One-way password credentials.
//!
//! Credentials are PHC strings produced by Argon2id. The salt and cost
//! parameters live inside the string, so verification needs nothing but the
//! stored value.

use argon2::{
    Argon2,
    password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
};
use serde::{
    Deserialize, Deserializer,
    de::{Error, Unexpected},
};
use std::fmt::{Debug, Formatter};
use thiserror::Error;

pub const SALT_LEN: usize = 16;

#[derive(Clone, Eq, PartialEq, Debug, Error)]
#[error("Hashing password failed: {0}")]
pub struct CredentialHashError(password_hash::Error);

/// A plaintext password as received from a client.
#[derive(Clone, Eq, PartialEq, Hash)]
pub struct Password(String);

/// A stored password hash in PHC string format.
#[derive(Clone, Eq, PartialEq, Hash)]
pub struct PasswordCredential(String);

#[derive(Clone, Default)]
pub struct CredentialVerifier {
    argon2: Argon2<'static>,
}

impl CredentialVerifier {
    #[must_use]
    pub fn new(argon2: Argon2<'static>) -> Self {
        Self { argon2 }
    }

    /// Hashes with a fresh random salt, so two calls with the same password
    /// never return the same credential.
    pub fn hash(&self, password: &Password) -> Result<PasswordCredential, CredentialHashError> {
        let salt_bytes: [u8; SALT_LEN] = rand::random();
        let salt = SaltString::encode_b64(&salt_bytes).map_err(CredentialHashError)?;

        let hash = self
            .argon2
            .hash_password(password.0.as_bytes(), &salt)
            .map_err(CredentialHashError)?;

        Ok(PasswordCredential(hash.to_string()))
    }

    /// A credential that does not parse verifies as `false`.
    #[must_use]
    pub fn verify(&self, password: &Password, credential: &PasswordCredential) -> bool {
        let Ok(parsed) = PasswordHash::new(&credential.0) else {
            return false;
        };

        self.argon2
            .verify_password(password.0.as_bytes(), &parsed)
            .is_ok()
    }
}

impl Password {
    #[must_use]
    pub fn new(password: String) -> Option<Self> {
        (!password.is_empty()).then_some(Self(password))
    }
}

impl<'de> Deserialize<'de> for Password {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let inner = String::deserialize(deserializer)?;
        Password::new(inner).ok_or_else(|| Error::invalid_value(Unexpected::Str(""), &"a password"))
    }
}

impl Debug for Password {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Password").field(&"[redacted]").finish()
    }
}

impl PasswordCredential {
    /// Wraps a credential read back from storage. No validation happens here;
    /// a malformed value simply never verifies.
    #[must_use]
    pub fn from_stored(credential: String) -> Self {
        Self(credential)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Debug for PasswordCredential {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("PasswordCredential")
            .field(&"[redacted]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use argon2::{Algorithm, Params, Version};

    fn password(s: &str) -> Password {
        Password::new(s.to_owned()).unwrap()
    }

    fn verifier() -> CredentialVerifier {
        let params = Params::new(256, 1, 1, None).unwrap();
        CredentialVerifier::new(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }

    #[test]
    fn default_verifier_writes_argon2id_phc_strings() {
        let verifier = CredentialVerifier::default();

        let credential = verifier.hash(&password("p1")).unwrap();

        assert!(credential.as_str().starts_with("$argon2id$v=19$"));
        assert!(verifier.verify(&password("p1"), &credential));
    }

    #[test]
    fn same_password_hashes_differently() {
        let verifier = verifier();

        let first = verifier.hash(&password("p1")).unwrap();
        let second = verifier.hash(&password("p1")).unwrap();

        assert_ne!(first, second);
        assert!(verifier.verify(&password("p1"), &first));
        assert!(verifier.verify(&password("p1"), &second));
    }

    #[test]
    fn cost_is_read_from_the_credential() {
        let cheap = verifier().hash(&password("p1")).unwrap();

        assert!(CredentialVerifier::default().verify(&password("p1"), &cheap));
    }

    #[test]
    fn verify_accepts_only_the_right_password() {
        let verifier = verifier();
        let credential = verifier.hash(&password("p1")).unwrap();

        assert!(verifier.verify(&password("p1"), &credential));
        assert!(!verifier.verify(&password("p2"), &credential));
    }

    #[test]
    fn verify_does_not_depend_on_call_order() {
        let verifier = verifier();
        let alice = verifier.hash(&password("alice-pw")).unwrap();
        let bob = verifier.hash(&password("bob-pw")).unwrap();

        assert!(verifier.verify(&password("bob-pw"), &bob));
        assert!(verifier.verify(&password("alice-pw"), &alice));
        assert!(verifier.verify(&password("bob-pw"), &bob));
        assert!(!verifier.verify(&password("alice-pw"), &bob));
    }

    #[test]
    fn malformed_credential_never_verifies() {
        let verifier = verifier();

        for stored in ["", "plaintext", "$argon2id$v=19$garbage"] {
            let credential = PasswordCredential::from_stored(stored.to_owned());
            assert!(!verifier.verify(&password("plaintext"), &credential));
        }
    }

    #[test]
    fn debug_output_is_redacted() {
        let debug = format!("{:?}", password("hunter2"));

        assert!(!debug.contains("hunter2"));
    }
}
