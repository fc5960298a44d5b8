//! Credential tuples
//!
//! A credential is one application key pair plus one user access token pair.
//! The two secrets are wrapped in `Secret` so they never reach logs; the key
//! and token are identifiers and stay plain.

use common::Secret;

use crate::error::{Error, Result};

/// One complete set of API authorization secrets.
#[derive(Debug, Clone)]
pub struct Credential {
    pub consumer_key: String,
    pub consumer_secret: Secret<String>,
    pub access_token: String,
    pub access_token_secret: Secret<String>,
}

impl Credential {
    pub fn new(
        consumer_key: impl Into<String>,
        consumer_secret: impl Into<Secret<String>>,
        access_token: impl Into<String>,
        access_token_secret: impl Into<Secret<String>>,
    ) -> Self {
        Self {
            consumer_key: consumer_key.into(),
            consumer_secret: consumer_secret.into(),
            access_token: access_token.into(),
            access_token_secret: access_token_secret.into(),
        }
    }

    /// False when any of the four parts is empty.
    pub fn is_complete(&self) -> bool {
        !(self.consumer_key.is_empty()
            || self.consumer_secret.is_empty()
            || self.access_token.is_empty()
            || self.access_token_secret.is_empty())
    }

    /// Names of the parts that are missing, for error messages.
    pub fn missing_parts(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.consumer_key.is_empty() {
            missing.push("consumer_key");
        }
        if self.consumer_secret.is_empty() {
            missing.push("consumer_secret");
        }
        if self.access_token.is_empty() {
            missing.push("access_token");
        }
        if self.access_token_secret.is_empty() {
            missing.push("access_token_secret");
        }
        missing
    }

    /// Fail with the missing part names unless the credential is complete.
    pub fn validate(&self) -> Result<()> {
        if self.is_complete() {
            Ok(())
        } else {
            Err(Error::InvalidCredentials(format!(
                "missing {}",
                self.missing_parts().join(", ")
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full() -> Credential {
        Credential::new("ck", "cs", "at", "ats")
    }

    #[test]
    fn complete_credential_validates() {
        let credential = full();
        assert!(credential.is_complete());
        assert!(credential.missing_parts().is_empty());
        credential.validate().unwrap();
    }

    #[test]
    fn any_empty_part_is_incomplete() {
        let mut credential = full();
        credential.access_token_secret = Secret::from("");
        assert!(!credential.is_complete());

        let mut credential = full();
        credential.consumer_key.clear();
        credential.access_token.clear();
        assert_eq!(
            credential.missing_parts(),
            vec!["consumer_key", "access_token"]
        );
        let err = credential.validate().unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid credentials: missing consumer_key, access_token"
        );
    }

    #[test]
    fn debug_redacts_secrets() {
        let rendered = format!("{:?}", full());
        assert!(rendered.contains("ck"));
        assert!(!rendered.contains("\"cs\""));
        assert!(!rendered.contains("ats"));
        assert!(rendered.contains("[REDACTED]"));
    }
}
