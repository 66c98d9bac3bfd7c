//! API credentials for authenticated requests
//!
//! The secret and passphrase are redacted from `Debug` output so a credential
//! can sit inside logged structs without leaking.

use std::fmt;

use crate::consts::{ENV_API_KEY, ENV_API_PASSPHRASE, ENV_API_SECRET};
use crate::prelude::*;

/// Immutable API key triple, owned by the client it is handed to
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    api_key: String,
    api_secret: String,
    passphrase: String,
}

impl Credentials {
    pub fn new(
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
        passphrase: impl Into<String>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret: api_secret.into(),
            passphrase: passphrase.into(),
        }
    }

    /// Load from `APEX_API_KEY`, `APEX_API_SECRET` and `APEX_API_PASSPHRASE`.
    ///
    /// A `.env` file in the working directory is read first if present.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| {
            lookup(name)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| Error::MissingCredentials(name.to_string()))
        };

        Ok(Self::new(
            read(ENV_API_KEY)?,
            read(ENV_API_SECRET)?,
            read(ENV_API_PASSPHRASE)?,
        ))
    }

    /// Names of the credential variables absent from the environment
    pub fn missing_env_vars() -> Vec<&'static str> {
        dotenvy::dotenv().ok();
        [ENV_API_KEY, ENV_API_SECRET, ENV_API_PASSPHRASE]
            .into_iter()
            .filter(|name| std::env::var(name).map(|v| v.trim().is_empty()).unwrap_or(true))
            .collect()
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub(crate) fn api_secret(&self) -> &str {
        &self.api_secret
    }

    pub(crate) fn passphrase(&self) -> &str {
        &self.passphrase
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &self.api_key)
            .field("api_secret", &"[REDACTED]")
            .field("passphrase", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_debug_redacts_secrets() {
        let creds = Credentials::new("key-123", "very-secret", "open-sesame");
        let debug_str = format!("{:?}", creds);

        assert!(debug_str.contains("key-123"));
        assert!(!debug_str.contains("very-secret"));
        assert!(!debug_str.contains("open-sesame"));
        assert!(debug_str.contains("[REDACTED]"));
    }

    #[test]
    fn test_from_lookup() {
        let vars: HashMap<&str, &str> = [
            ("APEX_API_KEY", "k"),
            ("APEX_API_SECRET", "s"),
            ("APEX_API_PASSPHRASE", "p"),
        ]
        .into_iter()
        .collect();

        let creds = Credentials::from_lookup(|n| vars.get(n).map(|v| v.to_string())).unwrap();
        assert_eq!(creds.api_key(), "k");
        assert_eq!(creds.api_secret(), "s");
        assert_eq!(creds.passphrase(), "p");
    }

    #[test]
    fn test_from_lookup_reports_missing_var() {
        let err = Credentials::from_lookup(|n| {
            (n != "APEX_API_PASSPHRASE").then(|| "x".to_string())
        })
        .unwrap_err();
        assert_eq!(err, Error::MissingCredentials("APEX_API_PASSPHRASE".into()));

        let err = Credentials::from_lookup(|_| Some("  ".to_string())).unwrap_err();
        assert_eq!(err, Error::MissingCredentials("APEX_API_KEY".into()));
    }
}
