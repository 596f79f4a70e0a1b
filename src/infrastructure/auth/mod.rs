//! Feed Credentials
//!
//! Identity token plus account identifier, immutable per connection
//! attempt. Token acquisition is out of scope: credentials are assumed
//! supplied by the environment or rotated in-process, and the supervisor
//! re-reads its [`CredentialSource`] on every attempt so rotation takes
//! effect on the next reconnect.

use parking_lot::RwLock;

use crate::application::ports::{ConnectionHeaders, CredentialSource};
use crate::infrastructure::config::ConfigError;

/// Environment variable holding the identity token.
pub const IDENTITY_TOKEN_VAR: &str = "FEED_IDENTITY_TOKEN";

/// Environment variable holding the account identifier.
pub const ACCOUNT_ID_VAR: &str = "FEED_ACCOUNT_ID";

/// Feed credentials: bearer-style identity token and account identifier.
///
/// The `Debug` implementation redacts the token for safe logging.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    identity_token: String,
    account_id: String,
}

impl Credentials {
    /// Create credentials, validating that both fields are present.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EmptyValue`] when either field is empty;
    /// this is a precondition failure, not a connection failure.
    pub fn new(
        identity_token: impl Into<String>,
        account_id: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let identity_token = identity_token.into();
        let account_id = account_id.into();

        if identity_token.is_empty() {
            return Err(ConfigError::EmptyValue(IDENTITY_TOKEN_VAR.to_string()));
        }
        if account_id.is_empty() {
            return Err(ConfigError::EmptyValue(ACCOUNT_ID_VAR.to_string()));
        }

        Ok(Self {
            identity_token,
            account_id,
        })
    }

    /// The identity token.
    #[must_use]
    pub fn identity_token(&self) -> &str {
        &self.identity_token
    }

    /// The account identifier.
    #[must_use]
    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    /// Derive the connection header pair for this identity.
    #[must_use]
    pub fn headers(&self) -> ConnectionHeaders {
        ConnectionHeaders {
            authorization: format!("Bearer {}", self.identity_token),
            account_id: self.account_id.clone(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("identity_token", &"[REDACTED]")
            .field("account_id", &self.account_id)
            .finish()
    }
}

/// Credential source backed by process environment variables.
///
/// Variables are read on every call, so replacing them (e.g. via a
/// re-exec'd supervisor or test harness) is picked up on the next
/// connection attempt.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvCredentialSource;

impl EnvCredentialSource {
    /// Create an environment-backed credential source.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl CredentialSource for EnvCredentialSource {
    fn credentials(&self) -> Result<Credentials, ConfigError> {
        let token = std::env::var(IDENTITY_TOKEN_VAR)
            .map_err(|_| ConfigError::MissingEnvVar(IDENTITY_TOKEN_VAR.to_string()))?;
        let account = std::env::var(ACCOUNT_ID_VAR)
            .map_err(|_| ConfigError::MissingEnvVar(ACCOUNT_ID_VAR.to_string()))?;

        Credentials::new(token, account)
    }
}

/// In-memory rotatable credential source.
///
/// Callers hold a clone and call [`SharedCredentials::rotate`] when a new
/// token is issued; the supervisor sees the new value on its next attempt.
#[derive(Debug, Default)]
pub struct SharedCredentials {
    inner: RwLock<Option<Credentials>>,
}

impl SharedCredentials {
    /// Create an empty shared source (attempts fail until credentials are set).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a shared source seeded with credentials.
    #[must_use]
    pub fn with_credentials(credentials: Credentials) -> Self {
        Self {
            inner: RwLock::new(Some(credentials)),
        }
    }

    /// Replace the stored credentials.
    pub fn rotate(&self, credentials: Credentials) {
        *self.inner.write() = Some(credentials);
    }
}

impl CredentialSource for SharedCredentials {
    fn credentials(&self) -> Result<Credentials, ConfigError> {
        self.inner
            .read()
            .clone()
            .ok_or_else(|| ConfigError::MissingEnvVar(IDENTITY_TOKEN_VAR.to_string()))
    }
}
