//! Session identity and authentication payloads
//!
//! The session is passed explicitly into the controller; nothing is read from ambient
//! storage at submission time.

use crate::error::{Error, Result};
use crate::service::DatasetService;
use serde::{Deserialize, Serialize};

/// Longest password the service accepts (argon2 input limit on the backend)
pub const MAX_PASSWORD_LEN: usize = 72;

/// Shortest password accepted at signup
pub const MIN_SIGNUP_PASSWORD_LEN: usize = 6;

/// Identity of the signed-in user
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Account identifier attached to generation requests and history lookups
    pub email: String,
    /// Display name, if the service returned one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

impl Session {
    /// Create a session for the given account
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            username: None,
        }
    }

    /// A session without identity; jobs are generated but not recorded in any history
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Set the display name
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Whether the session carries an account identifier
    pub fn is_anonymous(&self) -> bool {
        self.email.trim().is_empty()
    }

    /// Sign in and obtain a session
    ///
    /// Credentials are checked locally before anything is sent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] for malformed credentials, or the service error
    /// (typically [`Error::Http`] with status 401) when the service rejects them.
    pub async fn login(service: &dyn DatasetService, credentials: &Credentials) -> Result<Self> {
        credentials.validate()?;
        let session = service.login(credentials).await?;
        tracing::info!(email = %session.email, "signed in");
        Ok(session)
    }
}

/// Register a new account
///
/// # Errors
///
/// Returns [`Error::Validation`] for a malformed request (nothing is sent), or the service
/// error (e.g. [`Error::Http`] with status 400 for a duplicate email).
pub async fn signup(service: &dyn DatasetService, request: &SignupRequest) -> Result<()> {
    request.validate()?;
    service.signup(request).await?;
    tracing::info!(email = %request.email, username = %request.username, "account created");
    Ok(())
}

/// Login payload for `POST /auth/login`
#[derive(Clone, Serialize, Deserialize)]
pub struct Credentials {
    /// Account email
    pub email: String,
    /// Plain-text password
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    /// Create login credentials
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    /// Check the payload against the service's limits
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] for an empty email or a password outside `1..=72` chars.
    pub fn validate(&self) -> Result<()> {
        validate_email(&self.email)?;
        validate_password(&self.password, 1)
    }
}

/// Signup payload for `POST /auth/signup`
#[derive(Clone, Serialize, Deserialize)]
pub struct SignupRequest {
    /// Display name
    pub username: String,
    /// Account email
    pub email: String,
    /// Plain-text password
    pub password: String,
}

impl std::fmt::Debug for SignupRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignupRequest")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl SignupRequest {
    /// Create a signup request
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            email: email.into(),
            password: password.into(),
        }
    }

    /// Check the payload against the service's limits
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] for an empty username or email, or a password
    /// outside `6..=72` chars.
    pub fn validate(&self) -> Result<()> {
        if self.username.trim().is_empty() {
            return Err(Error::validation("username", "must not be empty"));
        }
        validate_email(&self.email)?;
        validate_password(&self.password, MIN_SIGNUP_PASSWORD_LEN)
    }
}

fn validate_email(email: &str) -> Result<()> {
    if email.trim().is_empty() {
        return Err(Error::validation("email", "must not be empty"));
    }
    Ok(())
}

fn validate_password(password: &str, min_len: usize) -> Result<()> {
    let len = password.chars().count();
    if len < min_len || len > MAX_PASSWORD_LEN {
        return Err(Error::validation(
            "password",
            format!("must be between {min_len} and {MAX_PASSWORD_LEN} characters"),
        ));
    }
    Ok(())
}
