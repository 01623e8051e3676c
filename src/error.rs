//! Error taxonomy for the session subsystem.
//!
//! ERROR HANDLING
//! ==============
//! Identity-affecting failures (`login`, `logout`) surface to the caller as
//! [`AuthError`]. Enrichment failures (claims, profile, preferences) have
//! their own types so the manager can log them and degrade instead of
//! aborting a sign-in. Every error carries a grepable code through
//! [`ErrorCode`].

/// Grepable error code and retryable flag.
pub trait ErrorCode: std::fmt::Display {
    fn error_code(&self) -> &'static str;

    fn retryable(&self) -> bool {
        false
    }
}

/// Provider error codes the session layer knows how to classify.
pub mod codes {
    pub const INVALID_CREDENTIAL: &str = "auth/invalid-credential";
    pub const WRONG_PASSWORD: &str = "auth/wrong-password";
    pub const USER_NOT_FOUND: &str = "auth/user-not-found";
    pub const USER_DISABLED: &str = "auth/user-disabled";
    pub const TOO_MANY_REQUESTS: &str = "auth/too-many-requests";
    pub const NETWORK_REQUEST_FAILED: &str = "auth/network-request-failed";
}

// =============================================================================
// AUTH
// =============================================================================

/// Failure reported by the identity provider for sign-in or sign-out.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{code}: {message}")]
pub struct AuthError {
    /// Provider-specific code (e.g. `auth/wrong-password`).
    pub code: String,
    /// Human-readable description suitable for the login view.
    pub message: String,
}

impl AuthError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self { code: code.into(), message: message.into() }
    }

    #[must_use]
    pub fn invalid_credential() -> Self {
        Self::new(codes::INVALID_CREDENTIAL, "invalid email or password")
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(codes::NETWORK_REQUEST_FAILED, message)
    }

    /// True when the provider rejected the email/password pair itself.
    #[must_use]
    pub fn is_credential_error(&self) -> bool {
        matches!(
            self.code.as_str(),
            codes::INVALID_CREDENTIAL | codes::WRONG_PASSWORD | codes::USER_NOT_FOUND
        )
    }
}

impl ErrorCode for AuthError {
    fn error_code(&self) -> &'static str {
        match self.code.as_str() {
            codes::INVALID_CREDENTIAL | codes::WRONG_PASSWORD | codes::USER_NOT_FOUND => "E_AUTH_INVALID_CREDENTIAL",
            codes::USER_DISABLED => "E_AUTH_USER_DISABLED",
            codes::TOO_MANY_REQUESTS => "E_AUTH_RATE_LIMITED",
            codes::NETWORK_REQUEST_FAILED => "E_AUTH_UNAVAILABLE",
            _ => "E_AUTH",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self.code.as_str(), codes::NETWORK_REQUEST_FAILED | codes::TOO_MANY_REQUESTS)
    }
}

// =============================================================================
// CLAIMS
// =============================================================================

/// Claims could not be obtained for an identity. Recovered locally: the
/// session keeps absent or stale claims and permission checks fail closed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClaimsError {
    #[error("claims token fetch failed: {0}")]
    Fetch(String),
    #[error("identity {0} has no active token")]
    NoToken(String),
}

impl ErrorCode for ClaimsError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Fetch(_) => "E_CLAIMS_FETCH",
            Self::NoToken(_) => "E_CLAIMS_NO_TOKEN",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Fetch(_))
    }
}

// =============================================================================
// DOCUMENT STORE
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DocumentError {
    #[error("document store unavailable: {0}")]
    Unavailable(String),
    #[error("permission denied for {collection}/{id}")]
    PermissionDenied { collection: String, id: String },
}

impl ErrorCode for DocumentError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Unavailable(_) => "E_DOCUMENT_UNAVAILABLE",
            Self::PermissionDenied { .. } => "E_DOCUMENT_PERMISSION_DENIED",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

// =============================================================================
// PROFILE
// =============================================================================

/// Profile could not be read or decoded. Recovered locally by the manager:
/// the profile stays absent (or keeps its prior value) and sign-in proceeds.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProfileLoadError {
    #[error("profile store error: {0}")]
    Store(#[from] DocumentError),
    #[error("profile document malformed: {0}")]
    Malformed(String),
}

impl ErrorCode for ProfileLoadError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Store(e) => e.error_code(),
            Self::Malformed(_) => "E_PROFILE_MALFORMED",
        }
    }

    fn retryable(&self) -> bool {
        match self {
            Self::Store(e) => e.retryable(),
            Self::Malformed(_) => false,
        }
    }
}

// =============================================================================
// KEY-VALUE STORAGE
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    #[error("storage quota exceeded writing {key}")]
    QuotaExceeded { key: String },
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    #[error("value under {key} is not valid JSON: {reason}")]
    Decode { key: String, reason: String },
    #[error("value for {key} could not be encoded: {reason}")]
    Encode { key: String, reason: String },
}

impl ErrorCode for StorageError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::QuotaExceeded { .. } => "E_STORAGE_QUOTA",
            Self::Unavailable(_) => "E_STORAGE_UNAVAILABLE",
            Self::Decode { .. } => "E_STORAGE_DECODE",
            Self::Encode { .. } => "E_STORAGE_ENCODE",
        }
    }
}

// =============================================================================
// PREFERENCES
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PreferenceError {
    #[error("no identity is bound")]
    NotBound,
    #[error("preferences for {requested} cannot be saved while {bound} is signed in")]
    IdentityMismatch { bound: String, requested: String },
    #[error("preference storage failed: {0}")]
    Storage(#[from] StorageError),
}

impl ErrorCode for PreferenceError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NotBound => "E_PREFERENCES_NOT_BOUND",
            Self::IdentityMismatch { .. } => "E_PREFERENCES_IDENTITY_MISMATCH",
            Self::Storage(e) => e.error_code(),
        }
    }
}

// =============================================================================
// SESSION
// =============================================================================

/// Failure of a session operation that needs a bound identity.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("not authenticated")]
    NotAuthenticated,
    #[error("session is still synchronizing")]
    SyncInProgress,
    #[error("signed-in identity changed during the operation")]
    IdentityChanged,
    #[error(transparent)]
    Profile(#[from] ProfileLoadError),
    #[error(transparent)]
    Preference(#[from] PreferenceError),
}

impl ErrorCode for SessionError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NotAuthenticated => "E_NOT_AUTHENTICATED",
            Self::SyncInProgress => "E_SYNC_IN_PROGRESS",
            Self::IdentityChanged => "E_IDENTITY_CHANGED",
            Self::Profile(e) => e.error_code(),
            Self::Preference(e) => e.error_code(),
        }
    }

    fn retryable(&self) -> bool {
        match self {
            Self::SyncInProgress => true,
            Self::Profile(e) => e.retryable(),
            _ => false,
        }
    }
}

#[cfg(test)]
#[path = "error_test.rs"]
mod tests;
