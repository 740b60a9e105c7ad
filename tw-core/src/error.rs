//! Error types for the Twinflow application.
//!
//! Two families live here:
//! - `TwError`, the application-level error covering configuration,
//!   persistence, IO and service lifecycle failures.
//! - `BackendError`, the taxonomy every backend call reports to the step
//!   sequencer. Only `TransientOffline` is special-cased by the sequencer.

use thiserror::Error;

/// Convenience type alias for Results using TwError.
pub type TwResult<T> = Result<T, TwError>;

/// Convenience type alias for backend call results.
pub type BackendResult<T> = Result<T, BackendError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum TwError {
    // -- Configuration errors --
    /// Failed to load or parse application configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// A required configuration value is missing.
    #[error("missing configuration: {0}")]
    MissingConfig(String),

    // -- Database errors --
    /// SQLite database error.
    #[error("database error: {0}")]
    Database(String),

    /// Database migration failed.
    #[error("migration error: {0}")]
    Migration(String),

    /// Database connection pool error.
    #[error("connection pool error: {0}")]
    Pool(String),

    /// Database integrity check failed.
    #[error("database integrity check failed: {0}")]
    IntegrityCheck(String),

    // -- Input errors --
    /// Caller supplied a value the operation cannot accept.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    // -- File/IO errors --
    /// File system operation failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    // -- Service errors --
    /// A service is not yet initialized.
    #[error("service not initialized: {0}")]
    ServiceNotInitialized(String),

    /// The controller or sequencer was disposed.
    #[error("disposed: {0}")]
    Disposed(String),

    /// A service operation failed.
    #[error("service error: {0}")]
    Service(String),

    /// A backend call failed outside of a sequencer.
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),

    // -- Generic --
    /// An unexpected internal error.
    #[error("internal error: {0}")]
    Internal(String),

    /// Wrapping anyhow errors for interop.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<serde_json::Error> for TwError {
    fn from(e: serde_json::Error) -> Self {
        TwError::Serialization(e.to_string())
    }
}

impl From<toml::de::Error> for TwError {
    fn from(e: toml::de::Error) -> Self {
        TwError::Config(e.to_string())
    }
}

/// Error reported by a backend call.
///
/// `TransientOffline` means "retry later": the sequencer parks the step
/// and waits for an explicit online signal. `ItemNotFound` is usually
/// mapped to a dedicated "not found" observer callback.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// The requested item does not exist.
    #[error("item not found: {0}")]
    ItemNotFound(String),

    /// The backend is temporarily unreachable.
    #[error("backend offline")]
    TransientOffline,

    /// Any other failure, passed through to the controller.
    #[error("{kind}: {detail}")]
    Other {
        /// Classification of the failure.
        kind: ErrorKind,
        /// Human-readable detail.
        detail: String,
    },
}

impl BackendError {
    /// Build an `Other` error from a kind and a detail message.
    pub fn other(kind: ErrorKind, detail: impl Into<String>) -> Self {
        BackendError::Other {
            kind,
            detail: detail.into(),
        }
    }

    /// Build an `ItemNotFound` error.
    pub fn not_found(what: impl Into<String>) -> Self {
        BackendError::ItemNotFound(what.into())
    }

    /// Whether this is the transient offline sentinel.
    pub fn is_offline(&self) -> bool {
        matches!(self, BackendError::TransientOffline)
    }

    /// Whether this is a not-found error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, BackendError::ItemNotFound(_))
    }

    /// Numeric code matching the backend's wire error codes.
    pub fn code(&self) -> i32 {
        match self {
            BackendError::ItemNotFound(_) => ErrorKind::ITEM_NOT_FOUND_CODE,
            BackendError::TransientOffline => ErrorKind::OFFLINE_CODE,
            BackendError::Other { kind, .. } => kind.code(),
        }
    }
}

impl From<TwError> for BackendError {
    fn from(e: TwError) -> Self {
        match e {
            TwError::Backend(inner) => inner,
            TwError::InvalidInput(detail) => BackendError::other(ErrorKind::BadRequest, detail),
            other => BackendError::other(ErrorKind::Storage, other.to_string()),
        }
    }
}

/// Classification of non-offline, non-not-found backend failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[repr(i32)]
pub enum ErrorKind {
    /// The request was malformed or referenced an unusable item.
    BadRequest = 2,
    /// The caller is not allowed to perform the operation.
    NoPermission = 3,
    /// A quota or limit was reached.
    LimitReached = 6,
    /// Local storage failed.
    Storage = 8,
    /// A scanned or typed code is not valid.
    InvalidCode = 12,
    /// The item exists but is in the wrong state for the operation.
    InvalidState = 14,
    /// Unexpected backend failure.
    Internal = 99,
}

impl ErrorKind {
    /// Wire code for `BackendError::ItemNotFound`.
    pub const ITEM_NOT_FOUND_CODE: i32 = 1;
    /// Wire code for `BackendError::TransientOffline`.
    pub const OFFLINE_CODE: i32 = 4;

    /// Convert an integer code to an ErrorKind variant.
    pub fn from_code(code: i32) -> Self {
        match code {
            2 => Self::BadRequest,
            3 => Self::NoPermission,
            6 => Self::LimitReached,
            8 => Self::Storage,
            12 => Self::InvalidCode,
            14 => Self::InvalidState,
            _ => Self::Internal,
        }
    }

    /// Get the integer code for this kind.
    pub fn code(&self) -> i32 {
        *self as i32
    }

    /// Short lowercase label used in logs and error messages.
    pub fn label(&self) -> &'static str {
        match self {
            Self::BadRequest => "bad request",
            Self::NoPermission => "no permission",
            Self::LimitReached => "limit reached",
            Self::Storage => "storage error",
            Self::InvalidCode => "invalid code",
            Self::InvalidState => "invalid state",
            Self::Internal => "internal error",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
