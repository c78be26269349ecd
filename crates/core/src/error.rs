use std::io;

/// Error taxonomy for every administrative operation.
///
/// Provider-level failures (I/O, JSON, identity backend) are re-classified into these variants
/// at the store / identity boundary, so routines and the CLI only ever see this type.
#[derive(Debug, thiserror::Error)]
pub enum AdminError {
    /// A lookup missed. Recoverable, but must be reported to the operator.
    #[error("not found: {0}")]
    NotFound(String),

    /// Caller-supplied data violates a constraint. Raised before any write.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Provider-side failure that the caller may retry.
    #[error("transient provider error: {0}")]
    Transient(String),

    /// The credentials do not grant access. Never retried.
    #[error("not authorised: {0}")]
    Authorization(String),

    /// A multi-step routine completed some steps but not all.
    #[error("partial failure for {id}: step '{step}' failed after earlier steps succeeded: {source}")]
    PartialFailure {
        id: String,
        step: &'static str,
        #[source]
        source: Box<AdminError>,
    },

    /// Credential or connection failure at startup.
    #[error("fatal: {0}")]
    Fatal(String),
}

pub type AdminResult<T> = std::result::Result<T, AdminError>;

impl AdminError {
    /// Short machine-friendly name of the taxonomy class.
    pub fn kind(&self) -> &'static str {
        match self {
            AdminError::NotFound(_) => "NotFound",
            AdminError::Validation(_) => "ValidationError",
            AdminError::Transient(_) => "TransientError",
            AdminError::Authorization(_) => "AuthorizationError",
            AdminError::PartialFailure { .. } => "PartialFailure",
            AdminError::Fatal(_) => "Fatal",
        }
    }

    /// Only transient errors may be retried by the caller.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AdminError::Transient(_))
    }

    /// Process exit status for this error.
    ///
    /// 1 is left for bootstrap failures outside the taxonomy and 2 for usage errors.
    pub fn exit_code(&self) -> u8 {
        match self {
            AdminError::NotFound(_) => 3,
            AdminError::Validation(_) => 4,
            AdminError::Transient(_) => 5,
            AdminError::Authorization(_) => 6,
            AdminError::PartialFailure { .. } => 7,
            AdminError::Fatal(_) => 8,
        }
    }

    pub(crate) fn partial(id: impl Into<String>, step: &'static str, source: AdminError) -> Self {
        AdminError::PartialFailure {
            id: id.into(),
            step,
            source: Box::new(source),
        }
    }

    /// Re-classifies an I/O error raised while talking to a backend.
    pub(crate) fn from_io(context: impl AsRef<str>, err: io::Error) -> Self {
        let context = context.as_ref();
        match err.kind() {
            io::ErrorKind::NotFound => AdminError::NotFound(format!("{context}: {err}")),
            io::ErrorKind::PermissionDenied => {
                AdminError::Authorization(format!("{context}: {err}"))
            }
            io::ErrorKind::InvalidData | io::ErrorKind::InvalidInput => {
                AdminError::Validation(format!("{context}: {err}"))
            }
            _ => AdminError::Transient(format!("{context}: {err}")),
        }
    }

    /// Re-classifies a JSON decoding failure for stored or supplied data.
    pub(crate) fn from_json(context: impl AsRef<str>, err: serde_json::Error) -> Self {
        if err.is_io() {
            return AdminError::Transient(format!("{}: {err}", context.as_ref()));
        }
        AdminError::Validation(format!("{}: {err}", context.as_ref()))
    }
}

impl From<portal_types::TextError> for AdminError {
    fn from(err: portal_types::TextError) -> Self {
        AdminError::Validation(err.to_string())
    }
}

impl From<portal_types::EmailError> for AdminError {
    fn from(err: portal_types::EmailError) -> Self {
        AdminError::Validation(err.to_string())
    }
}

impl From<portal_uuid::UuidError> for AdminError {
    fn from(err: portal_uuid::UuidError) -> Self {
        AdminError::Validation(err.to_string())
    }
}
