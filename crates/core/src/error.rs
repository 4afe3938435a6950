use std::path::PathBuf;

/// Coarse classification of a [`CoreError`].
///
/// API layers map this to a transport status (HTTP 400/401/403/404/409/500) without having to
/// know every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Unauthenticated,
    Forbidden,
    NotFound,
    Conflict,
    Internal,
}

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("patient record is incomplete")]
    IncompletePatient {
        patient_id: healthcure_uuid::RecordId,
        missing_fields: Vec<&'static str>,
    },
    #[error(transparent)]
    Text(#[from] healthcure_types::TextError),
    #[error(transparent)]
    Id(#[from] healthcure_uuid::UuidError),

    #[error("{0}")]
    Unauthenticated(&'static str),
    #[error("{0}")]
    Forbidden(&'static str),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    Conflict(String),

    #[error("failed to hash password")]
    PasswordHash,
    #[error("failed to issue token: {0}")]
    TokenIssue(jsonwebtoken::errors::Error),
    #[error("failed to create storage directory {path}: {source}", path = path.display())]
    StorageDirCreation {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write document {path}: {source}", path = path.display())]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read document {path}: {source}", path = path.display())]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to remove document {path}: {source}", path = path.display())]
    FileRemove {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize document: {0}")]
    Serialization(serde_json::Error),
    #[error("{0} lock poisoned")]
    LockPoisoned(&'static str),
}

impl CoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::InvalidInput(_)
            | CoreError::IncompletePatient { .. }
            | CoreError::Text(_)
            | CoreError::Id(_) => ErrorKind::Validation,
            CoreError::Unauthenticated(_) => ErrorKind::Unauthenticated,
            CoreError::Forbidden(_) => ErrorKind::Forbidden,
            CoreError::NotFound(_) => ErrorKind::NotFound,
            CoreError::Conflict(_) => ErrorKind::Conflict,
            CoreError::PasswordHash
            | CoreError::TokenIssue(_)
            | CoreError::StorageDirCreation { .. }
            | CoreError::FileWrite { .. }
            | CoreError::FileRead { .. }
            | CoreError::FileRemove { .. }
            | CoreError::Serialization(_)
            | CoreError::LockPoisoned(_) => ErrorKind::Internal,
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        CoreError::Conflict(message.into())
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        CoreError::InvalidInput(message.into())
    }
}

pub type CoreResult<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds_cover_status_classes() {
        assert_eq!(
            CoreError::invalid("bad").kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            CoreError::Unauthenticated("no token").kind(),
            ErrorKind::Unauthenticated
        );
        assert_eq!(CoreError::Forbidden("admins only").kind(), ErrorKind::Forbidden);
        assert_eq!(CoreError::NotFound("patient").kind(), ErrorKind::NotFound);
        assert_eq!(CoreError::conflict("already_linked").kind(), ErrorKind::Conflict);
        assert_eq!(CoreError::PasswordHash.kind(), ErrorKind::Internal);
    }

    #[test]
    fn test_text_errors_are_validation() {
        let err: CoreError = healthcure_types::TextError::Empty.into();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_not_found_message() {
        assert_eq!(CoreError::NotFound("patient").to_string(), "patient not found");
    }
}
