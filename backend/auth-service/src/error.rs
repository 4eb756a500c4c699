use thiserror::Error;
use vget_common::ServiceError;

pub type Result<T> = std::result::Result<T, AuthError>;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("user not found")]
    UserNotFound,

    #[error("email already registered")]
    EmailAlreadyExists,

    #[error("invalid token")]
    InvalidToken,

    #[error("token expired")]
    TokenExpired,

    #[error("account disabled")]
    AccountDisabled,

    #[error("validation error: {0}")]
    Validation(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<AuthError> for tonic::Status {
    fn from(err: AuthError) -> Self {
        let service_err = match err {
            AuthError::InvalidCredentials => {
                ServiceError::Unauthenticated("invalid email or password".into())
            }
            AuthError::UserNotFound => ServiceError::NotFound("user not found".into()),
            AuthError::EmailAlreadyExists => {
                ServiceError::Conflict("email already registered".into())
            }
            AuthError::InvalidToken => ServiceError::Unauthenticated("invalid token".into()),
            AuthError::TokenExpired => ServiceError::Unauthenticated("token expired".into()),
            AuthError::AccountDisabled => {
                ServiceError::PermissionDenied("account disabled".into())
            }
            AuthError::Validation(msg) => ServiceError::InvalidInput(msg),
            AuthError::Database(e) => ServiceError::Internal(format!("database error: {e}")),
            AuthError::Internal(msg) => ServiceError::Internal(msg),
        };
        service_err.into()
    }
}

impl From<bcrypt::BcryptError> for AuthError {
    fn from(err: bcrypt::BcryptError) -> Self {
        AuthError::Internal(format!("bcrypt error: {err}"))
    }
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::InvalidToken,
        }
    }
}
