use sea_orm::DbErr;
use thiserror::Error;

/// Failure taxonomy shared by the attendance services.
///
/// Join rejections are not here: they are ordinary `JoinOutcome` values,
/// not errors.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    InvalidInput(String),

    #[error("could not allocate an unused session code")]
    CodeExhausted,

    #[error(transparent)]
    Db(#[from] DbErr),
}
