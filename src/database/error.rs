use std::fmt::{self, Display};

use potion::{Error, HtmlError};

pub struct QueryError {
    info: String,
}

impl QueryError {
    pub fn new(info: String) -> Self {
        Self { info }
    }
}

impl From<sqlx::Error> for QueryError {
    fn from(value: sqlx::Error) -> Self {
        match value {
            sqlx::Error::RowNotFound => Self::new(String::from("RowNotFound")),
            sqlx::Error::PoolTimedOut => Self::new(String::from("Pool timed out")),
            sqlx::Error::PoolClosed => Self::new(String::from("Pool closed")),
            sqlx::Error::TypeNotFound { type_name } => {
                Self::new(format!("Type not found: {type_name}"))
            }
            e => Self::new(format!("{e}")),
        }
    }
}

impl From<QueryError> for Error {
    fn from(value: QueryError) -> Self {
        Error {
            code: 500,
            info: Some(value.info),
            redirect: None,
        }
    }
}

/// Errors a request can end with besides a failed query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    Validation(String),
    Unauthenticated(String),
    Forbidden(String),
    NotFound(String),
}

impl ApiError {
    pub fn validation(info: &str) -> Self {
        Self::Validation(info.to_string())
    }

    pub fn not_found(info: &str) -> Self {
        Self::NotFound(info.to_string())
    }

    pub fn forbidden() -> Self {
        Self::Forbidden(String::from(
            "You don't have permission to perform this action",
        ))
    }

    pub fn unauthenticated(info: &str) -> Self {
        Self::Unauthenticated(info.to_string())
    }

    pub fn info(&self) -> &str {
        match self {
            ApiError::Validation(info)
            | ApiError::Unauthenticated(info)
            | ApiError::Forbidden(info)
            | ApiError::NotFound(info) => info,
        }
    }
}

impl Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.info())
    }
}

impl std::error::Error for ApiError {}

impl From<ApiError> for Error {
    fn from(value: ApiError) -> Self {
        match value {
            ApiError::Validation(info) => HtmlError::InvalidRequest.new(&info),
            ApiError::Unauthenticated(info) => HtmlError::InvalidSession.new(&info),
            ApiError::Forbidden(info) => Error {
                code: 403,
                info: Some(info),
                redirect: None,
            },
            ApiError::NotFound(info) => Error {
                code: 404,
                info: Some(info),
                redirect: None,
            },
        }
    }
}

/// A concurrent duplicate insert trips the unique constraint after the
/// existence check passed; it is reported with the same message.
pub fn unique_violation_as(value: sqlx::Error, info: &str) -> Error {
    match &value {
        sqlx::Error::Database(e) if e.is_unique_violation() => ApiError::validation(info).into(),
        _ => QueryError::from(value).into(),
    }
}

/// Inserts referencing the session user fail on the foreign key once that
/// user is gone; the session is reported as stale instead of a 500.
pub fn missing_user_as_unauthenticated(value: sqlx::Error) -> Error {
    match &value {
        sqlx::Error::Database(e) if e.is_foreign_key_violation() => {
            ApiError::unauthenticated("Invalid session; User no longer exists").into()
        }
        _ => QueryError::from(value).into(),
    }
}
