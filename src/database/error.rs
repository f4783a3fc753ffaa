use std::fmt::{self, Display};

use potion::Error;

/// Request outcomes that end a request early, mapped onto their HTTP status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    ValidationFailed,
    Unauthenticated,
    PermissionDenied,
    NotFound,
}

impl ErrorKind {
    pub fn new(self, info: &str) -> Error {
        let info = Some(info.to_owned());
        match self {
            ErrorKind::ValidationFailed => Error {
                code: 400,
                info,
                redirect: None,
            },
            ErrorKind::Unauthenticated => Error {
                code: 401,
                info,
                redirect: None,
            },
            ErrorKind::PermissionDenied => Error {
                code: 403,
                info,
                redirect: None,
            },
            ErrorKind::NotFound => Error {
                code: 404,
                info,
                redirect: None,
            },
        }
    }

    pub fn default(self) -> Error {
        match self {
            ErrorKind::ValidationFailed => self.new("Invalid request"),
            ErrorKind::Unauthenticated => self.new("Authentication credentials were not provided"),
            ErrorKind::PermissionDenied => {
                self.new("You do not have permission to perform this action")
            }
            ErrorKind::NotFound => self.new("Not found"),
        }
    }
}

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
            sqlx::Error::RowNotFound => Self::new("Row not found".to_owned()),
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
                Self::new(format!("Database unavailable ({value})"))
            }
            sqlx::Error::Database(e) => Self::new(format!("{e}")),
            e => Self::new(format!("{e}")),
        }
    }
}

impl From<QueryError> for Error {
    fn from(value: QueryError) -> Self {
        log::error!("> Query failed: {}", value.info);
        Error {
            code: 500,
            info: Some(value.info),
            redirect: None,
        }
    }
}

pub struct CacheError {
    info: String,
}

impl From<redis::RedisError> for CacheError {
    fn from(value: redis::RedisError) -> Self {
        Self {
            info: format!("{:?} - {:?}", value.code(), value.detail()),
        }
    }
}

impl From<CacheError> for Error {
    fn from(value: CacheError) -> Self {
        log::error!("> Cache failed: {}", value.info);
        Error {
            code: 500,
            info: Some(value.info),
            redirect: None,
        }
    }
}

/// Malformed user input: query parameters, payload fields.
#[derive(Debug)]
pub struct TypeError {
    info: String,
}

impl TypeError {
    pub fn new(info: &str) -> Self {
        Self {
            info: info.to_string(),
        }
    }
}

impl From<TypeError> for Error {
    fn from(value: TypeError) -> Self {
        ErrorKind::ValidationFailed.new(&value.info)
    }
}

impl Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({})", self.info)
    }
}

impl std::error::Error for TypeError {}
