use std::fmt;

#[derive(Debug)]
pub enum Error {
    Http(reqwest::Error),
    Authentication(String),
    NotAuthenticated,
    NotFound {
        kind: &'static str,
        index: usize,
        len: usize,
    },
    Communication(String),
    Validation(String),
    NoSnapshot,
    Io(std::io::Error),
    Json(serde_json::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Http(e) => write!(f, "HTTP error: {e}"),
            Error::Authentication(user) => {
                write!(f, "invalid username or password for {user}")
            }
            Error::NotAuthenticated => write!(f, "not authenticated"),
            Error::NotFound { kind, index, len } => {
                write!(f, "{kind} {index} not found ({len} available)")
            }
            Error::Communication(msg) => write!(f, "communication error: {msg}"),
            Error::Validation(msg) => write!(f, "validation error: {msg}"),
            Error::NoSnapshot => write!(f, "no thermostat state polled yet"),
            Error::Io(e) => write!(f, "IO error: {e}"),
            Error::Json(e) => write!(f, "JSON error: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Http(e) => Some(e),
            Error::Io(e) => Some(e),
            Error::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Http(e)
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Json(e)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
