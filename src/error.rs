use camino::Utf8PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Clone, Error, Diagnostic)]
pub enum KiraError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("invalid resolution mode: {0}")]
    InvalidConfiguration(String),

    #[error("accession not found: {0}")]
    NotFound(String),

    #[error("names service unavailable: {0}")]
    TransportUnavailable(String),

    #[error("object type mismatch for {accession}: requested {requested}")]
    TypeMismatch {
        accession: String,
        requested: String,
    },

    #[error("failed to read config file at {0}")]
    ConfigRead(Utf8PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),

    #[error("names request failed: {0}")]
    NamesHttp(String),

    #[error("names service returned status {status}: {message}")]
    NamesStatus { status: u16, message: String },

    #[error("failed to parse names response: {0}")]
    NamesParse(String),

    #[error("invalid path: {0}")]
    InvalidPath(String),
}

impl KiraError {
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            KiraError::TransportUnavailable(_)
                | KiraError::NamesHttp(_)
                | KiraError::NamesStatus { .. }
                | KiraError::NamesParse(_)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum LocationError {
    #[error("not found")]
    NotFound,

    #[error("object type mismatch")]
    TypeMismatch,

    #[error("no writable cache repository configured")]
    NoCacheRoot,
}
