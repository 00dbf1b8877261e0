use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum TessError {
    #[error("data from sector {sector} is not available (status {status})")]
    #[diagnostic(help("the sector may not exist yet; run `tess-cat check-sectors`"))]
    RemoteDataUnavailable { sector: u32, status: u16 },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("unknown TOI catalog source: {0}")]
    #[diagnostic(help("expected one of: caltech, mit"))]
    UnknownCatalogSource(String),

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("remote returned status {status}: {message}")]
    HttpStatus { status: u16, message: String },

    #[error("TIC catalog query failed: {0}")]
    CatalogQuery(String),

    #[error("TIC catalog returned status {status}: {message}")]
    CatalogStatus { status: u16, message: String },

    #[error("missing column `{column}` in {context}")]
    MissingColumn { column: String, context: String },

    #[error("failed to parse CSV: {0}")]
    Csv(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),
}

impl TessError {
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            TessError::RemoteDataUnavailable { .. }
                | TessError::Http(_)
                | TessError::HttpStatus { .. }
                | TessError::CatalogQuery(_)
                | TessError::CatalogStatus { .. }
        )
    }
}
