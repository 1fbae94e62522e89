use std::path::PathBuf;

use camino::Utf8PathBuf;
use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum LottoError {
    #[error("invalid draw number: {0}")]
    InvalidDrawNo(String),

    #[error("invalid URL template (must contain {{drw_no}}): {0}")]
    InvalidUrlTemplate(String),

    #[error("round {draw_no} not published yet (returnValue: {return_value})")]
    NotPublished { draw_no: u32, return_value: String },

    #[error("lottery request failed: {0}")]
    Http(String),

    #[error("lottery endpoint returned status {status}")]
    HttpStatus { status: u16 },

    #[error("malformed lottery response: {0}")]
    MalformedResponse(String),

    #[error("lottery response is missing required field `{0}`")]
    MissingField(&'static str),

    #[error("failed to read dataset {path}: {message}")]
    DatasetRead { path: Utf8PathBuf, message: String },

    #[error("unexpected dataset header in {path}: {found}")]
    #[diagnostic(help("expected header: year,drawNo,date,n1,n2,n3,n4,n5,n6,bonus"))]
    DatasetHeader { path: Utf8PathBuf, found: String },

    #[error("failed to write dataset {path}: {message}")]
    DatasetWrite { path: Utf8PathBuf, message: String },

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),
}

impl LottoError {
    /// The draw simply has not been announced yet; the caller should try again later.
    pub fn is_not_published(&self) -> bool {
        matches!(self, LottoError::NotPublished { .. })
    }
}
