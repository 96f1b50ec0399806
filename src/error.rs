use thiserror::Error;

use crate::forms::Role;

pub type VizResult<T> = Result<T, VizError>;

/// Failures of the upload → decode → render pipeline.
///
/// None of these are fatal: the web layer turns them into a status line or
/// an empty figure.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum VizError {
    #[error("unsupported file format: .{extension}")]
    UnsupportedFormat { extension: String },

    #[error("{detail}")]
    Decode { detail: String },

    #[error("no column selected for role '{role}'")]
    MissingBinding { role: Role },

    #[error("Value of '{column}' is not the name of a column")]
    UnknownColumn { column: String },

    #[error("{0}")]
    Render(String),
}

impl VizError {
    pub fn decode(detail: impl std::fmt::Display) -> Self {
        VizError::Decode {
            detail: detail.to_string(),
        }
    }

    pub fn render(detail: impl std::fmt::Display) -> Self {
        VizError::Render(detail.to_string())
    }
}

impl From<base64::DecodeError> for VizError {
    fn from(e: base64::DecodeError) -> Self {
        VizError::decode(e)
    }
}

impl From<csv::Error> for VizError {
    fn from(e: csv::Error) -> Self {
        VizError::decode(e)
    }
}

impl From<calamine::XlsxError> for VizError {
    fn from(e: calamine::XlsxError) -> Self {
        VizError::decode(e)
    }
}

impl From<std::string::FromUtf8Error> for VizError {
    fn from(e: std::string::FromUtf8Error) -> Self {
        VizError::decode(e)
    }
}
