//! Error taxonomy for the workbook sink and export service.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ExportError>;

#[derive(Debug, Error)]
pub enum ExportError {
    /// Workbook could not be built or serialized.
    #[error("workbook sink error: {message}")]
    Sink { message: String },

    /// Sheet rows could not be converted to a DataFrame.
    #[error("frame conversion error: {0}")]
    Frame(#[from] polars::prelude::PolarsError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ExportError {
    pub fn sink(message: impl Into<String>) -> Self {
        Self::Sink {
            message: message.into(),
        }
    }
}

impl From<rust_xlsxwriter::XlsxError> for ExportError {
    fn from(err: rust_xlsxwriter::XlsxError) -> Self {
        Self::sink(format!("xlsx write error: {err}"))
    }
}
