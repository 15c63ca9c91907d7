use thiserror::Error;

/// Errors raised while reading an input spreadsheet.
///
/// Bad cells are never errors; only an unreadable file is.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("spreadsheet error: {0}")]
    Spreadsheet(#[from] calamine::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("the workbook has no sheets")]
    NoSheets,

    #[error("unsupported file extension: {0}")]
    UnsupportedFormat(String),
}

/// Errors raised by the export flow. Every variant aborts the export and
/// leaves none of its files in the output directory.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("{0}")]
    MissingData(String),

    #[error("could not decode chart image '{name}': {reason}")]
    ImageDecode { name: String, reason: String },

    #[error("could not render chart '{name}': {reason}")]
    ChartRender { name: String, reason: String },

    #[error("could not build document: {0}")]
    Document(String),

    #[error("the data changed while the ficha was being prepared; export again")]
    Stale,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl From<zip::result::ZipError> for ExportError {
    fn from(e: zip::result::ZipError) -> Self {
        Self::Document(e.to_string())
    }
}
