use thiserror::Error;

/// Errors raised while turning an upload into a [`Dataset`](crate::data::model::Dataset).
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("unsupported file extension: .{0}")]
    UnsupportedFormat(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Upload was structurally valid but not a table (e.g. JSON that is not an array of objects).
    #[error("malformed table: {0}")]
    Malformed(String),

    #[error("row {row}: expected {expected} fields, found {actual}")]
    RowWidth {
        row: usize,
        expected: usize,
        actual: usize,
    },

    #[error("column '{column}' has {actual} rows, expected {expected}")]
    RaggedColumn {
        column: String,
        expected: usize,
        actual: usize,
    },
}

/// Errors raised by the chart renderer.
#[derive(Debug, Error)]
pub enum PlotError {
    #[error("unsupported plot kind '{0}' (expected scatter, line, hist, bar-sum or bar-count)")]
    UnsupportedKind(String),

    #[error("column '{0}' not found")]
    ColumnNotFound(String),

    #[error("column '{column}' is not numeric, required for {kind}")]
    NonNumericColumn { column: String, kind: &'static str },

    #[error("drawing failed: {0}")]
    Draw(String),

    #[error("image encoding failed: {0}")]
    Encode(#[from] image::ImageError),
}

/// A cosmetic chart option that could not be applied. Always swallowed by the renderer.
#[derive(Debug, Error)]
pub enum OptionError {
    #[error("option '{option}' rejected: {reason}")]
    Invalid { option: &'static str, reason: String },

    #[error("option '{option}' could not be drawn: {reason}")]
    Draw { option: &'static str, reason: String },
}

/// Errors writing the last-result snapshot files.
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Everything a request handler can fail with. The status code mapping
/// lives next to the handlers.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("no dataset loaded; upload a file first")]
    NoDataset,

    #[error("multipart field 'file-input' missing from upload")]
    MissingUpload,

    #[error("upload exceeds {0} bytes")]
    UploadTooLarge(usize),

    #[error("upload error: {0}")]
    Multipart(String),

    #[error("could not read upload: {0}")]
    Dataset(#[from] DatasetError),

    #[error(transparent)]
    Plot(#[from] PlotError),

    #[error("could not save result: {0}")]
    Artifact(#[from] ArtifactError),

    #[error("worker pool error: {0}")]
    Blocking(#[from] actix_web::error::BlockingError),
}
