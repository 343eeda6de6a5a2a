use thiserror::Error;
use std::io;
use std::path::PathBuf;

/// Custom error types for StainQuant
#[derive(Error, Debug)]
pub enum QuantError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input folder!")]
    InvalidDirectory(PathBuf),

    #[error("No images found in directory")]
    EmptyDirectory(PathBuf),

    #[error("Failed to read image {path}: {source}")]
    ImageRead {
        path: PathBuf,
        source: image::ImageError,
    },

    /// The grayscale reference has no non-black pixels, so there is nothing to divide by.
    #[error("Image {path} has no non-background pixels")]
    DivisionByZero { path: PathBuf },

    #[error("No results to export!")]
    NoResults,

    #[error("CSV output error: {0}")]
    CsvOutput(#[from] csv::Error),

    #[error("Invalid input path: {0}")]
    InvalidPath(PathBuf),

    #[error("Scratch folder {0} is not empty and was not created by StainQuant")]
    ForeignScratch(PathBuf),
}

impl QuantError {
    /// True for failures tied to a single image, which the batch failure policy may skip.
    pub fn is_per_image(&self) -> bool {
        matches!(
            self,
            QuantError::ImageRead { .. } | QuantError::DivisionByZero { .. } | QuantError::InvalidPath(_)
        )
    }
}

/// Type alias for Result with our custom error type
pub type Result<T> = std::result::Result<T, QuantError>;
