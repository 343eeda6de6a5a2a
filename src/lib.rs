// src/lib.rs - Library interface for StainQuant

pub mod batch;
pub mod config;
pub mod errors;
pub mod image_io;
pub mod image_utils;
pub mod output;
pub mod progress;
pub mod results;
pub mod scratch;
pub mod segmentation;

// Re-export commonly used types and functions
pub use errors::{QuantError, Result};
pub use config::{Config, FailurePolicy};
pub use image_io::{InputImage, list_images, load_image, save_image};
pub use results::{QuantificationResult, ResultStore};
pub use scratch::ScratchArea;
pub use output::{export, write_results_csv};

pub use segmentation::{
    quantify,
    quantify_image,
    segment,
    RenderMode,
    Segmentation,
};

pub use batch::{
    BatchOutcome,
    BatchReport,
    BatchRunner,
    CancelToken,
    FailedImage,
    Rejection,
};

pub use progress::{ChannelProgress, LogProgress, ProgressEvent, ProgressReceiver, ProgressSink};
