use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SampleError {
    #[error("video source not found: {0}")]
    NotFound(PathBuf),
    #[error("cannot read video source: {0}")]
    BadFormat(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("image encode error: {0}")]
    Image(#[from] image::ImageError),
}
