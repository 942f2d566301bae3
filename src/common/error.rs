use thiserror::Error;

#[derive(Error, Debug)]
pub enum MaskLensError {
    #[error("Not logged in")]
    Unauthenticated,

    #[error("Access denied: Admin privileges required")]
    Forbidden,

    #[error("Camera error: {0}")]
    DeviceUnavailable(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response from server: {0}")]
    InvalidResponse(String),

    #[error("{0}")]
    Validation(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, MaskLensError>;
