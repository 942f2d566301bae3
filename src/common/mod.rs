pub mod config;
pub mod dev_mode;
pub mod error;

pub use config::{CameraConfig, Config, ServerConfig};
pub use dev_mode::DevMode;
pub use error::{MaskLensError, Result};
