use crate::common::error::Result;
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct DevMode {
    enabled: bool,
    base_dir: PathBuf,
}

impl DevMode {
    pub fn new(enabled: bool) -> Result<Self> {
        let base_dir = if enabled {
            PathBuf::from("./dev_data")
        } else {
            PathBuf::new() // Not used when disabled
        };

        if enabled {
            fs::create_dir_all(&base_dir)?;
            fs::create_dir_all(base_dir.join("session"))?;
            fs::create_dir_all(base_dir.join("captures"))?;

            println!(
                "📁 Development mode enabled - data will be saved to: {}",
                base_dir.display()
            );
        }

        Ok(Self { enabled, base_dir })
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn session_dir(&self) -> PathBuf {
        if self.enabled {
            self.base_dir.join("session")
        } else {
            panic!("session_dir() called when dev mode is disabled")
        }
    }

    pub fn captures_dir(&self) -> PathBuf {
        if self.enabled {
            self.base_dir.join("captures")
        } else {
            panic!("captures_dir() called when dev mode is disabled")
        }
    }

    pub fn get_capture_path(&self, prefix: &str) -> PathBuf {
        if self.enabled {
            let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
            self.captures_dir().join(format!("{}_{}.png", prefix, timestamp))
        } else {
            PathBuf::from(format!("{}.png", prefix))
        }
    }
}
