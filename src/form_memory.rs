//! Remembers the start form values between runs.
//!
//! The device name and Loki credential are stored as plain JSON, without
//! validation or encryption, and pre-fill the next start.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use thiserror::Error;

use noise_core::config::StartFormParams;

/// File name inside the state directory
pub const FORM_MEMORY_FILE: &str = "start-form-params.json";

#[derive(Error, Debug)]
pub enum FormMemoryError {
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to encode form params: {0}")]
    Encode(#[from] serde_json::Error),
}

pub struct FormMemory {
    path: PathBuf,
}

impl FormMemory {
    /// Form memory stored in `dir`
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            path: dir.join(FORM_MEMORY_FILE),
        }
    }

    /// Form memory in the user's config directory, or the working
    /// directory when there is none
    pub fn default_location() -> Self {
        let dir = dirs::config_dir()
            .map(|d| d.join("noise-meter"))
            .unwrap_or_else(|| PathBuf::from("."));
        Self::in_dir(&dir)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remembered values, or empty ones when nothing usable is stored
    pub fn load(&self) -> StartFormParams {
        match fs::read_to_string(&self.path) {
            Ok(contents) => StartFormParams::parse_or_default(&contents),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("No form memory at {}", self.path.display());
                StartFormParams::default()
            }
            Err(e) => {
                warn!("Failed to read {}: {}", self.path.display(), e);
                StartFormParams::default()
            }
        }
    }

    pub fn save(&self, params: &StartFormParams) -> Result<(), FormMemoryError> {
        let serialized = serde_json::to_string_pretty(params)?;
        let write_err = |source| FormMemoryError::Write {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        fs::write(&self.path, serialized).map_err(write_err)?;
        debug!("Form params saved to {}", self.path.display());
        Ok(())
    }
}
