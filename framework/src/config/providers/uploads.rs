use crate::config::env::env;
use std::path::PathBuf;

/// Uploaded asset storage
#[derive(Debug, Clone)]
pub struct UploadsConfig {
    /// Directory holding uploaded files
    pub dir: PathBuf,
    /// URL prefix the directory is served under
    pub mount: String,
}

impl UploadsConfig {
    pub fn from_env() -> Self {
        Self {
            dir: PathBuf::from(env("UPLOADS_DIR", "uploads".to_string())),
            mount: "/uploads".to_string(),
        }
    }
}

impl Default for UploadsConfig {
    fn default() -> Self {
        Self::from_env()
    }
}
