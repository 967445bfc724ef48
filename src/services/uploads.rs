use std::path::{Path, PathBuf};

use rand::Rng;

use crate::config::UploadConfig;
use crate::error::{AppError, AppResult};

/// Disk-backed store for uploaded screenshots. Files land under
/// `{root}/{folder}/` and are referenced everywhere else by their public
/// `/uploads/...` path, which is what gets persisted on squad and player rows.
#[derive(Clone)]
pub struct UploadStore {
    root: PathBuf,
    max_file_bytes: usize,
}

impl UploadStore {
    pub fn new(config: &UploadConfig) -> Self {
        Self {
            root: PathBuf::from(&config.root),
            max_file_bytes: config.max_file_bytes,
        }
    }

    pub async fn save(&self, folder: &str, original_name: &str, bytes: &[u8]) -> AppResult<String> {
        if bytes.is_empty() {
            return Err(AppError::BadRequest("Uploaded file is empty".into()));
        }
        if bytes.len() > self.max_file_bytes {
            return Err(AppError::BadRequest("Uploaded file is too large".into()));
        }

        let dir = self.root.join(folder);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| AppError::Internal(format!("Upload dir error: {e}")))?;

        let filename = unique_name(original_name);
        tokio::fs::write(dir.join(&filename), bytes)
            .await
            .map_err(|e| AppError::Internal(format!("Upload write error: {e}")))?;

        Ok(format!("/uploads/{folder}/{filename}"))
    }
}

/// Timestamp-random filename keeping only the original extension, so caller
/// supplied names never reach the filesystem.
fn unique_name(original_name: &str) -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let nonce: u32 = rand::thread_rng().gen_range(0..1_000_000_000);
    let ext = Path::new(original_name)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| e.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|e| format!(".{e}"))
        .unwrap_or_default();
    format!("{millis}-{nonce}{ext}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_name_keeps_extension_only() {
        let name = unique_name("proof.png");
        assert!(name.ends_with(".png"));
        assert!(!name.contains("proof"));
    }

    #[test]
    fn unique_name_drops_suspicious_extensions() {
        let name = unique_name("../../etc/passwd");
        assert!(!name.contains('/'));
        assert!(!name.contains(".."));
    }

    #[test]
    fn unique_name_handles_missing_extension() {
        let name = unique_name("screenshot");
        assert!(!name.contains('.'));
    }
}
