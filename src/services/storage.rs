use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use uuid::Uuid;

/// Disk-backed bucket for uploaded news images.
#[derive(Debug, Clone)]
pub struct ImageStore {
    dir: PathBuf,
}

impl ImageStore {
    pub async fn new(dir: &Path) -> Result<Self> {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("Failed to create image directory: {}", dir.display()))?;
        Ok(ImageStore {
            dir: dir.to_path_buf(),
        })
    }

    /// Stored names combine a millisecond timestamp with a random suffix
    /// so concurrent uploads of the same file cannot collide. Only the
    /// extension of the client name is kept, reduced to ASCII.
    pub fn generate_name(original: &str) -> String {
        let ext: String = Path::new(original)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("bin")
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .take(8)
            .collect::<String>()
            .to_lowercase();
        let ext = if ext.is_empty() { "bin".to_string() } else { ext };

        let suffix = Uuid::new_v4().simple().to_string();
        format!("{}-{}.{}", Utc::now().timestamp_millis(), &suffix[..12], ext)
    }

    pub async fn save(&self, name: &str, data: &[u8]) -> Result<()> {
        let path = self.dir.join(name);
        tokio::fs::write(&path, data)
            .await
            .with_context(|| format!("Failed to write image {}", path.display()))?;
        Ok(())
    }

    /// Read a stored image back. Unsafe names and missing files both come
    /// back as `None`.
    pub async fn load(&self, name: &str) -> Result<Option<Vec<u8>>> {
        if !is_safe_name(name) {
            return Ok(None);
        }
        match tokio::fs::read(self.dir.join(name)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// Reject anything that could point outside the bucket directory.
fn is_safe_name(name: &str) -> bool {
    !name.is_empty() && !name.contains(['/', '\\']) && !name.contains("..")
}
