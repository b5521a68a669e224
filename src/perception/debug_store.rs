use std::path::{Path, PathBuf};

use rand::Rng;

use crate::errors::EuporieResult;

/// Writes annotated screenshots to disk for inspection. Nothing reads them
/// back.
#[derive(Debug, Clone)]
pub struct DebugStore {
    dir: PathBuf,
}

impl DebugStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns `<local data dir>/euporie/debug`, falling back to `./debug`.
    pub fn default_dir() -> PathBuf {
        dirs::data_local_dir()
            .map(|d| d.join("euporie").join("debug"))
            .unwrap_or_else(|| PathBuf::from("debug"))
    }

    pub fn persist(&self, jpeg: &[u8]) -> EuporieResult<PathBuf> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(unique_name());
        std::fs::write(&path, jpeg)?;
        tracing::debug!(path = %path.display(), bytes = jpeg.len(), "annotated image saved");
        Ok(path)
    }

    pub fn persist_or_log(&self, jpeg: &[u8]) {
        if let Err(e) = self.persist(jpeg) {
            tracing::warn!(error = %e, dir = %self.dir.display(), "could not save annotated image");
        }
    }
}

fn unique_name() -> String {
    format!(
        "annotated_image_{}_{}.jpg",
        chrono::Local::now().format("%Y%m%d_%H%M%S"),
        rand::thread_rng().gen_range(1000..10000)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_follow_pattern() {
        let name = unique_name();
        let re = regex::Regex::new(r"^annotated_image_\d{8}_\d{6}_\d{4}\.jpg$").unwrap();
        assert!(re.is_match(&name), "{name}");
    }

    #[test]
    fn persist_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let store = DebugStore::new(dir.path().join("nested").join("debug"));
        let path = store.persist(b"jpeg").unwrap();
        assert_eq!(std::fs::read(path).unwrap(), b"jpeg");
    }

    #[test]
    fn persist_failure_is_swallowed() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, b"x").unwrap();
        // a regular file where the directory should be
        let store = DebugStore::new(&blocker);
        assert!(store.persist(b"jpeg").is_err());
        store.persist_or_log(b"jpeg");
    }
}
