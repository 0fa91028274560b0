use super::traits::SessionStorage;
use std::fs;
use std::path::PathBuf;

/// File-backed storage: one file per key under a session directory, so a
/// restarted CLI resumes where the participant left off.
#[derive(Debug)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: PathBuf) -> std::io::Result<Self> {
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        // Keys are internal identifiers, but sanitize anyway so a key can
        // never escape the session directory.
        let safe: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
            .collect();
        self.dir.join(safe)
    }
}

impl SessionStorage for FileStorage {
    fn get(&self, key: &str) -> Option<String> {
        fs::read_to_string(self.path_for(key)).ok()
    }

    fn set(&mut self, key: &str, value: &str) {
        if let Err(e) = fs::write(self.path_for(key), value) {
            tracing::warn!("failed to persist session key {}: {}", key, e);
        }
    }

    fn remove(&mut self, key: &str) {
        let _ = fs::remove_file(self.path_for(key));
    }

    fn clear(&mut self) {
        if let Ok(entries) = fs::read_dir(&self.dir) {
            for entry in entries.flatten() {
                let _ = fs::remove_file(entry.path());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut storage = FileStorage::new(dir.path().to_path_buf()).unwrap();
            storage.set("survey_document", "{\"likert\":{}}");
        }
        let storage = FileStorage::new(dir.path().to_path_buf()).unwrap();
        assert_eq!(
            storage.get("survey_document").as_deref(),
            Some("{\"likert\":{}}")
        );
    }

    #[test]
    fn test_clear_removes_all_keys() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = FileStorage::new(dir.path().to_path_buf()).unwrap();
        storage.set("a", "1");
        storage.set("b", "2");
        storage.clear();
        assert_eq!(storage.get("a"), None);
        assert_eq!(storage.get("b"), None);
    }

    #[test]
    fn test_key_sanitized() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = FileStorage::new(dir.path().to_path_buf()).unwrap();
        storage.set("../escape", "x");
        assert_eq!(storage.get("../escape").as_deref(), Some("x"));
        assert!(!dir.path().parent().unwrap().join("escape").exists());
    }
}
