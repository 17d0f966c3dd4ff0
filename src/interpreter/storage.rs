use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::error::{Error, Result};

/// Extension used for script files
pub const EXTENSION: &str = "capybara";

/// Name of the per-user folder interpreter saves land in
pub const STORAGE_DIR_NAME: &str = "카피바라 저장소";

/// Default storage folder: `<documents>/카피바라 저장소`
pub fn default_dir() -> Option<PathBuf> {
    dirs::document_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join("Documents")))
        .map(|docs| docs.join(STORAGE_DIR_NAME))
}

/// Create `dir` if it is missing
pub fn ensure_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).map_err(|e| Error::io(dir, e))
}

/// Write `content` to `path`, replacing whatever was there
pub fn save(path: &Path, content: &str) -> Result<()> {
    fs::write(path, content).map_err(|e| Error::io(path, e))
}

/// Read the whole file at `path`
pub fn load(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => Error::NotFound {
            path: path.to_path_buf(),
        },
        _ => Error::io(path, e),
    })
}

/// Add the script extension when `path` has none
pub fn with_script_extension(path: PathBuf) -> PathBuf {
    if path.extension().is_some() {
        path
    } else {
        path.with_extension(EXTENSION)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("note.capybara");
        save(&path, "data").unwrap();
        assert_eq!(load(&path).unwrap(), "data");
    }

    #[test]
    fn save_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("note.capybara");
        save(&path, "a much longer first version").unwrap();
        save(&path, "short").unwrap();
        assert_eq!(load(&path).unwrap(), "short");
    }

    #[test]
    fn load_missing_file_names_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.capybara");
        match load(&path) {
            Err(Error::NotFound { path: p }) => assert_eq!(p, path),
            other => panic!("expected NotFound, got {:?}", other),
        }
        let message = load(&path).unwrap_err().to_string();
        assert!(message.contains("missing.capybara"));
    }

    #[test]
    fn ensure_dir_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("nested").join(STORAGE_DIR_NAME);
        ensure_dir(&target).unwrap();
        ensure_dir(&target).unwrap();
        assert!(target.is_dir());
    }

    #[test]
    fn script_extension_added_only_when_missing() {
        assert_eq!(
            with_script_extension(PathBuf::from("hello")),
            PathBuf::from("hello.capybara")
        );
        assert_eq!(
            with_script_extension(PathBuf::from("hello.txt")),
            PathBuf::from("hello.txt")
        );
    }
}
