use std::fs;
use std::io::Write;
use std::path::Path;

use camino::{Utf8Path, Utf8PathBuf};
use directories::BaseDirs;
use serde_json::Value;

use crate::error::MetaError;

/// Shared on-disk cache of remote responses, plus the atomic file helpers
/// every command writes through.
#[derive(Debug, Clone)]
pub struct Store {
    cache_root: Utf8PathBuf,
}

impl Store {
    pub fn new() -> Result<Self, MetaError> {
        let cache_root = BaseDirs::new()
            .and_then(|dirs| {
                Utf8PathBuf::from_path_buf(dirs.home_dir().join(".cache").join("pokemeta")).ok()
            })
            .ok_or_else(|| MetaError::Filesystem("unable to resolve cache directory".to_string()))?;
        Ok(Self { cache_root })
    }

    pub fn new_with_path(cache_root: Utf8PathBuf) -> Self {
        Self { cache_root }
    }

    pub fn cache_root(&self) -> &Utf8Path {
        &self.cache_root
    }

    /// Cache file for a response, named after the request path.
    pub fn response_path(&self, resource: &str) -> Utf8PathBuf {
        let trimmed = resource
            .trim_start_matches("https://")
            .trim_start_matches("http://")
            .trim_matches('/');
        let name = trimmed
            .chars()
            .map(|ch| if ch.is_ascii_alphanumeric() || ch == '-' { ch } else { '_' })
            .collect::<String>();
        self.cache_root
            .join("responses")
            .join(format!("{name}.json"))
    }

    pub fn read_response(&self, resource: &str) -> Option<Value> {
        let path = self.response_path(resource);
        let content = fs::read(path.as_std_path()).ok()?;
        match serde_json::from_slice(&content) {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::warn!(path = %path, "ignoring unreadable cache entry: {err}");
                None
            }
        }
    }

    pub fn write_response(&self, resource: &str, value: &Value) -> Result<(), MetaError> {
        let path = self.response_path(resource);
        let content =
            serde_json::to_vec(value).map_err(|err| MetaError::Filesystem(err.to_string()))?;
        write_bytes_atomic(path.as_std_path(), &content)
    }

    pub fn clear_cache(&self) -> Result<bool, MetaError> {
        if !self.cache_root.as_std_path().exists() {
            return Ok(false);
        }
        fs::remove_dir_all(self.cache_root.as_std_path())
            .map_err(|err| MetaError::Filesystem(err.to_string()))?;
        Ok(true)
    }
}

/// Writes `content` to a temp file beside `path` and renames it into place.
pub fn write_bytes_atomic(path: &Path, content: &[u8]) -> Result<(), MetaError> {
    let parent = path
        .parent()
        .ok_or_else(|| MetaError::Filesystem(format!("invalid destination {}", path.display())))?;
    fs::create_dir_all(parent).map_err(|err| MetaError::Filesystem(err.to_string()))?;
    let mut temp = tempfile::Builder::new()
        .prefix(".pokemeta")
        .tempfile_in(parent)
        .map_err(|err| MetaError::Filesystem(err.to_string()))?;
    temp.write_all(content)
        .map_err(|err| MetaError::Filesystem(format!("write {}: {err}", path.display())))?;
    temp.persist(path)
        .map_err(|err| MetaError::Filesystem(format!("persist {}: {err}", path.display())))?;
    Ok(())
}

/// Copies `source` to `dest` through a temp file. With `replace` false an
/// existing `dest` is never clobbered.
pub fn copy_file_atomic(source: &Path, dest: &Path, replace: bool) -> Result<(), MetaError> {
    let parent = dest
        .parent()
        .ok_or_else(|| MetaError::Filesystem("invalid destination path".to_string()))?;
    fs::create_dir_all(parent).map_err(|err| MetaError::Filesystem(err.to_string()))?;
    let temp = tempfile::Builder::new()
        .prefix(".pokemeta")
        .tempfile_in(parent)
        .map_err(|err| MetaError::Filesystem(err.to_string()))?;
    fs::copy(source, temp.path())
        .map_err(|err| MetaError::Filesystem(format!("copy {}: {err}", source.display())))?;
    if replace {
        temp.persist(dest)
            .map_err(|err| MetaError::Filesystem(format!("persist {}: {err}", dest.display())))?;
    } else {
        temp.persist_noclobber(dest)
            .map_err(|err| MetaError::Filesystem(format!("persist {}: {err}", dest.display())))?;
    }
    Ok(())
}

/// Regular files directly inside `dir`, sorted by file name.
pub fn list_files(dir: &Path) -> Result<Vec<std::path::PathBuf>, MetaError> {
    let entries = fs::read_dir(dir)
        .map_err(|err| MetaError::Filesystem(format!("read {}: {err}", dir.display())))?;
    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|err| MetaError::Filesystem(err.to_string()))?;
        let path = entry.path();
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_path_is_flat() {
        let store = Store::new_with_path(Utf8PathBuf::from("/tmp/pokemeta-cache"));
        let path = store.response_path("https://pokeapi.co/api/v2/pokemon-species/25/");
        assert_eq!(
            path,
            Utf8PathBuf::from("/tmp/pokemeta-cache/responses/pokeapi_co_api_v2_pokemon-species_25.json")
        );
    }

    #[test]
    fn response_round_trip() {
        let temp = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(temp.path().join("cache")).unwrap();
        let store = Store::new_with_path(root);
        assert!(store.read_response("pokemon/eevee").is_none());
        let value = serde_json::json!({"name": "eevee"});
        store.write_response("pokemon/eevee", &value).unwrap();
        assert_eq!(store.read_response("pokemon/eevee"), Some(value));
        assert!(store.clear_cache().unwrap());
        assert!(store.read_response("pokemon/eevee").is_none());
    }

    #[test]
    fn copy_without_replace_keeps_existing() {
        let temp = tempfile::tempdir().unwrap();
        let source = temp.path().join("a.png");
        let dest = temp.path().join("1.png");
        fs::write(&source, b"new").unwrap();
        fs::write(&dest, b"old").unwrap();
        assert!(copy_file_atomic(&source, &dest, false).is_err());
        assert_eq!(fs::read(&dest).unwrap(), b"old");
        copy_file_atomic(&source, &dest, true).unwrap();
        assert_eq!(fs::read(&dest).unwrap(), b"new");
    }

    #[test]
    fn list_files_is_sorted_and_skips_dirs() {
        let temp = tempfile::tempdir().unwrap();
        fs::write(temp.path().join("b.png"), b"").unwrap();
        fs::write(temp.path().join("a.png"), b"").unwrap();
        fs::create_dir(temp.path().join("c")).unwrap();
        let names = list_files(temp.path())
            .unwrap()
            .into_iter()
            .map(|path| path.file_name().unwrap().to_string_lossy().to_string())
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["a.png", "b.png"]);
    }
}
