use anyhow::Result;
use rand::RngCore;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// Length of the random name stem: 16 bytes hex-encoded.
const TOKEN_LEN: usize = 32;
/// Extension cap, dot included. Anything longer is treated as no extension.
const MAX_EXT_LEN: usize = 12;

/// Flat-directory file store addressed by random token names.
///
/// Every file lives at `{dir}/{32-hex-token}{optional .ext}`. The token
/// format doubles as a whitelist: lookups for anything else fail closed
/// before the filesystem is ever touched, so user-supplied names can
/// never traverse outside the directory.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub async fn new(dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&dir).await?;
        info!("Upload directory: {}", dir.display());
        Ok(Self { dir })
    }

    /// Fresh stored name for an upload: random hex token plus the
    /// original file's (bounded, lower-cased) extension.
    pub fn stored_name_for(&self, original_name: &str) -> String {
        let mut bytes = [0u8; 16];
        rand::rng().fill_bytes(&mut bytes);
        format!("{}{}", hex::encode(bytes), safe_ext(original_name))
    }

    pub fn path_for(&self, stored_name: &str) -> PathBuf {
        self.dir.join(stored_name)
    }

    /// Path for a stored name, or None when the name fails the token
    /// check or no such file exists.
    pub async fn resolve(&self, stored_name: &str) -> Option<PathBuf> {
        if !is_valid_stored_name(stored_name) {
            return None;
        }
        let path = self.path_for(stored_name);
        match fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Some(path),
            _ => None,
        }
    }

    /// Whether a valid stored name currently has a backing file.
    pub async fn exists(&self, stored_name: &str) -> bool {
        self.resolve(stored_name).await.is_some()
    }

    /// Best-effort unlink. Every failure, including "does not exist",
    /// is swallowed; a missing file must never fail the CRUD operation
    /// that triggered the delete.
    pub async fn delete_quiet(&self, stored_name: &str) {
        if !is_valid_stored_name(stored_name) {
            return;
        }
        if let Err(e) = fs::remove_file(self.path_for(stored_name)).await {
            debug!("Quiet delete of {} skipped: {}", stored_name, e);
        }
    }
}

/// Whitelist check for stored names: exactly 32 lowercase hex chars,
/// optionally followed by a dot and a short alphanumeric extension.
pub fn is_valid_stored_name(name: &str) -> bool {
    if name.len() < TOKEN_LEN || !name.is_ascii() {
        return false;
    }
    let (token, ext) = name.split_at(TOKEN_LEN);
    if !token
        .chars()
        .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
    {
        return false;
    }
    if ext.is_empty() {
        return true;
    }
    if ext.len() > MAX_EXT_LEN {
        return false;
    }
    let Some(rest) = ext.strip_prefix('.') else {
        return false;
    };
    !rest.is_empty() && rest.chars().all(|c| c.is_ascii_alphanumeric())
}

/// Extension of an uploaded filename, lower-cased, dot included.
/// Over-long or non-alphanumeric extensions are discarded.
fn safe_ext(original_name: &str) -> String {
    let ext = Path::new(original_name)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();
    if ext.is_empty()
        || ext.len() + 1 > MAX_EXT_LEN
        || !ext.chars().all(|c| c.is_ascii_alphanumeric())
    {
        return String::new();
    }
    format!(".{}", ext)
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn open_store() -> (FileStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileStore::new(dir.path().join("uploads")).await.expect("store");
        (store, dir)
    }

    #[test]
    fn safe_ext_bounds_and_lowercases() {
        assert_eq!(safe_ext("report.PDF"), ".pdf");
        assert_eq!(safe_ext("archive.tar.GZ"), ".gz");
        assert_eq!(safe_ext("noext"), "");
        assert_eq!(safe_ext("weird.this-is-far-too-long"), "");
        assert_eq!(safe_ext("dots.."), "");
    }

    #[test]
    fn generated_names_pass_the_whitelist() {
        let store = FileStore { dir: PathBuf::from(".") };
        for original in ["photo.JPG", "no_extension", "весна.pdf"] {
            let name = store.stored_name_for(original);
            assert!(is_valid_stored_name(&name), "rejected {}", name);
        }
    }

    #[test]
    fn whitelist_fails_closed_on_foreign_names() {
        for bad in [
            "../../etc/passwd",
            "..",
            "",
            "short",
            &"A".repeat(32),                       // uppercase hex
            &format!("{}.{}", "a".repeat(32), "x".repeat(12)), // ext too long
            &format!("{}..pdf", "a".repeat(32)),
            &format!("{}/x", "a".repeat(31)),
            &format!("{}.p/d", "a".repeat(32)),
        ] {
            assert!(!is_valid_stored_name(bad), "accepted {:?}", bad);
        }
        assert!(is_valid_stored_name(&format!("{}.pdf", "0a".repeat(16))));
        assert!(is_valid_stored_name(&"deadbeef".repeat(4)));
    }

    #[tokio::test]
    async fn store_then_resolve_roundtrip() {
        let (store, _dir) = open_store().await;
        let name = store.stored_name_for("notes.txt");
        fs::write(store.path_for(&name), b"pages 10-12").await.unwrap();

        let path = store.resolve(&name).await.expect("resolves");
        assert_eq!(fs::read(&path).await.unwrap(), b"pages 10-12");
    }

    #[tokio::test]
    async fn resolve_misses_unknown_and_invalid_names() {
        let (store, _dir) = open_store().await;
        assert!(store.resolve(&"a".repeat(32)).await.is_none());
        assert!(store.resolve("../diary.db").await.is_none());
    }

    #[tokio::test]
    async fn delete_quiet_swallows_missing_files() {
        let (store, _dir) = open_store().await;
        let name = store.stored_name_for("a.png");
        fs::write(store.path_for(&name), b"x").await.unwrap();

        store.delete_quiet(&name).await;
        assert!(!store.exists(&name).await);
        // Second delete of the same name must be a no-op, not a panic.
        store.delete_quiet(&name).await;
    }
}
