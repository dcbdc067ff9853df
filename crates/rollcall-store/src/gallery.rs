//! Reference-image gallery - one folder per identity.
//!
//! Populated by the upload endpoint; read-only at match time. The
//! identity owning an upload is derived from the uploaded filename's
//! stem, as in `21CS001.jpg -> 21CS001/21CS001.jpg`.

use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GalleryError {
    #[error("empty filename")]
    EmptyFilename,
    #[error("gallery io: {0}")]
    Io(#[from] std::io::Error),
}

/// A stored reference image.
#[derive(Debug, Clone)]
pub struct SavedReference {
    pub identity: String,
    pub path: PathBuf,
}

/// The reference-image tree.
#[derive(Debug, Clone)]
pub struct Gallery {
    root: PathBuf,
}

impl Gallery {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Folder of reference images for an identity, if any exist.
    pub fn identity_dir(&self, identity: &str) -> Option<PathBuf> {
        let dir = self.root.join(identity);
        dir.is_dir().then_some(dir)
    }

    /// Store an uploaded reference image.
    ///
    /// Only the final path component of `filename` is used, and the
    /// identity is its stem. The identity folder is created on first
    /// upload.
    pub fn save_reference(
        &self,
        filename: &str,
        bytes: &[u8],
    ) -> Result<SavedReference, GalleryError> {
        let name = Path::new(filename)
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or(GalleryError::EmptyFilename)?;

        let identity = Path::new(name)
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .ok_or(GalleryError::EmptyFilename)?
            .to_string();

        let dir = self.root.join(&identity);
        std::fs::create_dir_all(&dir)?;

        let path = dir.join(name);
        std::fs::write(&path, bytes)?;

        tracing::info!(identity, path = %path.display(), "reference image stored");
        Ok(SavedReference { identity, path })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_derives_identity_from_stem() {
        let dir = tempfile::tempdir().unwrap();
        let gallery = Gallery::new(dir.path());

        let saved = gallery.save_reference("21CS001.jpg", b"img").unwrap();
        assert_eq!(saved.identity, "21CS001");
        assert!(saved.path.ends_with("21CS001/21CS001.jpg"));
        assert_eq!(std::fs::read(&saved.path).unwrap(), b"img");
    }

    #[test]
    fn test_identity_dir_exists_after_upload() {
        let dir = tempfile::tempdir().unwrap();
        let gallery = Gallery::new(dir.path());

        assert!(gallery.identity_dir("21CS001").is_none());
        gallery.save_reference("21CS001.jpg", b"img").unwrap();
        assert!(gallery.identity_dir("21CS001").is_some());
    }

    #[test]
    fn test_multiple_references_share_a_folder() {
        let dir = tempfile::tempdir().unwrap();
        let gallery = Gallery::new(dir.path());

        gallery.save_reference("21CS001.jpg", b"a").unwrap();
        let saved = gallery.save_reference("21CS001.png", b"b").unwrap();
        assert_eq!(saved.identity, "21CS001");

        let entries = std::fs::read_dir(gallery.identity_dir("21CS001").unwrap())
            .unwrap()
            .count();
        assert_eq!(entries, 2);
    }

    #[test]
    fn test_path_components_are_stripped() {
        let dir = tempfile::tempdir().unwrap();
        let gallery = Gallery::new(dir.path());

        let saved = gallery.save_reference("../../etc/21CS001.jpg", b"img").unwrap();
        assert!(saved.path.starts_with(dir.path()));
        assert_eq!(saved.identity, "21CS001");
    }

    #[test]
    fn test_empty_filename_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let gallery = Gallery::new(dir.path());
        assert!(matches!(
            gallery.save_reference("", b"img"),
            Err(GalleryError::EmptyFilename)
        ));
    }
}
