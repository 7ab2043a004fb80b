//! Avatar image storage under the media directory.

use std::path::{Path, PathBuf};

use thiserror::Error;
use uuid::Uuid;

/// Largest accepted upload.
pub const MAX_AVATAR_BYTES: usize = 2 * 1024 * 1024;

/// Subdirectory of the media root that holds avatars.
const AVATAR_DIR: &str = "avatars";

/// Errors that can occur when storing an avatar.
#[derive(Debug, Error)]
pub enum AvatarError {
    #[error("please choose an image to upload")]
    Empty,

    #[error("avatar must be at most 2 MiB")]
    TooLarge,

    #[error("avatar must be a PNG, JPEG, GIF or WebP image")]
    UnsupportedType,

    #[error("failed to store avatar: {0}")]
    Io(#[from] std::io::Error),
}

impl AvatarError {
    /// Whether the error is caused by the upload rather than the server.
    #[must_use]
    pub const fn is_user_error(&self) -> bool {
        !matches!(self, Self::Io(_))
    }
}

/// Image formats accepted as avatars, identified by magic bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Png,
    Jpeg,
    Gif,
    Webp,
}

impl ImageKind {
    /// Sniff the format from the first bytes of the file.
    #[must_use]
    pub fn detect(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
            Some(Self::Png)
        } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Some(Self::Jpeg)
        } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
            Some(Self::Gif)
        } else if bytes.starts_with(b"RIFF") && bytes.get(8..12) == Some(&b"WEBP"[..]) {
            Some(Self::Webp)
        } else {
            None
        }
    }

    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::Gif => "gif",
            Self::Webp => "webp",
        }
    }
}

/// Writes avatars to `<media>/avatars/<uuid>.<ext>`.
#[derive(Debug, Clone)]
pub struct AvatarStore {
    media_dir: PathBuf,
}

impl AvatarStore {
    #[must_use]
    pub fn new(media_dir: impl Into<PathBuf>) -> Self {
        Self {
            media_dir: media_dir.into(),
        }
    }

    /// Validate and store an upload.
    ///
    /// Returns the path relative to the media directory.
    ///
    /// # Errors
    ///
    /// Returns `AvatarError::Empty`, `TooLarge` or `UnsupportedType` for bad
    /// uploads and `AvatarError::Io` if the file cannot be written.
    pub async fn save(&self, bytes: &[u8]) -> Result<String, AvatarError> {
        if bytes.is_empty() {
            return Err(AvatarError::Empty);
        }
        if bytes.len() > MAX_AVATAR_BYTES {
            return Err(AvatarError::TooLarge);
        }
        let kind = ImageKind::detect(bytes).ok_or(AvatarError::UnsupportedType)?;

        let dir = self.media_dir.join(AVATAR_DIR);
        tokio::fs::create_dir_all(&dir).await?;

        let file_name = format!("{}.{}", Uuid::new_v4(), kind.extension());
        tokio::fs::write(dir.join(&file_name), bytes).await?;

        Ok(format!("{AVATAR_DIR}/{file_name}"))
    }

    /// Delete a previously stored avatar. Missing files are ignored.
    pub async fn remove(&self, relative: &str) {
        let Some(path) = self.resolve(relative) else {
            tracing::warn!(path = %relative, "Refusing to delete avatar outside media directory");
            return;
        };
        if let Err(e) = tokio::fs::remove_file(&path).await
            && e.kind() != std::io::ErrorKind::NotFound
        {
            tracing::warn!(path = %path.display(), error = %e, "Failed to delete old avatar");
        }
    }

    fn resolve(&self, relative: &str) -> Option<PathBuf> {
        let name = relative.strip_prefix(&format!("{AVATAR_DIR}/"))?;
        let is_plain = Path::new(name).file_name().is_some_and(|n| n == name);
        is_plain.then(|| self.media_dir.join(AVATAR_DIR).join(name))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

    #[test]
    fn test_detect_formats() {
        assert_eq!(ImageKind::detect(PNG), Some(ImageKind::Png));
        assert_eq!(
            ImageKind::detect(&[0xFF, 0xD8, 0xFF, 0xE0]),
            Some(ImageKind::Jpeg)
        );
        assert_eq!(ImageKind::detect(b"GIF89a...."), Some(ImageKind::Gif));
        assert_eq!(
            ImageKind::detect(b"RIFF\0\0\0\0WEBPVP8 "),
            Some(ImageKind::Webp)
        );
        assert_eq!(ImageKind::detect(b"<svg></svg>"), None);
        assert_eq!(ImageKind::detect(b"RIFF"), None);
    }

    #[tokio::test]
    async fn test_save_and_remove() {
        let dir = std::env::temp_dir().join(format!("selldesk-avatars-{}", Uuid::new_v4()));
        let store = AvatarStore::new(&dir);

        let relative = store.save(PNG).await.unwrap();
        assert!(relative.starts_with("avatars/"));
        assert!(relative.ends_with(".png"));
        assert!(dir.join(&relative).exists());

        store.remove(&relative).await;
        assert!(!dir.join(&relative).exists());

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }

    #[tokio::test]
    async fn test_rejects_bad_uploads() {
        let store = AvatarStore::new(std::env::temp_dir());
        assert!(matches!(store.save(b"").await, Err(AvatarError::Empty)));
        assert!(matches!(
            store.save(b"plain text").await,
            Err(AvatarError::UnsupportedType)
        ));
        let huge = vec![0xFF; MAX_AVATAR_BYTES + 1];
        assert!(matches!(store.save(&huge).await, Err(AvatarError::TooLarge)));
    }

    #[test]
    fn test_resolve_rejects_traversal() {
        let store = AvatarStore::new("/srv/media");
        assert!(store.resolve("avatars/abc.png").is_some());
        assert!(store.resolve("avatars/../secret").is_none());
        assert!(store.resolve("other/abc.png").is_none());
    }
}
