//! File loading and folder-gallery support.
//!
//! Everything that touches the filesystem lives here, outside the viewer
//! core: decoding via the `image` crate, folder scans for the prev/next
//! gallery, and the `rfd` open dialogs.

use std::path::{Path, PathBuf};

use image::RgbaImage;

use crate::picture::Picture;

/// File extensions accepted by the open dialog and the folder scan.
pub const IMAGE_EXTENSIONS: &[&str] =
    &["png", "jpg", "jpeg", "bmp", "gif", "tif", "tiff", "webp"];

// ============================================================================
// Errors
// ============================================================================

/// Error type for image loading. A failed load never mutates viewer state;
/// the previous image stays live.
#[derive(Debug)]
pub enum LoadError {
    Io(std::io::Error),
    Decode(String),
    /// The decoded buffer has a zero dimension (or no pixels at all).
    EmptyImage,
}

impl std::fmt::Display for LoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadError::Io(e) => write!(f, "I/O error: {}", e),
            LoadError::Decode(e) => write!(f, "Decode error: {}", e),
            LoadError::EmptyImage => write!(f, "Image has zero width or height"),
        }
    }
}

impl From<std::io::Error> for LoadError {
    fn from(e: std::io::Error) -> Self {
        LoadError::Io(e)
    }
}

impl From<image::ImageError> for LoadError {
    fn from(e: image::ImageError) -> Self {
        LoadError::Decode(e.to_string())
    }
}

// ============================================================================
// Loading
// ============================================================================

/// Decode an image file into a classified [`Picture`].
pub fn load_picture(path: &Path) -> Result<Picture, LoadError> {
    let decoded = image::open(path)?;
    let rgba: RgbaImage = decoded.to_rgba8();
    Picture::new(rgba)
}

/// True if the path has a supported image extension (case-insensitive).
pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// List the image files in a folder, sorted by path.
/// Non-image entries are skipped; subdirectories are not descended into.
pub fn list_folder_images(folder: &Path) -> Result<Vec<PathBuf>, LoadError> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(folder)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && is_image_file(path))
        .collect();
    paths.sort();
    Ok(paths)
}

// ============================================================================
// Open dialogs
// ============================================================================

/// Wraps the native open dialogs and remembers the last-used directory so
/// consecutive opens start where the user left off.
pub struct FileHandler {
    last_dir: Option<PathBuf>,
}

impl FileHandler {
    pub fn new(last_dir: Option<PathBuf>) -> Self {
        Self { last_dir }
    }

    pub fn last_dir(&self) -> Option<&Path> {
        self.last_dir.as_deref()
    }

    /// Remember the directory an image was opened from (by any route,
    /// including drag-and-drop and the CLI path).
    pub fn remember_dir_of(&mut self, path: &Path) {
        if let Some(parent) = path.parent() {
            if parent.as_os_str().is_empty() {
                return;
            }
            self.last_dir = Some(parent.to_path_buf());
        }
    }

    /// Show the native file-open dialog. Returns None if cancelled.
    pub fn pick_image_path(&mut self) -> Option<PathBuf> {
        let mut dialog = rfd::FileDialog::new().add_filter("Images", IMAGE_EXTENSIONS);
        if let Some(dir) = &self.last_dir {
            dialog = dialog.set_directory(dir);
        }
        let path = dialog.pick_file()?;
        self.remember_dir_of(&path);
        Some(path)
    }

    /// Show the native folder-open dialog. Returns None if cancelled.
    pub fn pick_folder_path(&mut self) -> Option<PathBuf> {
        let mut dialog = rfd::FileDialog::new();
        if let Some(dir) = &self.last_dir {
            dialog = dialog.set_directory(dir);
        }
        let folder = dialog.pick_folder()?;
        self.last_dir = Some(folder.clone());
        Some(folder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_image_file() {
        assert!(is_image_file(Path::new("shot.png")));
        assert!(is_image_file(Path::new("shot.PNG")));
        assert!(is_image_file(Path::new("a/b/photo.JPeG")));
        assert!(is_image_file(Path::new("scan.tiff")));

        assert!(!is_image_file(Path::new("notes.txt")));
        assert!(!is_image_file(Path::new("archive.zip")));
        assert!(!is_image_file(Path::new("noext")));
    }

    #[test]
    fn test_extensions_are_lowercase() {
        for ext in IMAGE_EXTENSIONS {
            assert_eq!(*ext, ext.to_lowercase());
        }
    }

    #[test]
    fn test_remember_dir_of() {
        let mut fh = FileHandler::new(None);
        fh.remember_dir_of(Path::new("/data/images/cat.png"));
        assert_eq!(fh.last_dir(), Some(Path::new("/data/images")));

        // A bare filename has no usable parent — keep the previous dir.
        fh.remember_dir_of(Path::new("dog.png"));
        assert_eq!(fh.last_dir(), Some(Path::new("/data/images")));
    }
}
