use std::path::{Path, PathBuf};
use walkdir::WalkDir;
use crate::error::{SwaywpError, ImageDiscoveryError, InputError};
use crate::Result;

const SUPPORTED_EXTENSIONS: [&str; 6] = ["jpg", "jpeg", "png", "gif", "bmp", "webp"];

/// Source of the current image set. Called fresh on every tick, so the folder
/// may change between calls.
pub trait ImageSource {
    /// Images in `folder`, sorted by file name. Never fails: a missing or
    /// unreadable folder is an empty set.
    fn list_images(&self, folder: &Path) -> Vec<PathBuf>;
}

impl<T: ImageSource + ?Sized> ImageSource for &T {
    fn list_images(&self, folder: &Path) -> Vec<PathBuf> {
        (**self).list_images(folder)
    }
}

/// Lists supported images directly inside a folder.
pub struct ImageDiscovery;

impl ImageDiscovery {
    pub fn discover_images(path: &Path) -> Result<Vec<PathBuf>> {
        if !path.is_dir() {
            return Err(SwaywpError::ImageDiscovery(ImageDiscoveryError::DirectoryRead {
                path: path.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "Directory not found"),
            }));
        }

        let mut images = Vec::new();

        for entry in WalkDir::new(path)
            .min_depth(1)
            .max_depth(1)
            .follow_links(true)
            .sort_by_file_name()
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    // The folder itself being unreadable is reported as such
                    if e.depth() == 0 {
                        return Err(SwaywpError::ImageDiscovery(ImageDiscoveryError::DirectoryRead {
                            path: path.to_path_buf(),
                            source: e.into(),
                        }));
                    }
                    log::warn!("Skipping unreadable entry in {:?}: {}", path, e);
                    continue;
                }
            };

            if entry.file_type().is_file() && Self::is_supported(entry.path()) {
                images.push(entry.into_path());
            }
        }

        log::debug!("Discovered {} images in {:?}", images.len(), path);
        Ok(images)
    }

    /// Checks a path given on the command line before anything is spawned.
    pub fn validate_image(path: &Path) -> Result<()> {
        if !path.exists() {
            return Err(InputError::NotFound { path: path.to_path_buf() }.into());
        }

        if !path.is_file() {
            return Err(InputError::NotAFile { path: path.to_path_buf() }.into());
        }

        if !Self::is_supported(path) {
            return Err(InputError::UnsupportedFormat { path: path.to_path_buf() }.into());
        }

        Ok(())
    }

    pub fn is_supported(path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| SUPPORTED_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
            .unwrap_or(false)
    }
}

/// [`ImageSource`] backed by the filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct FolderImages;

impl ImageSource for FolderImages {
    fn list_images(&self, folder: &Path) -> Vec<PathBuf> {
        match ImageDiscovery::discover_images(folder) {
            Ok(images) => images,
            Err(e) => {
                log::warn!("{}", crate::ErrorReporting::user_friendly_message(&e));
                Vec::new()
            }
        }
    }
}
