//! # File Management Module
//!
//! Questo modulo gestisce le operazioni sui file e la discovery degli archivi.
//!
//! ## Responsabilità:
//! - Discovery ricorsiva di archivi CBZ in directory
//! - Riconoscimento dei membri immagine supportati (per estensione)
//! - Utilità per dimensioni su disco e percentuali di risparmio
//! - Formattazione human-readable delle dimensioni
//!
//! ## Formati supportati:
//! - **Archivi**: CBZ (ZIP)
//! - **Immagini in input**: PNG, JPG, JPEG
//!
//! ## Utilità:
//! - `format_size()`: Converte bytes in formato leggibile (KB, MB, GB)
//! - `calculate_savings()`: Calcola percentuale di risparmio (anche negativa)
//!
//! ## Esempio:
//! ```rust,ignore
//! let archives = FileManager::find_archives(Path::new("/comics"));
//! let saved = FileManager::calculate_savings(original as f64, compressed as f64);
//! ```

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Raster extensions accepted as archive image members
pub const SUPPORTED_IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

/// Container extensions accepted as input archives
pub const SUPPORTED_ARCHIVE_EXTENSIONS: &[&str] = &["cbz", "zip"];

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Manages file operations and discovery
pub struct FileManager;

impl FileManager {
    /// Convert a byte count to megabytes
    pub fn size_in_mb(bytes: u64) -> f64 {
        bytes as f64 / BYTES_PER_MB
    }

    /// Find all comic archives below a directory, sorted by path
    pub fn find_archives(dir: &Path) -> Vec<PathBuf> {
        let mut archives: Vec<PathBuf> = WalkDir::new(dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .filter(|path| Self::is_archive(path))
            .collect();

        archives.sort();
        archives
    }

    /// Check if a path has a supported archive extension
    pub fn is_archive(path: &Path) -> bool {
        Self::has_extension(path, SUPPORTED_ARCHIVE_EXTENSIONS)
    }

    /// Check if an archive member name is a supported raster image
    pub fn is_supported_image(name: &str) -> bool {
        !name.ends_with('/') && Self::has_extension(Path::new(name), SUPPORTED_IMAGE_EXTENSIONS)
    }

    fn has_extension(path: &Path, accepted: &[&str]) -> bool {
        match path.extension() {
            Some(ext) => {
                let ext_lower = ext.to_string_lossy().to_lowercase();
                accepted.contains(&ext_lower.as_str())
            }
            None => false,
        }
    }

    /// Get human-readable file size
    pub fn format_size(size: u64) -> String {
        const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
        let mut size = size as f64;
        let mut unit_index = 0;

        while size >= 1024.0 && unit_index < UNITS.len() - 1 {
            size /= 1024.0;
            unit_index += 1;
        }

        if unit_index == 0 {
            format!("{} {}", size as u64, UNITS[unit_index])
        } else {
            format!("{:.2} {}", size, UNITS[unit_index])
        }
    }

    /// Calculate percentage saved going from `original_size` to `new_size`.
    ///
    /// Negative when the output grew; zero when there was nothing to begin with.
    pub fn calculate_savings(original_size: f64, new_size: f64) -> f64 {
        if original_size == 0.0 {
            0.0
        } else {
            ((original_size - new_size) / original_size) * 100.0
        }
    }
}
