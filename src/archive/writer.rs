//! # Archive Writer
//!
//! Crea il CBZ di output a partire dalle immagini transcodificate.
//!
//! Lo ZIP viene scritto in un file temporaneo nella directory di destinazione
//! e rinominato sul path finale solo dopo `finish()`: un errore a metà
//! scrittura non lascia mai un archivio parziale al path di output.

use crate::{
    error::{CompressError, Result},
    image_processor::TranscodedEntry,
};
use std::collections::HashSet;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::debug;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Deflate level used for the container (images are already compressed)
const DEFLATE_LEVEL: i32 = 9;

/// Requested mode for output archives, narrowed by the process umask
#[cfg(unix)]
const OUTPUT_MODE: u32 = 0o666;

/// Writes recompressed archives
pub struct ArchiveWriter;

impl ArchiveWriter {
    /// Write `entries` into a new archive at `path`, returning its size on disk
    pub fn create(path: &Path, entries: &[TranscodedEntry]) -> Result<u64> {
        let mut seen = HashSet::with_capacity(entries.len());
        for entry in entries {
            if !seen.insert(entry.output_name.as_str()) {
                return Err(write_error(path, format!("duplicate member name: {}", entry.output_name)));
            }
        }

        let parent = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut temp = output_temp_file(parent).map_err(|e| write_error(path, e.to_string()))?;

        let options = FileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .compression_level(Some(DEFLATE_LEVEL));

        {
            let mut zip = ZipWriter::new(temp.as_file_mut());
            for entry in entries {
                zip.start_file(entry.output_name.as_str(), options)
                    .map_err(|e| write_error(path, e.to_string()))?;
                zip.write_all(&entry.encoded_bytes)
                    .map_err(|e| write_error(path, e.to_string()))?;
            }
            zip.finish().map_err(|e| write_error(path, e.to_string()))?;
        }

        temp.as_file()
            .sync_all()
            .map_err(|e| write_error(path, e.to_string()))?;
        temp.persist(path).map_err(|e| write_error(path, e.error.to_string()))?;

        let size = std::fs::metadata(path)
            .map_err(|e| write_error(path, e.to_string()))?
            .len();
        debug!("Wrote {} ({} members, {} bytes)", path.display(), entries.len(), size);
        Ok(size)
    }
}

/// Temp file created with the mode a plain `File::create` would get (0o666 minus umask)
#[cfg(unix)]
fn output_temp_file(dir: &Path) -> std::io::Result<NamedTempFile> {
    use std::os::unix::fs::PermissionsExt;

    tempfile::Builder::new()
        .permissions(std::fs::Permissions::from_mode(OUTPUT_MODE))
        .tempfile_in(dir)
}

#[cfg(not(unix))]
fn output_temp_file(dir: &Path) -> std::io::Result<NamedTempFile> {
    NamedTempFile::new_in(dir)
}

fn write_error(path: &Path, reason: impl Into<String>) -> CompressError {
    CompressError::WriteError {
        path: path.to_path_buf(),
        reason: reason.into(),
    }
}
