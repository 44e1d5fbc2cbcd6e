//! # Archive Reader
//!
//! Apertura, validazione ed enumerazione dei membri immagine di un CBZ.
//!
//! ## Responsabilità:
//! - Valida path, estensione, firma ZIP e presenza di almeno un membro
//! - Elenca i membri immagine (PNG/JPEG) in ordine di archivio
//! - Legge un singolo membro in memoria
//! - Materializza le immagini in memoria o in una directory temporanea
//!   che viene rimossa ricorsivamente al drop, su ogni percorso di uscita
//!
//! Tutte le operazioni sono sincrone: l'orchestratore le esegue dentro
//! `spawn_blocking` per non bloccare il runtime.

use crate::{
    config::ExtractionStrategy,
    error::{CompressError, Result},
    file_manager::FileManager,
};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::debug;
use zip::ZipArchive;

/// Local file header signature
const ZIP_LOCAL_HEADER: [u8; 4] = *b"PK\x03\x04";
/// End of central directory signature (archive without members)
const ZIP_EMPTY_ARCHIVE: [u8; 4] = *b"PK\x05\x06";

const TEMP_DIR_PREFIX: &str = ".cbz-optimizer-";

/// Upper bound on the buffer reserved from a member's declared size
const MAX_PREALLOCATION: u64 = 64 << 20;

/// A validated source archive
#[derive(Debug, Clone)]
pub struct ArchiveHandle {
    path: PathBuf,
    size: u64,
    members: Vec<String>,
}

impl ArchiveHandle {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Size of the archive on disk in bytes
    pub fn size(&self) -> u64 {
        self.size
    }

    /// All member names, in archive order
    pub fn members(&self) -> &[String] {
        &self.members
    }
}

/// Where the raw bytes of an image member currently live
#[derive(Debug)]
enum ImageData {
    InMemory(Vec<u8>),
    OnDisk(PathBuf),
}

/// A raster image member waiting to be transcoded
#[derive(Debug)]
pub struct ImageEntry {
    name: String,
    data: ImageData,
}

impl ImageEntry {
    pub fn in_memory(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            data: ImageData::InMemory(bytes),
        }
    }

    pub(crate) fn on_disk(name: impl Into<String>, path: PathBuf) -> Self {
        Self {
            name: name.into(),
            data: ImageData::OnDisk(path),
        }
    }

    /// Original member path inside the archive
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Consume the entry, returning its name and raw bytes
    pub fn into_parts(self) -> Result<(String, Vec<u8>)> {
        let bytes = match self.data {
            ImageData::InMemory(bytes) => bytes,
            ImageData::OnDisk(path) => std::fs::read(&path)?,
        };
        Ok((self.name, bytes))
    }
}

/// Image entries of one archive plus the scoped storage backing them
#[derive(Debug)]
pub struct LoadedImages {
    pub entries: Vec<ImageEntry>,
    /// Dropping this removes the extraction directory
    pub workspace: Option<TempDir>,
}

/// Reads and validates comic archives
pub struct ArchiveReader;

impl ArchiveReader {
    /// Open and validate an archive
    pub fn open(path: &Path) -> Result<ArchiveHandle> {
        if !path.exists() {
            return Err(invalid(path, "file does not exist"));
        }
        if !path.is_file() {
            return Err(invalid(path, "not a regular file"));
        }
        if !FileManager::is_archive(path) {
            return Err(invalid(path, "file is not a CBZ file"));
        }

        let size = std::fs::metadata(path)?.len();
        Self::check_signature(path)?;

        let mut archive = Self::zip(path)?;
        let mut members = Vec::with_capacity(archive.len());
        for i in 0..archive.len() {
            let file = archive
                .by_index_raw(i)
                .map_err(|e| corrupt(path, e.to_string()))?;
            members.push(file.name().to_string());
        }

        if members.is_empty() {
            return Err(CompressError::EmptyArchive { path: path.to_path_buf() });
        }

        debug!("Opened {} ({} members, {} bytes)", path.display(), members.len(), size);
        Ok(ArchiveHandle {
            path: path.to_path_buf(),
            size,
            members,
        })
    }

    /// Names of the raster image members, in archive order
    pub fn list_image_entries(handle: &ArchiveHandle) -> Vec<String> {
        handle
            .members
            .iter()
            .filter(|name| FileManager::is_supported_image(name))
            .cloned()
            .collect()
    }

    /// Read one member's bytes into memory
    pub fn read_entry(handle: &ArchiveHandle, name: &str) -> Result<Vec<u8>> {
        let mut archive = Self::zip(&handle.path)?;
        Self::read_member(&mut archive, &handle.path, name)
    }

    /// Materialize every image member according to `strategy`.
    ///
    /// With [`ExtractionStrategy::TempDir`] the members land in a fresh
    /// directory created inside `scratch_parent`.
    pub fn load_images(
        handle: &ArchiveHandle,
        strategy: ExtractionStrategy,
        scratch_parent: &Path,
    ) -> Result<LoadedImages> {
        let mut archive = Self::zip(&handle.path)?;
        let workspace = match strategy {
            ExtractionStrategy::InMemory => None,
            ExtractionStrategy::TempDir => Some(
                tempfile::Builder::new()
                    .prefix(TEMP_DIR_PREFIX)
                    .tempdir_in(scratch_parent)?,
            ),
        };

        let names = Self::list_image_entries(handle);
        let mut entries = Vec::with_capacity(names.len());
        for name in names {
            let entry = match &workspace {
                None => {
                    let data = Self::read_member(&mut archive, &handle.path, &name)?;
                    ImageEntry::in_memory(name, data)
                }
                Some(dir) => {
                    let mut file = archive
                        .by_name(&name)
                        .map_err(|e| corrupt(&handle.path, format!("cannot read member {}: {}", name, e)))?;
                    let relative = file
                        .enclosed_name()
                        .map(Path::to_path_buf)
                        .ok_or_else(|| corrupt(&handle.path, format!("unsafe member path: {}", name)))?;
                    let target = dir.path().join(relative);
                    if let Some(parent) = target.parent() {
                        std::fs::create_dir_all(parent)?;
                    }
                    let mut out = File::create(&target)?;
                    std::io::copy(&mut file, &mut out)
                        .map_err(|e| corrupt(&handle.path, format!("cannot extract member {}: {}", name, e)))?;
                    ImageEntry::on_disk(name, target)
                }
            };
            entries.push(entry);
        }

        if let Some(dir) = &workspace {
            debug!("Extracted {} images to {}", entries.len(), dir.path().display());
        }
        Ok(LoadedImages { entries, workspace })
    }

    fn read_member(archive: &mut ZipArchive<BufReader<File>>, path: &Path, name: &str) -> Result<Vec<u8>> {
        let mut file = archive
            .by_name(name)
            .map_err(|e| corrupt(path, format!("cannot read member {}: {}", name, e)))?;

        let mut data = Vec::with_capacity(preallocation(file.size()));
        file.read_to_end(&mut data)
            .map_err(|e| corrupt(path, format!("cannot read member {}: {}", name, e)))?;
        Ok(data)
    }

    fn check_signature(path: &Path) -> Result<()> {
        let mut signature = [0u8; 4];
        let mut file = File::open(path)?;
        if file.read_exact(&mut signature).is_err() {
            return Err(corrupt(path, "file too short to be a ZIP container"));
        }
        if signature != ZIP_LOCAL_HEADER && signature != ZIP_EMPTY_ARCHIVE {
            return Err(corrupt(path, "missing ZIP signature"));
        }
        Ok(())
    }

    fn zip(path: &Path) -> Result<ZipArchive<BufReader<File>>> {
        let reader = BufReader::new(File::open(path)?);
        ZipArchive::new(reader).map_err(|e| corrupt(path, format!("invalid CBZ file format: {}", e)))
    }
}

/// Buffer size to reserve for a member, never trusting the header beyond a bound
fn preallocation(declared_size: u64) -> usize {
    declared_size.min(MAX_PREALLOCATION) as usize
}

fn invalid(path: &Path, reason: impl Into<String>) -> CompressError {
    CompressError::InvalidArchive {
        path: path.to_path_buf(),
        reason: reason.into(),
    }
}

fn corrupt(path: &Path, reason: impl Into<String>) -> CompressError {
    CompressError::CorruptArchive {
        path: path.to_path_buf(),
        reason: reason.into(),
    }
}
