//! # Error Types Module
//!
//! Questo modulo definisce tutti i tipi di errore della pipeline di ricompressione.
//!
//! ## Responsabilità:
//! - Definisce `CompressError` per categorizzare ogni fallimento possibile
//! - Distingue errori pre-flight (archivio), per-immagine e di scrittura
//! - Tratta la cancellazione come esito terminale distinto, non come guasto
//! - Avvolge l'errore originale con il path dell'archivio che l'ha causato
//!
//! ## Categorie di errori:
//! - `InvalidArchive` / `CorruptArchive` / `EmptyArchive`: validazione sorgente
//! - `DecodeError` / `EncodeError`: transcodifica di un singolo membro
//! - `WriteError`: creazione dell'archivio di output
//! - `Cancelled`: abort richiesto dal chiamante
//! - `Batch`: wrapper a livello batch con il path dell'archivio fallito
//!
//! ## Esempio:
//! ```rust,ignore
//! if names.is_empty() {
//!     return Err(CompressError::EmptyArchive { path: path.to_path_buf() });
//! }
//! ```

use std::path::PathBuf;

/// Convenient crate-wide result type
pub type Result<T> = std::result::Result<T, CompressError>;

/// Error types for archive recompression
#[derive(thiserror::Error, Debug)]
pub enum CompressError {
    #[error("Invalid archive {}: {reason}", path.display())]
    InvalidArchive { path: PathBuf, reason: String },

    #[error("Corrupt archive {}: {reason}", path.display())]
    CorruptArchive { path: PathBuf, reason: String },

    #[error("Archive contains no images: {}", path.display())]
    EmptyArchive { path: PathBuf },

    #[error("Failed to decode {member}: {reason}")]
    DecodeError { member: String, reason: String },

    #[error("Failed to encode {member}: {reason}")]
    EncodeError { member: String, reason: String },

    #[error("Failed to write archive {}: {reason}", path.display())]
    WriteError { path: PathBuf, reason: String },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Processing failed for {}: {source}", path.display())]
    Batch {
        path: PathBuf,
        #[source]
        source: Box<CompressError>,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Worker task failed: {0}")]
    Task(String),
}

impl CompressError {
    /// Wraps a per-archive error with the archive that triggered it
    pub fn in_archive(self, path: impl Into<PathBuf>) -> Self {
        match self {
            Self::Cancelled => Self::Cancelled,
            other => Self::Batch {
                path: path.into(),
                source: Box::new(other),
            },
        }
    }

    /// Image member that caused the failure, when known
    pub fn member(&self) -> Option<&str> {
        match self {
            Self::DecodeError { member, .. } | Self::EncodeError { member, .. } => Some(member),
            Self::Batch { source, .. } => source.member(),
            _ => None,
        }
    }

    /// Archive path that caused a batch-level failure
    pub fn archive(&self) -> Option<&std::path::Path> {
        match self {
            Self::Batch { path, .. } => Some(path),
            _ => None,
        }
    }

    /// Short stable label for the error kind (used by JSON output)
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidArchive { .. } => "invalid_archive",
            Self::CorruptArchive { .. } => "corrupt_archive",
            Self::EmptyArchive { .. } => "empty_archive",
            Self::DecodeError { .. } => "decode_error",
            Self::EncodeError { .. } => "encode_error",
            Self::WriteError { .. } => "write_error",
            Self::Cancelled => "cancelled",
            Self::Batch { source, .. } => source.kind(),
            Self::Io(_) => "io",
            Self::Config(_) => "config",
            Self::Task(_) => "task",
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_wrapper_exposes_member_and_kind() {
        let err = CompressError::DecodeError {
            member: "pages/003.jpg".to_string(),
            reason: "unexpected EOF".to_string(),
        }
        .in_archive("/comics/vol1.cbz");

        assert_eq!(err.member(), Some("pages/003.jpg"));
        assert_eq!(err.kind(), "decode_error");
        assert_eq!(err.archive(), Some(std::path::Path::new("/comics/vol1.cbz")));
        assert!(err.to_string().contains("vol1.cbz"));
        assert!(err.to_string().contains("pages/003.jpg"));
    }

    #[test]
    fn test_cancelled_is_never_wrapped() {
        let err = CompressError::Cancelled.in_archive("/comics/vol2.cbz");
        assert!(err.is_cancelled());
        assert_eq!(err.archive(), None);
    }
}
