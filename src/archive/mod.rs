//! # Archive Module
//!
//! Lettura e scrittura dei contenitori CBZ (ZIP):
//! - `reader`: validazione, enumerazione e materializzazione delle immagini
//! - `writer`: creazione atomica del CBZ ricompresso

pub mod reader;
pub mod writer;

pub use reader::{ArchiveHandle, ArchiveReader, ImageEntry, LoadedImages};
pub use writer::ArchiveWriter;
