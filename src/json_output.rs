//! # JSON Output Module
//!
//! Questo modulo gestisce l'output strutturato in JSON per comunicazione con altri processi.
//!
//! ## Responsabilità:
//! - Emette un messaggio JSON per riga su stdout per ogni evento del batch
//! - Riutilizza `ProgressSnapshot` e `BatchResult` senza duplicarne i campi
//! - Espone il tipo di errore in forma stabile (`kind`) oltre al messaggio
//!
//! ## Tipi di messaggi:
//! - `start`: Inizio del batch con configurazione effettiva
//! - `archive_start`: Inizio elaborazione di un archivio
//! - `progress`: Progresso corrente (immagini processate, velocità, ETA)
//! - `complete`: Fine batch con stato finale e statistiche
//! - `error`: Errore che ha fermato il batch

use crate::{
    config::{Config, ExtractionStrategy, OutputFormat},
    error::CompressError,
    optimizer::BatchState,
    progress::{BatchResult, ProgressSnapshot},
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Tipo di messaggio JSON
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum JsonMessage {
    /// Inizio del batch
    #[serde(rename = "start")]
    Start {
        total_archives: usize,
        output_dir: PathBuf,
        config: JsonConfig,
    },

    /// Inizio elaborazione di un archivio
    #[serde(rename = "archive_start")]
    ArchiveStart {
        path: PathBuf,
        index: usize,
        total: usize,
        images: usize,
    },

    /// Progresso corrente
    #[serde(rename = "progress")]
    Progress {
        #[serde(flatten)]
        snapshot: ProgressSnapshot,
        percentage: f64,
        eta_seconds: Option<f64>,
    },

    /// Batch terminato (completato o interrotto)
    #[serde(rename = "complete")]
    Complete {
        state: BatchState,
        #[serde(flatten)]
        result: BatchResult,
        duration_seconds: f64,
    },

    /// Errore che ha fermato il batch
    #[serde(rename = "error")]
    Error {
        kind: String,
        message: String,
        archive: Option<PathBuf>,
        member: Option<String>,
    },
}

/// Configurazione per output JSON
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonConfig {
    pub quality: u8,
    pub output_format: OutputFormat,
    pub workers: usize,
    pub extraction: ExtractionStrategy,
}

impl JsonMessage {
    /// Emette il messaggio JSON su stdout
    pub fn emit(&self) {
        if let Ok(json) = serde_json::to_string(self) {
            println!("{}", json);
        }
    }

    pub fn start(total_archives: usize, config: &Config) -> Self {
        Self::Start {
            total_archives,
            output_dir: config.output_dir.clone(),
            config: JsonConfig::from(config),
        }
    }

    pub fn archive_start(path: PathBuf, snapshot: &ProgressSnapshot) -> Self {
        Self::ArchiveStart {
            path,
            index: snapshot.archive_index,
            total: snapshot.total_archives,
            images: snapshot.total_images,
        }
    }

    /// Crea un messaggio di progresso
    pub fn progress(snapshot: &ProgressSnapshot) -> Self {
        Self::Progress {
            percentage: snapshot.percentage(),
            eta_seconds: snapshot.eta_seconds(),
            snapshot: snapshot.clone(),
        }
    }

    pub fn complete(state: BatchState, result: &BatchResult, duration_seconds: f64) -> Self {
        Self::Complete {
            state,
            result: result.clone(),
            duration_seconds,
        }
    }

    /// Crea un messaggio di errore
    pub fn error(error: &CompressError) -> Self {
        Self::Error {
            kind: error.kind().to_string(),
            message: error.to_string(),
            archive: error.archive().map(|p| p.to_path_buf()),
            member: error.member().map(str::to_string),
        }
    }
}

/// Converti Config in JsonConfig
impl From<&Config> for JsonConfig {
    fn from(config: &Config) -> Self {
        Self {
            quality: config.quality,
            output_format: config.output_format,
            workers: config.parallelism(),
            extraction: config.extraction,
        }
    }
}
