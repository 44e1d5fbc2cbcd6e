//! # CBZ Optimizer Library
//!
//! Questo è il modulo principale della libreria che espone tutte le API pubbliche.
//!
//! ## Responsabilità:
//! - Definisce la struttura modulare dell'applicazione
//! - Espone i tipi e le funzioni principali tramite re-exports
//! - Fornisce un'interfaccia pulita per il main.rs e per altri consumatori
//!
//! ## Architettura dei moduli:
//! - `config`: Gestione configurazione e validazione parametri
//! - `error`: Tipi di errore custom per ogni fase della pipeline
//! - `archive`: Lettura/validazione CBZ e scrittura atomica dell'output
//! - `image_processor`: Transcodifica immagini (JPEG/PNG -> WebP/JPEG)
//! - `optimizer`: Scheduler parallelo e orchestratore del batch
//! - `progress`: Snapshot di progresso, statistiche e progress bar
//! - `file_manager`: Discovery archivi e utility su dimensioni
//! - `json_output`: Eventi JSON per consumatori programmatici
//! - `cancel`: Token di cancellazione cooperativa
//!
//! ## Utilizzo:
//! ```rust,ignore
//! use cbz_optimizer::{BatchOptimizer, CancelToken, Config};
//!
//! let mut optimizer = BatchOptimizer::new(Config::default())?;
//! let report = optimizer.run_batch(&paths, |_| {}, &CancelToken::new()).await;
//! let stats = report.into_result()?;
//! ```

pub mod archive;
pub mod cancel;
pub mod config;
pub mod error;
pub mod file_manager;
pub mod image_processor;
pub mod json_output;
pub mod optimizer;
pub mod progress;

#[cfg(test)]
pub(crate) mod test_support;

pub use cancel::CancelToken;
pub use config::{Config, ExtractionStrategy, OutputFormat};
pub use error::CompressError;
pub use optimizer::{BatchOptimizer, BatchReport, BatchState};
pub use progress::{BatchResult, ProgressSnapshot};
