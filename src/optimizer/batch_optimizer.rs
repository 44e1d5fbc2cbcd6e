//! # Batch Optimizer Main Orchestrator
//!
//! Orchestratore principale: processa gli archivi in sequenza delegando
//! lettura, transcodifica e scrittura ai moduli specializzati.
//!
//! ## Macchina a stati:
//! `Idle -> Running -> {Completed, Aborted, Failed}`
//!
//! ## Per ogni archivio:
//! 1. Checkpoint di cancellazione
//! 2. Validazione e dimensione originale su disco
//! 3. Materializzazione immagini (memoria o directory temporanea)
//! 4. Transcodifica parallela con progress
//! 5. Scrittura atomica del CBZ di output e accumulo statistiche
//!
//! Un errore ferma il batch (fail-fast) ma gli archivi già completati restano
//! validi e inclusi nei totali.

use crate::{
    archive::{ArchiveReader, ArchiveWriter, LoadedImages},
    cancel::CancelToken,
    config::Config,
    error::{CompressError, Result},
    file_manager::FileManager,
    image_processor::ImageProcessor,
    optimizer::{
        path_resolver::PathResolver,
        progress_tracker::ProgressTracker,
        scheduler::{ScheduleOutcome, TranscodeScheduler},
    },
    progress::{BatchResult, ProgressSnapshot},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, error, info, warn};

/// Lifecycle of a batch run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchState {
    Idle,
    Running,
    Completed,
    Aborted,
    Failed,
}

/// Final state of a batch with the statistics gathered up to that point
#[derive(Debug)]
pub struct BatchReport {
    pub state: BatchState,
    pub result: BatchResult,
    /// Set when `state` is `Failed`
    pub error: Option<CompressError>,
}

impl BatchReport {
    /// Statistics on completion, otherwise the failure (or `Cancelled`)
    pub fn into_result(self) -> Result<BatchResult> {
        match (self.state, self.error) {
            (_, Some(e)) => Err(e),
            (BatchState::Aborted, None) => Err(CompressError::Cancelled),
            _ => Ok(self.result),
        }
    }
}

/// What happened to a single archive
enum ArchiveOutcome {
    Processed {
        original_size: u64,
        compressed_size: u64,
        output_path: PathBuf,
    },
    Cancelled,
}

/// Orchestratore del batch di archivi
pub struct BatchOptimizer {
    config: Config,
    scheduler: TranscodeScheduler,
    state: BatchState,
}

impl BatchOptimizer {
    /// Crea nuova istanza validando la configurazione
    pub fn new(config: Config) -> Result<Self> {
        config
            .validate()
            .map_err(|e| CompressError::Config(e.to_string()))?;

        let scheduler = TranscodeScheduler::new(ImageProcessor::new(config.output_format), config.parallelism());
        Ok(Self {
            config,
            scheduler,
            state: BatchState::Idle,
        })
    }

    pub fn state(&self) -> BatchState {
        self.state
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Process `archive_paths` in order, reporting progress through `on_progress`.
    ///
    /// Always returns a report; use [`BatchReport::into_result`] for a plain `Result`.
    pub async fn run_batch<F>(&mut self, archive_paths: &[PathBuf], mut on_progress: F, cancel: &CancelToken) -> BatchReport
    where
        F: FnMut(&ProgressSnapshot) + Send,
    {
        let total_archives = archive_paths.len();
        let mut result = BatchResult::new(total_archives);
        let mut failure = None;

        self.state = BatchState::Running;
        self.log_configuration(total_archives);

        if let Err(e) = PathResolver::ensure_distinct_outputs(archive_paths, &self.config.output_dir) {
            error!("[ERROR] {}", e);
            failure = Some(e);
            self.state = BatchState::Failed;
        }

        for (i, input_path) in archive_paths.iter().enumerate() {
            if self.state != BatchState::Running {
                break;
            }
            if cancel.is_cancelled() {
                info!("Abort requested, skipping remaining {} archives", total_archives - i);
                self.state = BatchState::Aborted;
                break;
            }

            info!("Processing archive {}/{}: {}", i + 1, total_archives, input_path.display());
            match self
                .process_archive(input_path, i + 1, total_archives, &mut on_progress, cancel)
                .await
            {
                Ok(ArchiveOutcome::Processed {
                    original_size,
                    compressed_size,
                    output_path,
                }) => {
                    result.add_archive(original_size, compressed_size);
                    info!(
                        "[OK] {} -> {}: {} -> {} ({:.1}% saved)",
                        input_path.display(),
                        output_path.display(),
                        FileManager::format_size(original_size),
                        FileManager::format_size(compressed_size),
                        FileManager::calculate_savings(original_size as f64, compressed_size as f64)
                    );
                }
                Ok(ArchiveOutcome::Cancelled) => {
                    info!("Archive {} aborted", input_path.display());
                    self.state = BatchState::Aborted;
                    break;
                }
                Err(e) if e.is_cancelled() || cancel.is_cancelled() => {
                    warn!("Archive {} stopped after abort request: {}", input_path.display(), e);
                    self.state = BatchState::Aborted;
                    break;
                }
                Err(e) => {
                    let e = e.in_archive(input_path);
                    error!("[ERROR] {}", e);
                    failure = Some(e);
                    self.state = BatchState::Failed;
                    break;
                }
            }
        }

        if self.state == BatchState::Running {
            self.state = BatchState::Completed;
        }
        result.finalize();
        info!("Batch {:?}: {}", self.state, result.format_summary());

        BatchReport {
            state: self.state,
            result,
            error: failure,
        }
    }

    /// Processa un singolo archivio end-to-end
    async fn process_archive<F>(
        &self,
        input_path: &Path,
        archive_index: usize,
        total_archives: usize,
        on_progress: &mut F,
        cancel: &CancelToken,
    ) -> Result<ArchiveOutcome>
    where
        F: FnMut(&ProgressSnapshot) + Send,
    {
        let path = input_path.to_path_buf();
        let handle = blocking(move || ArchiveReader::open(&path)).await?;
        let original_size = handle.size();
        let output_path = PathResolver::output_archive_path(input_path, &self.config.output_dir)?;

        let strategy = self.config.extraction;
        let scratch = self.config.output_dir.clone();
        let LoadedImages { entries, workspace } =
            blocking(move || ArchiveReader::load_images(&handle, strategy, &scratch)).await?;

        if entries.is_empty() {
            Self::release_workspace(workspace);
            return Err(CompressError::EmptyArchive {
                path: input_path.to_path_buf(),
            });
        }

        let tracker = ProgressTracker::new(entries.len(), archive_index, total_archives);
        on_progress(&tracker.snapshot(""));
        debug!(
            "{} images, {} workers, original size {}",
            entries.len(),
            self.scheduler.parallelism(),
            FileManager::format_size(original_size)
        );

        let outcome = self
            .scheduler
            .run(entries, self.config.quality, tracker, on_progress, cancel)
            .await;
        Self::release_workspace(workspace);

        let transcoded = match outcome {
            ScheduleOutcome::Completed(transcoded) => transcoded,
            ScheduleOutcome::Cancelled => return Ok(ArchiveOutcome::Cancelled),
            ScheduleOutcome::Failed(e) => return Err(e),
        };

        let destination = output_path.clone();
        let compressed_size = blocking(move || ArchiveWriter::create(&destination, &transcoded)).await?;

        Ok(ArchiveOutcome::Processed {
            original_size,
            compressed_size,
            output_path,
        })
    }

    /// Remove the extraction directory, if any
    fn release_workspace(workspace: Option<TempDir>) {
        if let Some(dir) = workspace {
            let path = dir.path().to_path_buf();
            match dir.close() {
                Ok(()) => debug!("Removed extraction directory {}", path.display()),
                Err(e) => warn!("Failed to remove extraction directory {}: {}", path.display(), e),
            }
        }
    }

    /// Logga configurazione
    fn log_configuration(&self, total_archives: usize) {
        info!(
            "Recompressing {} archives to {:?} (quality: {})",
            total_archives, self.config.output_format, self.config.quality
        );
        info!("Output directory: {}", self.config.output_dir.display());
        debug!(
            "Workers: {}, extraction: {:?}",
            self.scheduler.parallelism(),
            self.config.extraction
        );
    }
}

/// Run blocking archive I/O off the async runtime
async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| CompressError::Task(e.to_string()))?
}
