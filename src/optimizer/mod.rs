//! # Optimizer Module
//!
//! Separa le responsabilità della ricompressione in sottomoduli:
//! - `batch_optimizer`: Orchestratore principale del batch
//! - `scheduler`: Pool limitato di transcodifica per un archivio
//! - `progress_tracker`: Contatori di progresso single-writer
//! - `path_resolver`: Logica di calcolo path centralizzata

pub mod batch_optimizer;
pub mod path_resolver;
pub mod progress_tracker;
pub mod scheduler;

pub use batch_optimizer::{BatchOptimizer, BatchReport, BatchState};
pub use path_resolver::PathResolver;
pub use progress_tracker::ProgressTracker;
pub use scheduler::{ScheduleOutcome, TranscodeScheduler};
