//! # Progress Tracking Module
//!
//! Aggregatore single-writer dei contatori di un archivio.
//!
//! Lo possiede esclusivamente il loop dello scheduler: i worker non lo
//! toccano mai, restituiscono solo risultati. Niente lock, niente race.

use crate::progress::ProgressSnapshot;
use std::time::Instant;

/// Counters for the archive currently being transcoded
#[derive(Debug)]
pub struct ProgressTracker {
    archive_index: usize,
    total_archives: usize,
    total_images: usize,
    processed_images: usize,
    started: Instant,
}

impl ProgressTracker {
    /// Crea un nuovo tracker; la velocità è misurata da questo istante
    pub fn new(total_images: usize, archive_index: usize, total_archives: usize) -> Self {
        Self {
            archive_index,
            total_archives,
            total_images,
            processed_images: 0,
            started: Instant::now(),
        }
    }

    /// Restart the speed clock (called when the scheduler begins dispatching)
    pub fn restart_clock(&mut self) {
        self.started = Instant::now();
    }

    pub fn processed(&self) -> usize {
        self.processed_images
    }

    pub fn total(&self) -> usize {
        self.total_images
    }

    /// Registra un'immagine completata e restituisce lo snapshot aggiornato
    pub fn record_completion(&mut self, file_name: &str) -> ProgressSnapshot {
        self.processed_images += 1;
        self.snapshot(file_name)
    }

    /// Snapshot of the current counters
    pub fn snapshot(&self, current_file_name: &str) -> ProgressSnapshot {
        let elapsed = self.started.elapsed().as_secs_f64();
        let images_per_second = if elapsed > 0.0 {
            self.processed_images as f64 / elapsed
        } else {
            0.0
        };

        ProgressSnapshot {
            archive_index: self.archive_index,
            total_archives: self.total_archives,
            total_images: self.total_images,
            processed_images: self.processed_images,
            current_file_name: current_file_name.to_string(),
            images_per_second,
        }
    }
}
