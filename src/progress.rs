//! # Progress Tracking and Statistics Module
//!
//! Questo modulo definisce gli eventi di progresso, le statistiche aggregate
//! del batch e il rendering della progress bar.
//!
//! ## Responsabilità:
//! - `ProgressSnapshot`: stato corrente immagini/archivi, velocità ed ETA
//! - `BatchResult`: dimensioni totali prima/dopo e percentuale di risparmio
//! - `progress_channel()`: adatta la callback a un canale tokio per la UI
//! - `ProgressManager`: progress bar visuale con `indicatif`
//!
//! ## Visual feedback:
//! ```text
//! ⠋ [00:00:12] Archive 2/5 [=========>------------] 41/96 (42%) 8.3 img/s | ETA 7 seconds | 041.webp
//! ```
//!
//! ## Esempio:
//! ```rust,ignore
//! let (callback, mut rx) = progress_channel();
//! tokio::spawn(async move { optimizer.run_batch(&paths, callback, &cancel).await });
//! while let Some(snapshot) = rx.recv().await {
//!     bar.update(&snapshot);
//! }
//! ```

use crate::file_manager::FileManager;
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::mpsc;

const SECONDS_IN_MINUTE: f64 = 60.0;
const SECONDS_IN_HOUR: f64 = 3600.0;

/// Read-only view of the pipeline's progress
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    /// 1-based index of the archive in flight
    pub archive_index: usize,
    pub total_archives: usize,
    pub total_images: usize,
    pub processed_images: usize,
    /// Output name of the most recently completed image
    pub current_file_name: String,
    pub images_per_second: f64,
}

impl ProgressSnapshot {
    /// Percentage of the current archive's images done
    pub fn percentage(&self) -> f64 {
        if self.total_images == 0 {
            0.0
        } else {
            (self.processed_images as f64 / self.total_images as f64) * 100.0
        }
    }

    /// Estimated seconds left for the current archive, if a speed is known
    pub fn eta_seconds(&self) -> Option<f64> {
        if self.images_per_second > 0.0 {
            let remaining = self.total_images.saturating_sub(self.processed_images);
            Some(remaining as f64 / self.images_per_second)
        } else {
            None
        }
    }

    /// ETA rendered as seconds, minutes or hours
    pub fn format_eta(&self) -> String {
        match self.eta_seconds() {
            Some(secs) => format_eta(secs),
            None => "-".to_string(),
        }
    }
}

/// Human-readable duration for an ETA
pub fn format_eta(secs: f64) -> String {
    if secs < SECONDS_IN_MINUTE {
        format!("{:.0} seconds", secs)
    } else if secs < SECONDS_IN_HOUR {
        format!("{:.1} minutes", secs / SECONDS_IN_MINUTE)
    } else {
        format!("{:.1} hours", secs / SECONDS_IN_HOUR)
    }
}

/// Callback that forwards every snapshot into an unbounded channel
pub fn progress_channel() -> (
    impl FnMut(&ProgressSnapshot) + Send + 'static,
    mpsc::UnboundedReceiver<ProgressSnapshot>,
) {
    let (tx, rx) = mpsc::unbounded_channel();
    let callback = move |snapshot: &ProgressSnapshot| {
        // Receiver gone means nobody is watching anymore
        let _ = tx.send(snapshot.clone());
    };
    (callback, rx)
}

/// Aggregate statistics for a batch run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchResult {
    pub total_files: usize,
    pub processed_files: usize,
    pub total_original_size_bytes: u64,
    pub total_compressed_size_bytes: u64,
    pub savings_percent: f64,
}

impl BatchResult {
    pub fn new(total_files: usize) -> Self {
        Self {
            total_files,
            ..Default::default()
        }
    }

    /// Account one fully written archive
    pub fn add_archive(&mut self, original_size: u64, compressed_size: u64) {
        self.processed_files += 1;
        self.total_original_size_bytes += original_size;
        self.total_compressed_size_bytes += compressed_size;
    }

    /// Compute `savings_percent` from the accumulated totals
    pub fn finalize(&mut self) {
        self.savings_percent = FileManager::calculate_savings(
            self.total_original_size_bytes as f64,
            self.total_compressed_size_bytes as f64,
        );
    }

    pub fn total_original_size_mb(&self) -> f64 {
        FileManager::size_in_mb(self.total_original_size_bytes)
    }

    pub fn total_compressed_size_mb(&self) -> f64 {
        FileManager::size_in_mb(self.total_compressed_size_bytes)
    }

    pub fn format_summary(&self) -> String {
        format!(
            "Files processed: {}/{} | Original size: {:.2} MB | Compressed size: {:.2} MB | Space saved: {:.1}%",
            self.processed_files,
            self.total_files,
            self.total_original_size_mb(),
            self.total_compressed_size_mb(),
            self.savings_percent
        )
    }
}

/// Manages progress reporting in the terminal
#[derive(Clone)]
pub struct ProgressManager {
    bar: ProgressBar,
}

impl ProgressManager {
    /// Create a new progress manager
    pub fn new() -> Self {
        let bar = ProgressBar::new(0);

        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] {prefix} [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );

        bar.enable_steady_tick(Duration::from_millis(100));

        Self { bar }
    }

    /// Reset the bar for a new archive
    pub fn start_archive(&self, snapshot: &ProgressSnapshot, name: &str) {
        self.bar.reset();
        self.bar.set_length(snapshot.total_images as u64);
        self.bar.set_prefix(format!("Archive {}/{}", snapshot.archive_index, snapshot.total_archives));
        self.bar.set_message(name.to_string());
    }

    /// Update position, speed and ETA
    pub fn update(&self, snapshot: &ProgressSnapshot) {
        self.bar.set_position(snapshot.processed_images as u64);
        self.bar.set_message(format!(
            "{:.1} img/s | ETA {} | {}",
            snapshot.images_per_second,
            snapshot.format_eta(),
            snapshot.current_file_name
        ));
    }

    /// Finish with a final message
    pub fn finish(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }

    /// Stop drawing without a final message
    pub fn abandon(&self, message: &str) {
        self.bar.abandon_with_message(message.to_string());
    }
}

impl Default for ProgressManager {
    fn default() -> Self {
        Self::new()
    }
}
