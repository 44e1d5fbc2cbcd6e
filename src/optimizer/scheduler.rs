//! # Parallel Transcode Scheduler
//!
//! Distribuisce la transcodifica delle immagini di un archivio su un pool
//! limitato di worker bloccanti.
//!
//! ## Responsabilità:
//! - Al massimo `parallelism` task in volo (`spawn_blocking` in un `JoinSet`)
//! - Raccolta dei risultati in ordine di completamento
//! - Aggiornamento del `ProgressTracker` e callback dopo ogni completamento
//! - Fail-fast: il primo errore ferma le sottomissioni
//! - Cancellazione cooperativa controllata prima di ogni sottomissione
//!
//! In entrambi i casi di stop i task già in volo vengono attesi fino in fondo:
//! quando `run` ritorna non resta lavoro in background.

use crate::{
    archive::ImageEntry,
    cancel::CancelToken,
    error::{CompressError, Result},
    image_processor::{ImageProcessor, TranscodedEntry},
    optimizer::progress_tracker::ProgressTracker,
    progress::ProgressSnapshot,
};
use tokio::task::JoinSet;
use tracing::{debug, warn};

/// Terminal outcome of scheduling one archive
#[derive(Debug)]
pub enum ScheduleOutcome {
    /// Every entry transcoded; results in completion order
    Completed(Vec<TranscodedEntry>),
    Cancelled,
    Failed(CompressError),
}

/// Bounded fan-out of transcode tasks
#[derive(Debug, Clone, Copy)]
pub struct TranscodeScheduler {
    processor: ImageProcessor,
    parallelism: usize,
}

impl TranscodeScheduler {
    pub fn new(processor: ImageProcessor, parallelism: usize) -> Self {
        Self {
            processor,
            parallelism: parallelism.max(1),
        }
    }

    pub fn parallelism(&self) -> usize {
        self.parallelism
    }

    /// Transcode `entries` at `quality`, reporting each completion through `on_progress`
    pub async fn run<F>(
        &self,
        entries: Vec<ImageEntry>,
        quality: u8,
        mut tracker: ProgressTracker,
        on_progress: &mut F,
        cancel: &CancelToken,
    ) -> ScheduleOutcome
    where
        F: FnMut(&ProgressSnapshot) + Send,
    {
        let mut pending = entries.into_iter();
        let mut in_flight: JoinSet<Result<TranscodedEntry>> = JoinSet::new();
        let mut results = Vec::with_capacity(tracker.total());
        let mut failure: Option<CompressError> = None;
        let mut cancelled = false;

        tracker.restart_clock();

        loop {
            while failure.is_none() && !cancelled && in_flight.len() < self.parallelism && pending.len() > 0 {
                if cancel.is_cancelled() {
                    debug!("Cancellation observed, no further submissions");
                    cancelled = true;
                    break;
                }
                let Some(entry) = pending.next() else {
                    break;
                };

                let processor = self.processor;
                in_flight.spawn_blocking(move || {
                    let (name, raw) = entry.into_parts()?;
                    processor.transcode(&raw, &name, quality)
                });
            }

            let Some(joined) = in_flight.join_next().await else {
                break;
            };

            match joined {
                Ok(Ok(entry)) => {
                    if failure.is_none() {
                        let snapshot = tracker.record_completion(&entry.output_name);
                        on_progress(&snapshot);
                    }
                    results.push(entry);
                }
                Ok(Err(e)) => {
                    if failure.is_none() {
                        warn!("Transcode failed, draining {} in-flight tasks: {}", in_flight.len(), e);
                        failure = Some(e);
                    }
                }
                Err(join_error) => {
                    if failure.is_none() {
                        warn!("Transcode task aborted: {}", join_error);
                        failure = Some(CompressError::Task(join_error.to_string()));
                    }
                }
            }
        }

        if cancelled || (failure.is_some() && cancel.is_cancelled()) {
            return ScheduleOutcome::Cancelled;
        }
        if let Some(e) = failure {
            return ScheduleOutcome::Failed(e);
        }

        debug!("Transcoded {} images", results.len());
        ScheduleOutcome::Completed(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OutputFormat;
    use crate::test_support::solid_jpeg;
    use std::collections::HashSet;

    fn jpeg_entries(count: usize) -> Vec<ImageEntry> {
        (0..count)
            .map(|i| ImageEntry::in_memory(format!("{:03}.jpg", i), solid_jpeg(40, 40, [i as u8, 50, 90], 90)))
            .collect()
    }

    fn scheduler(parallelism: usize) -> TranscodeScheduler {
        TranscodeScheduler::new(ImageProcessor::new(OutputFormat::Webp), parallelism)
    }

    #[tokio::test]
    async fn test_every_entry_is_accounted_for() {
        for parallelism in [1, 3, 16] {
            let mut seen = Vec::new();
            let mut on_progress = |s: &ProgressSnapshot| seen.push(s.processed_images);

            let outcome = scheduler(parallelism)
                .run(jpeg_entries(7), 80, ProgressTracker::new(7, 1, 1), &mut on_progress, &CancelToken::new())
                .await;

            let ScheduleOutcome::Completed(results) = outcome else {
                panic!("expected completion");
            };
            let names: HashSet<_> = results.iter().map(|r| r.output_name.clone()).collect();
            let expected: HashSet<_> = (0..7).map(|i| format!("{:03}.webp", i)).collect();
            assert_eq!(names, expected);
            assert_eq!(seen, (1..=7).collect::<Vec<_>>());
        }
    }

    #[tokio::test]
    async fn test_empty_input_completes_immediately() {
        let mut on_progress = |_: &ProgressSnapshot| {
            panic!("no progress expected");
        };
        let outcome = scheduler(2)
            .run(Vec::new(), 80, ProgressTracker::new(0, 1, 1), &mut on_progress, &CancelToken::new())
            .await;
        assert!(matches!(outcome, ScheduleOutcome::Completed(ref r) if r.is_empty()));
    }

    #[tokio::test]
    async fn test_first_failure_aborts_the_archive() {
        let mut entries = jpeg_entries(4);
        entries.insert(1, ImageEntry::in_memory("bad.jpg", b"not a jpeg".to_vec()));

        let mut on_progress = |_: &ProgressSnapshot| {};
        let outcome = scheduler(1)
            .run(entries, 80, ProgressTracker::new(5, 1, 1), &mut on_progress, &CancelToken::new())
            .await;

        match outcome {
            ScheduleOutcome::Failed(e) => assert_eq!(e.member(), Some("bad.jpg")),
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_cancel_before_start_submits_nothing() {
        let cancel = CancelToken::new();
        cancel.cancel();

        let mut calls = 0;
        let mut on_progress = |_: &ProgressSnapshot| calls += 1;
        let outcome = scheduler(4)
            .run(jpeg_entries(3), 80, ProgressTracker::new(3, 1, 1), &mut on_progress, &cancel)
            .await;

        assert!(matches!(outcome, ScheduleOutcome::Cancelled));
        assert_eq!(calls, 0);
    }

    #[tokio::test]
    async fn test_cancel_after_last_completion_keeps_results() {
        let cancel = CancelToken::new();
        let observer = cancel.clone();

        let mut on_progress = |s: &ProgressSnapshot| {
            if s.processed_images == s.total_images {
                observer.cancel();
            }
        };
        let outcome = scheduler(2)
            .run(jpeg_entries(3), 80, ProgressTracker::new(3, 1, 1), &mut on_progress, &cancel)
            .await;

        assert!(matches!(outcome, ScheduleOutcome::Completed(ref r) if r.len() == 3));
    }

    /// The failing entry reads from a FIFO, so it can only fail once the
    /// callback has requested the abort and fed it garbage.
    #[cfg(unix)]
    #[tokio::test]
    async fn test_cancel_wins_over_failure_in_flight() {
        use std::io::Write;

        let temp_dir = tempfile::TempDir::new().unwrap();
        let fifo = temp_dir.path().join("002.jpg");
        let status = std::process::Command::new("mkfifo").arg(&fifo).status().unwrap();
        assert!(status.success());

        let entries = vec![
            ImageEntry::on_disk("002.jpg", fifo.clone()),
            ImageEntry::in_memory("001.jpg", solid_jpeg(16, 16, [1, 2, 3], 90)),
        ];

        let cancel = CancelToken::new();
        let observer = cancel.clone();
        let mut feeder = None;
        let mut on_progress = |_: &ProgressSnapshot| {
            observer.cancel();
            let fifo = fifo.clone();
            feeder = Some(std::thread::spawn(move || {
                let mut writer = std::fs::OpenOptions::new().write(true).open(fifo).unwrap();
                writer.write_all(b"not a jpeg").unwrap();
            }));
        };

        let outcome = scheduler(2)
            .run(entries, 80, ProgressTracker::new(2, 1, 1), &mut on_progress, &cancel)
            .await;

        feeder.take().unwrap().join().unwrap();
        assert!(matches!(outcome, ScheduleOutcome::Cancelled), "got {:?}", outcome);
    }

    #[tokio::test]
    async fn test_cancel_mid_run_stops_submitting() {
        let cancel = CancelToken::new();
        let observer = cancel.clone();

        let mut seen = Vec::new();
        let mut on_progress = |s: &ProgressSnapshot| {
            seen.push(s.processed_images);
            if s.processed_images == 2 {
                observer.cancel();
            }
        };
        let outcome = scheduler(1)
            .run(jpeg_entries(6), 80, ProgressTracker::new(6, 1, 1), &mut on_progress, &cancel)
            .await;

        assert!(matches!(outcome, ScheduleOutcome::Cancelled));
        assert_eq!(seen, vec![1, 2]);
    }
}
