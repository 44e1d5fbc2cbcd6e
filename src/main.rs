//! # CBZ Optimizer - Main Entry Point
//!
//! Questo è il punto di ingresso principale dell'applicazione.
//!
//! ## Responsabilità:
//! - Parsing degli argomenti della command line con `clap`
//! - Inizializzazione del sistema di logging con `tracing`
//! - Caricamento configurazione da file e override da CLI
//! - Rendering del progresso (progress bar o JSON) e gestione di Ctrl+C
//!
//! ## Flusso di esecuzione:
//! 1. Parsa gli argomenti CLI (archivi/directory, quality, formato, workers, etc.)
//! 2. Configura il logging su stderr (INFO o DEBUG a seconda del flag verbose)
//! 3. Carica il file di configurazione e applica gli override
//! 4. Espande le directory negli archivi CBZ contenuti
//! 5. Avvia il batch e ne inoltra il progresso alla UI
//!
//! ## Esempio di utilizzo:
//! ```bash
//! cbz-optimizer ~/comics/series -o ~/comics/optimized --quality 80 --workers 6
//! ```

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use cbz_optimizer::{
    file_manager::FileManager,
    json_output::JsonMessage,
    progress::{progress_channel, ProgressManager},
    BatchOptimizer, BatchState, CancelToken, Config, ExtractionStrategy, OutputFormat, ProgressSnapshot,
};

#[derive(Parser)]
#[command(name = "cbz-optimizer")]
#[command(about = "Recompress the images inside CBZ comic archives")]
struct Args {
    /// CBZ archives or directories containing them
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Output directory for recompressed archives (created if missing)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Encoding quality (1-100)
    #[arg(short, long)]
    quality: Option<u8>,

    /// Output image format
    #[arg(short, long, value_enum)]
    format: Option<OutputFormat>,

    /// Number of parallel workers (default: CPU count - 1)
    #[arg(short, long)]
    workers: Option<usize>,

    /// How archive members are materialized during processing
    #[arg(long, value_enum)]
    extraction: Option<ExtractionStrategy>,

    /// Config file (default: ~/.cbz-optimizer/config.json)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Save the effective configuration to the config file
    #[arg(long)]
    save_config: bool,

    /// Output progress and results as JSON lines on stdout
    #[arg(long)]
    json: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Logs go to stderr so stdout stays clean for JSON output
    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with_writer(std::io::stderr)
        .init();

    let config_path = args.config.clone().or_else(Config::default_config_path);
    let mut config = match &config_path {
        Some(path) => Config::from_file(path).await?,
        None => Config::default(),
    };
    apply_overrides(&mut config, &args);

    if !config.output_dir.exists() {
        tokio::fs::create_dir_all(&config.output_dir).await?;
        info!("Created output directory: {}", config.output_dir.display());
    }
    config.validate()?;

    if args.save_config {
        if let Some(path) = &config_path {
            config.save_to_file(path).await?;
            info!("Saved configuration to {}", path.display());
        }
    }

    let archives = collect_archives(&args.inputs)?;
    if archives.is_empty() {
        warn!("No CBZ archives found");
    }

    let json_output = config.json_output;
    if json_output {
        JsonMessage::start(archives.len(), &config).emit();
    }

    let mut optimizer = BatchOptimizer::new(config)?;
    let cancel = CancelToken::new();
    let (callback, mut rx) = progress_channel();
    let started = Instant::now();

    let batch_cancel = cancel.clone();
    let batch_archives = archives.clone();
    let mut batch = tokio::spawn(async move {
        optimizer.run_batch(&batch_archives, callback, &batch_cancel).await
    });

    let progress = (!json_output).then(ProgressManager::new);
    let mut interrupted = false;

    let report = loop {
        tokio::select! {
            Some(snapshot) = rx.recv() => {
                render(&snapshot, &archives, progress.as_ref(), json_output);
            }
            signal = tokio::signal::ctrl_c(), if !interrupted => {
                if signal.is_ok() {
                    warn!("Interrupt received, finishing in-flight images before stopping");
                    interrupted = true;
                    cancel.cancel();
                }
            }
            joined = &mut batch => {
                // Drain snapshots sent before the batch returned
                while let Ok(snapshot) = rx.try_recv() {
                    render(&snapshot, &archives, progress.as_ref(), json_output);
                }
                break joined?;
            }
        }
    };

    let elapsed = started.elapsed().as_secs_f64();
    if let Some(bar) = &progress {
        match report.state {
            BatchState::Completed => bar.finish("done"),
            _ => bar.abandon("stopped"),
        }
    }

    if json_output {
        if let Some(err) = &report.error {
            JsonMessage::error(err).emit();
        }
        JsonMessage::complete(report.state, &report.result, elapsed).emit();
    } else {
        print_final_stats(&report.result, report.state, elapsed);
    }

    report.into_result()?;
    Ok(())
}

fn apply_overrides(config: &mut Config, args: &Args) {
    if let Some(output) = &args.output {
        config.output_dir = output.clone();
    }
    if let Some(quality) = args.quality {
        config.quality = quality;
    }
    if let Some(format) = args.format {
        config.output_format = format;
    }
    if args.workers.is_some() {
        config.workers = args.workers;
    }
    if let Some(extraction) = args.extraction {
        config.extraction = extraction;
    }
    if args.json {
        config.json_output = true;
    }
}

/// Espande le directory negli archivi che contengono, preservando l'ordine
fn collect_archives(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut archives = Vec::new();
    for input in inputs {
        if input.is_dir() {
            archives.extend(FileManager::find_archives(input));
        } else if input.exists() {
            archives.push(input.clone());
        } else {
            return Err(anyhow::anyhow!("Input does not exist: {}", input.display()));
        }
    }
    Ok(archives)
}

fn render(snapshot: &ProgressSnapshot, archives: &[PathBuf], progress: Option<&ProgressManager>, json_output: bool) {
    let path = archives
        .get(snapshot.archive_index.saturating_sub(1))
        .cloned()
        .unwrap_or_default();

    if json_output {
        if snapshot.processed_images == 0 {
            JsonMessage::archive_start(path, snapshot).emit();
        } else {
            JsonMessage::progress(snapshot).emit();
        }
        return;
    }

    if let Some(bar) = progress {
        if snapshot.processed_images == 0 {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            bar.start_archive(snapshot, &name);
        } else {
            bar.update(snapshot);
        }
    }
}

fn print_final_stats(result: &cbz_optimizer::BatchResult, state: BatchState, elapsed: f64) {
    info!("Recompression {:?} in {:.1}s", state, elapsed);
    info!("Archives processed: {}/{}", result.processed_files, result.total_files);
    info!(
        "Total size: {} -> {}",
        FileManager::format_size(result.total_original_size_bytes),
        FileManager::format_size(result.total_compressed_size_bytes)
    );
    info!("Space saved: {:.1}%", result.savings_percent);
}
