//! # Configuration Management Module
//!
//! Questo modulo gestisce tutta la configurazione della ricompressione.
//!
//! ## Responsabilità:
//! - Definisce la struct `Config` con i parametri di ricompressione
//! - Fornisce validazione dei parametri di input
//! - Supporta caricamento/salvataggio configurazione da/verso file JSON
//! - Fornisce valori di default sensati per tutti i parametri
//!
//! ## Parametri di configurazione:
//! - `quality`: Qualità di encoding (1-100, default: 85)
//! - `output_dir`: Directory dove scrivere i CBZ ricompressi
//! - `output_format`: Formato delle immagini di output (default: WebP)
//! - `workers`: Override opzionale del numero di worker (default: CPU - 1)
//! - `extraction`: Strategia di estrazione (default: in memoria)
//! - `json_output`: Progress e risultati come JSON su stdout
//!
//! ## Esempio:
//! ```rust,ignore
//! let config = Config {
//!     quality: 70,
//!     output_dir: PathBuf::from("/comics/out"),
//!     ..Default::default()
//! };
//! config.validate()?;
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_QUALITY: u8 = 85;

/// Target encoding for transcoded images
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Webp,
    Jpeg,
}

impl OutputFormat {
    /// File extension written for members in this format
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Webp => "webp",
            Self::Jpeg => "jpg",
        }
    }
}

/// Where archive members are materialized while an archive is processed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ExtractionStrategy {
    /// Members are read straight into memory
    #[default]
    InMemory,
    /// Members are extracted to a scoped temporary directory inside the output directory
    TempDir,
}

/// Configuration for archive recompression
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Encoding quality (1-100)
    pub quality: u8,
    /// Output directory for recompressed archives
    pub output_dir: PathBuf,
    /// Target image encoding
    pub output_format: OutputFormat,
    /// Worker override (None = available parallelism - 1)
    pub workers: Option<usize>,
    /// Extraction strategy for archive members
    pub extraction: ExtractionStrategy,
    /// Output progress and status as JSON for programmatic use
    pub json_output: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            quality: DEFAULT_QUALITY,
            output_dir: PathBuf::from("."),
            output_format: OutputFormat::Webp,
            workers: None,
            extraction: ExtractionStrategy::InMemory,
            json_output: false,
        }
    }
}

impl Config {
    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        if self.quality == 0 || self.quality > 100 {
            return Err(anyhow::anyhow!("Quality must be between 1 and 100"));
        }

        if self.workers == Some(0) {
            return Err(anyhow::anyhow!("Number of workers must be greater than 0"));
        }

        if !self.output_dir.exists() {
            return Err(anyhow::anyhow!("Output directory does not exist: {}", self.output_dir.display()));
        }
        if !self.output_dir.is_dir() {
            return Err(anyhow::anyhow!("Output path is not a directory: {}", self.output_dir.display()));
        }

        Ok(())
    }

    /// Degree of parallelism for the transcode pool
    pub fn parallelism(&self) -> usize {
        self.workers.unwrap_or_else(default_parallelism).max(1)
    }

    /// Default location of the config file (`~/.cbz-optimizer/config.json`)
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".cbz-optimizer").join("config.json"))
    }

    /// Load configuration from file
    pub async fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config = serde_json::from_str(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        Ok(config)
    }

    /// Save configuration to file
    pub async fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }
}

/// Available hardware parallelism minus one, never below one
pub fn default_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .saturating_sub(1)
        .max(1)
}
