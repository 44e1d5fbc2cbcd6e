//! # Path Resolution Module
//!
//! Centralizza il calcolo del path di output di ogni archivio:
//! `output_dir / basename(input)`.

use crate::error::{CompressError, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Utility per calcolare i path di output in modo centralizzato
pub struct PathResolver;

impl PathResolver {
    /// Output path for an input archive, refusing to overwrite the input itself
    pub fn output_archive_path(input_path: &Path, output_dir: &Path) -> Result<PathBuf> {
        let file_name = input_path.file_name().ok_or_else(|| CompressError::InvalidArchive {
            path: input_path.to_path_buf(),
            reason: "path has no file name".to_string(),
        })?;

        let output_path = output_dir.join(file_name);
        if Self::same_file(input_path, &output_path) {
            return Err(CompressError::InvalidArchive {
                path: input_path.to_path_buf(),
                reason: "output would overwrite the input archive".to_string(),
            });
        }

        debug!("Resolved output path: {} -> {}", input_path.display(), output_path.display());
        Ok(output_path)
    }

    /// Fail on the first input whose output path was already claimed by an earlier input
    pub fn ensure_distinct_outputs(inputs: &[PathBuf], output_dir: &Path) -> Result<()> {
        let mut claimed: HashMap<PathBuf, &Path> = HashMap::with_capacity(inputs.len());
        for input in inputs {
            // Unresolvable inputs are reported when their turn comes
            let Ok(output) = Self::output_archive_path(input, output_dir) else {
                continue;
            };
            if let Some(earlier) = claimed.insert(output, input.as_path()) {
                return Err(CompressError::InvalidArchive {
                    path: input.clone(),
                    reason: format!("output name collides with {}", earlier.display()),
                }
                .in_archive(input));
            }
        }
        Ok(())
    }

    fn same_file(a: &Path, b: &Path) -> bool {
        match (a.canonicalize(), b.canonicalize()) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        }
    }
}
