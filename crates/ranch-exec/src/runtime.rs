//! Tool locations and data directories.

use std::path::{Path, PathBuf};

use tracing::warn;

use crate::ExecError;

pub const DEFAULT_PRIMER3_BIN: &str = "/opt/software/primer3/2.6.1/src/primer3_core";
pub const DEFAULT_PRIMERSEARCH_BIN: &str = "/opt/software/emboss/EMBOSS-6.6.0/emboss/primersearch";
pub const DEFAULT_BLAST_BIN_DIR: &str = "/opt/software/ncbi-blast-2.7.1+-src/c++/bin";
pub const DEFAULT_PERL_BIN: &str = "perl";
pub const DEFAULT_DATA_DIR: &str = "src/data";
pub const DEFAULT_PREDDATA_DIR: &str = "src/prediction/preddata";
pub const DEFAULT_PREDICTION_SCRIPT: &str = "src/prediction/MicroSatMiner.pl";
pub const DEFAULT_BLAST_THREADS: usize = 20;

/// Where the external tools and their data live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub primer3_bin: PathBuf,
    pub primersearch_bin: PathBuf,
    /// Directory holding `blastn`, `blastp` and the other BLAST programs.
    pub blast_bin_dir: PathBuf,
    pub perl_bin: PathBuf,
    /// Genome FASTA files and BLAST databases.
    pub data_dir: PathBuf,
    /// Scratch space for per-job inputs and outputs.
    pub preddata_dir: PathBuf,
    pub prediction_script: PathBuf,
    pub blast_threads: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            primer3_bin: DEFAULT_PRIMER3_BIN.into(),
            primersearch_bin: DEFAULT_PRIMERSEARCH_BIN.into(),
            blast_bin_dir: DEFAULT_BLAST_BIN_DIR.into(),
            perl_bin: DEFAULT_PERL_BIN.into(),
            data_dir: DEFAULT_DATA_DIR.into(),
            preddata_dir: DEFAULT_PREDDATA_DIR.into(),
            prediction_script: DEFAULT_PREDICTION_SCRIPT.into(),
            blast_threads: DEFAULT_BLAST_THREADS,
        }
    }
}

impl RuntimeConfig {
    /// Paths the service cannot work without.
    pub fn required_paths(&self) -> Vec<PathBuf> {
        vec![
            self.primer3_bin.clone(),
            self.primersearch_bin.clone(),
            self.blast_bin_dir.join("blastn"),
            self.preddata_dir.clone(),
            self.data_dir.clone(),
        ]
    }
}

/// Return the required paths that do not exist.
pub async fn check_runtime_paths(config: &RuntimeConfig) -> Vec<PathBuf> {
    let mut missing = Vec::new();
    for path in config.required_paths() {
        if !exists(&path).await {
            missing.push(path);
        }
    }
    missing
}

/// Fail in strict mode, warn otherwise, when required paths are missing.
pub async fn ensure_runtime_paths(config: &RuntimeConfig, strict: bool) -> Result<(), ExecError> {
    let missing = check_runtime_paths(config).await;
    if missing.is_empty() {
        return Ok(());
    }

    let err = ExecError::MissingRuntimePaths(missing);
    if strict {
        return Err(err);
    }
    warn!("{}", err);
    Ok(())
}

async fn exists(path: &Path) -> bool {
    tokio::fs::try_exists(path).await.unwrap_or(false)
}
