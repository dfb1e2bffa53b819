//! Electronic PCR with EMBOSS primersearch.

use std::ffi::OsString;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::params::loose_string;
use crate::process::run_command;
use crate::{ExecError, RuntimeConfig};

/// Three primer pairs to search for.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrimerSet {
    #[serde(default, deserialize_with = "loose_string")]
    pub f1: String,
    #[serde(default, deserialize_with = "loose_string")]
    pub r1: String,
    #[serde(default, deserialize_with = "loose_string")]
    pub f2: String,
    #[serde(default, deserialize_with = "loose_string")]
    pub r2: String,
    #[serde(default, deserialize_with = "loose_string")]
    pub f3: String,
    #[serde(default, deserialize_with = "loose_string")]
    pub r3: String,
}

impl PrimerSet {
    /// Render the tab-separated primer file primersearch reads.
    pub fn to_primer_table(&self) -> String {
        [
            ["Primer1", self.f1.as_str(), self.r1.as_str()],
            ["Primer2", self.f2.as_str(), self.r2.as_str()],
            ["Primer3", self.f3.as_str(), self.r3.as_str()],
        ]
        .iter()
        .map(|row| row.join("\t"))
        .collect::<Vec<_>>()
        .join("\n")
    }
}

/// Reject genome names that would leave the data directory.
fn validate_genome(genome: &str) -> Result<(), ExecError> {
    let path = Path::new(genome);
    let plain = path.components().count() == 1
        && path.file_name().is_some_and(|name| name == path.as_os_str());
    if genome.is_empty() || !plain {
        return Err(ExecError::invalid("Invalid genome"));
    }
    Ok(())
}

/// Search for the primers in `sequence`, or in the named genome when
/// `sequence` is blank, and return primersearch's report.
#[tracing::instrument(skip(runtime, primers, sequence))]
pub async fn run_epcr(
    runtime: &RuntimeConfig,
    primers: &PrimerSet,
    sequence: &str,
    mismatch: &str,
    genome: &str,
) -> Result<String, ExecError> {
    let workdir = tempfile::Builder::new().prefix("ranch-epcr-").tempdir()?;
    let primer_file = workdir.path().join("pinput.txt");
    let out_file = workdir.path().join("result.txt");

    tokio::fs::write(&primer_file, primers.to_primer_table()).await?;

    let target = if sequence.trim().is_empty() {
        validate_genome(genome)?;
        runtime.data_dir.join(genome)
    } else {
        let seq_file = workdir.path().join("dnaseq.fa");
        tokio::fs::write(&seq_file, sequence).await?;
        seq_file
    };

    let args: Vec<OsString> = vec![
        "-infile".into(),
        primer_file.into_os_string(),
        "-seqall".into(),
        target.into_os_string(),
        "-mismatchpercent".into(),
        mismatch.into(),
        "-outfile".into(),
        out_file.clone().into_os_string(),
    ];
    run_command(&runtime.primersearch_bin, &args).await?;

    Ok(tokio::fs::read_to_string(&out_file).await?)
}
