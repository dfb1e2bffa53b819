//! BLAST searches against the bundled genome databases.

use std::ffi::OsString;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::params::loose_string;
use crate::process::{delete_file_if_exists, run_command};
use crate::tabular::{BLAST_HEADINGS, parse_with_headings};
use crate::{ExecError, RuntimeConfig};

/// Databases that may be searched.
pub const BLAST_DATABASES: [&str; 12] = [
    "bostaurus.fasta",
    "goat.fa",
    "dog.fa",
    "cat.fa",
    "donkey.fa",
    "horse.fa",
    "pig.fa",
    "buffalo.fa",
    "sheep.fa",
    "yak.fa",
    "bee.fa",
    "chicken.fa",
];

/// BLAST program to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlastProgram {
    Blastn,
    Blastp,
    Blastx,
    Tblastn,
    Tblastx,
}

impl BlastProgram {
    pub fn as_str(self) -> &'static str {
        match self {
            BlastProgram::Blastn => "blastn",
            BlastProgram::Blastp => "blastp",
            BlastProgram::Blastx => "blastx",
            BlastProgram::Tblastn => "tblastn",
            BlastProgram::Tblastx => "tblastx",
        }
    }
}

impl fmt::Display for BlastProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BlastProgram {
    type Err = ExecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "blastn" => Ok(BlastProgram::Blastn),
            "blastp" => Ok(BlastProgram::Blastp),
            "blastx" => Ok(BlastProgram::Blastx),
            "tblastn" => Ok(BlastProgram::Tblastn),
            "tblastx" => Ok(BlastProgram::Tblastx),
            _ => Err(ExecError::invalid("Invalid BLAST program")),
        }
    }
}

/// Reject databases outside the allow-list.
pub fn validate_database(genome: &str) -> Result<(), ExecError> {
    if BLAST_DATABASES.contains(&genome) {
        Ok(())
    } else {
        Err(ExecError::invalid("Invalid BLAST database"))
    }
}

/// A BLAST request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlastParams {
    /// Database file name, one of [`BLAST_DATABASES`].
    #[serde(default, deserialize_with = "loose_string")]
    pub genome: String,
    /// Inline query FASTA.
    #[serde(default, deserialize_with = "loose_string")]
    pub gdata: String,
    #[serde(default, deserialize_with = "loose_string")]
    pub word: String,
    #[serde(default, deserialize_with = "loose_string")]
    pub target: String,
    #[serde(default, deserialize_with = "loose_string")]
    pub evalue: String,
    #[serde(default, deserialize_with = "loose_string")]
    pub program: String,
}

impl BlastParams {
    /// Check the program and database before any file is written.
    pub fn validate(&self) -> Result<BlastProgram, ExecError> {
        validate_database(&self.genome)?;
        self.program.parse()
    }
}

/// Search `query` with BLAST and return the hit rows.
#[tracing::instrument(skip(runtime, query, params), fields(program = %params.program, genome = %params.genome))]
pub async fn run_blast(
    runtime: &RuntimeConfig,
    id: &str,
    query: &Path,
    params: &BlastParams,
) -> Result<Value, ExecError> {
    let program = params.validate()?;
    let binary = runtime.blast_bin_dir.join(program.as_str());
    let database = runtime.data_dir.join(&params.genome);
    let out_file = runtime.preddata_dir.join(format!("pred{id}.out.tsv"));

    let args: Vec<OsString> = vec![
        "-db".into(),
        database.into_os_string(),
        "-query".into(),
        query.as_os_str().to_owned(),
        "-max_target_seqs".into(),
        params.target.clone().into(),
        "-word_size".into(),
        params.word.clone().into(),
        "-evalue".into(),
        params.evalue.clone().into(),
        "-num_threads".into(),
        runtime.blast_threads.to_string().into(),
        "-outfmt".into(),
        "6".into(),
        "-out".into(),
        out_file.clone().into_os_string(),
    ];
    run_command(&binary, &args).await?;

    let raw = tokio::fs::read_to_string(&out_file).await;
    if let Err(e) = delete_file_if_exists(&out_file).await {
        debug!(path = %out_file.display(), error = %e, "failed to remove BLAST output");
    }

    Ok(Value::Array(parse_with_headings(&raw?, &BLAST_HEADINGS)))
}
