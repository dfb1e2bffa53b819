//! Microsatellite prediction with the MicroSatMiner script.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::params::loose_string;
use crate::process::{delete_file_if_exists, run_command};
use crate::tabular::parse_with_header;
use crate::{ExecError, RuntimeConfig};

/// A prediction request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionParams {
    /// Inline FASTA to scan.
    #[serde(default, deserialize_with = "loose_string")]
    pub genome: String,
    #[serde(default, deserialize_with = "loose_string")]
    pub min_repeat: String,
    #[serde(default, deserialize_with = "loose_string")]
    pub max_repeat: String,
    /// Minimum length for mononucleotide repeats.
    #[serde(default, deserialize_with = "loose_string")]
    pub mono: String,
    /// Minimum length for all other repeats.
    #[serde(default, deserialize_with = "loose_string")]
    pub all: String,
}

/// Run the prediction script over `fasta` and return its rows.
///
/// The script's report is deleted once read, whether or not it parsed.
#[tracing::instrument(skip(runtime, fasta, params))]
pub async fn run_prediction(
    runtime: &RuntimeConfig,
    id: &str,
    fasta: &Path,
    params: &PredictionParams,
) -> Result<Value, ExecError> {
    let prefix = runtime.preddata_dir.join(format!("pred{id}"));
    let mut report = prefix.clone().into_os_string();
    report.push(".ssr.txt");
    let report = PathBuf::from(report);

    let args: Vec<OsString> = vec![
        runtime.prediction_script.clone().into_os_string(),
        "-i".into(),
        fasta.as_os_str().to_owned(),
        "-min".into(),
        params.min_repeat.clone().into(),
        "-max".into(),
        params.max_repeat.clone().into(),
        "-ml".into(),
        params.mono.clone().into(),
        "-t".into(),
        params.all.clone().into(),
        "-sp".into(),
        prefix.into_os_string(),
    ];
    run_command(&runtime.perl_bin, &args).await?;

    let raw = tokio::fs::read_to_string(&report).await;
    if let Err(e) = delete_file_if_exists(&report).await {
        debug!(path = %report.display(), error = %e, "failed to remove prediction report");
    }

    Ok(Value::Array(parse_with_header(&raw?)))
}
