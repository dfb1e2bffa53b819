//! Primer design with primer3.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::params::loose_string;
use crate::process::run_command;
use crate::{ExecError, RuntimeConfig};

/// Query parameters for a primer design request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PrimerRequest {
    /// Template sequence around the repeat.
    #[serde(default, deserialize_with = "loose_string")]
    pub seq: String,
    #[serde(default, deserialize_with = "loose_string")]
    pub motif_length: String,
    #[serde(rename = "minS", default, deserialize_with = "loose_string")]
    pub min_size: String,
    #[serde(rename = "maxS", default, deserialize_with = "loose_string")]
    pub max_size: String,
    #[serde(rename = "minTM", default, deserialize_with = "loose_string")]
    pub min_tm: String,
    #[serde(rename = "maxTM", default, deserialize_with = "loose_string")]
    pub max_tm: String,
    #[serde(rename = "minGC", default, deserialize_with = "loose_string")]
    pub min_gc: String,
    #[serde(rename = "maxGC", default, deserialize_with = "loose_string")]
    pub max_gc: String,
    /// Length of the flanking sequence before the repeat.
    #[serde(default, deserialize_with = "loose_string")]
    pub flank: String,
}

/// Up to three primer pairs picked by primer3.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrimerDesign {
    pub f1: Option<String>,
    pub r1: Option<String>,
    pub f1tm: Option<String>,
    pub r1tm: Option<String>,
    #[serde(rename = "f1GC")]
    pub f1_gc: Option<String>,
    #[serde(rename = "r1GC")]
    pub r1_gc: Option<String>,
    pub p1psize: Option<String>,
    pub f2: Option<String>,
    pub r2: Option<String>,
    pub f2tm: Option<String>,
    pub r2tm: Option<String>,
    #[serde(rename = "f2GC")]
    pub f2_gc: Option<String>,
    #[serde(rename = "r2GC")]
    pub r2_gc: Option<String>,
    pub p2psize: Option<String>,
    pub f3: Option<String>,
    pub r3: Option<String>,
    pub f3tm: Option<String>,
    pub r3tm: Option<String>,
    #[serde(rename = "f3GC")]
    pub f3_gc: Option<String>,
    #[serde(rename = "r3GC")]
    pub r3_gc: Option<String>,
    pub p3psize: Option<String>,
}

fn parse_int(value: &str, field: &str) -> Result<i64, ExecError> {
    value
        .trim()
        .parse()
        .map_err(|_| ExecError::invalid(format!("Invalid {field}")))
}

/// Build the Boulder-IO record primer3 reads.
///
/// The repeat itself is both the target and an excluded region, padded by
/// three bases on each side.
pub fn build_primer3_input(request: &PrimerRequest) -> Result<String, ExecError> {
    let exclude_start = parse_int(&request.flank, "flank")?
        .checked_sub(3)
        .ok_or_else(|| ExecError::invalid("Invalid flank"))?;
    let exclude_len = parse_int(&request.motif_length, "motif_length")?
        .checked_add(3)
        .ok_or_else(|| ExecError::invalid("Invalid motif_length"))?;
    let region = format!("{exclude_start},{exclude_len}");

    let lines = [
        "SEQUENCE_ID=example".to_string(),
        format!("SEQUENCE_TEMPLATE={}", request.seq),
        "PRIMER_TASK=generic".to_string(),
        "PRIMER_NUM_RETURN=3".to_string(),
        "PRIMER_PICK_LEFT_PRIMER=1".to_string(),
        "PRIMER_PICK_INTERNAL_OLIGO=0".to_string(),
        "PRIMER_PICK_RIGHT_PRIMER=1".to_string(),
        "PRIMER_OPT_SIZE=20".to_string(),
        format!("PRIMER_MIN_SIZE={}", request.min_size),
        format!("PRIMER_MAX_SIZE={}", request.max_size),
        format!("PRIMER_MIN_TM={}", request.min_tm),
        format!("PRIMER_MAX_TM={}", request.max_tm),
        format!("PRIMER_MIN_GC={}", request.min_gc),
        format!("PRIMER_MAX_GC={}", request.max_gc),
        format!("SEQUENCE_TARGET={region}"),
        format!("SEQUENCE_INTERNAL_EXCLUDE_REGION={region}"),
        "PRIMER_PRODUCT_SIZE_RANGE=100-200".to_string(),
        "PRIMER_EXPLAIN_FLAG=1".to_string(),
        "=".to_string(),
    ];
    Ok(lines.join("\n"))
}

/// Pick the primer pairs out of primer3's `KEY=VALUE` output.
pub fn parse_primer3_output(output: &str) -> PrimerDesign {
    let fields: HashMap<&str, &str> = output
        .lines()
        .filter_map(|line| line.split_once('='))
        .filter(|(key, _)| !key.is_empty())
        .map(|(key, value)| (key.trim(), value.trim()))
        .collect();
    let get = |key: &str| fields.get(key).map(|v| v.to_string());

    PrimerDesign {
        f1: get("PRIMER_LEFT_0_SEQUENCE"),
        r1: get("PRIMER_RIGHT_0_SEQUENCE"),
        f1tm: get("PRIMER_LEFT_0_TM"),
        r1tm: get("PRIMER_RIGHT_0_TM"),
        f1_gc: get("PRIMER_LEFT_0_GC_PERCENT"),
        r1_gc: get("PRIMER_RIGHT_0_GC_PERCENT"),
        p1psize: get("PRIMER_PAIR_0_PRODUCT_SIZE"),
        f2: get("PRIMER_LEFT_1_SEQUENCE"),
        r2: get("PRIMER_RIGHT_1_SEQUENCE"),
        f2tm: get("PRIMER_LEFT_1_TM"),
        r2tm: get("PRIMER_RIGHT_1_TM"),
        f2_gc: get("PRIMER_LEFT_1_GC_PERCENT"),
        r2_gc: get("PRIMER_RIGHT_1_GC_PERCENT"),
        p2psize: get("PRIMER_PAIR_1_PRODUCT_SIZE"),
        f3: get("PRIMER_LEFT_2_SEQUENCE"),
        r3: get("PRIMER_RIGHT_2_SEQUENCE"),
        f3tm: get("PRIMER_LEFT_2_TM"),
        r3tm: get("PRIMER_RIGHT_2_TM"),
        f3_gc: get("PRIMER_LEFT_2_GC_PERCENT"),
        r3_gc: get("PRIMER_RIGHT_2_GC_PERCENT"),
        p3psize: get("PRIMER_PAIR_2_PRODUCT_SIZE"),
    }
}

/// Design primers around a repeat.
#[tracing::instrument(skip_all, fields(flank = %request.flank, motif_length = %request.motif_length))]
pub async fn get_primers(
    runtime: &RuntimeConfig,
    request: &PrimerRequest,
) -> Result<PrimerDesign, ExecError> {
    let input = build_primer3_input(request)?;

    // Removed with everything in it when dropped
    let workdir = tempfile::Builder::new().prefix("ranch-primer3-").tempdir()?;
    let input_file = workdir.path().join("input.txt");
    tokio::fs::write(&input_file, input).await?;

    let output = run_command(&runtime.primer3_bin, [&input_file]).await?;
    Ok(parse_primer3_output(&output.stdout))
}
