//! External analysis tools for Ranch.
//!
//! This crate wraps the command-line programs behind the analysis endpoints:
//! - MicroSatMiner microsatellite prediction
//! - BLAST searches against the bundled genome databases
//! - primer3 primer design and primersearch electronic PCR
//!
//! It also builds scheduler jobs for the long-running tools and checks that
//! the configured binaries and data directories exist.

mod blast;
mod epcr;
mod error;
mod jobs;
mod params;
mod prediction;
mod primers;
mod process;
mod runtime;
mod tabular;

pub use blast::{BLAST_DATABASES, BlastParams, BlastProgram, run_blast, validate_database};
pub use epcr::{PrimerSet, run_epcr};
pub use error::ExecError;
pub use jobs::{
    AnalysisJob, JobKind, blast_job, blast_now, predict_now, prediction_job, submit_request,
    write_fasta,
};
pub use prediction::{PredictionParams, run_prediction};
pub use primers::{PrimerDesign, PrimerRequest, build_primer3_input, get_primers, parse_primer3_output};
pub use process::{ProcessOutput, delete_file_if_exists, run_command};
pub use runtime::{
    DEFAULT_BLAST_BIN_DIR, DEFAULT_BLAST_THREADS, DEFAULT_DATA_DIR, DEFAULT_PERL_BIN,
    DEFAULT_PREDDATA_DIR, DEFAULT_PREDICTION_SCRIPT, DEFAULT_PRIMER3_BIN,
    DEFAULT_PRIMERSEARCH_BIN, RuntimeConfig, check_runtime_paths, ensure_runtime_paths,
};
pub use tabular::{BLAST_HEADINGS, cell_value, parse_with_header, parse_with_headings};
