//! Ranch: genomic analysis job service
//!
//! Main binary with subcommands:
//! - `serve`: HTTP API with the in-memory job scheduler
//! - `check`: Verify that analysis tools and data directories exist

use std::convert::Infallible;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use miette::Result;
use ranch_exec::{
    DEFAULT_BLAST_BIN_DIR, DEFAULT_BLAST_THREADS, DEFAULT_DATA_DIR, DEFAULT_PERL_BIN,
    DEFAULT_PREDDATA_DIR, DEFAULT_PREDICTION_SCRIPT, DEFAULT_PRIMER3_BIN,
    DEFAULT_PRIMERSEARCH_BIN, RuntimeConfig,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod serve;

/// Origins allowed when `ALLOWED_ORIGINS` is not set.
const DEFAULT_ALLOWED_ORIGINS: [&str; 4] = [
    "http://127.0.0.1:3602",
    "http://localhost:3602",
    "https://bioinfo.usu.edu",
    "https://kaabil.net",
];

/// Parse boolean from environment variable, accepting common truthy values.
/// Accepts "1", "true", "yes", "on" (case-insensitive) as true. Anything
/// else, including unrecognized values, is false.
fn parse_bool_env(s: &str) -> Result<bool, Infallible> {
    Ok(matches!(
        s.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    ))
}

/// Split a comma-separated origin list, falling back to the defaults.
fn parse_origins(raw: Option<&str>) -> Vec<String> {
    match raw {
        Some(raw) => raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect(),
        None => DEFAULT_ALLOWED_ORIGINS.iter().map(|s| s.to_string()).collect(),
    }
}

#[derive(Parser)]
#[command(name = "ranch")]
#[command(about = "Genomic analysis job service", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API
    Serve {
        /// HTTP server port
        #[arg(long, env = "PORT", default_value = "3603")]
        port: u16,

        /// Comma-separated browser origins allowed by CORS
        #[arg(long, env = "ALLOWED_ORIGINS")]
        allowed_origins: Option<String>,

        /// Refuse to start when tools or data directories are missing
        #[arg(long, env = "STRICT_RUNTIME_CHECKS", value_parser = parse_bool_env, default_value = "false")]
        strict_runtime_checks: bool,

        /// Maximum number of jobs running at once (defaults to 1)
        #[arg(long, env = "JOB_CONCURRENCY")]
        job_concurrency: Option<String>,

        /// How long finished jobs stay queryable, in milliseconds
        #[arg(long, env = "JOB_RETENTION_MS")]
        job_retention_ms: Option<String>,

        /// Maximum number of waiting jobs (unbounded when unset)
        #[arg(long, env = "JOB_MAX_QUEUE_DEPTH")]
        job_max_queue_depth: Option<usize>,

        #[command(flatten)]
        runtime: RuntimeArgs,
    },

    /// Check that analysis tools and data directories exist
    Check {
        #[command(flatten)]
        runtime: RuntimeArgs,
    },
}

/// Locations of the external tools and their data.
#[derive(Args, Debug, Clone)]
struct RuntimeArgs {
    /// primer3_core binary
    #[arg(long, env = "PRIMER3_BIN", default_value = DEFAULT_PRIMER3_BIN)]
    primer3_bin: PathBuf,

    /// EMBOSS primersearch binary
    #[arg(long, env = "PRIMERSEARCH_BIN", default_value = DEFAULT_PRIMERSEARCH_BIN)]
    primersearch_bin: PathBuf,

    /// Directory containing the BLAST programs
    #[arg(long, env = "BLAST_BIN_DIR", default_value = DEFAULT_BLAST_BIN_DIR)]
    blast_bin_dir: PathBuf,

    /// Perl interpreter for the prediction script
    #[arg(long, env = "PERL_BIN", default_value = DEFAULT_PERL_BIN)]
    perl_bin: PathBuf,

    /// Genome and BLAST database directory
    #[arg(long, env = "DATA_DIR", default_value = DEFAULT_DATA_DIR)]
    data_dir: PathBuf,

    /// Scratch directory for job inputs and outputs
    #[arg(long, env = "PREDDATA_DIR", default_value = DEFAULT_PREDDATA_DIR)]
    preddata_dir: PathBuf,

    /// MicroSatMiner script
    #[arg(long, env = "PREDICTION_SCRIPT", default_value = DEFAULT_PREDICTION_SCRIPT)]
    prediction_script: PathBuf,

    /// Threads passed to BLAST
    #[arg(long, env = "BLAST_THREADS", default_value_t = DEFAULT_BLAST_THREADS)]
    blast_threads: usize,
}

impl From<RuntimeArgs> for RuntimeConfig {
    fn from(args: RuntimeArgs) -> Self {
        RuntimeConfig {
            primer3_bin: args.primer3_bin,
            primersearch_bin: args.primersearch_bin,
            blast_bin_dir: args.blast_bin_dir,
            perl_bin: args.perl_bin,
            data_dir: args.data_dir,
            preddata_dir: args.preddata_dir,
            prediction_script: args.prediction_script,
            blast_threads: args.blast_threads,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| {
                "ranch=info,ranch_jobs=info,ranch_exec=info,ranch_web=info".to_string()
            }),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            port,
            allowed_origins,
            strict_runtime_checks,
            job_concurrency,
            job_retention_ms,
            job_max_queue_depth,
            runtime,
        } => {
            serve::run(serve::ServeConfig {
                port,
                allowed_origins: parse_origins(allowed_origins.as_deref()),
                strict_runtime_checks,
                job_concurrency,
                job_retention_ms,
                job_max_queue_depth,
                runtime: runtime.into(),
            })
            .await
        }

        Commands::Check { runtime } => run_check(runtime.into()).await,
    }
}

async fn run_check(runtime: RuntimeConfig) -> Result<()> {
    let missing = ranch_exec::check_runtime_paths(&runtime).await;
    if missing.is_empty() {
        println!("All runtime paths present");
        return Ok(());
    }

    for path in &missing {
        println!("missing: {}", path.display());
    }
    Err(miette::miette!(
        "{}",
        ranch_exec::ExecError::MissingRuntimePaths(missing)
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bool_env_values() {
        assert_eq!(parse_bool_env("TRUE"), Ok(true));
        assert_eq!(parse_bool_env("on"), Ok(true));
        assert_eq!(parse_bool_env(""), Ok(false));
        assert_eq!(parse_bool_env("off"), Ok(false));
        assert_eq!(parse_bool_env("maybe"), Ok(false));
    }

    #[test]
    fn unrecognized_strict_flag_starts_lenient() {
        let cli = Cli::try_parse_from(["ranch", "serve", "--strict-runtime-checks", "maybe"]).unwrap();
        let Commands::Serve {
            strict_runtime_checks,
            ..
        } = cli.command
        else {
            panic!("expected serve command");
        };
        assert!(!strict_runtime_checks);

        let cli = Cli::try_parse_from(["ranch", "serve", "--strict-runtime-checks", "true"]).unwrap();
        let Commands::Serve {
            strict_runtime_checks,
            ..
        } = cli.command
        else {
            panic!("expected serve command");
        };
        assert!(strict_runtime_checks);
    }

    #[test]
    fn origins_default_when_unset() {
        let origins = parse_origins(None);
        assert_eq!(origins.len(), 4);
        assert!(origins.contains(&"https://kaabil.net".to_string()));
    }

    #[test]
    fn origins_are_trimmed_and_filtered() {
        assert_eq!(
            parse_origins(Some(" https://a.example , ,https://b.example")),
            vec!["https://a.example", "https://b.example"]
        );
        assert!(parse_origins(Some("")).is_empty());
    }

    #[test]
    fn runtime_flags_become_config() {
        let cli = Cli::try_parse_from([
            "ranch",
            "check",
            "--primer3-bin",
            "/usr/bin/primer3_core",
            "--data-dir",
            "/srv/genomes",
            "--blast-threads",
            "4",
        ])
        .unwrap();

        let Commands::Check { runtime } = cli.command else {
            panic!("expected check command");
        };
        let config = RuntimeConfig::from(runtime);
        assert_eq!(config.primer3_bin, PathBuf::from("/usr/bin/primer3_core"));
        assert_eq!(config.data_dir, PathBuf::from("/srv/genomes"));
        assert_eq!(config.blast_threads, 4);
    }

    #[test]
    fn serve_accepts_raw_job_settings() {
        let cli = Cli::try_parse_from([
            "ranch",
            "serve",
            "--port",
            "8080",
            "--job-concurrency",
            "abc",
            "--job-retention-ms",
            "1000",
            "--job-max-queue-depth",
            "50",
        ])
        .unwrap();

        let Commands::Serve {
            port,
            job_concurrency,
            job_retention_ms,
            job_max_queue_depth,
            ..
        } = cli.command
        else {
            panic!("expected serve command");
        };
        assert_eq!(port, 8080);
        assert_eq!(job_concurrency.as_deref(), Some("abc"));
        assert_eq!(job_retention_ms.as_deref(), Some("1000"));
        assert_eq!(job_max_queue_depth, Some(50));
    }
}
