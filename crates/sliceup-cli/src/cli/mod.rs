//! CLI for the sliceup chunked uploader.

mod commands;

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use sliceup_core::config;

use commands::{run_fingerprint, run_plan, run_upload};

/// Top-level CLI for the sliceup uploader.
#[derive(Debug, Parser)]
#[command(name = "sliceup")]
#[command(about = "sliceup: resumable chunked file uploader", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Upload a file in chunks and request the server-side merge.
    Upload {
        /// Path to the file to upload.
        file: String,

        /// Remote filename (defaults to the file's basename).
        #[arg(long)]
        filename: Option<String>,

        /// Chunk size in bytes (defaults to the configured value).
        #[arg(long, value_name = "BYTES")]
        chunk_size: Option<u64>,

        /// Maximum concurrent chunk uploads.
        #[arg(long, value_name = "N")]
        pool_limit: Option<usize>,
    },

    /// Show the chunk plan for a file without touching the network.
    Plan {
        /// Path to the file to plan.
        file: String,

        /// Chunk size in bytes (defaults to the configured value).
        #[arg(long, value_name = "BYTES")]
        chunk_size: Option<u64>,
    },

    /// Print the whole-file fingerprint used for the dedup check.
    Fingerprint {
        /// Path to the file to fingerprint.
        file: String,

        /// Chunk size in bytes (defaults to the configured value).
        #[arg(long, value_name = "BYTES")]
        chunk_size: Option<u64>,
    },

    /// Generate shell completions.
    Completions {
        /// Target shell.
        shell: clap_complete::Shell,
    },
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();

        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Upload {
                file,
                filename,
                chunk_size,
                pool_limit,
            } => run_upload(&cfg, &file, filename, chunk_size, pool_limit).await,
            CliCommand::Plan { file, chunk_size } => run_plan(&cfg, &file, chunk_size),
            CliCommand::Fingerprint { file, chunk_size } => {
                run_fingerprint(&cfg, &file, chunk_size)
            }
            CliCommand::Completions { shell } => {
                let mut cmd = Cli::command();
                clap_complete::generate(shell, &mut cmd, "sliceup", &mut std::io::stdout());
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> CliCommand {
        let cli = Cli::try_parse_from(args).unwrap();
        cli.command
    }

    #[test]
    fn cli_parse_upload() {
        match parse(&["sliceup", "upload", "video.bin"]) {
            CliCommand::Upload {
                file,
                filename,
                chunk_size,
                pool_limit,
            } => {
                assert_eq!(file, "video.bin");
                assert!(filename.is_none());
                assert!(chunk_size.is_none());
                assert!(pool_limit.is_none());
            }
            _ => panic!("expected Upload"),
        }
    }

    #[test]
    fn cli_parse_upload_with_options() {
        match parse(&[
            "sliceup",
            "upload",
            "video.bin",
            "--filename",
            "remote.bin",
            "--chunk-size",
            "1048576",
            "--pool-limit",
            "8",
        ]) {
            CliCommand::Upload {
                filename,
                chunk_size,
                pool_limit,
                ..
            } => {
                assert_eq!(filename.as_deref(), Some("remote.bin"));
                assert_eq!(chunk_size, Some(1_048_576));
                assert_eq!(pool_limit, Some(8));
            }
            _ => panic!("expected Upload"),
        }
    }

    #[test]
    fn cli_parse_plan() {
        match parse(&["sliceup", "plan", "video.bin"]) {
            CliCommand::Plan { file, chunk_size } => {
                assert_eq!(file, "video.bin");
                assert!(chunk_size.is_none());
            }
            _ => panic!("expected Plan"),
        }
    }

    #[test]
    fn cli_parse_fingerprint() {
        match parse(&["sliceup", "fingerprint", "video.bin", "--chunk-size", "4096"]) {
            CliCommand::Fingerprint { file, chunk_size } => {
                assert_eq!(file, "video.bin");
                assert_eq!(chunk_size, Some(4096));
            }
            _ => panic!("expected Fingerprint"),
        }
    }

    #[test]
    fn cli_rejects_unknown_subcommand() {
        assert!(Cli::try_parse_from(["sliceup", "download", "x"]).is_err());
    }
}
