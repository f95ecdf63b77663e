//! CLI argument parsing for leakcheck

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Output format for classified tasks
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Task records, separated by blank lines (default)
    Text,
    /// JSON object with tasks and parse errors
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "leakcheck")]
#[command(version)]
#[command(about = "Dump and classify the live threads of a process", long_about = None)]
pub struct Cli {
    /// Enable debug tracing output to stderr
    #[arg(long = "debug", global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print a thread dump in stack record format
    Dump {
        /// Process to dump (defaults to leakcheck itself)
        #[arg(short = 'p', long = "pid", value_name = "PID")]
        pid: Option<u32>,

        /// procfs mount point
        #[arg(long = "proc-root", value_name = "DIR", default_value = "/proc")]
        proc_root: PathBuf,
    },

    /// Classify the records of a dump and print the interesting tasks
    Classify {
        /// Dump file to read (stdin when omitted or "-")
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,

        /// Extra ignore rule, as a regex over the record body (repeatable)
        #[arg(short = 'i', long = "ignore", value_name = "REGEX")]
        ignore: Vec<String>,

        /// Start from an empty ignore list instead of the defaults
        #[arg(long = "no-default-ignores")]
        no_default_ignores: bool,

        /// Output format
        #[arg(long = "format", value_enum, default_value = "text")]
        format: OutputFormat,
    },
}
