//! `Cli`/`Commands`: ambient argument parsing for the `orph` binary.
//!
//! CLI dispatch is explicitly out of scope for `orphdat_core` (spec.md §1);
//! this module exists only so the core is exercisable end-to-end, mirroring
//! the teacher's `cli.rs` shape.

use clap::{Parser, Subcommand, ValueEnum};
use simplelog::LevelFilter;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about = "Content-hash engine for a photo/video library")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Write a log file alongside the usual terminal output.
    #[arg(long, global = true)]
    pub log: Option<PathBuf>,

    /// Log level for the file logger (debug, info, warn, error).
    #[arg(long, default_value_t = LevelFilter::Info, global = true)]
    pub log_level: LevelFilter,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compute (or reuse the cached) content hash for one or more paths.
    Hash {
        /// Files or directories to hash. Directories are walked recursively.
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Recompute even if a cached record passes its stat check.
        #[arg(long)]
        force: bool,

        /// Trust any existing record without re-stating the file.
        #[arg(long)]
        add_only: bool,
    },

    /// Recompute hashes and report any content mismatch against the stored
    /// record (forces recalculation; does not trust the cache).
    Verify {
        /// Files or directories to verify. Directories are walked recursively.
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// How to resolve a content conflict instead of prompting.
        #[arg(long, value_enum)]
        on_conflict: Option<OnConflict>,
    },

    /// Move (rename) a file or directory, keeping `.orphdat` stores coherent.
    Move {
        #[arg(required = true)]
        src: PathBuf,
        #[arg(required = true)]
        dst: PathBuf,
    },

    /// Move a file or directory to `.orphtrash`, with its sidecars.
    Trash {
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Preserve the path's position relative to this ancestor under
        /// `<root>/.orphtrash/...` instead of trashing in place.
        #[arg(long)]
        root: Option<PathBuf>,

        /// Also trash any sidecars (XMP, AAE, THM, ...) found on disk.
        #[arg(long)]
        with_sidecars: bool,
    },

    /// Walk every `.orphdat` under the given roots and print each record.
    FindHashes {
        /// Root directories (or glob patterns) to walk. Defaults to `.`.
        roots: Vec<String>,

        /// Include `.orphtrash` subtrees in the walk.
        #[arg(long)]
        include_trash: bool,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OnConflict {
    Keep,
    Overwrite,
    Skip,
    Abort,
}
