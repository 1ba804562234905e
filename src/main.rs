mod cli;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands, OnConflict};
use orphdat::orphdat_core::conflict::{ConflictDecision, ConflictResolver, FixedConflictResolver, InteractiveConflictResolver};
use orphdat::orphdat_core::engine::HashEngine;
use orphdat::orphdat_core::mover::FileMover;
use orphdat::orphdat_core::reporter::LoggingReporter;
use orphdat::orphdat_core::type_registry;
use orphdat::orphdat_core::walker;
use simplelog::{CombinedLogger, Config, LevelFilter, SharedLogger, TermLogger, WriteLogger};
use std::fs::File;
use std::path::{Path, PathBuf};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
        LevelFilter::Warn,
        Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )];

    if let Some(log_path) = &cli.log {
        loggers.push(WriteLogger::new(cli.log_level, Config::default(), File::create(log_path)?));
    }

    CombinedLogger::init(loggers)?;

    match cli.command {
        Commands::Hash { paths, force, add_only } => {
            let mut engine = HashEngine::new(Box::new(LoggingReporter), resolver(None));
            for path in collect_media_files(&paths, false)? {
                match engine.resolve(&path, add_only, force, None)? {
                    Some(record) => println!(
                        "{}: md5={} full_md5={} version={}",
                        path.display(),
                        record.md5,
                        record.full_md5,
                        record.version
                    ),
                    None => println!("{}: skipped", path.display()),
                }
            }
        }

        Commands::Verify { paths, on_conflict } => {
            let mut engine = HashEngine::new(Box::new(LoggingReporter), resolver(on_conflict));
            let mut mismatches = 0usize;
            for path in collect_media_files(&paths, false)? {
                match engine.resolve(&path, false, true, None)? {
                    Some(record) => println!("{}: OK (md5={})", path.display(), record.md5),
                    None => {
                        mismatches += 1;
                        println!("{}: skipped after conflict", path.display());
                    }
                }
            }
            if mismatches > 0 {
                println!("{mismatches} file(s) skipped after a content conflict");
            }
        }

        Commands::Move { src, dst } => {
            let mut mover = FileMover::new();
            if src.is_dir() {
                mover.move_dir(&src, &dst)?;
            } else {
                mover.move_file(&src, &dst)?;
            }
            println!("moved {} -> {}", src.display(), dst.display());
        }

        Commands::Trash { paths, root, with_sidecars } => {
            let mut mover = FileMover::new();
            for path in &paths {
                if with_sidecars {
                    mover.trash_and_sidecars(path)?;
                } else if let Some(root) = &root {
                    mover.trash_with_root(path, root)?;
                } else {
                    mover.trash(path)?;
                }
                println!("trashed {}", path.display());
            }
        }

        Commands::FindHashes { roots, include_trash } => {
            let roots = if roots.is_empty() { vec![".".to_string()] } else { roots };
            let mut engine = HashEngine::new(Box::new(LoggingReporter), resolver(None));
            engine.find_hashes(
                &roots,
                include_trash,
                |_dir| true,
                |_media_path| true,
                |media_path, record| {
                    println!("{}: md5={} full_md5={}", media_path.display(), record.md5, record.full_md5);
                },
            )?;
        }
    }

    Ok(())
}

fn resolver(on_conflict: Option<OnConflict>) -> Box<dyn ConflictResolver> {
    match on_conflict {
        Some(OnConflict::Keep) => Box::new(FixedConflictResolver(ConflictDecision::Keep)),
        Some(OnConflict::Overwrite) => Box::new(FixedConflictResolver(ConflictDecision::Overwrite)),
        Some(OnConflict::Skip) => Box::new(FixedConflictResolver(ConflictDecision::Skip)),
        Some(OnConflict::Abort) => Box::new(FixedConflictResolver(ConflictDecision::Abort)),
        None => Box::new(InteractiveConflictResolver),
    }
}

/// Expand `paths` (files or directories) into the list of media files they
/// contain, walking directories recursively via the core `FileWalker` and
/// filtering by `TypeRegistry::is_media` (spec.md §4.1, §4.3).
fn collect_media_files(paths: &[PathBuf], include_trash: bool) -> Result<Vec<PathBuf>> {
    let roots: Vec<String> = paths.iter().map(|p| p.to_string_lossy().into_owned()).collect();
    let mut files = Vec::new();
    walker::walk(
        &roots,
        include_trash,
        |path: &Path, _root| {
            if path.is_dir() {
                true
            } else {
                path.file_name().map(|n| type_registry::is_media(&n.to_string_lossy())).unwrap_or(false)
            }
        },
        |path: &Path, _root| {
            if path.is_file() {
                files.push(path.to_path_buf());
            }
            Ok(())
        },
    )?;
    Ok(files)
}
