//! `ConflictResolver` collaborator: asked to arbitrate when a recomputed
//! content hash disagrees with the stored record (spec.md §4.6, §6).

use crate::orphdat_core::record::HashRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictDecision {
    Keep,
    Overwrite,
    Skip,
    Abort,
}

pub trait ConflictResolver {
    fn on_content_mismatch(&self, old: &HashRecord, new: &HashRecord) -> ConflictDecision;
}

/// Default `ConflictResolver`: prompts on stdin. Any input other than the
/// recognized single-letter answers is treated as `Skip`, matching the
/// teacher's permissive `import.rs` prompt loop.
pub struct InteractiveConflictResolver;

impl ConflictResolver for InteractiveConflictResolver {
    fn on_content_mismatch(&self, old: &HashRecord, new: &HashRecord) -> ConflictDecision {
        use std::io::Write;

        println!(
            "content mismatch for {}: stored md5 {} vs recomputed {}",
            old.filename, old.md5, new.md5
        );
        print!("[k]eep / [o]verwrite / [s]kip / [a]bort? ");
        let _ = std::io::stdout().flush();

        let mut line = String::new();
        if std::io::stdin().read_line(&mut line).is_err() {
            return ConflictDecision::Skip;
        }
        match line.trim().to_lowercase().as_str() {
            "k" | "keep" => ConflictDecision::Keep,
            "o" | "overwrite" => ConflictDecision::Overwrite,
            "a" | "abort" => ConflictDecision::Abort,
            _ => ConflictDecision::Skip,
        }
    }
}

/// A `ConflictResolver` that always returns the same decision, for
/// non-interactive use (the CLI's `--on-conflict` flag, and tests).
pub struct FixedConflictResolver(pub ConflictDecision);

impl ConflictResolver for FixedConflictResolver {
    fn on_content_mismatch(&self, _old: &HashRecord, _new: &HashRecord) -> ConflictDecision {
        self.0
    }
}
