//! `Reporter` collaborator: the engine emits lifecycle events through this
//! trait instead of writing to stdout directly (spec.md §6).

/// The kind of event being reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    Create,
    Read,
    Update,
    Delete,
    Trace,
}

pub trait Reporter {
    fn emit(&self, kind: ReportKind, message: &str);
}

/// Default `Reporter`: forwards every event to the `log` facade at a level
/// matching its kind.
pub struct LoggingReporter;

impl Reporter for LoggingReporter {
    fn emit(&self, kind: ReportKind, message: &str) {
        match kind {
            ReportKind::Create => log::info!("create: {message}"),
            ReportKind::Read => log::debug!("read: {message}"),
            ReportKind::Update => log::info!("update: {message}"),
            ReportKind::Delete => log::info!("delete: {message}"),
            ReportKind::Trace => log::trace!("{message}"),
        }
    }
}

#[cfg(test)]
pub mod test_support {
    use super::*;
    use std::cell::RefCell;

    /// A recording `Reporter` test double: collects every emitted event in
    /// order for assertion, instead of writing anywhere.
    #[derive(Default)]
    pub struct RecordingReporter {
        pub events: RefCell<Vec<(ReportKind, String)>>,
    }

    impl Reporter for RecordingReporter {
        fn emit(&self, kind: ReportKind, message: &str) {
            self.events.borrow_mut().push((kind, message.to_string()));
        }
    }
}
