//! Collects diagnostics from the parallel solver phases.

use crate::code::{Category, DiagnosticCode};
use crate::diagnostic::Diagnostic;
use crate::severity::Severity;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Diagnostics gathered over one optimizer run.
///
/// Level-parallel multiplier updates and per-troncon legalization jobs emit
/// into the same sink from worker threads, so arrival order is not
/// meaningful. [`diagnostics`](Self::diagnostics) returns them in a fixed
/// order instead: errors first, then by code and subject.
pub struct DiagnosticSink {
    diagnostics: Mutex<Vec<Diagnostic>>,
    errors: AtomicUsize,
    warnings: AtomicUsize,
}

impl DiagnosticSink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self {
            diagnostics: Mutex::new(Vec::new()),
            errors: AtomicUsize::new(0),
            warnings: AtomicUsize::new(0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Diagnostic>> {
        self.diagnostics.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Records a diagnostic. Safe to call from any worker thread.
    pub fn emit(&self, diag: Diagnostic) {
        let counter = match diag.severity {
            Severity::Error => &self.errors,
            Severity::Warning => &self.warnings,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        self.lock().push(diag);
    }

    /// Returns `true` if the solution is known to violate a channel limit.
    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }

    /// Number of error diagnostics.
    pub fn error_count(&self) -> usize {
        self.errors.load(Ordering::Relaxed)
    }

    /// Number of warning diagnostics.
    pub fn warning_count(&self) -> usize {
        self.warnings.load(Ordering::Relaxed)
    }

    /// How many diagnostics carry `code`.
    pub fn count_code(&self, code: DiagnosticCode) -> usize {
        self.lock().iter().filter(|d| d.code == code).count()
    }

    /// How many diagnostics fall in `category` (`C` channel, `S` solver, ...).
    pub fn count_category(&self, category: Category) -> usize {
        self.lock()
            .iter()
            .filter(|d| d.code.category == category)
            .count()
    }

    /// Snapshot of every diagnostic, errors first, then by code and subject.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        let mut out = self.lock().clone();
        out.sort_by(|a, b| {
            b.severity
                .cmp(&a.severity)
                .then(a.code.cmp(&b.code))
                .then_with(|| a.subject.cmp(&b.subject))
                .then_with(|| a.message.cmp(&b.message))
        });
        out
    }
}

impl Default for DiagnosticSink {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn widened(troncon: usize) -> Diagnostic {
        Diagnostic::warning(DiagnosticCode::new(Category::Channel, 2), "max choice widened")
            .with_subject(format!("troncon {troncon}"))
    }

    fn over_limit(troncon: usize) -> Diagnostic {
        Diagnostic::error(DiagnosticCode::new(Category::Channel, 3), "limit exceeded")
            .with_subject(format!("troncon {troncon}"))
    }

    fn unabsorbed(node: usize) -> Diagnostic {
        Diagnostic::warning(DiagnosticCode::new(Category::Solver, 2), "flow not absorbed")
            .with_subject(format!("timing node {node}"))
    }

    #[test]
    fn empty_sink() {
        let sink = DiagnosticSink::new();
        assert!(!sink.has_errors());
        assert_eq!(sink.error_count(), 0);
        assert_eq!(sink.warning_count(), 0);
        assert!(sink.diagnostics().is_empty());
    }

    #[test]
    fn counts_by_severity() {
        let sink = DiagnosticSink::new();
        sink.emit(widened(0));
        sink.emit(unabsorbed(3));
        sink.emit(over_limit(0));
        assert!(sink.has_errors());
        assert_eq!(sink.error_count(), 1);
        assert_eq!(sink.warning_count(), 2);
    }

    #[test]
    fn counts_by_code_and_category() {
        let sink = DiagnosticSink::new();
        sink.emit(widened(0));
        sink.emit(widened(1));
        sink.emit(over_limit(1));
        sink.emit(unabsorbed(7));
        assert_eq!(sink.count_code(DiagnosticCode::new(Category::Channel, 2)), 2);
        assert_eq!(sink.count_code(DiagnosticCode::new(Category::Channel, 4)), 0);
        assert_eq!(sink.count_category(Category::Channel), 3);
        assert_eq!(sink.count_category(Category::Solver), 1);
        assert_eq!(sink.count_category(Category::Timing), 0);
    }

    #[test]
    fn snapshot_puts_errors_first() {
        let sink = DiagnosticSink::new();
        sink.emit(unabsorbed(2));
        sink.emit(widened(1));
        sink.emit(over_limit(4));
        sink.emit(widened(0));
        let codes: Vec<String> = sink
            .diagnostics()
            .iter()
            .map(|d| format!("{} {}", d.code, d.subject.as_deref().unwrap_or("")))
            .collect();
        assert_eq!(
            codes,
            vec![
                "C003 troncon 4",
                "C002 troncon 0",
                "C002 troncon 1",
                "S002 timing node 2",
            ]
        );
    }

    #[test]
    fn parallel_emission_gives_a_stable_snapshot() {
        use std::sync::Arc;
        use std::thread;

        let run = || {
            let sink = Arc::new(DiagnosticSink::new());
            let handles: Vec<_> = (0..8)
                .map(|worker| {
                    let sink = Arc::clone(&sink);
                    thread::spawn(move || {
                        for i in 0..25 {
                            sink.emit(unabsorbed(worker * 25 + i));
                            if i % 5 == 0 {
                                sink.emit(over_limit(worker));
                            }
                        }
                    })
                })
                .collect();
            for h in handles {
                h.join().unwrap();
            }
            assert_eq!(sink.warning_count(), 200);
            assert_eq!(sink.error_count(), 40);
            sink.diagnostics()
                .into_iter()
                .map(|d| (d.code, d.subject))
                .collect::<Vec<_>>()
        };
        assert_eq!(run(), run());
    }
}
