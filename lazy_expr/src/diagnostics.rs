//! Construction-time diagnostics.
//!
//! Some operations succeed but do something a user may not expect: a
//! numeric promotion that can lose precision, a fold whose zero value had to
//! be widened to match its body, or a `drop` that named the same field
//! twice. These are not errors, so they are reported through an optional
//! collector instead.
//!
//! # Usage
//!
//! Diagnostics are disabled by default to avoid noisy output. Enable them via:
//! - `DiagnosticsCollector::enable()` - enable diagnostics collection
//! - `DiagnosticsCollector::disable()` - disable diagnostics collection
//! - `DiagnosticsCollector::take()` - retrieve and clear collected diagnostics
//!
//! Every emitted diagnostic is also logged as a `tracing` event at `debug`
//! level, whether or not collection is enabled.

use std::cell::RefCell;

use crate::types::ExprType;

/// Reason a diagnostic was emitted.
#[derive(Clone, Debug, PartialEq)]
pub enum DiagnosticReason {
    /// Numeric promotion whose target cannot represent every source value.
    LossyPromotion { from: ExprType, to: ExprType },

    /// Fold or scan reconciliation coerced the zero value to the body type.
    FoldZeroPromoted { from: ExprType, to: ExprType },

    /// `drop` named the same field more than once.
    DuplicateDropField(String),

    /// `InsertFields` construction hoisted repeated sources into bindings.
    /// Contains the number of hoisted sources.
    FieldsDeduplicated(usize),
}

impl std::fmt::Display for DiagnosticReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DiagnosticReason::LossyPromotion { from, to } => {
                write!(f, "promotion from '{}' to '{}' may lose precision", from, to)
            }
            DiagnosticReason::FoldZeroPromoted { from, to } => {
                write!(f, "fold zero value promoted from '{}' to '{}'", from, to)
            }
            DiagnosticReason::DuplicateDropField(name) => {
                write!(f, "field '{}' listed more than once in drop", name)
            }
            DiagnosticReason::FieldsDeduplicated(n) => {
                write!(f, "{} repeated field source(s) bound once", n)
            }
        }
    }
}

/// A single construction diagnostic (warning).
#[derive(Clone, Debug)]
pub struct BuildDiagnostic {
    /// What happened.
    pub reason: DiagnosticReason,
    /// Optional name of the operation that emitted it.
    pub context: Option<String>,
}

impl BuildDiagnostic {
    /// Create a new diagnostic.
    pub fn new(reason: DiagnosticReason) -> Self {
        Self {
            reason,
            context: None,
        }
    }

    /// Add context (operation name) to the diagnostic.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }
}

impl std::fmt::Display for BuildDiagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "warning: {}", self.reason)?;
        if let Some(ctx) = &self.context {
            write!(f, " (in {})", ctx)?;
        }
        Ok(())
    }
}

// Thread-local storage for diagnostics collector state
thread_local! {
    static DIAGNOSTICS_ENABLED: RefCell<bool> = const { RefCell::new(false) };
    static DIAGNOSTICS: RefCell<Vec<BuildDiagnostic>> = const { RefCell::new(Vec::new()) };
}

/// Collector for construction diagnostics.
///
/// Uses thread-local storage, so each thread building trees sees only its
/// own diagnostics.
#[derive(Debug)]
pub struct DiagnosticsCollector;

impl DiagnosticsCollector {
    /// Enable diagnostics collection.
    pub fn enable() {
        DIAGNOSTICS_ENABLED.with(|enabled| {
            *enabled.borrow_mut() = true;
        });
    }

    /// Disable diagnostics collection.
    pub fn disable() {
        DIAGNOSTICS_ENABLED.with(|enabled| {
            *enabled.borrow_mut() = false;
        });
    }

    /// Check if diagnostics collection is enabled.
    pub fn is_enabled() -> bool {
        DIAGNOSTICS_ENABLED.with(|enabled| *enabled.borrow())
    }

    /// Add a diagnostic to the collection (if enabled).
    pub fn emit(diagnostic: BuildDiagnostic) {
        tracing::debug!(diagnostic = %diagnostic, "build diagnostic");
        if Self::is_enabled() {
            DIAGNOSTICS.with(|diags| {
                diags.borrow_mut().push(diagnostic);
            });
        }
    }

    /// Take all collected diagnostics, clearing the collection.
    pub fn take() -> Vec<BuildDiagnostic> {
        DIAGNOSTICS.with(|diags| std::mem::take(&mut *diags.borrow_mut()))
    }

    /// Clear all collected diagnostics without returning them.
    pub fn clear() {
        DIAGNOSTICS.with(|diags| {
            diags.borrow_mut().clear();
        });
    }

    /// Get the number of collected diagnostics.
    pub fn count() -> usize {
        DIAGNOSTICS.with(|diags| diags.borrow().len())
    }
}

/// Helper function to emit a lossy promotion diagnostic.
pub fn emit_lossy_promotion(from: &ExprType, to: &ExprType) {
    DiagnosticsCollector::emit(BuildDiagnostic::new(DiagnosticReason::LossyPromotion {
        from: from.clone(),
        to: to.clone(),
    }));
}

/// Helper function to emit a fold zero promotion diagnostic.
pub fn emit_fold_zero_promoted(op: &str, from: &ExprType, to: &ExprType) {
    DiagnosticsCollector::emit(
        BuildDiagnostic::new(DiagnosticReason::FoldZeroPromoted {
            from: from.clone(),
            to: to.clone(),
        })
        .with_context(op),
    );
}

/// Helper function to emit a duplicate drop field diagnostic.
pub fn emit_duplicate_drop_field(name: &str) {
    DiagnosticsCollector::emit(
        BuildDiagnostic::new(DiagnosticReason::DuplicateDropField(name.to_string()))
            .with_context("drop"),
    );
}

/// Helper function to emit a field deduplication diagnostic.
pub fn emit_fields_deduplicated(count: usize) {
    DiagnosticsCollector::emit(
        BuildDiagnostic::new(DiagnosticReason::FieldsDeduplicated(count))
            .with_context("InsertFields"),
    );
}
